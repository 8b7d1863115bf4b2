//! User profiles. Roles are provisioned outside the application and never changed here.

use chrono::Utc;
use std::sync::Arc;

use crate::domain::aggregates::User;
use crate::store::{self, DocumentStore, StoreError, USERS};

pub struct UserService {
    store: Arc<dyn DocumentStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self { Self { store } }

    pub async fn get(&self, id: &str) -> Result<Option<User>, StoreError> {
        store::fetch(self.store.as_ref(), USERS, id).await
    }

    /// Returns the existing profile, or creates a customer profile on first sign-in.
    pub async fn ensure_profile(&self, id: &str, email: &str, name: Option<&str>) -> Result<User, StoreError> {
        if let Some(existing) = self.get(id).await? {
            return Ok(existing);
        }
        let user = User::signup(id, email, name, Utc::now());
        match self.store.create(USERS, id, store::encode(&user)?).await {
            Ok(()) => {
                tracing::info!(user_id = id, "user profile created");
                Ok(user)
            }
            // Lost a race with a concurrent first sign-in; the other writer's profile wins.
            Err(StoreError::AlreadyExists { .. }) => self.get(id).await?.ok_or_else(|| StoreError::not_found(USERS, id)),
            Err(e) => Err(e),
        }
    }
}
