//! Order notification handoff: a pre-filled chat message addressed to the store contact.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Serialize;

use crate::domain::aggregates::{NotificationSettings, Order};
use crate::domain::value_objects::format_naira;

pub const MESSAGING_BASE_URL: &str = "https://wa.me";

/// West Africa Time, used for the timestamp in the message.
const WAT_OFFSET_SECS: i32 = 3600;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeItem { pub name: String, pub size: String, pub quantity: u32, pub price: i64 }

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotice {
    pub order_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<NoticeItem>,
    pub total_price: i64,
}

impl From<&Order> for OrderNotice {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            items: order.items.iter().map(|i| NoticeItem { name: i.name.clone(), size: i.size.clone(), quantity: i.quantity, price: i.price }).collect(),
            total_price: order.total_price,
        }
    }
}

impl OrderNotice {
    pub fn render(&self, placed_at: DateTime<Utc>) -> String {
        let items = self.items.iter().enumerate()
            .map(|(n, item)| format!(
                "{}. {}\n   Size: {}\n   Quantity: {}\n   Price: {}",
                n + 1, item.name, item.size, item.quantity, format_naira(item.price * i64::from(item.quantity)),
            ))
            .collect::<Vec<_>>()
            .join("\n\n");
        let wat = FixedOffset::east_opt(WAT_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
        format!(
            "*NEW ORDER - LILUXE STORE*\n\n\
             *Order ID:* {}\n\n\
             *Customer Details:*\nName: {}\nPhone: {}\n\n\
             *Items Ordered:*\n{}\n\n\
             *Total Amount:* {}\n\n\
             ---\nOrder placed on {}",
            self.order_id, self.customer_name, self.customer_phone, items,
            format_naira(self.total_price),
            placed_at.with_timezone(&wat).format("%b %-d, %Y, %-I:%M %p"),
        )
    }

    /// Deep link that opens a chat with `contact` (bare digits) pre-filled with the rendered message.
    pub fn handoff_url(&self, contact: &str, placed_at: DateTime<Utc>) -> String {
        format!("{MESSAGING_BASE_URL}/{contact}?text={}", urlencoding::encode(&self.render(placed_at)))
    }
}

/// Link for a placed order, or `None` when notifications are switched off.
pub fn handoff_for(order: &Order, settings: &NotificationSettings) -> Option<String> {
    if !settings.enabled { return None; }
    Some(OrderNotice::from(order).handoff_url(&settings.contact_digits(), order.created_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn notice() -> OrderNotice {
        OrderNotice {
            order_id: "ord1".into(), customer_name: "Ada".into(), customer_phone: "+2348012345678".into(),
            items: vec![NoticeItem { name: "Raffia Tote".into(), size: "One Size".into(), quantity: 2, price: 7500 }],
            total_price: 15000,
        }
    }

    #[test]
    fn test_render_lists_items_and_total() {
        let placed = Utc.with_ymd_and_hms(2024, 3, 5, 13, 30, 0).unwrap();
        let text = notice().render(placed);
        assert!(text.starts_with("*NEW ORDER - LILUXE STORE*"));
        assert!(text.contains("*Order ID:* ord1"));
        assert!(text.contains("1. Raffia Tote\n   Size: One Size\n   Quantity: 2\n   Price: ₦15,000"));
        assert!(text.contains("*Total Amount:* ₦15,000"));
        assert!(text.ends_with("Order placed on Mar 5, 2024, 2:30 PM"));
    }

    #[test]
    fn test_handoff_url_is_percent_encoded() {
        let placed = Utc.with_ymd_and_hms(2024, 3, 5, 13, 30, 0).unwrap();
        let url = notice().handoff_url("2348052465801", placed);
        assert!(url.starts_with("https://wa.me/2348052465801?text=%2ANEW%20ORDER"));
        assert!(!url.contains(' '));
        assert!(!url.contains('\n'));
    }
}
