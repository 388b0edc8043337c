use crate::order::{ActorSide, Order};
use crate::util::local_date;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Longest accepted message body (chars)
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Shortest space-free token treated as a blob id
const BLOB_ID_MIN_LEN: usize = 32;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Paths served by the blob store
const STORAGE_PATHS: [&str; 2] = ["/api/blobs/", "/api/storage/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Customer,
    Owner,
    Staff,
}

impl SenderRole {
    pub fn side(&self) -> ActorSide {
        match self {
            SenderRole::Customer => ActorSide::Customer,
            SenderRole::Owner | SenderRole::Staff => ActorSide::Restaurant,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    /// Body is a blob id or image URL
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: String,
    pub order_id: String,
    /// Server-assigned Unix millis, strictly increasing per order
    pub timestamp: i64,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_role: SenderRole,
    pub body: String,
    pub kind: MessageKind,
}

impl ChatMessage {
    pub fn side(&self) -> ActorSide {
        self.sender_role.side()
    }
}

/// Send payload. `kind` is inferred from the body when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessage {
    pub body: String,
    #[serde(default)]
    pub kind: Option<MessageKind>,
}

impl SendMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            kind: Some(MessageKind::Text),
        }
    }

    pub fn image(blob_id: impl Into<String>) -> Self {
        Self {
            body: blob_id.into(),
            kind: Some(MessageKind::Image),
        }
    }

    pub fn resolved_kind(&self) -> MessageKind {
        self.kind.unwrap_or_else(|| classify_body(&self.body))
    }
}

/// Unread count and last message of one order, for the requesting side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub order_id: String,
    pub unread_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<ChatMessage>,
}

/// Guess the kind of a message whose sender did not tag it
///
/// An http(s) URL ending in an image extension or pointing at blob storage
/// is an image. So is a long space-free alphanumeric token, which is how
/// blob ids look. Everything else is text.
pub fn classify_body(body: &str) -> MessageKind {
    let body = body.trim();

    if body.starts_with("http://") || body.starts_with("https://") {
        let path = body.split(['?', '#']).next().unwrap_or(body);
        let has_image_ext = path
            .rsplit_once('.')
            .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        let is_storage = STORAGE_PATHS.iter().any(|p| path.contains(p));
        if has_image_ext || is_storage {
            return MessageKind::Image;
        }
        return MessageKind::Text;
    }

    let looks_like_blob_id = body.len() >= BLOB_ID_MIN_LEN
        && body
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if looks_like_blob_id {
        MessageKind::Image
    } else {
        MessageKind::Text
    }
}

/// Chat gate
///
/// Closed when the restaurant disabled chat, or when the order is final and
/// `now` falls on a later calendar day (business timezone) than creation.
pub fn is_chat_open(order: &Order, now: i64, tz: Tz) -> bool {
    if !order.allow_chat {
        return false;
    }
    if order.status.is_chat_final() {
        return local_date(now, tz) <= local_date(order.created_at, tz);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use crate::order::model::fixtures::order;
    use chrono::TimeZone;
    use chrono_tz::Asia::Manila;

    fn at(d: u32, h: u32, m: u32, s: u32) -> i64 {
        Manila
            .with_ymd_and_hms(2026, 10, d, h, m, s)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn test_chat_gate_day_boundary() {
        let created = at(17, 9, 0, 0);
        let o = order("o1", "c1", created, OrderStatus::Completed);

        assert!(is_chat_open(&o, created, Manila));
        assert!(is_chat_open(&o, at(17, 23, 59, 59) + 999, Manila));
        assert!(!is_chat_open(&o, at(18, 0, 0, 0), Manila));
        assert!(!is_chat_open(&o, at(25, 12, 0, 0), Manila));
    }

    #[test]
    fn test_chat_gate_open_for_non_final_orders() {
        let created = at(17, 9, 0, 0);
        for status in [OrderStatus::Pending, OrderStatus::Ready, OrderStatus::Denied] {
            let o = order("o1", "c1", created, status);
            assert!(is_chat_open(&o, at(20, 9, 0, 0), Manila), "{status}");
        }
    }

    #[test]
    fn test_chat_gate_disabled() {
        let created = at(17, 9, 0, 0);
        let mut o = order("o1", "c1", created, OrderStatus::Pending);
        o.allow_chat = false;
        assert!(!is_chat_open(&o, created, Manila));
    }

    #[test]
    fn test_classify_urls() {
        assert_eq!(
            classify_body("https://cdn.example.com/p/receipt.JPG"),
            MessageKind::Image
        );
        assert_eq!(
            classify_body("https://cdn.example.com/p/receipt.png?size=large"),
            MessageKind::Image
        );
        assert_eq!(
            classify_body("http://localhost:3000/api/blobs/abc123"),
            MessageKind::Image
        );
        assert_eq!(
            classify_body("https://maps.example.com/place/here"),
            MessageKind::Text
        );
    }

    #[test]
    fn test_classify_blob_ids_and_text() {
        let blob = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
        assert_eq!(classify_body(blob), MessageKind::Image);
        assert_eq!(classify_body("Thank you!"), MessageKind::Text);
        assert_eq!(classify_body("short"), MessageKind::Text);
        assert_eq!(
            classify_body("is my order ready yet, it has been thirty minutes"),
            MessageKind::Text
        );
    }

    #[test]
    fn test_explicit_kind_wins() {
        let blob_looking = "a".repeat(40);
        let msg = SendMessage::text(blob_looking.clone());
        assert_eq!(msg.resolved_kind(), MessageKind::Text);

        let untagged = SendMessage {
            body: blob_looking,
            kind: None,
        };
        assert_eq!(untagged.resolved_kind(), MessageKind::Image);
    }

    #[test]
    fn test_sender_sides() {
        assert_eq!(SenderRole::Owner.side(), ActorSide::Restaurant);
        assert_eq!(SenderRole::Staff.side(), ActorSide::Restaurant);
        assert_eq!(SenderRole::Customer.side(), ActorSide::Customer);
    }
}
