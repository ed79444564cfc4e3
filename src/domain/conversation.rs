use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::matching::MatchStatus;
use crate::domain::user::Role;

/// Shown in place of a last message when a match has no approved messages.
pub const NO_MESSAGES_PLACEHOLDER: &str = "No messages yet";

/// The other side of a match, as presented to a participant.
#[derive(Debug, Clone, Serialize)]
pub struct PartnerView {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub role: Role,
}

/// Per-user inbox entry derived from a match and its messages. Never stored.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub match_id: Uuid,
    pub partner_id: Uuid,
    pub partner_name: String,
    pub partner_img: Option<String>,
    pub last_message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_message_date: OffsetDateTime,
    pub unread_count: i64,
    pub status: MatchStatus,
}

/// Conversations with unread messages first, then newest activity first
/// within each group.
pub fn sort_conversations(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| {
        let a_unread = a.unread_count > 0;
        let b_unread = b.unread_count > 0;
        b_unread
            .cmp(&a_unread)
            .then_with(|| b.last_message_date.cmp(&a.last_message_date))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn conversation(name: &str, unread_count: i64, last_message_date: OffsetDateTime) -> Conversation {
        Conversation {
            match_id: Uuid::new_v4(),
            partner_id: Uuid::new_v4(),
            partner_name: name.to_string(),
            partner_img: None,
            last_message: String::new(),
            last_message_date,
            unread_count,
            status: MatchStatus::Accepted,
        }
    }

    fn names(conversations: &[Conversation]) -> Vec<&str> {
        conversations
            .iter()
            .map(|conversation| conversation.partner_name.as_str())
            .collect()
    }

    #[test]
    fn unread_beats_newer_read_conversation() {
        let t1 = OffsetDateTime::now_utc();
        let t2 = t1 + Duration::minutes(5);
        let mut items = vec![conversation("y", 0, t2), conversation("x", 2, t1)];

        sort_conversations(&mut items);

        assert_eq!(names(&items), vec!["x", "y"]);
    }

    #[test]
    fn each_group_sorted_newest_first() {
        let base = OffsetDateTime::now_utc();
        let mut items = vec![
            conversation("read-old", 0, base),
            conversation("unread-old", 1, base + Duration::minutes(1)),
            conversation("read-new", 0, base + Duration::minutes(10)),
            conversation("unread-new", 7, base + Duration::minutes(2)),
        ];

        sort_conversations(&mut items);

        assert_eq!(
            names(&items),
            vec!["unread-new", "unread-old", "read-new", "read-old"]
        );
    }

    #[test]
    fn unread_magnitude_does_not_affect_order() {
        let base = OffsetDateTime::now_utc();
        let mut items = vec![
            conversation("many", 9, base),
            conversation("one", 1, base + Duration::seconds(1)),
        ];

        sort_conversations(&mut items);

        assert_eq!(names(&items), vec!["one", "many"]);
    }
}
