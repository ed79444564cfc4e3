use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::user::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
    Blocked,
}

impl MatchStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Blocked => "blocked",
        }
    }
}

/// Relationship between exactly one prisoner-side and one partner-side user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub prisoner_id: Uuid,
    pub partner_id: Uuid,
    pub status: MatchStatus,
    pub initiated_by: Side,
    pub match_score: f64,
    pub match_reason: Vec<String>,
    pub message_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_interaction: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Match {
    /// Canonical identifier of the unordered pair `{a, b}`.
    pub fn pair_key(a: Uuid, b: Uuid) -> String {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        format!("{}:{}", low, high)
    }

    pub fn key(&self) -> String {
        Self::pair_key(self.prisoner_id, self.partner_id)
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.prisoner_id == user_id || self.partner_id == user_id
    }

    /// The other participant relative to `user_id`.
    pub fn counterpart(&self, user_id: Uuid) -> Option<Uuid> {
        if self.prisoner_id == user_id {
            Some(self.partner_id)
        } else if self.partner_id == user_id {
            Some(self.prisoner_id)
        } else {
            None
        }
    }

    pub fn initiator_id(&self) -> Uuid {
        match self.initiated_by {
            Side::Prisoner => self.prisoner_id,
            Side::Partner => self.partner_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_ignores_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(Match::pair_key(a, b), Match::pair_key(b, a));
        assert_ne!(Match::pair_key(a, b), Match::pair_key(a, Uuid::new_v4()));
    }

    #[test]
    fn unknown_status_text_is_rejected() {
        assert_eq!(MatchStatus::from_db("archived"), None);
        assert_eq!(MatchStatus::from_db("Accepted"), None);
    }

    #[test]
    fn counterpart_is_relative_to_requester() {
        let now = OffsetDateTime::now_utc();
        let record = Match {
            id: Uuid::new_v4(),
            prisoner_id: Uuid::new_v4(),
            partner_id: Uuid::new_v4(),
            status: MatchStatus::Pending,
            initiated_by: Side::Partner,
            match_score: 0.0,
            match_reason: Vec::new(),
            message_count: 0,
            last_interaction: now,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(record.counterpart(record.prisoner_id), Some(record.partner_id));
        assert_eq!(record.counterpart(record.partner_id), Some(record.prisoner_id));
        assert_eq!(record.counterpart(Uuid::new_v4()), None);
        assert_eq!(record.initiator_id(), record.partner_id);
    }
}
