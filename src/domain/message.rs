use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::user::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Outcome a moderator may assign to a pending message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationDecision {
    Approved,
    Rejected,
}

impl ModerationDecision {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn status(&self) -> ModerationStatus {
        match self {
            Self::Approved => ModerationStatus::Approved,
            Self::Rejected => ModerationStatus::Rejected,
        }
    }
}

/// Deployment-wide choice of whether messages wait for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModerationPolicy {
    /// Messages are visible as soon as they are sent.
    #[default]
    Unmoderated,
    /// Every message waits in the moderation queue until resolved.
    PreModerated,
}

impl ModerationPolicy {
    pub fn from_config(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::Unmoderated),
            "pre" => Some(Self::PreModerated),
            _ => None,
        }
    }

    pub fn initial_status(&self) -> ModerationStatus {
        match self {
            Self::Unmoderated => ModerationStatus::Approved,
            Self::PreModerated => ModerationStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub sender_type: Side,
    pub recipient_id: Uuid,
    pub content: String,
    pub attachments: Vec<String>,
    pub read_status: bool,
    pub moderation_status: ModerationStatus,
    pub moderation_reason: Option<String>,
    pub moderated_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub moderated_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
