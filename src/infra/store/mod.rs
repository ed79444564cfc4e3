//! Persistence seam for matches, messages and the identity directory.
//!
//! Services only talk to the traits here. `PgStore` backs them with Postgres,
//! `MemoryStore` keeps everything in-process for local runs and tests.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::matching::{Match, MatchStatus};
use crate::domain::message::{Message, ModerationStatus};
use crate::domain::user::{Profile, User};
use crate::infra::db::Db;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Result of an insert keyed on the canonical pair.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Created(Match),
    Existing(Match),
    /// The pair was taken concurrently but the winning row could not be read.
    Lost,
}

#[derive(Debug, Clone)]
pub struct MatchFilter {
    pub user_id: Uuid,
    pub status: Option<MatchStatus>,
}

/// Conjunction of optional predicates over messages.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub match_id: Option<Uuid>,
    /// Sender or recipient.
    pub participant: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub read_status: Option<bool>,
    pub moderation_status: Option<ModerationStatus>,
    /// Approved messages plus anything this user sent.
    pub visible_to: Option<Uuid>,
}

impl MessageFilter {
    pub fn for_match(match_id: Uuid) -> Self {
        Self {
            match_id: Some(match_id),
            ..Self::default()
        }
    }

    pub fn involving(user_id: Uuid) -> Self {
        Self {
            participant: Some(user_id),
            ..Self::default()
        }
    }

    /// Approved, unread messages addressed to `user_id`.
    pub fn unread_for(user_id: Uuid) -> Self {
        Self {
            recipient_id: Some(user_id),
            read_status: Some(false),
            moderation_status: Some(ModerationStatus::Approved),
            ..Self::default()
        }
    }

    pub fn pending() -> Self {
        Self {
            moderation_status: Some(ModerationStatus::Pending),
            ..Self::default()
        }
    }

    pub fn in_match(mut self, match_id: Uuid) -> Self {
        self.match_id = Some(match_id);
        self
    }

    pub fn approved(mut self) -> Self {
        self.moderation_status = Some(ModerationStatus::Approved);
        self
    }

    pub fn visible_to(mut self, user_id: Uuid) -> Self {
        self.visible_to = Some(user_id);
        self
    }

    pub fn matches(&self, message: &Message) -> bool {
        if self.match_id.is_some_and(|id| message.match_id != id) {
            return false;
        }
        if self
            .participant
            .is_some_and(|id| message.sender_id != id && message.recipient_id != id)
        {
            return false;
        }
        if self.recipient_id.is_some_and(|id| message.recipient_id != id) {
            return false;
        }
        if self.read_status.is_some_and(|read| message.read_status != read) {
            return false;
        }
        if self
            .moderation_status
            .is_some_and(|status| message.moderation_status != status)
        {
            return false;
        }
        if self.visible_to.is_some_and(|viewer| {
            message.moderation_status != ModerationStatus::Approved && message.sender_id != viewer
        }) {
            return false;
        }
        true
    }
}

/// A moderator's decision about to be applied to a pending message.
#[derive(Debug, Clone)]
pub struct ModerationOutcome {
    pub status: ModerationStatus,
    pub reason: Option<String>,
    pub moderator_id: Uuid,
    pub decided_at: OffsetDateTime,
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Atomically inserts `candidate` unless its pair is already linked.
    async fn insert_if_absent(&self, candidate: Match) -> Result<InsertOutcome>;

    async fn find(&self, id: Uuid) -> Result<Option<Match>>;

    async fn find_by_pair(&self, a: Uuid, b: Uuid) -> Result<Option<Match>>;

    /// Matches involving the user, newest `last_interaction` first.
    async fn list(&self, filter: &MatchFilter) -> Result<Vec<Match>>;

    /// Moves the match to `status` only while it is still in `expected`.
    /// Returns `None` when the match is gone or its status has moved on.
    async fn update_status(
        &self,
        id: Uuid,
        expected: MatchStatus,
        status: MatchStatus,
        updated_at: OffsetDateTime,
    ) -> Result<Option<Match>>;

    /// Increments `message_count` and bumps `last_interaction` in one step.
    /// Returns false when the match no longer exists.
    async fn record_message(&self, id: Uuid, at: OffsetDateTime) -> Result<bool>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: Message) -> Result<Message>;

    async fn find(&self, id: Uuid) -> Result<Option<Message>>;

    /// Ordered by `created_at` in the given direction.
    async fn list(
        &self,
        filter: &MessageFilter,
        order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>>;

    async fn count(&self, filter: &MessageFilter) -> Result<i64>;

    /// Flips `read_status` to true. Returns false if it already was.
    async fn mark_read(&self, id: Uuid, at: OffsetDateTime) -> Result<bool>;

    /// Applies `outcome` only while the message is still pending.
    async fn resolve_pending(
        &self,
        id: Uuid,
        outcome: &ModerationOutcome,
    ) -> Result<Option<Message>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Read-only view of the identity service's users and profiles.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>>;
}

#[derive(Clone)]
pub struct Stores {
    pub matches: Arc<dyn MatchStore>,
    pub messages: Arc<dyn MessageStore>,
    pub directory: Arc<dyn Directory>,
    db: Option<Db>,
}

impl Stores {
    pub fn postgres(db: Db) -> Self {
        let store = Arc::new(PgStore::new(db.clone()));
        Self {
            matches: store.clone(),
            messages: store.clone(),
            directory: store,
            db: Some(db),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            matches: store.clone(),
            messages: store.clone(),
            directory: store,
            db: None,
        }
    }

    pub async fn ping(&self) -> Result<()> {
        match &self.db {
            Some(db) => db.ping().await,
            None => Ok(()),
        }
    }
}
