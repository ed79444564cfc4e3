use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::matching::{Match, MatchStatus};
use crate::domain::message::{Message, ModerationStatus};
use crate::domain::user::{Profile, User};
use crate::infra::store::{
    Directory, InsertOutcome, MatchFilter, MatchStore, MessageFilter, MessageStore,
    ModerationOutcome, SortOrder,
};

/// In-process backend. Every operation takes the single lock once, so
/// check-and-write sequences are atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    matches: HashMap<Uuid, Match>,
    pairs: HashMap<String, Uuid>,
    // insertion order
    messages: Vec<Message>,
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user (and optional profile) as the identity service would.
    pub fn insert_user(&self, user: User, profile: Option<Profile>) -> Result<()> {
        let mut state = self.state()?;
        if let Some(profile) = profile {
            state.profiles.insert(user.id, profile);
        }
        state.users.insert(user.id, user);
        Ok(())
    }

    /// Drops a user and their profile from the directory. Matches and
    /// messages referencing them are left in place.
    pub fn remove_user(&self, user_id: Uuid) -> Result<bool> {
        let mut state = self.state()?;
        state.profiles.remove(&user_id);
        Ok(state.users.remove(&user_id).is_some())
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn insert_if_absent(&self, candidate: Match) -> Result<InsertOutcome> {
        let mut state = self.state()?;
        let key = candidate.key();
        if let Some(existing_id) = state.pairs.get(&key).copied() {
            return Ok(match state.matches.get(&existing_id) {
                Some(existing) => InsertOutcome::Existing(existing.clone()),
                None => InsertOutcome::Lost,
            });
        }
        state.pairs.insert(key, candidate.id);
        state.matches.insert(candidate.id, candidate.clone());
        Ok(InsertOutcome::Created(candidate))
    }

    async fn find(&self, id: Uuid) -> Result<Option<Match>> {
        Ok(self.state()?.matches.get(&id).cloned())
    }

    async fn find_by_pair(&self, a: Uuid, b: Uuid) -> Result<Option<Match>> {
        let state = self.state()?;
        Ok(state
            .pairs
            .get(&Match::pair_key(a, b))
            .and_then(|id| state.matches.get(id))
            .cloned())
    }

    async fn list(&self, filter: &MatchFilter) -> Result<Vec<Match>> {
        let state = self.state()?;
        let mut matches: Vec<Match> = state
            .matches
            .values()
            .filter(|record| record.involves(filter.user_id))
            .filter(|record| filter.status.map_or(true, |status| record.status == status))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.last_interaction
                .cmp(&a.last_interaction)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(matches)
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: MatchStatus,
        status: MatchStatus,
        updated_at: OffsetDateTime,
    ) -> Result<Option<Match>> {
        let mut state = self.state()?;
        Ok(state
            .matches
            .get_mut(&id)
            .filter(|record| record.status == expected)
            .map(|record| {
                record.status = status;
                record.updated_at = updated_at;
                record.clone()
            }))
    }

    async fn record_message(&self, id: Uuid, at: OffsetDateTime) -> Result<bool> {
        let mut state = self.state()?;
        match state.matches.get_mut(&id) {
            Some(record) => {
                record.message_count += 1;
                record.last_interaction = at;
                record.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert(&self, message: Message) -> Result<Message> {
        self.state()?.messages.push(message.clone());
        Ok(message)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Message>> {
        Ok(self
            .state()?
            .messages
            .iter()
            .find(|message| message.id == id)
            .cloned())
    }

    async fn list(
        &self,
        filter: &MessageFilter,
        order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>> {
        let state = self.state()?;
        let mut selected: Vec<&Message> = state
            .messages
            .iter()
            .filter(|message| filter.matches(message))
            .collect();

        // Stable sorts: ties keep insertion order, reversed for descending.
        match order {
            SortOrder::Ascending => selected.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::Descending => {
                selected.reverse();
                selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
        }

        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(selected
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &MessageFilter) -> Result<i64> {
        let count = self
            .state()?
            .messages
            .iter()
            .filter(|message| filter.matches(message))
            .count();
        Ok(i64::try_from(count)?)
    }

    async fn mark_read(&self, id: Uuid, at: OffsetDateTime) -> Result<bool> {
        let mut state = self.state()?;
        match state
            .messages
            .iter_mut()
            .find(|message| message.id == id && !message.read_status)
        {
            Some(message) => {
                message.read_status = true;
                message.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn resolve_pending(
        &self,
        id: Uuid,
        outcome: &ModerationOutcome,
    ) -> Result<Option<Message>> {
        let mut state = self.state()?;
        Ok(state
            .messages
            .iter_mut()
            .find(|message| {
                message.id == id && message.moderation_status == ModerationStatus::Pending
            })
            .map(|message| {
                message.moderation_status = outcome.status;
                message.moderation_reason = outcome.reason.clone();
                message.moderated_by = Some(outcome.moderator_id);
                message.moderated_at = Some(outcome.decided_at);
                message.updated_at = outcome.decided_at;
                message.clone()
            }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state()?;
        let before = state.messages.len();
        state.messages.retain(|message| message.id != id);
        Ok(state.messages.len() < before)
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state()?.users.get(&id).cloned())
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        Ok(self.state()?.profiles.get(&user_id).cloned())
    }
}
