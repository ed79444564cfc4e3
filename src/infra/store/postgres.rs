use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::matching::{Match, MatchStatus};
use crate::domain::message::{Message, ModerationStatus};
use crate::domain::user::{Profile, Role, Side, User};
use crate::infra::db::Db;
use crate::infra::store::{
    Directory, InsertOutcome, MatchFilter, MatchStore, MessageFilter, MessageStore,
    ModerationOutcome, SortOrder,
};

const MATCH_COLUMNS: &str = "id, prisoner_id, partner_id, status, initiated_by, match_score, \
     match_reason, message_count, last_interaction, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, match_id, sender_id, sender_type, recipient_id, content, \
     attachments, read_status, moderation_status, moderation_reason, moderated_by, \
     moderated_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

fn match_from_row(row: &PgRow) -> Result<Match> {
    let status: String = row.try_get("status")?;
    let status = MatchStatus::from_db(&status)
        .ok_or_else(|| anyhow!("unknown match status: {}", status))?;
    let initiated_by: String = row.try_get("initiated_by")?;
    let initiated_by = Side::from_db(&initiated_by)
        .ok_or_else(|| anyhow!("unknown match initiator: {}", initiated_by))?;

    Ok(Match {
        id: row.try_get("id")?,
        prisoner_id: row.try_get("prisoner_id")?,
        partner_id: row.try_get("partner_id")?,
        status,
        initiated_by,
        match_score: row.try_get("match_score")?,
        match_reason: row.try_get("match_reason")?,
        message_count: row.try_get("message_count")?,
        last_interaction: row.try_get("last_interaction")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn message_from_row(row: &PgRow) -> Result<Message> {
    let sender_type: String = row.try_get("sender_type")?;
    let sender_type = Side::from_db(&sender_type)
        .ok_or_else(|| anyhow!("unknown sender type: {}", sender_type))?;
    let moderation_status: String = row.try_get("moderation_status")?;
    let moderation_status = ModerationStatus::from_db(&moderation_status)
        .ok_or_else(|| anyhow!("unknown moderation status: {}", moderation_status))?;

    Ok(Message {
        id: row.try_get("id")?,
        match_id: row.try_get("match_id")?,
        sender_id: row.try_get("sender_id")?,
        sender_type,
        recipient_id: row.try_get("recipient_id")?,
        content: row.try_get("content")?,
        attachments: row.try_get("attachments")?,
        read_status: row.try_get("read_status")?,
        moderation_status,
        moderation_reason: row.try_get("moderation_reason")?,
        moderated_by: row.try_get("moderated_by")?,
        moderated_at: row.try_get("moderated_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_message_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &MessageFilter) {
    builder.push(" WHERE TRUE");
    if let Some(match_id) = filter.match_id {
        builder.push(" AND match_id = ").push_bind(match_id);
    }
    if let Some(user_id) = filter.participant {
        builder
            .push(" AND (sender_id = ")
            .push_bind(user_id)
            .push(" OR recipient_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(recipient_id) = filter.recipient_id {
        builder.push(" AND recipient_id = ").push_bind(recipient_id);
    }
    if let Some(read_status) = filter.read_status {
        builder.push(" AND read_status = ").push_bind(read_status);
    }
    if let Some(status) = filter.moderation_status {
        builder
            .push(" AND moderation_status = ")
            .push_bind(status.as_db());
    }
    if let Some(viewer) = filter.visible_to {
        builder
            .push(" AND (moderation_status = 'approved' OR sender_id = ")
            .push_bind(viewer)
            .push(")");
    }
}

#[async_trait]
impl MatchStore for PgStore {
    async fn insert_if_absent(&self, candidate: Match) -> Result<InsertOutcome> {
        let key = candidate.key();
        let row = sqlx::query(&format!(
            "INSERT INTO matches (id, pair_key, prisoner_id, partner_id, status, initiated_by, \
                                  match_score, match_reason, message_count, last_interaction, \
                                  created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (pair_key) DO NOTHING \
             RETURNING {}",
            MATCH_COLUMNS
        ))
        .bind(candidate.id)
        .bind(&key)
        .bind(candidate.prisoner_id)
        .bind(candidate.partner_id)
        .bind(candidate.status.as_db())
        .bind(candidate.initiated_by.as_db())
        .bind(candidate.match_score)
        .bind(&candidate.match_reason)
        .bind(candidate.message_count)
        .bind(candidate.last_interaction)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .fetch_optional(self.db.pool())
        .await?;

        if let Some(row) = row {
            return Ok(InsertOutcome::Created(match_from_row(&row)?));
        }

        let existing = sqlx::query(&format!(
            "SELECT {} FROM matches WHERE pair_key = $1",
            MATCH_COLUMNS
        ))
        .bind(&key)
        .fetch_optional(self.db.pool())
        .await?;

        match existing {
            Some(row) => Ok(InsertOutcome::Existing(match_from_row(&row)?)),
            None => Ok(InsertOutcome::Lost),
        }
    }

    async fn find(&self, id: Uuid) -> Result<Option<Match>> {
        let row = sqlx::query(&format!("SELECT {} FROM matches WHERE id = $1", MATCH_COLUMNS))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(match_from_row).transpose()
    }

    async fn find_by_pair(&self, a: Uuid, b: Uuid) -> Result<Option<Match>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM matches WHERE pair_key = $1",
            MATCH_COLUMNS
        ))
        .bind(Match::pair_key(a, b))
        .fetch_optional(self.db.pool())
        .await?;
        row.as_ref().map(match_from_row).transpose()
    }

    async fn list(&self, filter: &MatchFilter) -> Result<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM matches \
             WHERE (prisoner_id = $1 OR partner_id = $1) \
               AND ($2::text IS NULL OR status = $2) \
             ORDER BY last_interaction DESC, id DESC",
            MATCH_COLUMNS
        ))
        .bind(filter.user_id)
        .bind(filter.status.map(|status| status.as_db()))
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: MatchStatus,
        status: MatchStatus,
        updated_at: OffsetDateTime,
    ) -> Result<Option<Match>> {
        let row = sqlx::query(&format!(
            "UPDATE matches SET status = $2, updated_at = $3 \
             WHERE id = $1 AND status = $4 \
             RETURNING {}",
            MATCH_COLUMNS
        ))
        .bind(id)
        .bind(status.as_db())
        .bind(updated_at)
        .bind(expected.as_db())
        .fetch_optional(self.db.pool())
        .await?;
        row.as_ref().map(match_from_row).transpose()
    }

    async fn record_message(&self, id: Uuid, at: OffsetDateTime) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE matches \
             SET message_count = message_count + 1, last_interaction = $2, updated_at = $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn insert(&self, message: Message) -> Result<Message> {
        let row = sqlx::query(&format!(
            "INSERT INTO messages (id, match_id, sender_id, sender_type, recipient_id, content, \
                                   attachments, read_status, moderation_status, moderation_reason, \
                                   moderated_by, moderated_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {}",
            MESSAGE_COLUMNS
        ))
        .bind(message.id)
        .bind(message.match_id)
        .bind(message.sender_id)
        .bind(message.sender_type.as_db())
        .bind(message.recipient_id)
        .bind(&message.content)
        .bind(&message.attachments)
        .bind(message.read_status)
        .bind(message.moderation_status.as_db())
        .bind(&message.moderation_reason)
        .bind(message.moderated_by)
        .bind(message.moderated_at)
        .bind(message.created_at)
        .bind(message.updated_at)
        .fetch_one(self.db.pool())
        .await?;

        message_from_row(&row)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Message>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM messages WHERE id = $1",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        row.as_ref().map(message_from_row).transpose()
    }

    async fn list(
        &self,
        filter: &MessageFilter,
        order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM messages", MESSAGE_COLUMNS));
        push_message_filter(&mut builder, filter);
        builder.push(match order {
            SortOrder::Ascending => " ORDER BY created_at ASC, id ASC",
            SortOrder::Descending => " ORDER BY created_at DESC, id DESC",
        });
        builder.push(" LIMIT ").push_bind(limit);
        builder.push(" OFFSET ").push_bind(offset);

        let rows = builder.build().fetch_all(self.db.pool()).await?;
        rows.iter().map(message_from_row).collect()
    }

    async fn count(&self, filter: &MessageFilter) -> Result<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM messages");
        push_message_filter(&mut builder, filter);
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    async fn mark_read(&self, id: Uuid, at: OffsetDateTime) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE messages SET read_status = TRUE, updated_at = $2 \
             WHERE id = $1 AND read_status = FALSE",
        )
        .bind(id)
        .bind(at)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn resolve_pending(
        &self,
        id: Uuid,
        outcome: &ModerationOutcome,
    ) -> Result<Option<Message>> {
        let row = sqlx::query(&format!(
            "UPDATE messages \
             SET moderation_status = $2, moderation_reason = $3, moderated_by = $4, \
                 moderated_at = $5, updated_at = $5 \
             WHERE id = $1 AND moderation_status = 'pending' \
             RETURNING {}",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .bind(outcome.status.as_db())
        .bind(&outcome.reason)
        .bind(outcome.moderator_id)
        .bind(outcome.decided_at)
        .fetch_optional(self.db.pool())
        .await?;
        row.as_ref().map(message_from_row).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Directory for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let role: String = row.try_get("role")?;
        let role = Role::from_db(&role).ok_or_else(|| anyhow!("unknown user role: {}", role))?;

        Ok(Some(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            role,
        }))
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT user_id, first_name, last_name, photos FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Profile {
            user_id: row.try_get("user_id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            photos: row.try_get("photos")?,
        }))
    }
}
