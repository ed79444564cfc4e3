use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::Page;
use crate::domain::message::{Message, ModerationDecision};
use crate::infra::store::{MessageFilter, ModerationOutcome, SortOrder, Stores};

const DEFAULT_REJECTION_REASON: &str = "Message violates community guidelines";

/// Review queue over messages awaiting a decision.
#[derive(Clone)]
pub struct ModerationQueue {
    stores: Stores,
}

impl ModerationQueue {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Pending messages, oldest first.
    pub async fn list_pending(&self, limit: i64, offset: i64) -> ServiceResult<Page<Message>> {
        let filter = MessageFilter::pending();
        let items = self
            .stores
            .messages
            .list(&filter, SortOrder::Ascending, limit, offset)
            .await?;
        let total = self.stores.messages.count(&filter).await?;
        Ok(Page { items, total })
    }

    /// Applies a decision to a pending message. A message can be resolved
    /// once; later attempts fail with `Conflict`.
    pub async fn resolve(
        &self,
        message_id: Uuid,
        moderator_id: Uuid,
        decision: Option<&str>,
        reason: Option<String>,
    ) -> ServiceResult<Message> {
        if self.stores.messages.find(message_id).await?.is_none() {
            return Err(ServiceError::not_found("message not found"));
        }

        let decision = decision
            .map(str::trim)
            .filter(|decision| !decision.is_empty())
            .ok_or_else(|| ServiceError::invalid("decision is required"))?;
        let decision = ModerationDecision::parse(decision).ok_or_else(|| {
            ServiceError::invalid(format!(
                "invalid decision: {} (expected approved or rejected)",
                decision
            ))
        })?;

        let reason = match decision {
            ModerationDecision::Rejected => Some(
                reason
                    .filter(|reason| !reason.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()),
            ),
            ModerationDecision::Approved => None,
        };

        let outcome = ModerationOutcome {
            status: decision.status(),
            reason,
            moderator_id,
            decided_at: OffsetDateTime::now_utc(),
        };

        let resolved = self
            .stores
            .messages
            .resolve_pending(message_id, &outcome)
            .await?;

        match resolved {
            Some(message) => {
                tracing::info!(
                    message_id = %message_id,
                    moderator_id = %moderator_id,
                    decision = outcome.status.as_db(),
                    "message moderated"
                );
                Ok(message)
            }
            None => match self.stores.messages.find(message_id).await? {
                Some(_) => Err(ServiceError::conflict("message has already been moderated")),
                None => Err(ServiceError::not_found("message not found")),
            },
        }
    }
}
