use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::conversation::PartnerView;
use crate::domain::matching::{Match, MatchStatus};
use crate::domain::user::{display_name, Role, Side};
use crate::infra::store::{InsertOutcome, MatchFilter, Stores};

#[derive(Clone)]
pub struct MatchService {
    stores: Stores,
}

impl MatchService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Returns the match linking the requester and `partner_id`, creating a
    /// pending one on first contact. The boolean is true when it was created.
    pub async fn create_match(
        &self,
        requester_id: Uuid,
        requester_role: Role,
        partner_id: Option<Uuid>,
    ) -> ServiceResult<(Match, bool)> {
        let partner_id = partner_id.ok_or_else(|| ServiceError::invalid("partner_id is required"))?;
        if partner_id == requester_id {
            return Err(ServiceError::invalid("cannot match with yourself"));
        }

        if let Some(existing) = self
            .stores
            .matches
            .find_by_pair(requester_id, partner_id)
            .await?
        {
            return Ok((existing, false));
        }

        let side = requester_role.side().ok_or_else(|| {
            ServiceError::forbidden("only prisoner or partner accounts can request matches")
        })?;

        let partner = self
            .stores
            .directory
            .find_user(partner_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user not found"))?;
        if partner.role.side() != Some(side.opposite()) {
            return Err(ServiceError::invalid(format!(
                "a {} can only be matched with a {}",
                side.as_db(),
                side.opposite().as_db()
            )));
        }

        let (prisoner_id, partner_side_id) = match side {
            Side::Prisoner => (requester_id, partner_id),
            Side::Partner => (partner_id, requester_id),
        };

        let now = OffsetDateTime::now_utc();
        let candidate = Match {
            id: Uuid::new_v4(),
            prisoner_id,
            partner_id: partner_side_id,
            status: MatchStatus::Pending,
            initiated_by: side,
            match_score: 0.0,
            match_reason: Vec::new(),
            message_count: 0,
            last_interaction: now,
            created_at: now,
            updated_at: now,
        };

        match self.stores.matches.insert_if_absent(candidate).await? {
            InsertOutcome::Created(record) => {
                tracing::info!(
                    match_id = %record.id,
                    prisoner_id = %record.prisoner_id,
                    partner_id = %record.partner_id,
                    initiated_by = record.initiated_by.as_db(),
                    "match created"
                );
                Ok((record, true))
            }
            InsertOutcome::Existing(record) => Ok((record, false)),
            InsertOutcome::Lost => Err(ServiceError::conflict(
                "a concurrent request for this pair is in progress; retry",
            )),
        }
    }

    /// Applies a status change requested by a participant. The write only
    /// lands if the match is still in the status the transition was checked
    /// against; a concurrent change in between yields `Conflict`.
    pub async fn update_status(
        &self,
        match_id: Uuid,
        requester_id: Uuid,
        new_status: Option<&str>,
    ) -> ServiceResult<Match> {
        let record = self.find(match_id).await?;
        if !record.involves(requester_id) {
            return Err(ServiceError::forbidden("not a participant in this match"));
        }
        let new_status = new_status
            .map(str::trim)
            .filter(|status| !status.is_empty())
            .ok_or_else(|| ServiceError::invalid("status is required"))?;
        let next = MatchStatus::from_db(new_status).ok_or_else(|| {
            ServiceError::invalid(format!(
                "invalid status: {} (expected pending, accepted, rejected or blocked)",
                new_status
            ))
        })?;

        let by_initiator = record.initiator_id() == requester_id;
        if !check_transition(record.status, next, by_initiator)? {
            return Ok(record);
        }

        let updated = self
            .stores
            .matches
            .update_status(match_id, record.status, next, OffsetDateTime::now_utc())
            .await?;
        let Some(updated) = updated else {
            return match self.stores.matches.find(match_id).await? {
                Some(_) => Err(ServiceError::conflict(
                    "match status changed concurrently; retry",
                )),
                None => Err(ServiceError::not_found("match not found")),
            };
        };

        tracing::info!(
            match_id = %match_id,
            actor_id = %requester_id,
            from = record.status.as_db(),
            to = next.as_db(),
            "match status changed"
        );

        Ok(updated)
    }

    pub async fn partner_view(&self, match_id: Uuid, requester_id: Uuid) -> ServiceResult<PartnerView> {
        let record = self.find(match_id).await?;
        let partner_id = record
            .counterpart(requester_id)
            .ok_or_else(|| ServiceError::forbidden("not a participant in this match"))?;
        resolve_partner(&self.stores, partner_id).await
    }

    pub async fn get(&self, match_id: Uuid, requester_id: Uuid, requester_role: Role) -> ServiceResult<Match> {
        let record = self.find(match_id).await?;
        if !record.involves(requester_id) && !requester_role.is_staff() {
            return Err(ServiceError::forbidden("not a participant in this match"));
        }
        Ok(record)
    }

    pub async fn list_for_user(&self, user_id: Uuid, status: Option<&str>) -> ServiceResult<Vec<Match>> {
        let status = status
            .map(|value| {
                MatchStatus::from_db(value)
                    .ok_or_else(|| ServiceError::invalid(format!("invalid status: {}", value)))
            })
            .transpose()?;

        Ok(self
            .stores
            .matches
            .list(&MatchFilter { user_id, status })
            .await?)
    }

    async fn find(&self, match_id: Uuid) -> ServiceResult<Match> {
        self.stores
            .matches
            .find(match_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("match not found"))
    }
}

/// Loads a user and their profile and shapes them for display to the other
/// side of a match.
pub(crate) async fn resolve_partner(stores: &Stores, user_id: Uuid) -> ServiceResult<PartnerView> {
    let user = stores
        .directory
        .find_user(user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("partner not found"))?;
    let profile = stores.directory.find_profile(user_id).await?;

    Ok(PartnerView {
        id: user.id,
        name: display_name(&user, profile.as_ref()),
        image: profile.and_then(|profile| profile.photos.into_iter().next()),
        role: user.role,
    })
}

/// Validates `current -> next`. Returns false for a no-op (same status).
///
/// Only the participant who did not initiate may accept. Either side may
/// reject a pending or accepted match, or block at any time. Nothing
/// returns to pending.
fn check_transition(current: MatchStatus, next: MatchStatus, by_initiator: bool) -> ServiceResult<bool> {
    use MatchStatus::*;

    if current == next {
        return Ok(false);
    }

    match (current, next) {
        (Pending, Accepted) if by_initiator => Err(ServiceError::forbidden(
            "only the invited participant can accept a match",
        )),
        (Pending, Accepted) => Ok(true),
        (Pending | Accepted, Rejected) => Ok(true),
        (_, Blocked) => Ok(true),
        (from, to) => Err(ServiceError::conflict(format!(
            "cannot change match status from {} to {}",
            from.as_db(),
            to.as_db()
        ))),
    }
}
