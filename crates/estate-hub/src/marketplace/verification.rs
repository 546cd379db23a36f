//! Admin decision on a pending agent.
//!
//! The target row is re-read and then written without a compare-and-swap, so two admins
//! deciding on the same agent at once both pass the `pending` check and the later write wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::domain::{Profile, ProfileId, Role, VerificationStatus};
use super::error::MarketplaceError;
use super::pagination::{Page, Pagination};
use super::repository::ProfileFilter;
use super::service::MarketplaceService;
use super::session::AuthContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationAction {
    Approve,
    Reject,
}

impl VerificationAction {
    pub const fn target(self) -> VerificationStatus {
        match self {
            Self::Approve => VerificationStatus::Verified,
            Self::Reject => VerificationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyAgentRequest {
    pub agent_id: Uuid,
    pub action: VerificationAction,
    #[validate(length(min = 1, max = 500, message = "Reason must be 1-500 characters"))]
    pub reason: Option<String>,
}

/// Subset of the profile returned after a decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationView {
    pub id: ProfileId,
    pub email: String,
    pub full_name: String,
    pub verification_status: VerificationStatus,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl From<&Profile> for VerificationView {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            verification_status: profile.verification_status,
            is_verified: profile.is_verified,
            verified_at: profile.verified_at,
            rejection_reason: profile.rejection_reason.clone(),
        }
    }
}

/// Only `pending` agents can be decided on.
pub fn check_verification_transition(
    from: VerificationStatus,
    to: VerificationStatus,
) -> Result<(), MarketplaceError> {
    match (from, to) {
        (VerificationStatus::Pending, VerificationStatus::Verified)
        | (VerificationStatus::Pending, VerificationStatus::Rejected) => Ok(()),
        _ => Err(MarketplaceError::InvalidTransition {
            entity: "agent",
            from: from.label(),
            to: to.label(),
        }),
    }
}

/// Applies the decision to an agent row in memory.
pub fn apply_verification(
    profile: &mut Profile,
    action: VerificationAction,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), MarketplaceError> {
    if profile.role != Role::Agent {
        return Err(MarketplaceError::invalid("Target profile is not an agent"));
    }
    let target = action.target();
    check_verification_transition(profile.verification_status, target)?;

    profile.verification_status = target;
    match action {
        VerificationAction::Approve => {
            profile.is_verified = true;
            profile.verified_at = Some(now);
            profile.rejection_reason = None;
        }
        VerificationAction::Reject => {
            profile.is_verified = false;
            profile.verified_at = None;
            profile.rejection_reason = reason;
        }
    }
    profile.updated_at = now;
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentReviewQuery {
    pub status: Option<VerificationStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl MarketplaceService {
    pub fn verify_agent(
        &self,
        ctx: &AuthContext,
        request: VerifyAgentRequest,
    ) -> Result<VerificationView, MarketplaceError> {
        ctx.require_admin()?;
        request.validate()?;

        let reason = request
            .reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());
        if request.action == VerificationAction::Reject && reason.is_none() {
            return Err(MarketplaceError::invalid("A reason is required when rejecting an agent"));
        }

        let agent_id = ProfileId(request.agent_id);
        let mut profile = self
            .profiles
            .fetch(&agent_id)?
            .ok_or(MarketplaceError::NotFound("Agent"))?;

        if let Err(err) = apply_verification(&mut profile, request.action, reason, Utc::now()) {
            warn!(%agent_id, admin = %ctx.profile_id(), error = %err, "verification refused");
            return Err(err);
        }

        let updated = self.profiles.update(profile)?;
        info!(
            %agent_id,
            admin = %ctx.profile_id(),
            status = updated.verification_status.label(),
            "agent verification decided"
        );
        Ok(VerificationView::from(&updated))
    }

    pub fn agents_for_review(
        &self,
        ctx: &AuthContext,
        query: AgentReviewQuery,
    ) -> Result<Page<Profile>, MarketplaceError> {
        ctx.require_admin()?;
        let pagination = Pagination::new(query.page, query.limit);
        let filter = ProfileFilter {
            role: Some(Role::Agent),
            verification_status: query.status,
        };
        let total = self.profiles.count(&filter)?;
        let rows = self.profiles.list(&filter, &pagination)?;
        Ok(Page::new(rows, &pagination, total))
    }
}
