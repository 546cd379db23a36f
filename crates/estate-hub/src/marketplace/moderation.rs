use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use super::domain::{AnalyticsEventKind, Property, PropertyId, PropertyStatus};
use super::error::MarketplaceError;
use super::pagination::{Page, Pagination};
use super::repository::PropertyFilter;
use super::service::MarketplaceService;
use super::session::AuthContext;

/// Listing status moves. Everything else is refused.
pub fn check_property_transition(
    from: PropertyStatus,
    to: PropertyStatus,
) -> Result<(), MarketplaceError> {
    use PropertyStatus::*;
    match (from, to) {
        (Pending, Active) | (Pending, Archived) | (Active, Archived) | (Active, Sold) => Ok(()),
        _ => Err(MarketplaceError::InvalidTransition {
            entity: "property",
            from: from.label(),
            to: to.label(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Reject,
    Archive,
}

impl ModerationAction {
    pub fn next_status(self, from: PropertyStatus) -> Result<PropertyStatus, MarketplaceError> {
        let to = match self {
            Self::Approve => PropertyStatus::Active,
            Self::Reject | Self::Archive => PropertyStatus::Archived,
        };
        if self == Self::Reject && from != PropertyStatus::Pending {
            return Err(MarketplaceError::InvalidTransition {
                entity: "property",
                from: from.label(),
                to: to.label(),
            });
        }
        check_property_transition(from, to)?;
        Ok(to)
    }

    const fn event(self) -> AnalyticsEventKind {
        match self {
            Self::Approve => AnalyticsEventKind::Approved,
            Self::Reject => AnalyticsEventKind::Rejected,
            Self::Archive => AnalyticsEventKind::Archived,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ModerationRequest {
    pub action: ModerationAction,
    #[validate(length(min = 1, max = 500, message = "Reason must be 1-500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminPropertyQuery {
    pub status: Option<PropertyStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl MarketplaceService {
    pub fn moderate_property(
        &self,
        ctx: &AuthContext,
        property_id: PropertyId,
        request: ModerationRequest,
    ) -> Result<Property, MarketplaceError> {
        ctx.require_admin()?;
        request.validate()?;

        let mut property = self
            .properties
            .fetch(&property_id)?
            .ok_or(MarketplaceError::NotFound("Property"))?;

        let next = match request.action.next_status(property.status) {
            Ok(next) => next,
            Err(err) => {
                warn!(%property_id, admin = %ctx.profile_id(), error = %err, "moderation refused");
                return Err(err);
            }
        };

        property.status = next;
        property.rejection_reason = match request.action {
            ModerationAction::Reject => request.reason,
            ModerationAction::Approve => None,
            ModerationAction::Archive => property.rejection_reason,
        };
        property.updated_at = Utc::now();

        let updated = self.properties.update(property)?;
        self.track(property_id, request.action.event(), Some(ctx.profile_id()));
        info!(
            %property_id,
            admin = %ctx.profile_id(),
            status = updated.status.label(),
            "listing moderated"
        );
        Ok(updated)
    }

    pub fn properties_for_admin(
        &self,
        ctx: &AuthContext,
        query: AdminPropertyQuery,
    ) -> Result<Page<Property>, MarketplaceError> {
        ctx.require_admin()?;
        let pagination = Pagination::new(query.page, query.limit);
        let filter = PropertyFilter {
            statuses: query.status.into_iter().collect(),
            ..PropertyFilter::default()
        };
        let total = self.properties.count(&filter)?;
        let rows = self.properties.list(&filter, &pagination)?;
        Ok(Page::new(rows, &pagination, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_is_closed() {
        let allowed = [
            (PropertyStatus::Pending, PropertyStatus::Active),
            (PropertyStatus::Pending, PropertyStatus::Archived),
            (PropertyStatus::Active, PropertyStatus::Archived),
            (PropertyStatus::Active, PropertyStatus::Sold),
        ];
        for from in PropertyStatus::ordered() {
            for to in PropertyStatus::ordered() {
                assert_eq!(
                    check_property_transition(from, to).is_ok(),
                    allowed.contains(&(from, to)),
                    "{from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn reject_only_applies_to_pending_listings() {
        assert_eq!(
            ModerationAction::Reject
                .next_status(PropertyStatus::Pending)
                .expect("pending rejects"),
            PropertyStatus::Archived
        );
        assert!(ModerationAction::Reject
            .next_status(PropertyStatus::Active)
            .is_err());
        assert_eq!(
            ModerationAction::Archive
                .next_status(PropertyStatus::Active)
                .expect("active archives"),
            PropertyStatus::Archived
        );
        assert!(ModerationAction::Approve
            .next_status(PropertyStatus::Archived)
            .is_err());
    }
}
