use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::domain::{
    AnalyticsEventKind, Inquiry, InquiryId, InquiryStatus, PropertyId, PropertyStatus, Role,
};
use super::error::MarketplaceError;
use super::pagination::{Page, Pagination};
use super::repository::{InquiryFilter, PropertyFilter};
use super::service::MarketplaceService;
use super::session::AuthContext;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInquiryRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
    #[validate(length(min = 10, max = 2000, message = "Message must be 10-2000 characters"))]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RespondInquiryRequest {
    pub status: Option<InquiryStatus>,
    #[validate(length(max = 2000))]
    pub response: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InquiryQuery {
    pub status: Option<InquiryStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub fn check_inquiry_transition(
    from: InquiryStatus,
    to: InquiryStatus,
) -> Result<(), MarketplaceError> {
    use InquiryStatus::*;
    match (from, to) {
        (Pending, Responded) | (Pending, Closed) | (Responded, Closed) => Ok(()),
        // Follow-up answers keep the inquiry in `responded`.
        (Responded, Responded) => Ok(()),
        _ => Err(MarketplaceError::InvalidTransition {
            entity: "inquiry",
            from: from.label(),
            to: to.label(),
        }),
    }
}

impl MarketplaceService {
    pub fn create_inquiry(
        &self,
        ctx: Option<&AuthContext>,
        property_id: PropertyId,
        request: CreateInquiryRequest,
    ) -> Result<Inquiry, MarketplaceError> {
        request.validate()?;
        let property = self
            .properties
            .fetch(&property_id)?
            .filter(|property| property.status == PropertyStatus::Active)
            .ok_or(MarketplaceError::NotFound("Property"))?;

        let inquiry = Inquiry {
            id: InquiryId::generate(),
            property_id: property.id,
            profile_id: ctx.map(AuthContext::profile_id),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            phone: request.phone.map(|phone| phone.trim().to_string()),
            message: request.message.trim().to_string(),
            status: InquiryStatus::Pending,
            response: None,
            responded_at: None,
            created_at: Utc::now(),
        };

        let stored = self.inquiries.insert(inquiry)?;
        self.track(property_id, AnalyticsEventKind::Inquiry, stored.profile_id);
        info!(inquiry_id = %stored.id, %property_id, "inquiry received");
        Ok(stored)
    }

    /// Inquiries visible to the caller: all for admins, own listings for agents, own for customers.
    pub fn list_inquiries(
        &self,
        ctx: &AuthContext,
        query: InquiryQuery,
    ) -> Result<Page<Inquiry>, MarketplaceError> {
        let pagination = Pagination::new(query.page, query.limit);
        let mut filter = InquiryFilter {
            status: query.status,
            ..InquiryFilter::default()
        };
        match ctx.role() {
            Role::Admin => {}
            Role::Agent => {
                let owned = self.properties.ids(&PropertyFilter {
                    agent_id: Some(ctx.profile_id()),
                    ..PropertyFilter::default()
                })?;
                filter.property_ids = Some(owned);
            }
            Role::Customer => filter.profile_id = Some(ctx.profile_id()),
        }

        let total = self.inquiries.count(&filter)?;
        let rows = self.inquiries.list(&filter, &pagination)?;
        Ok(Page::new(rows, &pagination, total))
    }

    pub fn respond_to_inquiry(
        &self,
        ctx: &AuthContext,
        inquiry_id: InquiryId,
        request: RespondInquiryRequest,
    ) -> Result<Inquiry, MarketplaceError> {
        request.validate()?;
        let mut inquiry = self
            .inquiries
            .fetch(&inquiry_id)?
            .ok_or(MarketplaceError::NotFound("Inquiry"))?;
        let property = self
            .properties
            .fetch(&inquiry.property_id)?
            .ok_or(MarketplaceError::NotFound("Property"))?;
        if !ctx.can_manage(property.agent_id) {
            return Err(MarketplaceError::forbidden(
                "Insufficient permissions. Only the listing agent may respond.",
            ));
        }

        let response = request
            .response
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        let target = match (request.status, &response) {
            (Some(status), _) => status,
            (None, Some(_)) => InquiryStatus::Responded,
            (None, None) => {
                return Err(MarketplaceError::invalid(
                    "Provide a response or a new status",
                ))
            }
        };
        if target == InquiryStatus::Responded && response.is_none() && inquiry.response.is_none()
        {
            return Err(MarketplaceError::invalid(
                "A response is required to mark an inquiry responded",
            ));
        }
        check_inquiry_transition(inquiry.status, target)?;

        if let Some(response) = response {
            inquiry.response = Some(response);
            inquiry.responded_at = Some(Utc::now());
        }
        inquiry.status = target;

        Ok(self.inquiries.update(inquiry)?)
    }
}
