use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{Inquiry, InquiryStatus, PropertyStatus};
use super::error::MarketplaceError;
use super::pagination::Pagination;
use super::repository::{InquiryFilter, PropertyFilter};
use super::service::MarketplaceService;
use super::session::AuthContext;

const RECENT_INQUIRIES: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct SellerDashboard {
    pub total_listings: usize,
    pub listings_by_status: BTreeMap<&'static str, usize>,
    pub total_views: u64,
    pub total_inquiries: usize,
    pub open_inquiries: usize,
    pub recent_inquiries: Vec<Inquiry>,
}

impl MarketplaceService {
    /// Aggregates over the caller's own listings.
    pub fn seller_dashboard(&self, ctx: &AuthContext) -> Result<SellerDashboard, MarketplaceError> {
        let profile = ctx.require_agent()?;
        let owned = PropertyFilter {
            agent_id: Some(profile.id),
            ..PropertyFilter::default()
        };

        let mut listings_by_status = BTreeMap::new();
        for status in PropertyStatus::ordered() {
            let count = self.properties.count(&PropertyFilter {
                statuses: vec![status],
                ..owned.clone()
            })?;
            listings_by_status.insert(status.label(), count);
        }
        let total_listings = listings_by_status.values().sum();

        let property_ids = self.properties.ids(&owned)?;
        let mut total_views = 0;
        for id in &property_ids {
            if let Some(property) = self.properties.fetch(id)? {
                total_views += property.views;
            }
        }

        let inquiries = InquiryFilter {
            property_ids: Some(property_ids),
            ..InquiryFilter::default()
        };
        let total_inquiries = self.inquiries.count(&inquiries)?;
        let open_inquiries = self.inquiries.count(&InquiryFilter {
            status: Some(InquiryStatus::Pending),
            ..inquiries.clone()
        })?;
        let recent_inquiries = self
            .inquiries
            .list(&inquiries, &Pagination::new(Some(1), Some(RECENT_INQUIRIES)))?;

        Ok(SellerDashboard {
            total_listings,
            listings_by_status,
            total_views,
            total_inquiries,
            open_inquiries,
            recent_inquiries,
        })
    }
}
