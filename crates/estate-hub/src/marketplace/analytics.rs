use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{AnalyticsEventKind, InquiryStatus, PropertyStatus, Role, VerificationStatus};
use super::error::MarketplaceError;
use super::repository::{InquiryFilter, ProfileFilter, PropertyFilter};
use super::service::MarketplaceService;
use super::session::AuthContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsOverview {
    pub profiles_by_role: BTreeMap<&'static str, usize>,
    pub agents_by_verification: BTreeMap<&'static str, usize>,
    pub properties_by_status: BTreeMap<&'static str, usize>,
    pub inquiries_by_status: BTreeMap<&'static str, usize>,
    pub events_by_kind: BTreeMap<&'static str, usize>,
}

impl MarketplaceService {
    pub fn analytics_overview(
        &self,
        ctx: &AuthContext,
    ) -> Result<AnalyticsOverview, MarketplaceError> {
        ctx.require_admin()?;

        let mut profiles_by_role = BTreeMap::new();
        for role in Role::ordered() {
            let filter = ProfileFilter {
                role: Some(role),
                ..ProfileFilter::default()
            };
            profiles_by_role.insert(role.label(), self.profiles.count(&filter)?);
        }

        let mut agents_by_verification = BTreeMap::new();
        for status in VerificationStatus::ordered() {
            let filter = ProfileFilter {
                role: Some(Role::Agent),
                verification_status: Some(status),
            };
            agents_by_verification.insert(status.label(), self.profiles.count(&filter)?);
        }

        let mut properties_by_status = BTreeMap::new();
        for status in PropertyStatus::ordered() {
            let filter = PropertyFilter {
                statuses: vec![status],
                ..PropertyFilter::default()
            };
            properties_by_status.insert(status.label(), self.properties.count(&filter)?);
        }

        let mut inquiries_by_status = BTreeMap::new();
        for status in InquiryStatus::ordered() {
            let filter = InquiryFilter {
                status: Some(status),
                ..InquiryFilter::default()
            };
            inquiries_by_status.insert(status.label(), self.inquiries.count(&filter)?);
        }

        let mut events_by_kind = BTreeMap::new();
        for kind in AnalyticsEventKind::ordered() {
            events_by_kind.insert(kind.label(), self.analytics.count(None, Some(kind))?);
        }

        Ok(AnalyticsOverview {
            profiles_by_role,
            agents_by_verification,
            properties_by_status,
            inquiries_by_status,
            events_by_kind,
        })
    }
}
