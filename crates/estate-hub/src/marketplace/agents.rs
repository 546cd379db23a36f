use serde::{Deserialize, Serialize};

use super::domain::{Profile, ProfileId, PropertyStatus, Role, VerificationStatus};
use super::error::MarketplaceError;
use super::pagination::{Page, Pagination};
use super::repository::{ProfileFilter, PropertyFilter};
use super::service::MarketplaceService;

/// Public card for a verified agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub id: ProfileId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub agency_name: Option<String>,
    pub years_experience: Option<u8>,
    pub specializations: Vec<String>,
    pub active_listings: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentDirectoryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

fn verified_agents() -> ProfileFilter {
    ProfileFilter {
        role: Some(Role::Agent),
        verification_status: Some(VerificationStatus::Verified),
    }
}

impl MarketplaceService {
    fn agent_summary(&self, profile: Profile) -> Result<AgentSummary, MarketplaceError> {
        let active_listings = self.properties.count(&PropertyFilter {
            statuses: vec![PropertyStatus::Active],
            agent_id: Some(profile.id),
            ..PropertyFilter::default()
        })?;
        Ok(AgentSummary {
            id: profile.id,
            full_name: profile.full_name,
            email: profile.email,
            phone: profile.phone,
            avatar_url: profile.avatar_url,
            bio: profile.bio,
            agency_name: profile.agency_name,
            years_experience: profile.years_experience,
            specializations: profile.specializations,
            active_listings,
        })
    }

    pub fn agent_directory(
        &self,
        query: AgentDirectoryQuery,
    ) -> Result<Page<AgentSummary>, MarketplaceError> {
        let pagination = Pagination::new(query.page, query.limit);
        let filter = verified_agents();
        let total = self.profiles.count(&filter)?;
        let summaries = self
            .profiles
            .list(&filter, &pagination)?
            .into_iter()
            .map(|profile| self.agent_summary(profile))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            data: summaries,
            pagination: pagination.meta(total),
        })
    }

    /// Only verified agents have a public profile.
    pub fn agent_profile(&self, id: ProfileId) -> Result<AgentSummary, MarketplaceError> {
        let profile = self
            .profiles
            .fetch(&id)?
            .filter(Profile::is_verified_agent)
            .ok_or(MarketplaceError::NotFound("Agent"))?;
        self.agent_summary(profile)
    }
}
