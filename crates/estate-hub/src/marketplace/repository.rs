use super::domain::{
    AnalyticsEvent, AnalyticsEventKind, Inquiry, InquiryId, InquiryStatus, ListingType, Profile,
    ProfileId, Property, PropertyId, PropertyStatus, PropertyType, Role, SystemConfigEntry,
    VerificationStatus,
};
use super::pagination::Pagination;

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Row filter for the `profiles` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFilter {
    pub role: Option<Role>,
    pub verification_status: Option<VerificationStatus>,
}

impl ProfileFilter {
    pub fn matches(&self, profile: &Profile) -> bool {
        self.role.map_or(true, |role| profile.role == role)
            && self
                .verification_status
                .map_or(true, |status| profile.verification_status == status)
    }
}

/// Row filter for the `properties` table. Empty `statuses` matches every status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    pub statuses: Vec<PropertyStatus>,
    pub agent_id: Option<ProfileId>,
    pub city: Option<String>,
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub min_bedrooms: Option<u8>,
    pub text: Option<String>,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&property.status) {
            return false;
        }
        if self.agent_id.is_some_and(|agent| property.agent_id != agent) {
            return false;
        }
        if let Some(city) = &self.city {
            if !property.city.eq_ignore_ascii_case(city.trim()) {
                return false;
            }
        }
        if self
            .property_type
            .is_some_and(|kind| property.property_type != kind)
        {
            return false;
        }
        if self
            .listing_type
            .is_some_and(|kind| property.listing_type != kind)
        {
            return false;
        }
        if self.min_price.is_some_and(|min| property.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| property.price > max) {
            return false;
        }
        if self
            .min_bedrooms
            .is_some_and(|bedrooms| property.bedrooms < bedrooms)
        {
            return false;
        }
        if let Some(text) = &self.text {
            let needle = text.trim().to_lowercase();
            if !needle.is_empty() {
                let haystacks = [&property.title, &property.description, &property.address];
                if !haystacks
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
                {
                    return false;
                }
            }
        }
        true
    }
}

/// Row filter for the `inquiries` table. `property_ids: Some(vec![])` matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InquiryFilter {
    pub property_ids: Option<Vec<PropertyId>>,
    pub profile_id: Option<ProfileId>,
    pub status: Option<InquiryStatus>,
}

impl InquiryFilter {
    pub fn matches(&self, inquiry: &Inquiry) -> bool {
        self.property_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&inquiry.property_id))
            && self
                .profile_id
                .map_or(true, |profile| inquiry.profile_id == Some(profile))
            && self.status.map_or(true, |status| inquiry.status == status)
    }
}

pub trait ProfileRepository: Send + Sync {
    fn insert(&self, profile: Profile) -> Result<Profile, RepositoryError>;
    fn update(&self, profile: Profile) -> Result<Profile, RepositoryError>;
    fn fetch(&self, id: &ProfileId) -> Result<Option<Profile>, RepositoryError>;
    fn list(
        &self,
        filter: &ProfileFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Profile>, RepositoryError>;
    fn count(&self, filter: &ProfileFilter) -> Result<usize, RepositoryError>;
}

pub trait PropertyRepository: Send + Sync {
    fn insert(&self, property: Property) -> Result<Property, RepositoryError>;
    fn update(&self, property: Property) -> Result<Property, RepositoryError>;
    fn fetch(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;
    fn list(
        &self,
        filter: &PropertyFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Property>, RepositoryError>;
    fn count(&self, filter: &PropertyFilter) -> Result<usize, RepositoryError>;
    /// Ids of every matching row, unpaginated.
    fn ids(&self, filter: &PropertyFilter) -> Result<Vec<PropertyId>, RepositoryError>;
}

pub trait InquiryRepository: Send + Sync {
    fn insert(&self, inquiry: Inquiry) -> Result<Inquiry, RepositoryError>;
    fn update(&self, inquiry: Inquiry) -> Result<Inquiry, RepositoryError>;
    fn fetch(&self, id: &InquiryId) -> Result<Option<Inquiry>, RepositoryError>;
    fn list(
        &self,
        filter: &InquiryFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Inquiry>, RepositoryError>;
    fn count(&self, filter: &InquiryFilter) -> Result<usize, RepositoryError>;
}

pub trait SystemConfigRepository: Send + Sync {
    fn upsert(&self, entry: SystemConfigEntry) -> Result<SystemConfigEntry, RepositoryError>;
    fn fetch(&self, category: &str, key: &str)
        -> Result<Option<SystemConfigEntry>, RepositoryError>;
    fn list(&self, category: Option<&str>) -> Result<Vec<SystemConfigEntry>, RepositoryError>;
}

pub trait AnalyticsRepository: Send + Sync {
    fn record(&self, event: AnalyticsEvent) -> Result<(), RepositoryError>;
    fn count(
        &self,
        property_id: Option<&PropertyId>,
        kind: Option<AnalyticsEventKind>,
    ) -> Result<usize, RepositoryError>;
}
