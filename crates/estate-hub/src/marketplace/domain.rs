use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a profile row; shares its value with the auth provider's user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InquiryId(pub Uuid);

impl PropertyId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl InquiryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for InquiryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Agent,
    Admin,
}

impl Role {
    pub const fn ordered() -> [Self; 3] {
        [Self::Customer, Self::Agent, Self::Admin]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Agent => "agent",
            Self::Admin => "admin",
        }
    }
}

/// Gate on an agent's ability to publish listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub const fn ordered() -> [Self; 3] {
        [Self::Pending, Self::Verified, Self::Rejected]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Active,
    Pending,
    Archived,
    Sold,
}

impl PropertyStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::Active, Self::Pending, Self::Archived, Self::Sold]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Archived => "archived",
            Self::Sold => "sold",
        }
    }

    /// Listings in these states are shown to anonymous visitors.
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Active | Self::Sold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    House,
    Apartment,
    Condo,
    Townhouse,
    Land,
    Commercial,
}

impl PropertyType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::House => "house",
            Self::Apartment => "apartment",
            Self::Condo => "condo",
            Self::Townhouse => "townhouse",
            Self::Land => "land",
            Self::Commercial => "commercial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    Sale,
    Rent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    Pending,
    Responded,
    Closed,
}

impl InquiryStatus {
    pub const fn ordered() -> [Self; 3] {
        [Self::Pending, Self::Responded, Self::Closed]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Responded => "responded",
            Self::Closed => "closed",
        }
    }
}

/// The application's user record, separate from the auth provider's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub verification_status: VerificationStatus,
    pub is_verified: bool,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub agency_name: Option<String>,
    pub license_number: Option<String>,
    pub years_experience: Option<u8>,
    pub specializations: Vec<String>,
    pub verification_documents: Vec<String>,
    pub rejection_reason: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(id: ProfileId, email: String, full_name: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            full_name,
            phone: None,
            role,
            verification_status: VerificationStatus::Pending,
            is_verified: false,
            avatar_url: None,
            bio: None,
            agency_name: None,
            license_number: None,
            years_experience: None,
            specializations: Vec::new(),
            verification_documents: Vec::new(),
            rejection_reason: None,
            verified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_verified_agent(&self) -> bool {
        self.role == Role::Agent && self.verification_status == VerificationStatus::Verified
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub agent_id: ProfileId,
    pub title: String,
    pub description: String,
    pub price: u64,
    pub property_type: PropertyType,
    pub listing_type: ListingType,
    pub bedrooms: u8,
    pub bathrooms: u8,
    pub square_feet: Option<u32>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: Option<String>,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub status: PropertyStatus,
    pub views: u64,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: InquiryId,
    pub property_id: PropertyId,
    pub profile_id: Option<ProfileId>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub status: InquiryStatus,
    pub response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Admin-tunable setting keyed by `(category, key)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfigEntry {
    pub category: String,
    pub key: String,
    pub value: serde_json::Value,
    pub description: Option<String>,
    pub updated_by: Option<ProfileId>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsEventKind {
    View,
    Inquiry,
    Approved,
    Rejected,
    Archived,
}

impl AnalyticsEventKind {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::View,
            Self::Inquiry,
            Self::Approved,
            Self::Rejected,
            Self::Archived,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Inquiry => "inquiry",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub property_id: PropertyId,
    pub kind: AnalyticsEventKind,
    pub actor_id: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn new(property_id: PropertyId, kind: AnalyticsEventKind, actor_id: Option<ProfileId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            property_id,
            kind,
            actor_id,
            created_at: Utc::now(),
        }
    }
}
