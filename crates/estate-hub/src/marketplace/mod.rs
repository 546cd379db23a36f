//! Real-estate marketplace: profiles, agent verification, listings, moderation, inquiries,
//! seller dashboards, platform analytics, and admin-tunable settings.
//!
//! Persistence, authentication, and file storage sit behind traits so the same service
//! runs against the hosted backend or the in-process store.

pub mod agents;
pub mod analytics;
pub mod backend;
pub mod completion;
pub mod domain;
pub mod error;
pub mod import;
pub mod inquiries;
pub mod listings;
pub mod memory;
pub mod moderation;
pub mod pagination;
pub mod profiles;
pub mod repository;
pub mod router;
pub mod seller;
pub mod service;
pub mod session;
pub mod settings;
pub mod uploads;
pub mod verification;

#[cfg(test)]
mod tests;

pub use agents::{AgentDirectoryQuery, AgentSummary};
pub use analytics::AnalyticsOverview;
pub use backend::{HostedAuthClient, HostedStorageClient};
pub use completion::{profile_completion, ProfileCompletion};
pub use domain::{
    AnalyticsEvent, AnalyticsEventKind, Inquiry, InquiryId, InquiryStatus, ListingType, Profile,
    ProfileId, Property, PropertyId, PropertyStatus, PropertyType, Role, SystemConfigEntry,
    VerificationStatus,
};
pub use error::MarketplaceError;
pub use import::{ListingImportError, ListingImporter};
pub use inquiries::{CreateInquiryRequest, InquiryQuery, RespondInquiryRequest};
pub use listings::{ListingInput, PropertySearchQuery, UpdateListingRequest};
pub use memory::InMemoryStore;
pub use moderation::{AdminPropertyQuery, ModerationAction, ModerationRequest};
pub use pagination::{Page, PageMeta, Pagination};
pub use profiles::{CreateProfileRequest, UpdateProfileRequest};
pub use repository::{
    AnalyticsRepository, InquiryRepository, ProfileRepository, PropertyRepository,
    RepositoryError, SystemConfigRepository,
};
pub use router::marketplace_router;
pub use seller::SellerDashboard;
pub use service::{MarketplaceBackend, MarketplaceService};
pub use session::{AuthContext, InMemorySessionResolver, SessionResolver, SessionUser};
pub use settings::{SettingsQuery, UpsertSettingRequest};
pub use uploads::{InMemoryObjectStorage, ObjectStorage, UploadFile, UploadKind, UploadPolicy};
pub use verification::{AgentReviewQuery, VerificationAction, VerifyAgentRequest};
