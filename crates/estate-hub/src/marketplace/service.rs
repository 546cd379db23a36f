use std::sync::Arc;

use axum::http::HeaderMap;

use super::domain::{AnalyticsEvent, AnalyticsEventKind, ProfileId, PropertyId};
use super::error::MarketplaceError;
use super::memory::InMemoryStore;
use super::repository::{
    AnalyticsRepository, InquiryRepository, ProfileRepository, PropertyRepository,
    SystemConfigRepository,
};
use super::session::{session_token, AuthContext, SessionResolver};
use super::uploads::{ObjectStorage, UploadPolicy};

/// The collaborators a marketplace instance talks to.
#[derive(Clone)]
pub struct MarketplaceBackend {
    pub profiles: Arc<dyn ProfileRepository>,
    pub properties: Arc<dyn PropertyRepository>,
    pub inquiries: Arc<dyn InquiryRepository>,
    pub settings: Arc<dyn SystemConfigRepository>,
    pub analytics: Arc<dyn AnalyticsRepository>,
    pub sessions: Arc<dyn SessionResolver>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl MarketplaceBackend {
    /// Every table served from one in-process store.
    pub fn in_memory(
        store: InMemoryStore,
        sessions: Arc<dyn SessionResolver>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let store = Arc::new(store);
        Self {
            profiles: store.clone(),
            properties: store.clone(),
            inquiries: store.clone(),
            settings: store.clone(),
            analytics: store,
            sessions,
            storage,
        }
    }
}

/// Service composing the repositories, session lookup, and storage behind the routes.
pub struct MarketplaceService {
    pub(crate) profiles: Arc<dyn ProfileRepository>,
    pub(crate) properties: Arc<dyn PropertyRepository>,
    pub(crate) inquiries: Arc<dyn InquiryRepository>,
    pub(crate) settings: Arc<dyn SystemConfigRepository>,
    pub(crate) analytics: Arc<dyn AnalyticsRepository>,
    pub(crate) sessions: Arc<dyn SessionResolver>,
    pub(crate) storage: Arc<dyn ObjectStorage>,
    pub(crate) uploads: UploadPolicy,
    cookie_name: String,
}

impl MarketplaceService {
    pub fn new(backend: MarketplaceBackend, cookie_name: impl Into<String>) -> Self {
        let MarketplaceBackend {
            profiles,
            properties,
            inquiries,
            settings,
            analytics,
            sessions,
            storage,
        } = backend;

        Self {
            profiles,
            properties,
            inquiries,
            settings,
            analytics,
            sessions,
            storage,
            uploads: UploadPolicy::default(),
            cookie_name: cookie_name.into(),
        }
    }

    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.uploads = policy;
        self
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        self.uploads
    }

    /// Resolves the caller, returning `None` when no valid session is present.
    pub async fn session(&self, headers: &HeaderMap) -> Result<Option<AuthContext>, MarketplaceError> {
        let Some(token) = session_token(headers, &self.cookie_name) else {
            return Ok(None);
        };
        let Some(user) = self.sessions.resolve(&token).await? else {
            return Ok(None);
        };
        let profile = self.profiles.fetch(&ProfileId(user.id))?;
        Ok(Some(AuthContext { user, profile }))
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, MarketplaceError> {
        self.session(headers)
            .await?
            .ok_or(MarketplaceError::Unauthorized)
    }

    /// Analytics rows are secondary; a failed insert is logged, not surfaced.
    pub(crate) fn track(
        &self,
        property_id: PropertyId,
        kind: AnalyticsEventKind,
        actor: Option<ProfileId>,
    ) {
        let event = AnalyticsEvent::new(property_id, kind, actor);
        if let Err(err) = self.analytics.record(event) {
            tracing::warn!(%property_id, kind = kind.label(), error = %err, "analytics insert failed");
        }
    }
}
