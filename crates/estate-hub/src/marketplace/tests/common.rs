use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::marketplace::domain::{
    Inquiry, InquiryId, InquiryStatus, ListingType, Profile, ProfileId, Property, PropertyId,
    PropertyStatus, PropertyType, Role, VerificationStatus,
};
use crate::marketplace::listings::ListingInput;
use crate::marketplace::memory::InMemoryStore;
use crate::marketplace::pagination::Pagination;
use crate::marketplace::repository::{
    ProfileFilter, ProfileRepository, PropertyFilter, PropertyRepository, RepositoryError,
};
use crate::marketplace::router::marketplace_router;
use crate::marketplace::service::{MarketplaceBackend, MarketplaceService};
use crate::marketplace::session::{AuthContext, InMemorySessionResolver, SessionUser};
use crate::marketplace::uploads::{InMemoryObjectStorage, UploadFile};

pub(crate) const COOKIE: &str = "estate-session";

fn profile(email: &str, full_name: &str, role: Role) -> Profile {
    Profile::new(
        ProfileId(Uuid::new_v4()),
        email.to_string(),
        full_name.to_string(),
        role,
    )
}

pub(crate) fn customer_profile(email: &str) -> Profile {
    profile(email, "Casey Buyer", Role::Customer)
}

/// Pending agent, as created at signup.
pub(crate) fn agent_profile(email: &str) -> Profile {
    let mut agent = profile(email, "Avery Agent", Role::Agent);
    agent.agency_name = Some("Riverfront Realty".to_string());
    agent.license_number = Some(format!("IA-{}", agent.id.0.simple()));
    agent
}

pub(crate) fn verified_agent(email: &str) -> Profile {
    let mut agent = agent_profile(email);
    agent.verification_status = VerificationStatus::Verified;
    agent.is_verified = true;
    agent.verified_at = Some(Utc::now());
    agent
}

pub(crate) fn admin_profile(email: &str) -> Profile {
    profile(email, "Morgan Admin", Role::Admin)
}

pub(crate) fn listing_input() -> ListingInput {
    ListingInput {
        title: "Sunny bungalow near the river".to_string(),
        description: "Three bedroom bungalow with a fenced yard and new roof.".to_string(),
        price: 245_000,
        property_type: PropertyType::House,
        listing_type: ListingType::Sale,
        bedrooms: 3,
        bathrooms: 2,
        square_feet: Some(1_450),
        address: "12 River Rd".to_string(),
        city: "Des Moines".to_string(),
        state: "IA".to_string(),
        zip_code: Some("50309".to_string()),
        features: vec!["garage".to_string()],
        images: Vec::new(),
    }
}

pub(crate) fn listing(agent: &Profile, status: PropertyStatus) -> Property {
    listing_input().into_property(agent.id, status, Utc::now())
}

pub(crate) fn inquiry_for(property: &Property, profile_id: Option<ProfileId>) -> Inquiry {
    Inquiry {
        id: InquiryId::generate(),
        property_id: property.id,
        profile_id,
        name: "Casey Buyer".to_string(),
        email: "buyer@example.com".to_string(),
        phone: None,
        message: "Is the basement finished?".to_string(),
        status: InquiryStatus::Pending,
        response: None,
        responded_at: None,
        created_at: Utc::now(),
    }
}

pub(crate) fn context(profile: &Profile) -> AuthContext {
    AuthContext {
        user: SessionUser {
            id: profile.id.0,
            email: profile.email.clone(),
        },
        profile: Some(profile.clone()),
    }
}

pub(crate) fn png_file(name: &str) -> UploadFile {
    UploadFile {
        file_name: Some(name.to_string()),
        content_type: Some("image/png".to_string()),
        bytes: vec![0x89, b'P', b'N', b'G', 0, 0, 0, 0],
    }
}

/// In-process marketplace with handles on every collaborator.
pub(crate) struct Harness {
    pub(crate) service: Arc<MarketplaceService>,
    pub(crate) store: InMemoryStore,
    pub(crate) sessions: InMemorySessionResolver,
    pub(crate) storage: InMemoryObjectStorage,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::build(|_, _| {})
    }

    /// Profile and property row updates fail; reads and inserts still work.
    pub(crate) fn with_failing_updates() -> Self {
        Self::build(|backend, store| {
            let failing = Arc::new(UpdateFailingStore(store.clone()));
            backend.profiles = failing.clone();
            backend.properties = failing;
        })
    }

    fn build(rewire: impl FnOnce(&mut MarketplaceBackend, &InMemoryStore)) -> Self {
        let store = InMemoryStore::default();
        let sessions = InMemorySessionResolver::default();
        let storage = InMemoryObjectStorage::default();
        let mut backend = MarketplaceBackend::in_memory(
            store.clone(),
            Arc::new(sessions.clone()),
            Arc::new(storage.clone()),
        );
        rewire(&mut backend, &store);
        Self {
            service: Arc::new(MarketplaceService::new(backend, COOKIE)),
            store,
            sessions,
            storage,
        }
    }

    pub(crate) fn router(&self) -> axum::Router {
        marketplace_router(self.service.clone())
    }

    /// Stores the profile and returns a bearer token for it.
    pub(crate) fn sign_in(&self, profile: &Profile) -> String {
        ProfileRepository::insert(&self.store, profile.clone()).expect("profile stored");
        self.token_for(profile)
    }

    /// Token for a signed-up user who has no profile row yet.
    pub(crate) fn token_for(&self, profile: &Profile) -> String {
        let token = format!("token-{}", profile.id);
        self.sessions.issue(
            token.clone(),
            SessionUser {
                id: profile.id.0,
                email: profile.email.clone(),
            },
        );
        token
    }

    pub(crate) fn stored_listing(&self, agent: &Profile, status: PropertyStatus) -> Property {
        PropertyRepository::insert(&self.store, listing(agent, status)).expect("listing stored")
    }

    pub(crate) fn profile(&self, id: ProfileId) -> Profile {
        ProfileRepository::fetch(&self.store, &id)
            .expect("fetch")
            .expect("profile present")
    }

    pub(crate) fn property(&self, id: PropertyId) -> Property {
        PropertyRepository::fetch(&self.store, &id)
            .expect("fetch")
            .expect("property present")
    }
}

/// Wraps the in-memory store and refuses every row update.
pub(crate) struct UpdateFailingStore(pub(crate) InMemoryStore);

fn update_refused() -> RepositoryError {
    RepositoryError::Unavailable("connection reset".to_string())
}

impl ProfileRepository for UpdateFailingStore {
    fn insert(&self, profile: Profile) -> Result<Profile, RepositoryError> {
        ProfileRepository::insert(&self.0, profile)
    }

    fn update(&self, _profile: Profile) -> Result<Profile, RepositoryError> {
        Err(update_refused())
    }

    fn fetch(&self, id: &ProfileId) -> Result<Option<Profile>, RepositoryError> {
        ProfileRepository::fetch(&self.0, id)
    }

    fn list(
        &self,
        filter: &ProfileFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Profile>, RepositoryError> {
        ProfileRepository::list(&self.0, filter, pagination)
    }

    fn count(&self, filter: &ProfileFilter) -> Result<usize, RepositoryError> {
        ProfileRepository::count(&self.0, filter)
    }
}

impl PropertyRepository for UpdateFailingStore {
    fn insert(&self, property: Property) -> Result<Property, RepositoryError> {
        PropertyRepository::insert(&self.0, property)
    }

    fn update(&self, _property: Property) -> Result<Property, RepositoryError> {
        Err(update_refused())
    }

    fn fetch(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        PropertyRepository::fetch(&self.0, id)
    }

    fn list(
        &self,
        filter: &PropertyFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Property>, RepositoryError> {
        PropertyRepository::list(&self.0, filter, pagination)
    }

    fn count(&self, filter: &PropertyFilter) -> Result<usize, RepositoryError> {
        PropertyRepository::count(&self.0, filter)
    }

    fn ids(&self, filter: &PropertyFilter) -> Result<Vec<PropertyId>, RepositoryError> {
        PropertyRepository::ids(&self.0, filter)
    }
}

const BOUNDARY: &str = "estate-hub-boundary";

/// Posts `files` as repeated `field` parts of a multipart form.
pub(crate) async fn send_multipart(
    router: axum::Router,
    uri: &str,
    token: &str,
    field: &str,
    files: &[UploadFile],
) -> Response {
    let mut body = Vec::new();
    for file in files {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{}\"\r\n",
                file.file_name.as_deref().unwrap_or("upload")
            )
            .as_bytes(),
        );
        if let Some(content_type) = &file.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request builds");
    router.oneshot(request).await.expect("route executes")
}

pub(crate) async fn send(
    router: axum::Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize body"))
        }
        None => Body::empty(),
    };
    router
        .oneshot(request.body(body).expect("request builds"))
        .await
        .expect("route executes")
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(crate) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}
