use estate_hub::config::AppConfig;
use estate_hub::error::AppError;
use estate_hub::marketplace::{
    HostedAuthClient, HostedStorageClient, InMemoryObjectStorage, InMemorySessionResolver,
    InMemoryStore, ListingInput, MarketplaceBackend, MarketplaceError, MarketplaceService,
    ObjectStorage, Profile, ProfileId, ProfileRepository, PropertyRepository, PropertyStatus,
    Role, SessionResolver, SessionUser, UploadPolicy, VerificationStatus,
};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use uuid::Uuid;

pub(crate) const DEV_ADMIN_TOKEN: &str = "dev-admin-token";
pub(crate) const DEV_AGENT_TOKEN: &str = "dev-agent-token";
pub(crate) const DEV_CUSTOMER_TOKEN: &str = "dev-customer-token";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Service plus the in-process handles needed for seeding.
pub(crate) struct Marketplace {
    pub(crate) service: Arc<MarketplaceService>,
    pub(crate) store: InMemoryStore,
    /// Present only when sessions are resolved in-process.
    pub(crate) dev_sessions: Option<InMemorySessionResolver>,
}

pub(crate) fn build_marketplace(config: &AppConfig) -> Marketplace {
    let store = InMemoryStore::default();
    let (sessions, storage, dev_sessions): (
        Arc<dyn SessionResolver>,
        Arc<dyn ObjectStorage>,
        Option<InMemorySessionResolver>,
    ) = match &config.backend {
        Some(backend) => (
            Arc::new(HostedAuthClient::new(backend)),
            Arc::new(HostedStorageClient::new(
                backend,
                config.storage.bucket.clone(),
            )),
            None,
        ),
        None => {
            let sessions = InMemorySessionResolver::default();
            (
                Arc::new(sessions.clone()),
                Arc::new(InMemoryObjectStorage::default()),
                Some(sessions),
            )
        }
    };

    let policy = UploadPolicy {
        max_bytes: config.storage.max_upload_bytes,
        ..UploadPolicy::default()
    };
    let backend = MarketplaceBackend::in_memory(store.clone(), sessions, storage);
    let service = MarketplaceService::new(backend, config.session.cookie_name.clone())
        .with_upload_policy(policy);

    Marketplace {
        service: Arc::new(service),
        store,
        dev_sessions,
    }
}

/// Marketplace wired entirely to in-process gateways, as used by the demo.
pub(crate) fn in_process_marketplace() -> (Marketplace, InMemorySessionResolver) {
    let store = InMemoryStore::default();
    let sessions = InMemorySessionResolver::default();
    let backend = MarketplaceBackend::in_memory(
        store.clone(),
        Arc::new(sessions.clone()),
        Arc::new(InMemoryObjectStorage::default()),
    );
    let marketplace = Marketplace {
        service: Arc::new(MarketplaceService::new(backend, "estate-session")),
        store,
        dev_sessions: Some(sessions.clone()),
    };
    (marketplace, sessions)
}

#[derive(Debug)]
pub(crate) struct DevAccounts {
    pub(crate) admin: Profile,
    pub(crate) agent: Profile,
    pub(crate) customer: Profile,
}

fn dev_profile(email: &str, full_name: &str, role: Role) -> Profile {
    Profile::new(
        ProfileId(Uuid::new_v4()),
        email.to_string(),
        full_name.to_string(),
        role,
    )
}

fn issue(sessions: &InMemorySessionResolver, token: &str, profile: &Profile) {
    sessions.issue(
        token,
        SessionUser {
            id: profile.id.0,
            email: profile.email.clone(),
        },
    );
}

/// One profile per role, each reachable through a fixed bearer token.
pub(crate) fn seed_accounts(
    store: &InMemoryStore,
    sessions: &InMemorySessionResolver,
) -> Result<DevAccounts, AppError> {
    let admin = dev_profile("admin@estate-hub.test", "Morgan Admin", Role::Admin);

    let mut agent = dev_profile("agent@estate-hub.test", "Avery Agent", Role::Agent);
    agent.agency_name = Some("Riverfront Realty".to_string());
    agent.license_number = Some("IA-554201".to_string());
    agent.verification_status = VerificationStatus::Verified;
    agent.is_verified = true;
    agent.verified_at = Some(Utc::now());

    let customer = dev_profile("buyer@estate-hub.test", "Casey Buyer", Role::Customer);

    for profile in [&admin, &agent, &customer] {
        ProfileRepository::insert(store, profile.clone()).map_err(MarketplaceError::from)?;
    }
    issue(sessions, DEV_ADMIN_TOKEN, &admin);
    issue(sessions, DEV_AGENT_TOKEN, &agent);
    issue(sessions, DEV_CUSTOMER_TOKEN, &customer);

    Ok(DevAccounts {
        admin,
        agent,
        customer,
    })
}

/// Stores imported rows as active listings owned by `agent`, skipping moderation.
pub(crate) fn seed_listings(
    store: &InMemoryStore,
    agent: &Profile,
    listings: Vec<ListingInput>,
) -> Result<usize, AppError> {
    let now = Utc::now();
    let mut stored = 0;
    for input in listings {
        let property = input.into_property(agent.id, PropertyStatus::Active, now);
        PropertyRepository::insert(store, property).map_err(MarketplaceError::from)?;
        stored += 1;
    }
    Ok(stored)
}
