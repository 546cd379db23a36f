use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, FromRequest, FromRequestParts, Multipart, Path, Query, Request, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use super::agents::AgentDirectoryQuery;
use super::domain::{InquiryId, ProfileId, PropertyId};
use super::error::MarketplaceError;
use super::inquiries::{CreateInquiryRequest, InquiryQuery, RespondInquiryRequest};
use super::listings::{ListingInput, PropertySearchQuery, UpdateListingRequest};
use super::moderation::{AdminPropertyQuery, ModerationRequest};
use super::profiles::{CreateProfileRequest, UpdateProfileRequest};
use super::service::MarketplaceService;
use super::session::{AuthContext, SessionView};
use super::settings::{SettingsQuery, UpsertSettingRequest};
use super::uploads::{UploadFile, UploadKind};
use super::verification::{AgentReviewQuery, VerificationAction, VerifyAgentRequest};

type Service = Arc<MarketplaceService>;

/// Router builder exposing every `/api/**` endpoint of the marketplace.
pub fn marketplace_router(service: Service) -> Router {
    let policy = service.upload_policy();
    let upload_limit = policy
        .max_bytes
        .saturating_mul(policy.max_files)
        .saturating_add(64 * 1024);

    Router::new()
        .route("/api/auth/session", get(session_handler))
        .route(
            "/api/profile",
            get(profile_handler)
                .post(create_profile_handler)
                .put(update_profile_handler),
        )
        .route("/api/profile/completion", get(completion_handler))
        .route("/api/profile/avatar", post(avatar_upload_handler))
        .route("/api/profile/documents", post(documents_upload_handler))
        .route("/api/agents", get(agent_directory_handler))
        .route("/api/agents/:agent_id", get(agent_profile_handler))
        .route(
            "/api/properties",
            get(search_properties_handler).post(create_property_handler),
        )
        .route(
            "/api/properties/:property_id",
            get(property_handler)
                .put(update_property_handler)
                .delete(archive_property_handler),
        )
        .route(
            "/api/properties/:property_id/images",
            post(property_images_handler),
        )
        .route(
            "/api/properties/:property_id/inquiries",
            post(create_inquiry_handler),
        )
        .route("/api/inquiries", get(list_inquiries_handler))
        .route("/api/inquiries/:inquiry_id", put(respond_inquiry_handler))
        .route("/api/seller/dashboard", get(seller_dashboard_handler))
        .route("/api/admin/agents", get(admin_agents_handler))
        .route("/api/admin/agents/verify", post(verify_agent_handler))
        .route("/api/admin/properties", get(admin_properties_handler))
        .route(
            "/api/admin/properties/:property_id/moderate",
            post(moderate_property_handler),
        )
        .route("/api/admin/analytics", get(analytics_handler))
        .route(
            "/api/admin/system-config",
            get(list_settings_handler).put(upsert_setting_handler),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(service)
}

#[axum::async_trait]
impl FromRequestParts<Service> for AuthContext {
    type Rejection = MarketplaceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Service,
    ) -> Result<Self, Self::Rejection> {
        state.authenticate(&parts.headers).await
    }
}

/// Caller's session when one is present; public endpoints accept anonymous requests.
pub struct MaybeSession(pub Option<AuthContext>);

#[axum::async_trait]
impl FromRequestParts<Service> for MaybeSession {
    type Rejection = MarketplaceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Service,
    ) -> Result<Self, Self::Rejection> {
        state.session(&parts.headers).await.map(MaybeSession)
    }
}

/// Caller who must be an admin. Listed before body and query extractors so
/// non-admins get 403 whatever the request carries.
pub struct AdminSession(pub AuthContext);

#[axum::async_trait]
impl FromRequestParts<Service> for AdminSession {
    type Rejection = MarketplaceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Service,
    ) -> Result<Self, Self::Rejection> {
        let ctx = state.authenticate(&parts.headers).await?;
        ctx.require_admin()?;
        Ok(AdminSession(ctx))
    }
}

/// Query string whose parse failures use the marketplace error envelope.
pub struct Params<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = MarketplaceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Params(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn query_rejection(rejection: QueryRejection) -> MarketplaceError {
    MarketplaceError::Validation {
        message: "Invalid query parameters".to_string(),
        details: Some(json!(rejection.body_text())),
    }
}

/// JSON body whose parse failures use the marketplace error envelope.
pub struct Payload<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = MarketplaceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> MarketplaceError {
    MarketplaceError::Validation {
        message: "Invalid request data".to_string(),
        details: Some(json!(rejection.body_text())),
    }
}

#[derive(Debug, Serialize)]
struct Envelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    data: T,
}

fn respond<T: Serialize>(status: StatusCode, message: Option<&'static str>, data: T) -> Response {
    (status, Json(Envelope { message, data })).into_response()
}

async fn collect_files(
    mut multipart: Multipart,
    kind: UploadKind,
) -> Result<Vec<UploadFile>, MarketplaceError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| MarketplaceError::invalid(err.body_text()))?
    {
        if field.name() != Some(kind.field()) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| MarketplaceError::invalid(err.body_text()))?;
        files.push(UploadFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Ok(files)
}

pub(crate) async fn session_handler(ctx: AuthContext) -> Response {
    respond(StatusCode::OK, None, SessionView::from(&ctx))
}

pub(crate) async fn profile_handler(ctx: AuthContext) -> Result<Response, MarketplaceError> {
    let profile = ctx.require_profile()?;
    Ok(respond(StatusCode::OK, None, profile))
}

pub(crate) async fn create_profile_handler(
    State(service): State<Service>,
    ctx: AuthContext,
    Payload(request): Payload<CreateProfileRequest>,
) -> Result<Response, MarketplaceError> {
    let profile = service.create_profile(&ctx, request)?;
    Ok(respond(StatusCode::CREATED, Some("Profile created"), profile))
}

pub(crate) async fn update_profile_handler(
    State(service): State<Service>,
    ctx: AuthContext,
    Payload(request): Payload<UpdateProfileRequest>,
) -> Result<Response, MarketplaceError> {
    let profile = service.update_profile(&ctx, request)?;
    Ok(respond(StatusCode::OK, Some("Profile updated"), profile))
}

pub(crate) async fn completion_handler(
    State(service): State<Service>,
    ctx: AuthContext,
) -> Result<Response, MarketplaceError> {
    let completion = service.completion(&ctx)?;
    Ok(respond(StatusCode::OK, None, completion))
}

pub(crate) async fn avatar_upload_handler(
    State(service): State<Service>,
    ctx: AuthContext,
    multipart: Multipart,
) -> Result<Response, MarketplaceError> {
    let files = collect_files(multipart, UploadKind::Avatar).await?;
    let profile = service.upload_avatar(&ctx, files).await?;
    Ok(respond(StatusCode::OK, Some("Avatar uploaded"), profile))
}

pub(crate) async fn documents_upload_handler(
    State(service): State<Service>,
    ctx: AuthContext,
    multipart: Multipart,
) -> Result<Response, MarketplaceError> {
    let files = collect_files(multipart, UploadKind::VerificationDocument).await?;
    let profile = service.upload_verification_documents(&ctx, files).await?;
    Ok(respond(StatusCode::OK, Some("Documents uploaded"), profile))
}

pub(crate) async fn agent_directory_handler(
    State(service): State<Service>,
    Params(query): Params<AgentDirectoryQuery>,
) -> Result<Response, MarketplaceError> {
    let page = service.agent_directory(query)?;
    Ok(Json(page).into_response())
}

pub(crate) async fn agent_profile_handler(
    State(service): State<Service>,
    Path(agent_id): Path<ProfileId>,
) -> Result<Response, MarketplaceError> {
    let agent = service.agent_profile(agent_id)?;
    Ok(respond(StatusCode::OK, None, agent))
}

pub(crate) async fn search_properties_handler(
    State(service): State<Service>,
    Params(query): Params<PropertySearchQuery>,
) -> Result<Response, MarketplaceError> {
    let page = service.search_properties(query)?;
    Ok(Json(page).into_response())
}

pub(crate) async fn create_property_handler(
    State(service): State<Service>,
    ctx: AuthContext,
    Payload(input): Payload<ListingInput>,
) -> Result<Response, MarketplaceError> {
    let property = service.create_property(&ctx, input)?;
    Ok(respond(
        StatusCode::CREATED,
        Some("Property submitted for review"),
        property,
    ))
}

pub(crate) async fn property_handler(
    State(service): State<Service>,
    MaybeSession(ctx): MaybeSession,
    Path(property_id): Path<PropertyId>,
) -> Result<Response, MarketplaceError> {
    let property = service.view_property(ctx.as_ref(), property_id)?;
    Ok(respond(StatusCode::OK, None, property))
}

pub(crate) async fn update_property_handler(
    State(service): State<Service>,
    ctx: AuthContext,
    Path(property_id): Path<PropertyId>,
    Payload(request): Payload<UpdateListingRequest>,
) -> Result<Response, MarketplaceError> {
    let property = service.update_property(&ctx, property_id, request)?;
    Ok(respond(StatusCode::OK, Some("Property updated"), property))
}

pub(crate) async fn archive_property_handler(
    State(service): State<Service>,
    ctx: AuthContext,
    Path(property_id): Path<PropertyId>,
) -> Result<Response, MarketplaceError> {
    let property = service.archive_property(&ctx, property_id)?;
    Ok(respond(StatusCode::OK, Some("Property archived"), property))
}

pub(crate) async fn property_images_handler(
    State(service): State<Service>,
    ctx: AuthContext,
    Path(property_id): Path<PropertyId>,
    multipart: Multipart,
) -> Result<Response, MarketplaceError> {
    let files = collect_files(multipart, UploadKind::PropertyImage).await?;
    let property = service
        .upload_property_images(&ctx, property_id, files)
        .await?;
    Ok(respond(StatusCode::OK, Some("Images uploaded"), property))
}

pub(crate) async fn create_inquiry_handler(
    State(service): State<Service>,
    MaybeSession(ctx): MaybeSession,
    Path(property_id): Path<PropertyId>,
    Payload(request): Payload<CreateInquiryRequest>,
) -> Result<Response, MarketplaceError> {
    let inquiry = service.create_inquiry(ctx.as_ref(), property_id, request)?;
    Ok(respond(StatusCode::CREATED, Some("Inquiry sent"), inquiry))
}

pub(crate) async fn list_inquiries_handler(
    State(service): State<Service>,
    ctx: AuthContext,
    Params(query): Params<InquiryQuery>,
) -> Result<Response, MarketplaceError> {
    let page = service.list_inquiries(&ctx, query)?;
    Ok(Json(page).into_response())
}

pub(crate) async fn respond_inquiry_handler(
    State(service): State<Service>,
    ctx: AuthContext,
    Path(inquiry_id): Path<InquiryId>,
    Payload(request): Payload<RespondInquiryRequest>,
) -> Result<Response, MarketplaceError> {
    let inquiry = service.respond_to_inquiry(&ctx, inquiry_id, request)?;
    Ok(respond(StatusCode::OK, Some("Inquiry updated"), inquiry))
}

pub(crate) async fn seller_dashboard_handler(
    State(service): State<Service>,
    ctx: AuthContext,
) -> Result<Response, MarketplaceError> {
    let dashboard = service.seller_dashboard(&ctx)?;
    Ok(respond(StatusCode::OK, None, dashboard))
}

pub(crate) async fn admin_agents_handler(
    State(service): State<Service>,
    AdminSession(ctx): AdminSession,
    Params(query): Params<AgentReviewQuery>,
) -> Result<Response, MarketplaceError> {
    let page = service.agents_for_review(&ctx, query)?;
    Ok(Json(page).into_response())
}

pub(crate) async fn verify_agent_handler(
    State(service): State<Service>,
    AdminSession(ctx): AdminSession,
    Payload(request): Payload<VerifyAgentRequest>,
) -> Result<Response, MarketplaceError> {
    let message = match request.action {
        VerificationAction::Approve => "Agent verified successfully",
        VerificationAction::Reject => "Agent verification rejected",
    };
    let view = service.verify_agent(&ctx, request)?;
    Ok(respond(StatusCode::OK, Some(message), view))
}

pub(crate) async fn admin_properties_handler(
    State(service): State<Service>,
    AdminSession(ctx): AdminSession,
    Params(query): Params<AdminPropertyQuery>,
) -> Result<Response, MarketplaceError> {
    let page = service.properties_for_admin(&ctx, query)?;
    Ok(Json(page).into_response())
}

pub(crate) async fn moderate_property_handler(
    State(service): State<Service>,
    AdminSession(ctx): AdminSession,
    Path(property_id): Path<PropertyId>,
    Payload(request): Payload<ModerationRequest>,
) -> Result<Response, MarketplaceError> {
    let property = service.moderate_property(&ctx, property_id, request)?;
    Ok(respond(StatusCode::OK, Some("Property moderated"), property))
}

pub(crate) async fn analytics_handler(
    State(service): State<Service>,
    AdminSession(ctx): AdminSession,
) -> Result<Response, MarketplaceError> {
    let overview = service.analytics_overview(&ctx)?;
    Ok(respond(StatusCode::OK, None, overview))
}

pub(crate) async fn list_settings_handler(
    State(service): State<Service>,
    AdminSession(ctx): AdminSession,
    Params(query): Params<SettingsQuery>,
) -> Result<Response, MarketplaceError> {
    let settings = service.list_settings(&ctx, query)?;
    Ok(respond(StatusCode::OK, None, settings))
}

pub(crate) async fn upsert_setting_handler(
    State(service): State<Service>,
    AdminSession(ctx): AdminSession,
    Payload(request): Payload<UpsertSettingRequest>,
) -> Result<Response, MarketplaceError> {
    let entry = service.upsert_setting(&ctx, request)?;
    Ok(respond(StatusCode::OK, Some("Setting saved"), entry))
}
