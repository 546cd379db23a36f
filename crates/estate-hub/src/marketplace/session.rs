use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{Profile, ProfileId, Role};
use super::error::{MarketplaceError, ADMIN_REQUIRED, AGENT_REQUIRED};

/// Identity as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("auth provider unavailable: {0}")]
    Upstream(String),
}

/// Maps an opaque access token to the signed-in user.
#[async_trait::async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Option<SessionUser>, SessionError>;
}

/// Token table standing in for the auth provider during development and tests.
#[derive(Default, Clone)]
pub struct InMemorySessionResolver {
    sessions: Arc<Mutex<HashMap<String, SessionUser>>>,
}

impl InMemorySessionResolver {
    pub fn issue(&self, token: impl Into<String>, user: SessionUser) {
        if let Ok(mut guard) = self.sessions.lock() {
            guard.insert(token.into(), user);
        }
    }

    pub fn revoke(&self, token: &str) {
        if let Ok(mut guard) = self.sessions.lock() {
            guard.remove(token);
        }
    }
}

#[async_trait::async_trait]
impl SessionResolver for InMemorySessionResolver {
    async fn resolve(&self, token: &str) -> Result<Option<SessionUser>, SessionError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|_| SessionError::Upstream("session table lock poisoned".to_string()))?;
        Ok(guard.get(token).cloned())
    }
}

/// Reads the access token from `Authorization: Bearer`, falling back to the session cookie.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Per-request view of who is calling and with which role.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: SessionUser,
    pub profile: Option<Profile>,
}

impl AuthContext {
    pub fn profile_id(&self) -> ProfileId {
        ProfileId(self.user.id)
    }

    /// Users without a profile row are treated as customers.
    pub fn role(&self) -> Role {
        self.profile
            .as_ref()
            .map_or(Role::Customer, |profile| profile.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }

    pub fn is_agent(&self) -> bool {
        self.role() == Role::Agent
    }

    pub fn is_customer(&self) -> bool {
        self.role() == Role::Customer
    }

    pub fn require_admin(&self) -> Result<(), MarketplaceError> {
        match self.role() {
            Role::Admin => Ok(()),
            Role::Agent | Role::Customer => Err(MarketplaceError::forbidden(ADMIN_REQUIRED)),
        }
    }

    /// Agents and admins; returns the caller's profile.
    pub fn require_agent(&self) -> Result<&Profile, MarketplaceError> {
        match self.role() {
            Role::Agent | Role::Admin => self.require_profile(),
            Role::Customer => Err(MarketplaceError::forbidden(AGENT_REQUIRED)),
        }
    }

    pub fn require_profile(&self) -> Result<&Profile, MarketplaceError> {
        self.profile
            .as_ref()
            .ok_or(MarketplaceError::NotFound("Profile"))
    }

    /// Owners and admins may change a row.
    pub fn can_manage(&self, owner: ProfileId) -> bool {
        self.is_admin() || self.profile_id() == owner
    }

    pub fn flags(&self) -> RoleFlags {
        RoleFlags {
            is_admin: self.is_admin(),
            is_agent: self.is_agent(),
            is_customer: self.is_customer(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleFlags {
    pub is_admin: bool,
    pub is_agent: bool,
    pub is_customer: bool,
}

/// Payload of `GET /api/auth/session`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub user: SessionUser,
    pub profile: Option<Profile>,
    pub role: Role,
    #[serde(flatten)]
    pub flags: RoleFlags,
}

impl From<&AuthContext> for SessionView {
    fn from(ctx: &AuthContext) -> Self {
        Self {
            user: ctx.user.clone(),
            profile: ctx.profile.clone(),
            role: ctx.role(),
            flags: ctx.flags(),
        }
    }
}
