use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::completion::{profile_completion, ProfileCompletion};
use super::domain::{Profile, Role};
use super::error::MarketplaceError;
use super::service::MarketplaceService;
use super::session::AuthContext;
use super::uploads::{discard, store_all, UploadFile, UploadKind};

/// Body of `POST /api/profile`, sent right after signup.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[validate(length(min = 2, max = 100, message = "Full name must be 2-100 characters"))]
    pub full_name: String,
    #[serde(default = "default_signup_role")]
    pub role: Role,
    #[validate(length(min = 7, max = 20, message = "Phone must be 7-20 characters"))]
    pub phone: Option<String>,
}

fn default_signup_role() -> Role {
    Role::Customer
}

/// Self-service edits; role and verification fields are not part of this shape.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100, message = "Full name must be 2-100 characters"))]
    pub full_name: Option<String>,
    #[validate(length(min = 7, max = 20, message = "Phone must be 7-20 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 2000, message = "Bio must be at most 2000 characters"))]
    pub bio: Option<String>,
    #[validate(length(max = 120))]
    pub agency_name: Option<String>,
    #[validate(length(min = 3, max = 50))]
    pub license_number: Option<String>,
    #[validate(range(max = 80, message = "Years of experience must be at most 80"))]
    pub years_experience: Option<u8>,
    #[validate(length(max = 20))]
    pub specializations: Option<Vec<String>>,
}

fn trimmed(value: String) -> Option<String> {
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

impl MarketplaceService {
    pub fn create_profile(
        &self,
        ctx: &AuthContext,
        request: CreateProfileRequest,
    ) -> Result<Profile, MarketplaceError> {
        request.validate()?;
        if request.role == Role::Admin {
            return Err(MarketplaceError::forbidden("Cannot self-assign the admin role"));
        }
        if ctx.profile.is_some() {
            return Err(MarketplaceError::Conflict("Profile already exists".to_string()));
        }

        let mut profile = Profile::new(
            ctx.profile_id(),
            ctx.user.email.clone(),
            request.full_name.trim().to_string(),
            request.role,
        );
        profile.phone = request.phone.and_then(trimmed);

        let stored = self.profiles.insert(profile)?;
        info!(profile_id = %stored.id, role = stored.role.label(), "profile created");
        Ok(stored)
    }

    pub fn update_profile(
        &self,
        ctx: &AuthContext,
        request: UpdateProfileRequest,
    ) -> Result<Profile, MarketplaceError> {
        request.validate()?;
        let mut profile = ctx.require_profile()?.clone();

        let UpdateProfileRequest {
            full_name,
            phone,
            bio,
            agency_name,
            license_number,
            years_experience,
            specializations,
        } = request;

        if let Some(full_name) = full_name {
            profile.full_name = full_name.trim().to_string();
        }
        if let Some(phone) = phone {
            profile.phone = trimmed(phone);
        }
        if let Some(bio) = bio {
            profile.bio = trimmed(bio);
        }
        if let Some(agency_name) = agency_name {
            profile.agency_name = trimmed(agency_name);
        }
        if let Some(license_number) = license_number {
            profile.license_number = trimmed(license_number);
        }
        if years_experience.is_some() {
            profile.years_experience = years_experience;
        }
        if let Some(specializations) = specializations {
            profile.specializations = specializations.into_iter().filter_map(trimmed).collect();
        }
        profile.updated_at = Utc::now();

        Ok(self.profiles.update(profile)?)
    }

    pub fn completion(&self, ctx: &AuthContext) -> Result<ProfileCompletion, MarketplaceError> {
        Ok(profile_completion(ctx.require_profile()?))
    }

    pub async fn upload_avatar(
        &self,
        ctx: &AuthContext,
        files: Vec<UploadFile>,
    ) -> Result<Profile, MarketplaceError> {
        let mut profile = ctx.require_profile()?.clone();
        if files.len() > 1 {
            return Err(MarketplaceError::invalid("Only one avatar may be uploaded"));
        }
        let prepared = self
            .uploads
            .prepare(UploadKind::Avatar, &profile.id.to_string(), files)?;
        let stored = store_all(self.storage.as_ref(), prepared).await?;

        profile.avatar_url = stored.first().map(|object| object.public_url.clone());
        profile.updated_at = Utc::now();
        match self.profiles.update(profile) {
            Ok(profile) => Ok(profile),
            Err(err) => {
                discard(self.storage.as_ref(), &stored).await;
                Err(err.into())
            }
        }
    }

    pub async fn upload_verification_documents(
        &self,
        ctx: &AuthContext,
        files: Vec<UploadFile>,
    ) -> Result<Profile, MarketplaceError> {
        let mut profile = ctx.require_agent()?.clone();
        let prepared = self.uploads.prepare(
            UploadKind::VerificationDocument,
            &profile.id.to_string(),
            files,
        )?;
        let stored = store_all(self.storage.as_ref(), prepared).await?;

        profile
            .verification_documents
            .extend(stored.iter().map(|object| object.public_url.clone()));
        profile.updated_at = Utc::now();
        match self.profiles.update(profile) {
            Ok(profile) => {
                info!(profile_id = %profile.id, uploaded = stored.len(), "verification documents attached");
                Ok(profile)
            }
            Err(err) => {
                discard(self.storage.as_ref(), &stored).await;
                Err(err.into())
            }
        }
    }
}
