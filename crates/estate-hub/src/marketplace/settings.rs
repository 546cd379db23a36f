use std::collections::BTreeMap;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationError};

use super::domain::SystemConfigEntry;
use super::error::MarketplaceError;
use super::service::MarketplaceService;
use super::session::AuthContext;

fn setting_name(value: &str) -> Result<(), ValidationError> {
    let valid = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("setting_name"))
    }
}

/// Shape check only; values are stored as given.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpsertSettingRequest {
    #[validate(length(min = 1, max = 64), custom(function = "setting_name"))]
    pub category: String,
    #[validate(length(min = 1, max = 128), custom(function = "setting_name"))]
    pub key: String,
    pub value: serde_json::Value,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsQuery {
    pub category: Option<String>,
}

/// Entries grouped by category, then key.
pub type GroupedSettings = BTreeMap<String, BTreeMap<String, SystemConfigEntry>>;

impl MarketplaceService {
    pub fn list_settings(
        &self,
        ctx: &AuthContext,
        query: SettingsQuery,
    ) -> Result<GroupedSettings, MarketplaceError> {
        ctx.require_admin()?;
        let category = query.category.as_deref().filter(|value| !value.is_empty());
        let mut grouped = GroupedSettings::new();
        for entry in self.settings.list(category)? {
            grouped
                .entry(entry.category.clone())
                .or_default()
                .insert(entry.key.clone(), entry);
        }
        Ok(grouped)
    }

    pub fn upsert_setting(
        &self,
        ctx: &AuthContext,
        request: UpsertSettingRequest,
    ) -> Result<SystemConfigEntry, MarketplaceError> {
        ctx.require_admin()?;
        request.validate()?;

        let entry = SystemConfigEntry {
            category: request.category,
            key: request.key,
            value: request.value,
            description: request.description,
            updated_by: Some(ctx.profile_id()),
            updated_at: Utc::now(),
        };
        let stored = self.settings.upsert(entry)?;
        info!(category = %stored.category, key = %stored.key, admin = %ctx.profile_id(), "system setting updated");
        Ok(stored)
    }

    pub fn setting(
        &self,
        category: &str,
        key: &str,
    ) -> Result<Option<SystemConfigEntry>, MarketplaceError> {
        Ok(self.settings.fetch(category, key)?)
    }
}
