use serde::Serialize;

use super::domain::{Profile, Role};

const CUSTOMER_FIELDS: &[&str] = &["full_name", "email", "phone", "avatar_url"];

const AGENT_FIELDS: &[&str] = &[
    "full_name",
    "email",
    "phone",
    "avatar_url",
    "bio",
    "agency_name",
    "license_number",
    "years_experience",
    "specializations",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileCompletion {
    pub percentage: u8,
    pub completed_fields: Vec<&'static str>,
    pub missing_fields: Vec<&'static str>,
    pub required_fields: usize,
}

pub fn required_fields(role: Role) -> &'static [&'static str] {
    match role {
        Role::Customer => CUSTOMER_FIELDS,
        Role::Agent | Role::Admin => AGENT_FIELDS,
    }
}

fn filled(value: Option<&str>) -> bool {
    value.is_some_and(|text| !text.trim().is_empty())
}

fn field_is_complete(profile: &Profile, field: &str) -> bool {
    match field {
        "full_name" => filled(Some(&profile.full_name)),
        "email" => filled(Some(&profile.email)),
        "phone" => filled(profile.phone.as_deref()),
        "avatar_url" => filled(profile.avatar_url.as_deref()),
        "bio" => filled(profile.bio.as_deref()),
        "agency_name" => filled(profile.agency_name.as_deref()),
        "license_number" => filled(profile.license_number.as_deref()),
        "years_experience" => profile.years_experience.is_some(),
        "specializations" => !profile.specializations.is_empty(),
        _ => false,
    }
}

/// `round(completed / required * 100)` over the role's fixed field list.
pub fn profile_completion(profile: &Profile) -> ProfileCompletion {
    let required = required_fields(profile.role);
    let (completed_fields, missing_fields): (Vec<&'static str>, Vec<&'static str>) = required
        .iter()
        .copied()
        .partition(|field| field_is_complete(profile, field));

    let percentage = (completed_fields.len() as f64 / required.len() as f64 * 100.0).round() as u8;

    ProfileCompletion {
        percentage,
        completed_fields,
        missing_fields,
        required_fields: required.len(),
    }
}
