//! In-process table store used for local development, the CLI demo, and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    AnalyticsEvent, AnalyticsEventKind, Inquiry, InquiryId, Profile, ProfileId, Property,
    PropertyId, SystemConfigEntry,
};
use super::pagination::{slice_window, Pagination};
use super::repository::{
    AnalyticsRepository, InquiryFilter, InquiryRepository, ProfileFilter, ProfileRepository,
    PropertyFilter, PropertyRepository, RepositoryError, SystemConfigRepository,
};

#[derive(Default, Clone)]
pub struct InMemoryStore {
    profiles: Arc<Mutex<HashMap<ProfileId, Profile>>>,
    properties: Arc<Mutex<HashMap<PropertyId, Property>>>,
    inquiries: Arc<Mutex<HashMap<InquiryId, Inquiry>>>,
    settings: Arc<Mutex<BTreeMap<(String, String), SystemConfigEntry>>>,
    events: Arc<Mutex<Vec<AnalyticsEvent>>>,
}

fn lock<'a, T>(table: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    table
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} table lock poisoned")))
}

impl InMemoryStore {
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Email and license number are unique across profiles, ignoring case.
fn check_unique(
    table: &HashMap<ProfileId, Profile>,
    profile: &Profile,
) -> Result<(), RepositoryError> {
    let clash = table
        .values()
        .filter(|other| other.id != profile.id)
        .any(|other| {
            other.email.eq_ignore_ascii_case(&profile.email)
                || matches!(
                    (&other.license_number, &profile.license_number),
                    (Some(theirs), Some(ours)) if theirs.eq_ignore_ascii_case(ours)
                )
        });
    if clash {
        Err(RepositoryError::Conflict)
    } else {
        Ok(())
    }
}

impl ProfileRepository for InMemoryStore {
    fn insert(&self, profile: Profile) -> Result<Profile, RepositoryError> {
        let mut guard = lock(&self.profiles, "profiles")?;
        if guard.contains_key(&profile.id) {
            return Err(RepositoryError::Conflict);
        }
        check_unique(&guard, &profile)?;
        guard.insert(profile.id, profile.clone());
        Ok(profile)
    }

    fn update(&self, profile: Profile) -> Result<Profile, RepositoryError> {
        let mut guard = lock(&self.profiles, "profiles")?;
        check_unique(&guard, &profile)?;
        match guard.get_mut(&profile.id) {
            Some(slot) => {
                *slot = profile.clone();
                Ok(profile)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ProfileId) -> Result<Option<Profile>, RepositoryError> {
        let guard = lock(&self.profiles, "profiles")?;
        Ok(guard.get(id).cloned())
    }

    fn list(
        &self,
        filter: &ProfileFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Profile>, RepositoryError> {
        let guard = lock(&self.profiles, "profiles")?;
        let mut rows: Vec<Profile> = guard
            .values()
            .filter(|profile| filter.matches(profile))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(slice_window(rows, pagination))
    }

    fn count(&self, filter: &ProfileFilter) -> Result<usize, RepositoryError> {
        let guard = lock(&self.profiles, "profiles")?;
        Ok(guard.values().filter(|profile| filter.matches(profile)).count())
    }
}

impl PropertyRepository for InMemoryStore {
    fn insert(&self, property: Property) -> Result<Property, RepositoryError> {
        let mut guard = lock(&self.properties, "properties")?;
        if guard.contains_key(&property.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(property.id, property.clone());
        Ok(property)
    }

    fn update(&self, property: Property) -> Result<Property, RepositoryError> {
        let mut guard = lock(&self.properties, "properties")?;
        match guard.get_mut(&property.id) {
            Some(slot) => {
                *slot = property.clone();
                Ok(property)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        let guard = lock(&self.properties, "properties")?;
        Ok(guard.get(id).cloned())
    }

    fn list(
        &self,
        filter: &PropertyFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Property>, RepositoryError> {
        let guard = lock(&self.properties, "properties")?;
        let mut rows: Vec<Property> = guard
            .values()
            .filter(|property| filter.matches(property))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(slice_window(rows, pagination))
    }

    fn count(&self, filter: &PropertyFilter) -> Result<usize, RepositoryError> {
        let guard = lock(&self.properties, "properties")?;
        Ok(guard
            .values()
            .filter(|property| filter.matches(property))
            .count())
    }

    fn ids(&self, filter: &PropertyFilter) -> Result<Vec<PropertyId>, RepositoryError> {
        let guard = lock(&self.properties, "properties")?;
        Ok(guard
            .values()
            .filter(|property| filter.matches(property))
            .map(|property| property.id)
            .collect())
    }
}

impl InquiryRepository for InMemoryStore {
    fn insert(&self, inquiry: Inquiry) -> Result<Inquiry, RepositoryError> {
        let mut guard = lock(&self.inquiries, "inquiries")?;
        if guard.contains_key(&inquiry.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(inquiry.id, inquiry.clone());
        Ok(inquiry)
    }

    fn update(&self, inquiry: Inquiry) -> Result<Inquiry, RepositoryError> {
        let mut guard = lock(&self.inquiries, "inquiries")?;
        match guard.get_mut(&inquiry.id) {
            Some(slot) => {
                *slot = inquiry.clone();
                Ok(inquiry)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &InquiryId) -> Result<Option<Inquiry>, RepositoryError> {
        let guard = lock(&self.inquiries, "inquiries")?;
        Ok(guard.get(id).cloned())
    }

    fn list(
        &self,
        filter: &InquiryFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Inquiry>, RepositoryError> {
        let guard = lock(&self.inquiries, "inquiries")?;
        let mut rows: Vec<Inquiry> = guard
            .values()
            .filter(|inquiry| filter.matches(inquiry))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(slice_window(rows, pagination))
    }

    fn count(&self, filter: &InquiryFilter) -> Result<usize, RepositoryError> {
        let guard = lock(&self.inquiries, "inquiries")?;
        Ok(guard.values().filter(|inquiry| filter.matches(inquiry)).count())
    }
}

impl SystemConfigRepository for InMemoryStore {
    fn upsert(&self, entry: SystemConfigEntry) -> Result<SystemConfigEntry, RepositoryError> {
        let mut guard = lock(&self.settings, "system_config")?;
        guard.insert((entry.category.clone(), entry.key.clone()), entry.clone());
        Ok(entry)
    }

    fn fetch(
        &self,
        category: &str,
        key: &str,
    ) -> Result<Option<SystemConfigEntry>, RepositoryError> {
        let guard = lock(&self.settings, "system_config")?;
        Ok(guard
            .get(&(category.to_string(), key.to_string()))
            .cloned())
    }

    fn list(&self, category: Option<&str>) -> Result<Vec<SystemConfigEntry>, RepositoryError> {
        let guard = lock(&self.settings, "system_config")?;
        Ok(guard
            .values()
            .filter(|entry| category.map_or(true, |wanted| entry.category == wanted))
            .cloned()
            .collect())
    }
}

impl AnalyticsRepository for InMemoryStore {
    fn record(&self, event: AnalyticsEvent) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.events, "property_analytics")?;
        guard.push(event);
        Ok(())
    }

    fn count(
        &self,
        property_id: Option<&PropertyId>,
        kind: Option<AnalyticsEventKind>,
    ) -> Result<usize, RepositoryError> {
        let guard = lock(&self.events, "property_analytics")?;
        Ok(guard
            .iter()
            .filter(|event| property_id.map_or(true, |id| event.property_id == *id))
            .filter(|event| kind.map_or(true, |kind| event.kind == kind))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::domain::{PropertyStatus, Role};
    use crate::marketplace::tests::common::{agent_profile, customer_profile, listing};

    #[test]
    fn profile_insert_rejects_duplicate_ids() {
        let store = InMemoryStore::default();
        let profile = customer_profile("buyer@example.com");
        ProfileRepository::insert(&store, profile.clone()).expect("first insert");
        let err = ProfileRepository::insert(&store, profile).expect_err("duplicate");
        assert!(matches!(err, RepositoryError::Conflict));
    }

    #[test]
    fn profiles_keep_email_and_license_unique() {
        let store = InMemoryStore::default();
        let first = agent_profile("agent@example.com");
        ProfileRepository::insert(&store, first.clone()).expect("first insert");

        let same_email = customer_profile("Agent@Example.com");
        let err = ProfileRepository::insert(&store, same_email).expect_err("email taken");
        assert!(matches!(err, RepositoryError::Conflict));

        let mut second = agent_profile("second@example.com");
        ProfileRepository::insert(&store, second.clone()).expect("distinct agent");
        second.license_number = first.license_number.clone();
        let err = ProfileRepository::update(&store, second).expect_err("license taken");
        assert!(matches!(err, RepositoryError::Conflict));

        // Saving a row over itself is not a clash.
        ProfileRepository::update(&store, first).expect("self update");
    }

    #[test]
    fn update_requires_existing_row() {
        let store = InMemoryStore::default();
        let agent = agent_profile("agent@example.com");
        let property = listing(&agent, PropertyStatus::Pending);
        let err = PropertyRepository::update(&store, property).expect_err("missing row");
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[test]
    fn list_and_count_share_the_filter() {
        let store = InMemoryStore::default();
        let agent = agent_profile("agent@example.com");
        for _ in 0..12 {
            PropertyRepository::insert(&store, listing(&agent, PropertyStatus::Active))
                .expect("insert");
        }
        PropertyRepository::insert(&store, listing(&agent, PropertyStatus::Pending))
            .expect("insert");

        let filter = PropertyFilter {
            statuses: vec![PropertyStatus::Active],
            ..PropertyFilter::default()
        };
        let second_page = PropertyRepository::list(&store, &filter, &Pagination::new(Some(2), Some(5)))
            .expect("list");
        assert_eq!(second_page.len(), 5);
        assert_eq!(PropertyRepository::count(&store, &filter).expect("count"), 12);
        assert_eq!(
            PropertyRepository::ids(&store, &PropertyFilter::default())
                .expect("ids")
                .len(),
            13
        );
    }

    #[test]
    fn settings_upsert_replaces_by_category_and_key() {
        let store = InMemoryStore::default();
        let entry = SystemConfigEntry {
            category: "listings".to_string(),
            key: "max_images".to_string(),
            value: serde_json::json!(10),
            description: None,
            updated_by: None,
            updated_at: chrono::Utc::now(),
        };
        store.upsert(entry.clone()).expect("insert");
        store
            .upsert(SystemConfigEntry {
                value: serde_json::json!(20),
                ..entry
            })
            .expect("replace");

        let all = SystemConfigRepository::list(&store, None).expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, serde_json::json!(20));
        assert!(SystemConfigRepository::list(&store, Some("billing"))
            .expect("list")
            .is_empty());
    }

    #[test]
    fn profile_count_by_role() {
        let store = InMemoryStore::default();
        ProfileRepository::insert(&store, customer_profile("a@example.com")).expect("insert");
        ProfileRepository::insert(&store, agent_profile("b@example.com")).expect("insert");
        let filter = ProfileFilter {
            role: Some(Role::Agent),
            ..ProfileFilter::default()
        };
        assert_eq!(ProfileRepository::count(&store, &filter).expect("count"), 1);
    }
}
