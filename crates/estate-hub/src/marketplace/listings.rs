use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::domain::{
    AnalyticsEventKind, ListingType, ProfileId, Property, PropertyId, PropertyStatus,
    PropertyType,
};
use super::error::{MarketplaceError, AGENT_REQUIRED};
use super::moderation::check_property_transition;
use super::pagination::{Page, Pagination};
use super::repository::PropertyFilter;
use super::service::MarketplaceService;
use super::session::AuthContext;
use super::uploads::{discard, store_all, UploadFile, UploadKind};

const MAX_IMAGES: usize = 20;

/// Listing fields shared by the create endpoint and the CSV importer.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct ListingInput {
    #[validate(length(min = 5, max = 200, message = "Title must be 5-200 characters"))]
    pub title: String,
    #[validate(length(min = 20, max = 5000, message = "Description must be 20-5000 characters"))]
    pub description: String,
    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: u64,
    pub property_type: PropertyType,
    pub listing_type: ListingType,
    #[validate(range(max = 50))]
    pub bedrooms: u8,
    #[validate(range(max = 50))]
    pub bathrooms: u8,
    #[validate(range(min = 1))]
    pub square_feet: Option<u32>,
    #[validate(length(min = 3, max = 300))]
    pub address: String,
    #[validate(length(min = 2, max = 100))]
    pub city: String,
    #[validate(length(min = 2, max = 100))]
    pub state: String,
    #[validate(length(min = 3, max = 12))]
    pub zip_code: Option<String>,
    #[serde(default)]
    #[validate(length(max = 30))]
    pub features: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub images: Vec<String>,
}

impl ListingInput {
    pub fn into_property(
        self,
        agent_id: ProfileId,
        status: PropertyStatus,
        now: DateTime<Utc>,
    ) -> Property {
        Property {
            id: PropertyId::generate(),
            agent_id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            price: self.price,
            property_type: self.property_type,
            listing_type: self.listing_type,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            square_feet: self.square_feet,
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            zip_code: self.zip_code.map(|zip| zip.trim().to_string()),
            features: clean_list(self.features),
            images: clean_list(self.images),
            status,
            views: 0,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Partial update by the owner or an admin. `status` may only become `sold`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateListingRequest {
    #[validate(length(min = 5, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 20, max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub price: Option<u64>,
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    #[validate(range(max = 50))]
    pub bedrooms: Option<u8>,
    #[validate(range(max = 50))]
    pub bathrooms: Option<u8>,
    #[validate(range(min = 1))]
    pub square_feet: Option<u32>,
    #[validate(length(min = 3, max = 300))]
    pub address: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub state: Option<String>,
    #[validate(length(min = 3, max = 12))]
    pub zip_code: Option<String>,
    #[validate(length(max = 30))]
    pub features: Option<Vec<String>>,
    #[validate(length(max = 20))]
    pub images: Option<Vec<String>>,
    pub status: Option<PropertyStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertySearchQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub city: Option<String>,
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub bedrooms: Option<u8>,
    pub q: Option<String>,
}

impl PropertySearchQuery {
    fn filter(&self) -> PropertyFilter {
        PropertyFilter {
            statuses: vec![PropertyStatus::Active],
            city: self.city.clone().filter(|city| !city.trim().is_empty()),
            property_type: self.property_type,
            listing_type: self.listing_type,
            min_price: self.min_price,
            max_price: self.max_price,
            min_bedrooms: self.bedrooms,
            text: self.q.clone(),
            ..PropertyFilter::default()
        }
    }
}

impl MarketplaceService {
    pub fn search_properties(
        &self,
        query: PropertySearchQuery,
    ) -> Result<Page<Property>, MarketplaceError> {
        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Err(MarketplaceError::invalid(
                    "min_price must not exceed max_price",
                ));
            }
        }
        let pagination = Pagination::new(query.page, query.limit);
        let filter = query.filter();
        let total = self.properties.count(&filter)?;
        let rows = self.properties.list(&filter, &pagination)?;
        Ok(Page::new(rows, &pagination, total))
    }

    /// Public listings for everyone; owners and admins also see the rest.
    pub fn view_property(
        &self,
        ctx: Option<&AuthContext>,
        property_id: PropertyId,
    ) -> Result<Property, MarketplaceError> {
        let mut property = self
            .properties
            .fetch(&property_id)?
            .ok_or(MarketplaceError::NotFound("Property"))?;

        let manager = ctx.is_some_and(|ctx| ctx.can_manage(property.agent_id));
        if !property.status.is_public() && !manager {
            return Err(MarketplaceError::NotFound("Property"));
        }

        let is_owner = ctx.is_some_and(|ctx| ctx.profile_id() == property.agent_id);
        if !is_owner {
            property.views += 1;
            property = self.properties.update(property)?;
            self.track(
                property_id,
                AnalyticsEventKind::View,
                ctx.map(AuthContext::profile_id),
            );
        }
        Ok(property)
    }

    pub fn create_property(
        &self,
        ctx: &AuthContext,
        input: ListingInput,
    ) -> Result<Property, MarketplaceError> {
        let profile = ctx.require_agent()?;
        if !ctx.is_admin() && !profile.is_verified_agent() {
            return Err(MarketplaceError::forbidden(format!(
                "{AGENT_REQUIRED} Agent verification is {}.",
                profile.verification_status.label()
            )));
        }
        input.validate()?;
        if input.images.len() > MAX_IMAGES {
            return Err(MarketplaceError::invalid("Too many images"));
        }

        let property = input.into_property(profile.id, PropertyStatus::Pending, Utc::now());
        let stored = self.properties.insert(property)?;
        info!(property_id = %stored.id, agent = %stored.agent_id, "listing submitted for review");
        Ok(stored)
    }

    fn managed_property(
        &self,
        ctx: &AuthContext,
        property_id: PropertyId,
    ) -> Result<Property, MarketplaceError> {
        let property = self
            .properties
            .fetch(&property_id)?
            .ok_or(MarketplaceError::NotFound("Property"))?;
        if !ctx.can_manage(property.agent_id) {
            return Err(MarketplaceError::forbidden(
                "Insufficient permissions. Only the listing agent may change this property.",
            ));
        }
        Ok(property)
    }

    pub fn update_property(
        &self,
        ctx: &AuthContext,
        property_id: PropertyId,
        request: UpdateListingRequest,
    ) -> Result<Property, MarketplaceError> {
        request.validate()?;
        let mut property = self.managed_property(ctx, property_id)?;

        if let Some(status) = request.status {
            if status != PropertyStatus::Sold && status != property.status {
                return Err(MarketplaceError::invalid(
                    "Status can only be changed to sold here",
                ));
            }
            if status != property.status {
                check_property_transition(property.status, status)?;
                property.status = status;
            }
        }

        let UpdateListingRequest {
            title,
            description,
            price,
            property_type,
            listing_type,
            bedrooms,
            bathrooms,
            square_feet,
            address,
            city,
            state,
            zip_code,
            features,
            images,
            status: _,
        } = request;

        if let Some(title) = title {
            property.title = title.trim().to_string();
        }
        if let Some(description) = description {
            property.description = description.trim().to_string();
        }
        if let Some(price) = price {
            property.price = price;
        }
        if let Some(property_type) = property_type {
            property.property_type = property_type;
        }
        if let Some(listing_type) = listing_type {
            property.listing_type = listing_type;
        }
        if let Some(bedrooms) = bedrooms {
            property.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = bathrooms {
            property.bathrooms = bathrooms;
        }
        if square_feet.is_some() {
            property.square_feet = square_feet;
        }
        if let Some(address) = address {
            property.address = address.trim().to_string();
        }
        if let Some(city) = city {
            property.city = city.trim().to_string();
        }
        if let Some(state) = state {
            property.state = state.trim().to_string();
        }
        if let Some(zip_code) = zip_code {
            property.zip_code = Some(zip_code.trim().to_string());
        }
        if let Some(features) = features {
            property.features = clean_list(features);
        }
        if let Some(images) = images {
            property.images = clean_list(images);
        }
        property.updated_at = Utc::now();

        Ok(self.properties.update(property)?)
    }

    /// Soft delete: the row stays, its status becomes `archived`.
    pub fn archive_property(
        &self,
        ctx: &AuthContext,
        property_id: PropertyId,
    ) -> Result<Property, MarketplaceError> {
        let mut property = self.managed_property(ctx, property_id)?;
        check_property_transition(property.status, PropertyStatus::Archived)?;
        property.status = PropertyStatus::Archived;
        property.updated_at = Utc::now();

        let updated = self.properties.update(property)?;
        self.track(property_id, AnalyticsEventKind::Archived, Some(ctx.profile_id()));
        info!(%property_id, by = %ctx.profile_id(), "listing archived");
        Ok(updated)
    }

    pub async fn upload_property_images(
        &self,
        ctx: &AuthContext,
        property_id: PropertyId,
        files: Vec<UploadFile>,
    ) -> Result<Property, MarketplaceError> {
        let mut property = self.managed_property(ctx, property_id)?;
        if property.images.len() + files.len() > MAX_IMAGES {
            return Err(MarketplaceError::invalid(format!(
                "A listing can hold at most {MAX_IMAGES} images"
            )));
        }

        let prepared = self.uploads.prepare(
            UploadKind::PropertyImage,
            &property.agent_id.to_string(),
            files,
        )?;
        let stored = store_all(self.storage.as_ref(), prepared).await?;

        property
            .images
            .extend(stored.iter().map(|object| object.public_url.clone()));
        property.updated_at = Utc::now();
        match self.properties.update(property) {
            Ok(property) => Ok(property),
            Err(err) => {
                discard(self.storage.as_ref(), &stored).await;
                Err(err.into())
            }
        }
    }
}
