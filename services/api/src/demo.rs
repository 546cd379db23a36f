use crate::infra::{in_process_marketplace, seed_accounts, DevAccounts};
use clap::Args;
use estate_hub::error::AppError;
use estate_hub::marketplace::{
    AuthContext, CreateInquiryRequest, CreateProfileRequest, InMemoryStore, ListingImporter,
    ListingInput, ListingType, MarketplaceError, ModerationAction, ModerationRequest, Profile,
    ProfileId, ProfileRepository, PropertyType, RespondInquiryRequest, Role, SessionUser,
    VerificationAction, VerifyAgentRequest,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional listing CSV submitted by the demo agent instead of the built-in sample.
    #[arg(long)]
    pub(crate) listings_csv: Option<PathBuf>,
    /// Print the seller dashboard and platform analytics as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ListingImportArgs {
    /// Listing CSV export to validate
    pub(crate) path: PathBuf,
}

pub(crate) fn run_listing_import(args: ListingImportArgs) -> Result<(), AppError> {
    let listings = ListingImporter::from_path(&args.path)?;
    println!(
        "{} listings validated from {}",
        listings.len(),
        args.path.display()
    );
    if listings.is_empty() {
        return Ok(());
    }

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    let mut for_sale = 0;
    let mut for_rent = 0;
    for listing in &listings {
        *by_type.entry(listing.property_type.label()).or_default() += 1;
        match listing.listing_type {
            ListingType::Sale => for_sale += 1,
            ListingType::Rent => for_rent += 1,
        }
    }

    println!("- {for_sale} for sale | {for_rent} for rent");
    for (property_type, count) in &by_type {
        println!("- {property_type}: {count}");
    }
    let cities: BTreeMap<&str, usize> =
        listings.iter().fold(BTreeMap::new(), |mut cities, listing| {
            *cities.entry(listing.city.as_str()).or_default() += 1;
            cities
        });
    println!(
        "- cities: {}",
        cities
            .iter()
            .map(|(city, count)| format!("{city} ({count})"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

fn sample_listing() -> ListingInput {
    ListingInput {
        title: "Sunny bungalow near the river".to_string(),
        description: "Three bedroom bungalow with a fenced yard and a new roof.".to_string(),
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
        features: vec!["garage".to_string(), "fenced yard".to_string()],
        images: Vec::new(),
    }
}

fn context(profile: &Profile) -> AuthContext {
    AuthContext {
        user: SessionUser {
            id: profile.id.0,
            email: profile.email.clone(),
        },
        profile: Some(profile.clone()),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { listings_csv, json } = args;
    let (marketplace, sessions) = in_process_marketplace();
    let service = marketplace.service.clone();
    let DevAccounts {
        admin, customer, ..
    } = seed_accounts(&marketplace.store, &sessions)?;
    let admin_ctx = context(&admin);
    let customer_ctx = context(&customer);

    println!("Estate Hub marketplace demo");

    let signup = AuthContext {
        user: SessionUser {
            id: Uuid::new_v4(),
            email: "jordan@riverfront.test".to_string(),
        },
        profile: None,
    };
    let agent = service.create_profile(
        &signup,
        CreateProfileRequest {
            full_name: "Jordan Lister".to_string(),
            role: Role::Agent,
            phone: Some("515-555-0142".to_string()),
        },
    )?;
    println!(
        "- New agent {} signed up -> verification {}",
        agent.full_name,
        agent.verification_status.label()
    );

    let pending_ctx = context(&agent);
    match service.create_property(&pending_ctx, sample_listing()) {
        Ok(_) => println!("  Unexpected: unverified agent listed a property"),
        Err(err) => println!("  Listing refused before verification: {err}"),
    }

    let decision = service.verify_agent(
        &admin_ctx,
        VerifyAgentRequest {
            agent_id: agent.id.0,
            action: VerificationAction::Approve,
            reason: None,
        },
    )?;
    println!(
        "- Admin verified {} (is_verified={})",
        decision.full_name, decision.is_verified
    );

    let agent_ctx = context(&stored_profile(&marketplace.store, agent.id)?);
    let inputs = match listings_csv {
        Some(path) => ListingImporter::from_path(path)?,
        None => vec![sample_listing()],
    };

    let mut listing_ids = Vec::new();
    for input in inputs {
        let property = service.create_property(&agent_ctx, input)?;
        println!(
            "- Listing submitted: {} [{}]",
            property.title,
            property.status.label()
        );
        listing_ids.push(property.id);
    }

    for (index, property_id) in listing_ids.iter().enumerate() {
        let request = if index % 4 == 3 {
            ModerationRequest {
                action: ModerationAction::Reject,
                reason: Some("Photos required before publishing".to_string()),
            }
        } else {
            ModerationRequest {
                action: ModerationAction::Approve,
                reason: None,
            }
        };
        let moderated = service.moderate_property(&admin_ctx, *property_id, request)?;
        println!(
            "  Moderated {} -> {}",
            moderated.title,
            moderated.status.label()
        );
    }

    let Some(first) = listing_ids.first().copied() else {
        println!("No listings submitted; nothing left to demonstrate");
        return Ok(());
    };
    let viewed = service.view_property(None, first)?;
    let viewed = service.view_property(Some(&customer_ctx), viewed.id)?;
    println!("- {} viewed {} times", viewed.title, viewed.views);

    let inquiry = service.create_inquiry(
        Some(&customer_ctx),
        first,
        CreateInquiryRequest {
            name: customer.full_name.clone(),
            email: customer.email.clone(),
            phone: None,
            message: "Could we tour the house on Saturday morning?".to_string(),
        },
    )?;
    println!("- Inquiry {} received from {}", inquiry.id, inquiry.name);
    let answered = service.respond_to_inquiry(
        &agent_ctx,
        inquiry.id,
        RespondInquiryRequest {
            status: None,
            response: Some("Saturday at 10 works. See you there.".to_string()),
        },
    )?;
    println!("  Agent responded -> {}", answered.status.label());

    let dashboard = service.seller_dashboard(&agent_ctx)?;
    let analytics = service.analytics_overview(&admin_ctx)?;
    if json {
        let payload = serde_json::json!({ "dashboard": dashboard, "analytics": analytics });
        match serde_json::to_string_pretty(&payload) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Dashboard payload unavailable: {err}"),
        }
        return Ok(());
    }

    println!("\nSeller dashboard for {}", agent.full_name);
    println!(
        "- {} listings | {} views | {} inquiries ({} open)",
        dashboard.total_listings,
        dashboard.total_views,
        dashboard.total_inquiries,
        dashboard.open_inquiries
    );
    for (status, count) in &dashboard.listings_by_status {
        println!("  - {status}: {count}");
    }

    println!("\nPlatform analytics");
    for (role, count) in &analytics.profiles_by_role {
        println!("- {role} profiles: {count}");
    }
    for (kind, count) in &analytics.events_by_kind {
        println!("- {kind} events: {count}");
    }

    Ok(())
}

fn stored_profile(store: &InMemoryStore, id: ProfileId) -> Result<Profile, AppError> {
    ProfileRepository::fetch(store, &id)
        .map_err(MarketplaceError::from)?
        .ok_or(AppError::Marketplace(MarketplaceError::NotFound("Profile")))
}
