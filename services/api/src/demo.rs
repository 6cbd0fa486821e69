use crate::infra::provision_admin;
use clap::Args;
use immo_market::auth::Principal;
use immo_market::error::AppError;
use immo_market::store::MemoryStore;
use immo_market::workflows::accounts::{AccountService, NewUser, Role, UserProfile};
use immo_market::workflows::listings::{
    ListingDraft, ListingFilter, ListingService, PropertyKind, TransactionKind,
};
use immo_market::workflows::notifications::{FeedEvent, NotificationListener, NotificationService};
use immo_market::workflows::subscriptions::{
    RequestFilter, SubscriptionPlan, SubscriptionService, CURRENCY,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Plan the demo agent applies for (trial, basic, premium)
    #[arg(long, default_value = "basic")]
    pub(crate) plan: SubscriptionPlan,
    /// Reject the request instead of approving it
    #[arg(long)]
    pub(crate) reject: bool,
    /// Print the admin CSV export at the end
    #[arg(long)]
    pub(crate) export: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        plan,
        reject,
        export,
    } = args;

    println!("Marketplace back office demo");
    let store = Arc::new(MemoryStore::default());
    let admin = provision_admin(&store, "Astou Sy", "astou@immo.test")?;
    let admin_principal = Principal {
        user_id: admin.id.clone(),
    };
    println!("- Provisioned admin {} ({})", admin.profile.name, admin.id);

    let accounts = AccountService::new(store.clone());
    let agent = match accounts.register(NewUser {
        role: Role::Demarcheur,
        profile: UserProfile {
            name: "Lamine Diouf".to_string(),
            email: "lamine@immo.test".to_string(),
            phone: "+221770001234".to_string(),
            zone: "Sicap Baobab".to_string(),
            country: "SN".to_string(),
        },
    }) {
        Ok(account) => account,
        Err(err) => {
            println!("  Registration failed: {}", err);
            return Ok(());
        }
    };
    let agent_principal = Principal {
        user_id: agent.id.clone(),
    };
    println!("- Registered demarcheur {} ({})", agent.profile.name, agent.id);

    let notifications = NotificationService::new(store.clone());
    match notifications.unread(&admin_principal) {
        Ok(unread) => println!("  Admin unread notifications: {}", unread.len()),
        Err(err) => println!("  Admin inbox unavailable: {}", err),
    }
    let mut feed = match notifications.listen(&agent_principal) {
        Ok(feed) => feed,
        Err(err) => {
            println!("  Live feed unavailable: {}", err);
            return Ok(());
        }
    };

    println!("\nSubscription request");
    let subscriptions = SubscriptionService::new(store.clone());
    let draft = match subscriptions.prepare(&agent_principal, plan) {
        Ok(draft) => draft,
        Err(err) => {
            println!("  Plan selection refused: {}", err);
            return Ok(());
        }
    };
    println!(
        "- Selected {} plan: {} {} (applicant snapshot: {}, {})",
        draft.plan(),
        draft.amount(),
        CURRENCY,
        draft.applicant().name,
        draft.applicant().zone
    );
    let request = match subscriptions.confirm(draft) {
        Ok(request) => request,
        Err(err) => {
            println!("  Submission failed: {}", err);
            return Ok(());
        }
    };
    println!(
        "- Submitted {} -> status {} / payment {}",
        request.id,
        request.status.label(),
        request.payment_status.label()
    );

    match subscriptions.review_queue(&admin_principal, &RequestFilter::search("sicap")) {
        Ok(entries) => {
            println!("- Admin queue matching \"sicap\": {} request(s)", entries.len());
            for entry in &entries {
                println!(
                    "    {} {} {} approve={} reject={}",
                    entry.request.id,
                    entry.request.applicant.name,
                    entry.request.status.label(),
                    entry.can_approve,
                    entry.can_reject
                );
            }
        }
        Err(err) => println!("  Review queue unavailable: {}", err),
    }

    let decision = if reject {
        subscriptions.reject(&admin_principal, &request.id)
    } else {
        subscriptions.approve(&admin_principal, &request.id)
    };
    match decision {
        Ok(receipt) => println!(
            "- Review committed: {} / payment {}",
            receipt.request.status.label(),
            receipt.request.payment_status.label()
        ),
        Err(err) => {
            println!("  Review failed: {}", err);
            return Ok(());
        }
    }
    match subscriptions.approve(&admin_principal, &request.id) {
        Ok(_) => println!("  Unexpected: a second review was accepted"),
        Err(err) => println!("- Second review refused: {}", err),
    }

    println!("\nApplicant notifications");
    if reject {
        println!(
            "- Rejections are not notified; feed still shows {} unread",
            feed.snapshot().unread_count
        );
    } else {
        match next_event(&mut feed).await {
            Some(event) => render_feed_event(&event),
            None => println!("- No feed event received"),
        }
    }

    match accounts.me(&agent_principal) {
        Ok(view) => match &view.subscription {
            Some(grant) => println!(
                "- Subscription {} active={} until {}",
                grant.plan,
                view.subscription_active,
                grant.ends_at.format("%Y-%m-%d")
            ),
            None => println!("- No subscription granted"),
        },
        Err(err) => println!("  Account lookup failed: {}", err),
    }

    println!("\nListing publication");
    let listings = ListingService::new(store.clone());
    match listings.create(
        &agent_principal,
        ListingDraft {
            title: "Appartement F4 vue mer".to_string(),
            description: "Troisieme etage, parking".to_string(),
            kind: PropertyKind::Apartment,
            transaction: TransactionKind::Rent,
            price: 450_000,
            city: "Dakar".to_string(),
            zone: "Fann".to_string(),
            bedrooms: Some(3),
            area_sqm: Some(140),
        },
    ) {
        Ok(listing) => println!("- Published {} ({})", listing.title, listing.id),
        Err(err) => println!("- Publication refused: {}", err),
    }
    match listings.search(&ListingFilter {
        city: Some("dakar".to_string()),
        ..ListingFilter::default()
    }) {
        Ok(found) => println!("- Listings in Dakar: {}", found.len()),
        Err(err) => println!("  Search unavailable: {}", err),
    }

    match notifications.mark_all_read(&admin_principal) {
        Ok(report) => println!(
            "- Admin marked {} notification(s) read, {} failed",
            report.updated.len(),
            report.failed.len()
        ),
        Err(err) => println!("  Mark all as read failed: {}", err),
    }

    if export {
        match subscriptions.export_csv(&admin_principal, &RequestFilter::default()) {
            Ok(csv) => println!("\nRequest export\n{}", csv.trim_end()),
            Err(err) => println!("  Export failed: {}", err),
        }
    }

    Ok(())
}

async fn next_event(feed: &mut NotificationListener<MemoryStore>) -> Option<FeedEvent> {
    tokio::time::timeout(Duration::from_secs(1), feed.next())
        .await
        .ok()
        .flatten()
}

fn render_feed_event(event: &FeedEvent) {
    println!("- Unread badge: {}", event.unread_count);
    if let Some(toast) = &event.toast {
        println!("  Toast: {} - {}", toast.title, toast.message);
    }
}
