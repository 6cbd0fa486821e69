pub mod accounts;
pub mod listings;
pub mod notifications;
pub mod subscriptions;

use std::sync::Arc;

use axum::Router;

use accounts::{account_router, AccountService, UserDirectory};
use listings::{listing_router, ListingRepository, ListingService};
use notifications::{notification_router, NotificationService, NotificationStore};
use subscriptions::{subscription_router, SubscriptionService, SubscriptionStore};

/// Every workflow router mounted over one shared store.
pub fn marketplace_router<S>(store: Arc<S>) -> Router
where
    S: UserDirectory + SubscriptionStore + NotificationStore + ListingRepository + 'static,
{
    account_router(Arc::new(AccountService::new(store.clone())))
        .merge(subscription_router(Arc::new(SubscriptionService::new(
            store.clone(),
        ))))
        .merge(notification_router(Arc::new(NotificationService::new(
            store.clone(),
        ))))
        .merge(listing_router(Arc::new(ListingService::new(store))))
}
