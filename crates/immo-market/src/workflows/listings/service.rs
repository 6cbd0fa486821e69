use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::domain::{Listing, ListingDraft, ListingFilter, ListingId, ListingStatus};
use super::repository::ListingRepository;
use crate::auth::{self, AccessError, Principal};
use crate::store::RepositoryError;
use crate::workflows::accounts::domain::Role;
use crate::workflows::accounts::repository::UserDirectory;
use crate::workflows::notifications::domain::NotificationTemplate;
use crate::workflows::notifications::emitter::fan_out;
use crate::workflows::notifications::repository::NotificationStore;

/// Publication and browsing of property listings.
pub struct ListingService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> ListingService<S>
where
    S: ListingRepository + UserDirectory + NotificationStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Publish a listing. Demarcheurs need a grant active right now; admins always may.
    pub fn create(
        &self,
        principal: &Principal,
        draft: ListingDraft,
    ) -> Result<Listing, ListingError> {
        let account = auth::resolve(&*self.store, principal)?;
        let now = Utc::now();
        match account.role {
            Role::Admin => {}
            Role::Demarcheur if account.has_active_subscription(now) => {}
            Role::Demarcheur => {
                warn!(user = %account.id, "listing refused: no active subscription");
                return Err(ListingError::SubscriptionRequired);
            }
            Role::Client => {
                return Err(AccessError::Forbidden {
                    role: Role::Demarcheur.label(),
                }
                .into())
            }
        }
        if let Some(reason) = draft.validation_error() {
            return Err(ListingError::Invalid(reason));
        }

        let listing = self.store.insert_listing(&account.id, draft, now)?;
        info!(listing = %listing.id, owner = %account.id, "listing published");

        let template = NotificationTemplate::listing_created(&listing);
        if let Err(err) = fan_out(&*self.store, Role::Admin, &template, Some(&account.id), now) {
            error!(listing = %listing.id, error = %err, "admin notification for listing failed");
        }
        Ok(listing)
    }

    pub fn search(&self, filter: &ListingFilter) -> Result<Vec<Listing>, ListingError> {
        let listings = self.store.listings_newest_first()?;
        Ok(listings
            .into_iter()
            .filter(|listing| filter.matches(listing))
            .collect())
    }

    pub fn get(&self, id: &ListingId) -> Result<Listing, ListingError> {
        self.store
            .fetch_listing(id)?
            .ok_or_else(|| ListingError::NotFound(id.clone()))
    }

    /// Withdraw a listing from search. Only its owner or an admin may do so.
    pub fn archive(&self, principal: &Principal, id: &ListingId) -> Result<Listing, ListingError> {
        let account = auth::resolve(&*self.store, principal)?;
        let listing = self.get(id)?;
        if listing.owner != account.id && account.role != Role::Admin {
            return Err(AccessError::Forbidden {
                role: Role::Admin.label(),
            }
            .into());
        }
        if listing.status == ListingStatus::Archived {
            return Ok(listing);
        }

        let archived = self
            .store
            .set_listing_status(id, ListingStatus::Archived, Utc::now())?;
        info!(listing = %id, by = %account.id, "listing archived");
        Ok(archived)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("an active subscription is required to publish")]
    SubscriptionRequired,
    #[error("invalid listing: {0}")]
    Invalid(&'static str),
    #[error("listing {0} not found")]
    NotFound(ListingId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
