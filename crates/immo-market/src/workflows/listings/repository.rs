use chrono::{DateTime, Utc};

use super::domain::{Listing, ListingDraft, ListingId, ListingStatus};
use crate::store::RepositoryError;
use crate::workflows::accounts::domain::UserId;

/// Storage abstraction for the `listings` collection.
pub trait ListingRepository: Send + Sync {
    fn insert_listing(
        &self,
        owner: &UserId,
        draft: ListingDraft,
        at: DateTime<Utc>,
    ) -> Result<Listing, RepositoryError>;
    fn fetch_listing(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;
    fn listings_newest_first(&self) -> Result<Vec<Listing>, RepositoryError>;
    fn set_listing_status(
        &self,
        id: &ListingId,
        status: ListingStatus,
        at: DateTime<Utc>,
    ) -> Result<Listing, RepositoryError>;
}
