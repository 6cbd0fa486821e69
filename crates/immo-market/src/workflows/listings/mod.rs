//! Property listings published by subscribed demarcheurs and browsed by everyone.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    Listing, ListingDraft, ListingFilter, ListingId, ListingStatus, PropertyKind, TransactionKind,
};
pub use repository::ListingRepository;
pub use router::listing_router;
pub use service::{ListingError, ListingService};
