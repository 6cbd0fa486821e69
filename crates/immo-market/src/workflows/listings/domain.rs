use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::accounts::domain::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    House,
    Apartment,
    Land,
    Office,
    Shop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Rent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Published,
    Archived,
}

/// Fields supplied by the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub kind: PropertyKind,
    pub transaction: TransactionKind,
    pub price: u64,
    pub city: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub bedrooms: Option<u8>,
    #[serde(default)]
    pub area_sqm: Option<u32>,
}

impl ListingDraft {
    /// First problem that blocks publication, if any.
    pub fn validation_error(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            return Some("title is required");
        }
        if self.city.trim().is_empty() {
            return Some("city is required");
        }
        if self.price == 0 {
            return Some("price must be greater than zero");
        }
        if matches!(self.kind, PropertyKind::Land) && self.bedrooms.is_some_and(|rooms| rooms > 0)
        {
            return Some("land listings cannot declare bedrooms");
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub kind: PropertyKind,
    pub transaction: TransactionKind,
    pub price: u64,
    pub city: String,
    pub zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_sqm: Option<u32>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public browser query. Every field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListingFilter {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub kind: Option<PropertyKind>,
    #[serde(default)]
    pub transaction: Option<TransactionKind>,
    #[serde(default)]
    pub max_price: Option<u64>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        if listing.status != ListingStatus::Published {
            return false;
        }
        if let Some(city) = self.city.as_deref().map(str::trim) {
            if !city.is_empty() && !listing.city.eq_ignore_ascii_case(city) {
                return false;
            }
        }
        self.kind.map_or(true, |kind| listing.kind == kind)
            && self
                .transaction
                .map_or(true, |transaction| listing.transaction == transaction)
            && self.max_price.map_or(true, |max| listing.price <= max)
    }
}
