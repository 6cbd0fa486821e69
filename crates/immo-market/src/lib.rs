//! Back-office workflows for the real-estate marketplace: accounts, listings,
//! subscription requests with admin review, and the notification feed that
//! ties them together.

pub mod auth;
pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod workflows;
