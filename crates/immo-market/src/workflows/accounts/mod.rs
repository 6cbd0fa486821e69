//! User records: sign-up, the caller's own profile, and the subscription grant they hold.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    AccountView, NewUser, Role, SubscriptionGrant, UserAccount, UserId, UserProfile,
};
pub use repository::UserDirectory;
pub use router::account_router;
pub use service::{validate_profile, AccountError, AccountService};
