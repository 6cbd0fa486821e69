use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::domain::{AccountView, NewUser, Role, UserAccount, UserProfile};
use super::repository::UserDirectory;
use crate::auth::{self, AccessError, Principal};
use crate::store::RepositoryError;
use crate::workflows::notifications::domain::NotificationTemplate;
use crate::workflows::notifications::emitter::fan_out;
use crate::workflows::notifications::repository::NotificationStore;

/// Registration and self-service profile management.
pub struct AccountService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> AccountService<S>
where
    S: UserDirectory + NotificationStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create the user record, then tell every admin about it.
    ///
    /// The admin fan-out runs after the insert has succeeded; a fan-out failure is logged
    /// and does not undo the registration.
    pub fn register(&self, user: NewUser) -> Result<UserAccount, AccountError> {
        validate_profile(&user.profile)?;
        let now = Utc::now();

        let account = self.store.insert_user(user, now).map_err(|err| {
            warn!(error = %err, "registration refused");
            err
        })?;
        info!(user = %account.id, role = account.role.label(), "user registered");

        let template = NotificationTemplate::user_registered(&account);
        if let Err(err) = fan_out(&*self.store, Role::Admin, &template, Some(&account.id), now) {
            error!(user = %account.id, error = %err, "admin notification for registration failed");
        }

        Ok(account)
    }

    /// Replace the caller's own profile. Existing request snapshots keep their copy.
    pub fn update_profile(
        &self,
        principal: &Principal,
        profile: UserProfile,
    ) -> Result<AccountView, AccountError> {
        validate_profile(&profile)?;
        let account = auth::resolve(&*self.store, principal)?;
        let now = Utc::now();
        let updated = self.store.update_profile(&account.id, profile, now)?;
        info!(user = %updated.id, "profile updated");
        Ok(AccountView::at(&updated, now))
    }

    pub fn me(&self, principal: &Principal) -> Result<AccountView, AccountError> {
        let account = auth::resolve(&*self.store, principal)?;
        Ok(AccountView::at(&account, Utc::now()))
    }
}

/// Name and e-mail are required on every write; the other fields may be filled in later.
pub fn validate_profile(profile: &UserProfile) -> Result<(), AccountError> {
    if profile.name.trim().is_empty() {
        return Err(AccountError::Invalid("name is required"));
    }
    let email = profile.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AccountError::Invalid("a valid e-mail address is required")),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("invalid profile: {0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
