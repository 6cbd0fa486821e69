use chrono::Utc;
use immo_market::error::AppError;
use immo_market::store::MemoryStore;
use immo_market::workflows::accounts::{
    validate_profile, NewUser, Role, UserAccount, UserDirectory, UserProfile,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Admin accounts cannot be created through public sign-up; the operator provisions the
/// first one at start-up. An address that is already registered is reused.
pub(crate) fn provision_admin(
    store: &MemoryStore,
    name: &str,
    email: &str,
) -> Result<UserAccount, AppError> {
    let profile = UserProfile {
        name: name.trim().to_string(),
        email: email.trim().to_string(),
        ..UserProfile::default()
    };
    validate_profile(&profile)?;

    let existing = store
        .users_with_role(Role::Admin)?
        .into_iter()
        .find(|account| account.profile.email.eq_ignore_ascii_case(&profile.email));
    if let Some(account) = existing {
        return Ok(account);
    }

    let account = store.insert_user(
        NewUser {
            role: Role::Admin,
            profile,
        },
        Utc::now(),
    )?;
    info!(user = %account.id, "admin provisioned");
    Ok(account)
}
