use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::auth::Principal;
use crate::store::{MemoryStore, RepositoryError};
use crate::workflows::accounts::domain::{NewUser, Role, UserAccount, UserId, UserProfile};
use crate::workflows::accounts::repository::UserDirectory;
use crate::workflows::subscriptions::domain::{
    NewSubscriptionRequest, SubscriptionRequest, SubscriptionRequestId,
};
use crate::workflows::subscriptions::repository::{
    ReviewCommit, ReviewOutcome, SubscriptionStore,
};
use crate::workflows::subscriptions::{subscription_router, SubscriptionService};

pub(super) fn profile(name: &str, email: &str, zone: &str) -> UserProfile {
    UserProfile {
        name: name.to_string(),
        email: email.to_string(),
        phone: "+221770001122".to_string(),
        zone: zone.to_string(),
        country: "SN".to_string(),
    }
}

pub(super) fn register<S: UserDirectory + ?Sized>(
    store: &S,
    role: Role,
    profile: UserProfile,
) -> UserAccount {
    store
        .insert_user(NewUser { role, profile }, Utc::now())
        .expect("user registers")
}

pub(super) fn principal(account: &UserAccount) -> Principal {
    Principal {
        user_id: account.id.clone(),
    }
}

pub(super) struct Fixture {
    pub(super) service: SubscriptionService<MemoryStore>,
    pub(super) store: Arc<MemoryStore>,
    pub(super) admin: UserAccount,
    pub(super) agent: UserAccount,
}

pub(super) fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::default());
    let admin = register(
        &*store,
        Role::Admin,
        profile("Fatou Ndiaye", "fatou@immo.test", "Plateau"),
    );
    let agent = register(
        &*store,
        Role::Demarcheur,
        profile("Ibrahima Sow", "ibrahima@immo.test", "Parcelles Assainies"),
    );
    let service = SubscriptionService::new(store.clone());
    Fixture {
        service,
        store,
        admin,
        agent,
    }
}

pub(super) fn application_router_with(fixture: &Fixture) -> axum::Router {
    subscription_router(Arc::new(SubscriptionService::new(fixture.store.clone())))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Delegates to a memory store while counting request inserts.
#[derive(Default)]
pub(super) struct RecordingStore {
    pub(super) inner: MemoryStore,
    pub(super) inserts: AtomicUsize,
}

impl RecordingStore {
    pub(super) fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

impl UserDirectory for RecordingStore {
    fn insert_user(
        &self,
        user: NewUser,
        at: DateTime<Utc>,
    ) -> Result<UserAccount, RepositoryError> {
        self.inner.insert_user(user, at)
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        self.inner.fetch_user(id)
    }

    fn update_profile(
        &self,
        id: &UserId,
        profile: UserProfile,
        at: DateTime<Utc>,
    ) -> Result<UserAccount, RepositoryError> {
        self.inner.update_profile(id, profile, at)
    }

    fn users_with_role(&self, role: Role) -> Result<Vec<UserAccount>, RepositoryError> {
        self.inner.users_with_role(role)
    }
}

impl SubscriptionStore for RecordingStore {
    fn insert_request(
        &self,
        request: NewSubscriptionRequest,
        at: DateTime<Utc>,
    ) -> Result<SubscriptionRequest, RepositoryError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_request(request, at)
    }

    fn fetch_request(
        &self,
        id: &SubscriptionRequestId,
    ) -> Result<Option<SubscriptionRequest>, RepositoryError> {
        self.inner.fetch_request(id)
    }

    fn requests_newest_first(&self) -> Result<Vec<SubscriptionRequest>, RepositoryError> {
        self.inner.requests_newest_first()
    }

    fn commit_review(&self, commit: ReviewCommit) -> Result<ReviewOutcome, RepositoryError> {
        self.inner.commit_review(commit)
    }
}

/// Accepts user reads but fails every request write with a fixed error.
pub(super) struct FailingStore {
    pub(super) users: MemoryStore,
    pub(super) error: RepositoryError,
}

impl FailingStore {
    pub(super) fn new(error: RepositoryError) -> Self {
        Self {
            users: MemoryStore::default(),
            error,
        }
    }
}

impl UserDirectory for FailingStore {
    fn insert_user(
        &self,
        user: NewUser,
        at: DateTime<Utc>,
    ) -> Result<UserAccount, RepositoryError> {
        self.users.insert_user(user, at)
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        self.users.fetch_user(id)
    }

    fn update_profile(
        &self,
        id: &UserId,
        profile: UserProfile,
        at: DateTime<Utc>,
    ) -> Result<UserAccount, RepositoryError> {
        self.users.update_profile(id, profile, at)
    }

    fn users_with_role(&self, role: Role) -> Result<Vec<UserAccount>, RepositoryError> {
        self.users.users_with_role(role)
    }
}

impl SubscriptionStore for FailingStore {
    fn insert_request(
        &self,
        _request: NewSubscriptionRequest,
        _at: DateTime<Utc>,
    ) -> Result<SubscriptionRequest, RepositoryError> {
        Err(self.error.clone())
    }

    fn fetch_request(
        &self,
        _id: &SubscriptionRequestId,
    ) -> Result<Option<SubscriptionRequest>, RepositoryError> {
        Err(self.error.clone())
    }

    fn requests_newest_first(&self) -> Result<Vec<SubscriptionRequest>, RepositoryError> {
        Err(self.error.clone())
    }

    fn commit_review(&self, _commit: ReviewCommit) -> Result<ReviewOutcome, RepositoryError> {
        Err(self.error.clone())
    }
}
