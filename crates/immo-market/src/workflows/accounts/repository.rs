use chrono::{DateTime, Utc};

use super::domain::{NewUser, Role, UserAccount, UserId, UserProfile};
use crate::store::RepositoryError;

/// Storage abstraction for the `users` collection.
///
/// Subscription fields are absent here; they change only inside a review commit.
pub trait UserDirectory: Send + Sync {
    /// Insert a user; a second account with the same e-mail is `AlreadyExists`.
    fn insert_user(&self, user: NewUser, at: DateTime<Utc>)
        -> Result<UserAccount, RepositoryError>;
    fn fetch_user(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError>;
    fn update_profile(
        &self,
        id: &UserId,
        profile: UserProfile,
        at: DateTime<Utc>,
    ) -> Result<UserAccount, RepositoryError>;
    fn users_with_role(&self, role: Role) -> Result<Vec<UserAccount>, RepositoryError>;
}
