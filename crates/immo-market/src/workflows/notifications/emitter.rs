use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::domain::{Notification, NotificationTemplate};
use super::repository::NotificationStore;
use crate::store::RepositoryError;
use crate::workflows::accounts::domain::{Role, UserId};
use crate::workflows::accounts::repository::UserDirectory;

/// Address `template` to every user holding `role`, skipping `except`.
///
/// Each recipient gets an independent insert. A failed insert is logged and skipped so one
/// unreachable inbox does not starve the rest; the delivered notifications are returned.
pub fn fan_out<S>(
    store: &S,
    role: Role,
    template: &NotificationTemplate,
    except: Option<&UserId>,
    at: DateTime<Utc>,
) -> Result<Vec<Notification>, RepositoryError>
where
    S: UserDirectory + NotificationStore + ?Sized,
{
    let recipients = store.users_with_role(role)?;
    let mut delivered = Vec::with_capacity(recipients.len());

    for recipient in recipients {
        if Some(&recipient.id) == except {
            continue;
        }
        match store.insert_notification(template.addressed_to(recipient.id.clone()), at) {
            Ok(notification) => delivered.push(notification),
            Err(err) => {
                warn!(recipient = %recipient.id, kind = ?template.kind, error = %err, "notification fan-out failed")
            }
        }
    }

    debug!(role = role.label(), kind = ?template.kind, delivered = delivered.len(), "fan-out complete");
    Ok(delivered)
}
