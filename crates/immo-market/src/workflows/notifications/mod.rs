//! Notification records, role fan-out, the recipient inbox, and the live unread feed.

pub mod domain;
pub mod emitter;
pub mod listener;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    ChangeKind, NewNotification, Notification, NotificationChange, NotificationId,
    NotificationKind, NotificationTemplate,
};
pub use emitter::fan_out;
pub use listener::{FeedEvent, NotificationListener, UnreadFeed};
pub use repository::NotificationStore;
pub use router::notification_router;
pub use service::{MarkAllReport, NotificationError, NotificationService};
