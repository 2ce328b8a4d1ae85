// ABOUTME: In-app notifications for change-management events
// ABOUTME: Provides the notification record, its storage, and the fire-and-forget sink seam

pub mod sink;
pub mod storage;
pub mod types;

pub use sink::{notify_best_effort, NotificationSink};
pub use storage::NotificationStorage;
pub use types::{Notification, NotificationCreateInput, NotificationKind};
