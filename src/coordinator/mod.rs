pub mod dispatch;
pub mod messages;
pub mod reminders;
pub mod subscription;
