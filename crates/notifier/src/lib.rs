pub mod push;
pub mod telegram;

pub use push::{DisabledPush, PushDelivery, PushError, WebPushSender};
pub use telegram::{NotifyReason, OwnerNotifier};
