pub mod address;
pub mod event;
pub mod message;
pub mod result;

pub use address::{format_mailbox, is_valid_address};
pub use event::{DeliveryEvent, SuppressionReason, UnsubscribeEvent, WebhookResult};
pub use message::OutboundMessage;
pub use result::{FailureDetail, SendResult};
