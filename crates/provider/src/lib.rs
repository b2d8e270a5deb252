pub mod batch;
pub mod error;
pub mod provider;
pub mod request;

pub use batch::content_uniform;
pub use error::EspError;
pub use provider::{DynEspProvider, EspProvider};
pub use request::WebhookRequest;
