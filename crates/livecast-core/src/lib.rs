pub mod caption;
pub mod config;
pub mod errors;
pub mod host;
pub mod messages;
pub mod status;
pub mod types;

pub use caption::CaptionEvent;
pub use config::ViewerConfig;
pub use errors::{SignalingError, ViewerError};
pub use host::{classify_host, HostClass};
pub use messages::{FailureReason, Language, Message};
pub use status::SystemStatus;
pub use types::*;
