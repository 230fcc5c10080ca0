//! livecast-subtitles: caption feed and caption overlay.
//!
//! The feed runs independently of the media session: it stays connected
//! whether or not a stream is playing. [`CaptionDisplay`] decides what is
//! actually shown.

pub mod channel;
pub mod display;
pub mod policy;

pub use channel::{SubtitleChannel, SubtitleEvent};
pub use display::CaptionDisplay;
pub use policy::ReconnectPolicy;
