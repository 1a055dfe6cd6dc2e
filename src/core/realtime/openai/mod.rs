//! OpenAI Realtime upstream link implementation.
//!
//! - `config` - endpoint, model and voice parameters
//! - `messages` - wire event types for both directions
//! - `translate` - pure mapping from wire events to [`ProviderEvent`]s
//! - `client` - the link itself: one duplex socket plus its receive loop

mod client;
mod config;
pub mod messages;
pub mod translate;

pub use client::OpenAiLink;
pub use config::{
    OPENAI_REALTIME_CHANNELS, OPENAI_REALTIME_SAMPLE_RATE, OPENAI_REALTIME_URL, RealtimeModel,
    RealtimeVoice,
};
