//! Realtime bridging between one client session and one upstream provider.
//!
//! # Architecture
//!
//! - [`OpenAiLink`] owns the duplex provider connection and its receive loop
//! - `openai::translate` maps wire events to [`ProviderEvent`]s, statelessly
//! - [`SessionBridge`] owns one link and fans events into a [`BridgeEvents`]
//!   sink in receive order
//!
//! The session orchestrator in `handlers::voice` sits on top and owns the
//! client-facing side.

mod base;
mod bridge;
pub mod openai;

pub use base::{
    BridgeEvents, ConnectionState, LinkConfig, LinkError, LinkResult, ProviderEvent,
    ProviderEventCallback,
};
pub use bridge::{BridgeError, BridgeResult, SessionBridge};
pub use openai::{
    OPENAI_REALTIME_CHANNELS, OPENAI_REALTIME_SAMPLE_RATE, OPENAI_REALTIME_URL, OpenAiLink,
    RealtimeModel, RealtimeVoice,
};
