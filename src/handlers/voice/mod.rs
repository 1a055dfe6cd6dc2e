//! Voice session WebSocket handler and message types.
//!
//! # Protocol
//!
//! ## Client -> Server
//!
//! - **start_session**: idempotent no-op after the initial accept
//! - **user_transcript** {text}: persist a user conversation event
//! - **stop_speaking**: turn boundary - commit audio and request a response
//! - **end_session**: graceful shutdown
//! - **Binary frames**: raw PCM16 mono audio, forwarded verbatim upstream
//!
//! ## Server -> Client
//!
//! - **audio_format** {sample_rate, channels}: sent once at session start
//! - **ai_text_delta** {text, is_final}: assistant transcript stream
//! - **error** {message}: user-visible failure
//! - **Binary frames**: assistant PCM16 audio, forwarded verbatim

mod handler;
pub mod messages;

pub use handler::{VoiceParams, voice_handler};
