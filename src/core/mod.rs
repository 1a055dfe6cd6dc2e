//! Core domain logic: the realtime upstream link, translator and bridge.

pub mod realtime;

pub use realtime::*;
