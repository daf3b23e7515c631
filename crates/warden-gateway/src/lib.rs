//! Adapters for the external voice directory service.
//!
//! [`RestDirectory`] implements the engine's `VoiceDirectory` capability over
//! the service's REST API with a cache-then-fetch role cache.
//! [`event_stream_loop`] maintains the WebSocket event stream with
//! auto-reconnect and decodes wire events into `DirectoryEvent`s.

pub mod config;
pub mod events;
pub mod rest;

pub use config::GatewayConfig;
pub use events::event_stream_loop;
pub use rest::RestDirectory;
