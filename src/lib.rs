pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod ingest;
pub mod payload;
pub mod record;
pub mod report;
pub mod roles;
pub mod session;
pub mod tracking;
pub mod transcript;

pub use config::TrackerConfig;
pub use error::TrackerError;
pub use tracking::{ToolCallEnd, ToolCallHooks, ToolCallStart, Tracker};
