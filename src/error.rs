use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the session log and configuration layers.
///
/// The call tracker itself never returns these to a hook caller; it reports
/// them through `tracing` and keeps going.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to create session directory {}", path.display())]
    SessionDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open log file {}", path.display())]
    OpenLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to append to {}", path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode tool call record")]
    Encode(#[from] serde_json::Error),

    #[error("failed to read config {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;

/// `outer: inner: root` rendering of an error and its sources, for log fields.
pub fn display_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
