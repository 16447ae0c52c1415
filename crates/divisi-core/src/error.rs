//! Error types for divisi-core.

use crate::substrate::{NodeId, ScheduleId};
use thiserror::Error;

/// Error type for substrate operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node {0} is not a {1} node")]
    WrongNodeKind(NodeId, &'static str),

    #[error("Unknown schedule: {0}")]
    UnknownSchedule(ScheduleId),

    #[error("Invalid node kind: {0:?}")]
    InvalidKind(String),

    #[error("Capture already running")]
    CaptureBusy,

    #[error("Capture not running")]
    CaptureNotStarted,

    #[error("Unknown content reference: {0:?}")]
    ContentNotFound(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
