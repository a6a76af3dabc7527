use log::debug;
use snafu::Snafu;

pub use crate::errors::Error::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Runtime error: Are you sure your code runs inside #[visage::runtime]?
    RuntimeError,
    /// State error: the animation state container is stopped.
    StoreStopped,
    /// Json error: {source}.
    JsonError { source: serde_json::Error },
    /// Unknown error: {info}.
    Unknown { info: String },
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        debug!("Unreadable JSON at line {}: {}", error.line(), error);
        Self::JsonError { source: error }
    }
}
