use std::path::PathBuf;
use thiserror::Error;

use crate::descriptor::Channel;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load image {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Extraction failed{}: {reason}", channel_suffix(.channel))]
    Extraction {
        channel: Option<Channel>,
        reason: String,
    },

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Image already exists: {0}")]
    ImageExists(String),

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Invalid object index {index}: image has {count} objects")]
    InvalidObjectIndex { index: usize, count: usize },

    #[error("Detection failed: {0}")]
    Detection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn extraction(channel: Channel, reason: impl Into<String>) -> Self {
        Error::Extraction {
            channel: Some(channel),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the caller's configuration rather than the data.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::InvalidConfig(_) | Error::UnknownChannel(_))
    }
}

fn channel_suffix(channel: &Option<Channel>) -> String {
    match channel {
        Some(c) => format!(" for {}", c),
        None => String::new(),
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
