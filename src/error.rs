//! Error taxonomy shared by every store.

use crate::api::types::EntityId;

/// Failure of a store operation or of one of its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// Transport failure or a 5xx answer. `status` is `None` when no response arrived.
  #[error("{message}")]
  Network { status: Option<u16>, message: String },

  /// The server rejected the request (4xx).
  #[error("{message}")]
  Validation { status: u16, message: String },

  /// The session could not be established or refreshed.
  #[error("session error: {0}")]
  Session(String),

  /// The payload did not match the expected shape.
  #[error("failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),

  /// Durable session storage failed.
  #[error("storage error: {0}")]
  Storage(String),

  /// A mutation named an entity the cache has never seen.
  #[error("{entity} {id} is not loaded")]
  NotCached { entity: &'static str, id: EntityId },

  /// Input rejected locally, before any network call.
  #[error("invalid input: {0}")]
  InvalidInput(String),
}

impl Error {
  /// Classify an HTTP status: 4xx is a validation failure, everything else is a network failure.
  pub fn from_status(status: u16, message: impl Into<String>) -> Self {
    let message = message.into();
    if (400..500).contains(&status) {
      Error::Validation { status, message }
    } else {
      Error::Network {
        status: Some(status),
        message,
      }
    }
  }

  /// Transport-level failure with no HTTP status.
  pub fn transport(message: impl Into<String>) -> Self {
    Error::Network {
      status: None,
      message: message.into(),
    }
  }

  /// HTTP status attached to the failure, if any.
  pub fn status(&self) -> Option<u16> {
    match self {
      Error::Network { status, .. } => *status,
      Error::Validation { status, .. } => Some(*status),
      _ => None,
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    Error::Storage(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;
