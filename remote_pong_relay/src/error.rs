// Error types for the relay crate.
//
// `RegistrationError` is the only one that reaches clients: each variant maps
// onto a wire `ErrorCode` and is sent as a `ServerMessage::Error` before the
// offending connection is dropped. The others surface to the binary or to
// client tooling.

use std::io;
use std::path::PathBuf;

use remote_pong_protocol::{ErrorCode, FieldId};

/// A client referenced a field it cannot use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("field id does not name a slot")]
    UnusableFieldId,
    #[error("field {0} does not exist")]
    FieldNotExists(FieldId),
    #[error("field {0} is closed for registration")]
    FieldClosed(FieldId),
}

impl RegistrationError {
    pub fn code(self) -> ErrorCode {
        match self {
            RegistrationError::UnusableFieldId | RegistrationError::FieldNotExists(_) => {
                ErrorCode::FieldNotExists
            }
            RegistrationError::FieldClosed(_) => ErrorCode::FieldClosedForRegistration,
        }
    }
}

/// Failure to start the relay server.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("listener setup failed: {0}")]
    Listener(#[from] io::Error),
}

/// Failure to load the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Failure in `RelayClient`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("relay I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
