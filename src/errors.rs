use std::string::FromUtf8Error;

/// All error types that can occur when interacting with Exoy lights.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The UDP socket could not be associated with the device address.
    ///
    /// This is fatal to instance creation: no [`crate::LightInstance`] is
    /// handed out when the transport cannot connect.
    #[error("connect to {host} failed: {err:?}")]
    Connect { host: String, err: std::io::Error },

    /// A network socket operation failed while communicating with a fixture.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// The UDP response from a fixture contained invalid UTF-8.
    #[error("utf8 decoding error: {0:?}")]
    Utf8Decode(FromUtf8Error),

    /// Attempted to send a write payload with no attributes set.
    #[error("invalid payload; no attributes set")]
    NoAttribute,

    /// The device never answered the initial status request.
    #[error("no status received from {host} within {timeout_ms}ms")]
    ReadyTimeout { host: String, timeout_ms: u64 },
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new connect error
    pub fn connect(host: &str, err: std::io::Error) -> Self {
        Error::Connect {
            host: host.to_string(),
            err,
        }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
