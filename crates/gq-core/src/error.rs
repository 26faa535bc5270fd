//! Error types for GQ

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Move guard errors
    #[error("Cannot move '{0}' across servers without cross-server permission")]
    CrossServerNotAllowed(String),

    #[error("Cannot move '{0}' onto itself")]
    SelfMove(String),

    #[error("Cannot move '{source_dn}' below itself ('{target_dn}')")]
    TargetBelowSource { source_dn: String, target_dn: String },

    #[error("Invalid distinguished name: {0}")]
    InvalidDn(String),

    // Server errors
    #[error("Unknown server: {0}")]
    UnknownServer(String),

    #[error("Server '{server}' is down: {message}")]
    ServerDown { server: String, message: String },

    #[error("Could not connect to server '{server}': {message}")]
    ConnectFailed { server: String, message: String },

    #[error("Bind to server '{server}' failed: {message}")]
    BindFailed { server: String, message: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::CrossServerNotAllowed(_) => "CrossServerNotAllowed",
            Error::SelfMove(_) => "SelfMove",
            Error::TargetBelowSource { .. } => "TargetBelowSource",
            Error::InvalidDn(_) => "InvalidDn",
            Error::UnknownServer(_) => "UnknownServer",
            Error::ServerDown { .. } => "ServerDown",
            Error::ConnectFailed { .. } => "ConnectFailed",
            Error::BindFailed { .. } => "BindFailed",
            Error::Config(_) => "InvalidConfiguration",
        }
    }

    /// True when the error means the server could not be reached at all.
    pub fn is_server_down(&self) -> bool {
        matches!(self, Error::ServerDown { .. })
    }
}
