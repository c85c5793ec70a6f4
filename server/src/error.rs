//! Error kinds used across the crate.
//!
//! Kept as plain enums with hand-written `Display` impls, not `thiserror`: none
//! of the reference server crates in this codebase's lineage pull in an error
//! derive crate, and these variants are few enough that the boilerplate is cheap.

use std::fmt;

/// Raised when a connecting client's declared protocol version doesn't match
/// [`crate::SERVER_VERSION`]. Surfaced to the remote, then the connection closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMismatch {
    pub client_version: u32,
    pub server_version: u32,
}

impl fmt::Display for VersionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "client version {} and server version {} are incompatible, please update",
            self.client_version, self.server_version
        )
    }
}

impl std::error::Error for VersionMismatch {}

/// Authentication failed against the password file. The server reacts only by
/// logging; the transport layer is responsible for closing the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationFailure {
    pub username: String,
}

impl fmt::Display for AuthenticationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "authentication failed for user {:?}", self.username)
    }
}

impl std::error::Error for AuthenticationFailure {}

/// A malformed frame (bad length prefix or undecodable body) arrived on a
/// connection. Always fatal to that one connection.
#[derive(Debug)]
pub enum ProtocolError {
    FrameTooLarge { len: u32, max: u32 },
    Decode(bincode::Error),
    Io(std::io::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::FrameTooLarge { len, max } => {
                write!(f, "frame length {} exceeds maximum {}", len, max)
            }
            ProtocolError::Decode(e) => write!(f, "failed to decode frame: {}", e),
            ProtocolError::Io(e) => write!(f, "transport I/O error: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Decode(e) => Some(e.as_ref()),
            ProtocolError::Io(e) => Some(e),
            ProtocolError::FrameTooLarge { .. } => None,
        }
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(e: std::io::Error) -> Self {
        ProtocolError::Io(e)
    }
}

impl From<bincode::Error> for ProtocolError {
    fn from(e: bincode::Error) -> Self {
        ProtocolError::Decode(e)
    }
}
