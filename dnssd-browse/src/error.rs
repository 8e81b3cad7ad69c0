use thiserror::Error;

/// Errors that end a browse session before it starts or abort it.
///
/// Send failures and undecodable datagrams are not represented here; they
/// are logged and absorbed by the session.
#[derive(Debug, Error)]
pub enum BrowseError {
    /// The requested service type is not of the form `_service._proto[.domain]`.
    #[error("Invalid service type: {0}")]
    InvalidServiceType(String),

    /// No usable multicast interface matched the filter.
    #[error("No multicast interfaces available")]
    NoInterfaces,

    /// The multicast transport could not be opened.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The transport's read stream ended while the session was live.
    #[error("Transport read stream closed")]
    ReadClosed,

    /// A message could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] hickory_proto::error::ProtoError),
}

pub type Result<T> = std::result::Result<T, BrowseError>;
