//! # `error`
//!
//! Error type for the HTTP mocker. Mostly errors raised by the underlying
//! socket server.
//!
//! Fatal errors are raised directly by [`HttpMocker::start`](crate::HttpMocker::start);
//! non-fatal errors occur while serving a single request and are logged by
//! the worker that hit them without taking the server down.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Represents an error raised by the HTTP mocker.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum HttpMockerError {
    #[error("{}: Failed to bind HTTP listener on {0}: {1}", self.fatal_str())]
    UnableToBindListener(SocketAddr, io::Error),
    #[error("{}: Failed to get local address of a listener: {0}", self.fatal_str())]
    UnableToGetLocalAddress(io::Error),
    #[error("{}: Failed to accept incoming connection on {0}: {1}", self.fatal_str())]
    UnableToAcceptConnection(SocketAddr, io::Error),
    #[error("{}: Failed to set read timeout on TCP stream: {0}", self.fatal_str())]
    UnableToSetReadTimeout(io::Error),
    #[error("{}: Failed to read from TCP stream: {0}", self.fatal_str())]
    UnableToReadStream(io::Error),
    #[error("{}: Failed to write to TCP stream: {0}", self.fatal_str())]
    UnableToWriteStream(io::Error),
    #[error("{}: Malformed HTTP request: {0}", self.fatal_str())]
    MalformedRequest(String),
    #[error("{}: Failed to read response body file {0}: {1}", self.fatal_str())]
    UnableToReadBodyFile(PathBuf, io::Error),
}

impl HttpMockerError {
    /// Indicate if this is a fatal error
    pub fn is_fatal(&self) -> bool {
        match self {
            HttpMockerError::UnableToBindListener(_, _)
            | HttpMockerError::UnableToGetLocalAddress(_)
            | HttpMockerError::UnableToAcceptConnection(_, _) => true,

            HttpMockerError::UnableToSetReadTimeout(_)
            | HttpMockerError::UnableToReadStream(_)
            | HttpMockerError::UnableToWriteStream(_)
            | HttpMockerError::MalformedRequest(_)
            | HttpMockerError::UnableToReadBodyFile(_, _) => false,
        }
    }

    fn fatal_str(&self) -> &'static str {
        if self.is_fatal() {
            "Fatal"
        } else {
            "Non fatal"
        }
    }
}
