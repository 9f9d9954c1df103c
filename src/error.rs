//! Module containing various error types.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use http::StatusCode;
use serde::Deserialize;

use crate::client::SendError;

/// The error body returned by the token endpoint.
#[derive(Deserialize, Debug)]
pub(crate) struct JsonError {
    pub error: String,
    pub error_description: Option<String>,
}

/// A helper type to deserialize either a JsonError or another piece of data.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub(crate) enum JsonErrorOr<T> {
    Err(JsonError),
    Data(T),
}

impl<T> JsonErrorOr<T> {
    pub(crate) fn into_result(self) -> Result<T, JsonError> {
        match self {
            JsonErrorOr::Err(err) => Result::Err(err),
            JsonErrorOr::Data(value) => Result::Ok(value),
        }
    }
}

// Graph wraps its errors as `{"error": {"code": ..., "message": ...}}`.
#[derive(Deserialize, Debug)]
struct GraphErrorBody {
    error: GraphErrorDetail,
}

#[derive(Deserialize, Debug)]
struct GraphErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

/// Encapsulates all possible failures of the token flow and the drive operations.
#[derive(Debug)]
pub enum Error {
    /// Indicates a connection failure or a request timeout
    SendError(SendError),
    /// Failure while reading a response body
    HttpError(hyper::Error),
    /// The request could not be built, usually because of an invalid URI
    InvalidRequest(http::Error),
    /// The service answered with a status code outside of the 2xx range.
    /// `code` and `message` are taken from the Graph error body when it has one.
    UnexpectedStatus {
        /// The status code of the response
        status: StatusCode,
        /// Graph error code, e.g. `itemNotFound`
        code: Option<String>,
        /// Human readable description
        message: Option<String>,
    },
    /// The bearer token was rejected; a new token has to be acquired
    AuthExpired,
    /// The OAuth client was not found
    InvalidClient,
    /// The requested scope was invalid. String contains the server error message
    InvalidScope(String),
    /// A 'catch-all' variant containing the token endpoint error and description
    /// First string is the error code, the second may be a more detailed description
    NegativeServerResponse(String, Option<String>),
    /// The token endpoint answered without an access token
    MissingAccessToken,
    /// The response was valid JSON, but lacked a field we rely on.
    MalformedResponse(String),
    /// Error while decoding a JSON response.
    JSONError(serde_json::Error),
    /// Error within user input or configuration.
    UserError(String),
    /// A lower level IO error.
    LowLevelError(io::Error),
}

impl Error {
    /// Builds an `UnexpectedStatus` error, pulling code and message out of a Graph error body.
    pub(crate) fn from_status(status: StatusCode, body: &[u8]) -> Error {
        let (code, message) = match serde_json::from_slice::<GraphErrorBody>(body) {
            Ok(GraphErrorBody { error }) => (error.code, error.message),
            Err(_) => (None, None),
        };
        Error::UnexpectedStatus {
            status,
            code,
            message,
        }
    }

    /// Whether the service rejected our token, meaning the caller should authenticate again.
    pub fn is_auth_expired(&self) -> bool {
        match *self {
            Error::AuthExpired => true,
            Error::UnexpectedStatus { status, .. } => status == StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }
}

impl From<SendError> for Error {
    fn from(error: SendError) -> Error {
        Error::SendError(error)
    }
}

impl From<hyper::Error> for Error {
    fn from(error: hyper::Error) -> Error {
        Error::HttpError(error)
    }
}

impl From<http::Error> for Error {
    fn from(error: http::Error) -> Error {
        Error::InvalidRequest(error)
    }
}

impl From<JsonError> for Error {
    fn from(value: JsonError) -> Error {
        match &*value.error {
            "invalid_client" => Error::InvalidClient,
            "invalid_scope" => Error::InvalidScope(
                value
                    .error_description
                    .unwrap_or_else(|| "no description provided".to_string()),
            ),
            _ => Error::NegativeServerResponse(value.error, value.error_description),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Error {
        Error::JSONError(value)
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Error {
        Error::LowLevelError(value)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Error::SendError(ref err) => err.fmt(f),
            Error::HttpError(ref err) => err.fmt(f),
            Error::InvalidRequest(ref err) => write!(f, "Invalid request: {}", err),
            Error::UnexpectedStatus {
                status,
                ref code,
                ref message,
            } => {
                write!(f, "Server responded with {}", status)?;
                if let Some(ref code) = *code {
                    write!(f, " ({})", code)?;
                }
                if let Some(ref message) = *message {
                    write!(f, ": {}", message)?;
                }
                Ok(())
            }
            Error::AuthExpired => "Access token rejected; authentication expired".fmt(f),
            Error::InvalidClient => "Invalid Client".fmt(f),
            Error::InvalidScope(ref scope) => write!(f, "Invalid Scope: '{}'", scope),
            Error::NegativeServerResponse(ref error, ref desc) => {
                error.fmt(f)?;
                if let Some(ref desc) = *desc {
                    write!(f, ": {}", desc)?;
                }
                Ok(())
            }
            Error::MissingAccessToken => "Token response did not contain an access token".fmt(f),
            Error::MalformedResponse(ref s) => write!(f, "Malformed server response: {}", s),
            Error::JSONError(ref e) => format!(
                "JSON Error; this might be a bug with unexpected server responses! {}",
                e
            )
            .fmt(f),
            Error::UserError(ref s) => s.fmt(f),
            Error::LowLevelError(ref e) => e.fmt(f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::SendError(ref err) => Some(err),
            Error::HttpError(ref err) => Some(err),
            Error::InvalidRequest(ref err) => Some(err),
            Error::LowLevelError(ref err) => Some(err),
            Error::JSONError(ref err) => Some(err),
            _ => None,
        }
    }
}
