use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, JsonErrorOr};

/// The application registration used for the client credentials grant.
#[derive(Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Credentials {
    /// The directory (tenant) ID.
    pub tenant_id: String,
    /// The application (client) ID.
    pub client_id: String,
    /// The client secret.
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Represents a bearer token as returned by the token endpoint.
///
/// The expiry is recorded for diagnostics only. Nothing in this crate refreshes
/// a token on its own; a rejected token surfaces as [`Error::AuthExpired`] and the
/// caller decides whether to authenticate again.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Wraps a raw bearer string that has no known expiry.
    pub fn new<S: Into<String>>(access_token: S) -> AccessToken {
        AccessToken {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// A string representation of the access token.
    pub fn as_str(&self) -> &str {
        &self.access_token
    }

    /// The time the access token will expire, if any.
    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Determine if the access token is expired.
    /// This will report that the token is expired 1 minute prior to the expiration time.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expiration_time| expiration_time - Duration::minutes(1) <= Utc::now())
            .unwrap_or(false)
    }

    pub(crate) fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Parses a token endpoint response, including its OAuth error form.
    pub(crate) fn from_json(json_data: &[u8]) -> Result<AccessToken, Error> {
        #[derive(Deserialize)]
        struct RawToken {
            access_token: Option<String>,
            token_type: Option<String>,
            expires_in: Option<i64>,
        }

        let RawToken {
            access_token,
            token_type,
            expires_in,
        } = serde_json::from_slice::<JsonErrorOr<_>>(json_data)?.into_result()?;

        if let Some(token_type) = token_type {
            if !token_type.eq_ignore_ascii_case("bearer") {
                return Err(Error::MalformedResponse(format!(
                    "unsupported token type {}",
                    token_type
                )));
            }
        }

        let access_token = access_token
            .filter(|token| !token.is_empty())
            .ok_or(Error::MissingAccessToken)?;
        let expires_at = expires_in.map(|seconds| Utc::now() + Duration::seconds(seconds));

        Ok(AccessToken {
            access_token,
            expires_at,
        })
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Identifies the document library all operations of a session run against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriveReference {
    /// The opaque drive id.
    pub id: String,
}

/// A folder as created by the service, which may have renamed it on conflict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderDescriptor {
    /// The name the service assigned to the folder.
    pub name: String,
    /// Link to the folder in the SharePoint web interface.
    pub web_url: String,
}

/// The subset of a Graph `driveItem` resource this crate reads.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    /// Item id, unique within the drive.
    pub id: Option<String>,
    /// Item name.
    pub name: Option<String>,
    /// Link to the item in the SharePoint web interface.
    pub web_url: Option<String>,
    /// Present if the item is a folder.
    pub folder: Option<serde_json::Value>,
    /// Present if the item is a file.
    pub file: Option<serde_json::Value>,
}

impl DriveItem {
    pub(crate) fn from_json(json_data: &[u8]) -> Result<DriveItem, Error> {
        Ok(serde_json::from_slice(json_data)?)
    }

    pub(crate) fn into_web_url(self) -> Result<String, Error> {
        self.web_url
            .ok_or_else(|| Error::MalformedResponse("drive item has no webUrl".to_string()))
    }
}

/// Outcome of a single upload workflow invocation.
#[derive(Debug)]
pub enum UploadResult {
    /// A file with the target name was already present; nothing was uploaded.
    AlreadyExists(String),
    /// The service rejected the token. Authenticate again before retrying.
    AuthExpired,
    /// The file was uploaded; contains the link to the new file.
    Uploaded(String),
    /// The upload did not happen.
    Failed(Error),
}

impl UploadResult {
    /// Link to the file on the service, if there is one.
    pub fn web_url(&self) -> Option<&str> {
        match *self {
            UploadResult::AlreadyExists(ref url) | UploadResult::Uploaded(ref url) => Some(url),
            UploadResult::AuthExpired | UploadResult::Failed(_) => None,
        }
    }

    /// Whether the token was rejected during this invocation.
    pub fn is_auth_expired(&self) -> bool {
        matches!(*self, UploadResult::AuthExpired)
    }

    /// Flattens the outcome to a `(link, auth_expired)` pair.
    pub fn into_parts(self) -> (Option<String>, bool) {
        match self {
            UploadResult::AlreadyExists(url) | UploadResult::Uploaded(url) => (Some(url), false),
            UploadResult::AuthExpired => (None, true),
            UploadResult::Failed(_) => (None, false),
        }
    }
}
