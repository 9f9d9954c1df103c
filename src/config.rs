//! Run configuration, read once at start-up and handed to [`DriveSession`](crate::DriveSession).
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::link::LinkTranslator;
use crate::types::Credentials;

/// Microsoft Graph v1.0 endpoint.
pub const GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";
/// Microsoft identity platform authority.
pub const AUTHORITY_URL: &str = "https://login.microsoftonline.com";
/// Requests every application permission granted to the client on Graph.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Locates a SharePoint site, e.g. host `contoso.sharepoint.com` and path `/sites/Transcripts`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SiteLocator {
    /// Host name of the SharePoint tenant.
    pub host: String,
    /// Server relative path of the site.
    pub path: String,
}

/// The two prefixes used to turn SharePoint links into UNC paths.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ShareMapping {
    /// Leading part of the web link that corresponds to the root of the share.
    pub web_prefix: String,
    /// UNC path of the share root, e.g. `\\fileserver\transcripts$\`.
    pub unc_prefix: String,
}

/// Everything a run needs to know. Fields that are unset fall back to the public
/// Microsoft endpoints.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    /// Application registration.
    pub credentials: Credentials,
    /// Base URL of the Graph API, without a trailing slash.
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    /// Base URL of the identity platform, without a trailing slash.
    #[serde(default = "default_authority_url")]
    pub authority_url: String,
    /// Scope requested with the client credentials grant.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Site whose drives are listed when no drive id is configured.
    #[serde(default)]
    pub site: Option<SiteLocator>,
    /// Use this drive directly, skipping site resolution.
    #[serde(default)]
    pub drive_id: Option<String>,
    /// Pick the site drive with this name instead of the first one.
    #[serde(default)]
    pub drive_name: Option<String>,
    /// Link to UNC path mapping.
    #[serde(default)]
    pub share: Option<ShareMapping>,
    /// Per-request timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_graph_url() -> String {
    GRAPH_URL.to_string()
}

fn default_authority_url() -> String {
    AUTHORITY_URL.to_string()
}

fn default_scope() -> String {
    GRAPH_DEFAULT_SCOPE.to_string()
}

impl Config {
    /// A configuration using the public endpoints and no drive selection.
    pub fn new(credentials: Credentials) -> Config {
        Config {
            credentials,
            graph_url: default_graph_url(),
            authority_url: default_authority_url(),
            scope: default_scope(),
            site: None,
            drive_id: None,
            drive_name: None,
            share: None,
            timeout_secs: None,
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// `tenant_id`, `client_id` and `client_secret` are required. `drive_id`,
    /// `drive_name`, `site_host` together with `site_path`, `share_web_prefix`
    /// together with `share_unc_prefix`, `graph_url`, `authority_url`, `scope` and
    /// `timeout_secs` are optional.
    pub fn from_env() -> Result<Config, Error> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Config, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| {
                Error::UserError(format!("missing environment variable {}", key))
            })
        };

        let mut config = Config::new(Credentials {
            tenant_id: required("tenant_id")?,
            client_id: required("client_id")?,
            client_secret: required("client_secret")?,
        });
        if let Some(graph_url) = var("graph_url") {
            config.graph_url = graph_url;
        }
        if let Some(authority_url) = var("authority_url") {
            config.authority_url = authority_url;
        }
        if let Some(scope) = var("scope") {
            config.scope = scope;
        }
        config.site = match (var("site_host"), var("site_path")) {
            (Some(host), Some(path)) => Some(SiteLocator { host, path }),
            (None, None) => None,
            _ => {
                return Err(Error::UserError(
                    "site_host and site_path must be set together".to_string(),
                ))
            }
        };
        config.drive_id = var("drive_id");
        config.drive_name = var("drive_name");
        config.share = match (var("share_web_prefix"), var("share_unc_prefix")) {
            (Some(web_prefix), Some(unc_prefix)) => Some(ShareMapping {
                web_prefix,
                unc_prefix,
            }),
            (None, None) => None,
            _ => {
                return Err(Error::UserError(
                    "share_web_prefix and share_unc_prefix must be set together".to_string(),
                ))
            }
        };
        config.timeout_secs = match var("timeout_secs") {
            Some(secs) => Some(secs.trim().parse().map_err(|_| {
                Error::UserError(format!("timeout_secs is not a number: {}", secs))
            })?),
            None => None,
        };
        Ok(config)
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// A translator for the configured share mapping, if there is one.
    pub fn link_translator(&self) -> Option<LinkTranslator> {
        self.share
            .as_ref()
            .map(|share| LinkTranslator::new(share.web_prefix.clone(), share.unc_prefix.clone()))
    }

    pub(crate) fn graph_base(&self) -> &str {
        self.graph_url.trim_end_matches('/')
    }

    pub(crate) fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_url.trim_end_matches('/'),
            self.credentials.tenant_id
        )
    }
}

/// Parse a configuration from a JSON string.
pub fn parse_config<S: AsRef<[u8]>>(config: S) -> Result<Config, Error> {
    Ok(serde_json::from_slice(config.as_ref())?)
}

/// Read a configuration from a JSON file.
pub async fn read_config<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
    parse_config(tokio::fs::read(path).await?)
}
