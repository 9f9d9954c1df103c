//! This module obtains Graph access tokens with the OAuth 2.0 client credentials grant.
//! No user is involved: the application authenticates with its own id and secret.
//!
//! Resources:
//! - [Microsoft identity platform and the OAuth 2.0 client credentials
//! flow](https://learn.microsoft.com/en-us/entra/identity-platform/v2-oauth2-client-creds-grant-flow)
//!
use crate::client::{fetch, RequestBody, SendRequest};
use crate::config::Config;
use crate::error::Error;
use crate::types::{AccessToken, Credentials};

use bytes::Bytes;
use http::header;
use url::form_urlencoded;

/// ClientCredentialsFlow can fetch tokens for an application registration.
pub(crate) struct ClientCredentialsFlow {
    credentials: Credentials,
    token_url: String,
    scope: String,
}

impl ClientCredentialsFlow {
    /// Builds the flow from the credentials, authority and scope in `config`.
    pub(crate) fn new(config: &Config) -> ClientCredentialsFlow {
        ClientCredentialsFlow {
            credentials: config.credentials.clone(),
            token_url: config.token_url(),
            scope: config.scope.clone(),
        }
    }

    /// Send a request for a new Bearer token to the identity platform.
    pub(crate) async fn token(&self, hyper_client: &impl SendRequest) -> Result<AccessToken, Error> {
        let req = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("scope", self.scope.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .finish();

        let request = http::Request::post(&self.token_url)
            .header(header::CONTENT_TYPE, mime::APPLICATION_WWW_FORM_URLENCODED.as_ref())
            .body(RequestBody::new(Bytes::from(req)))?;

        log::debug!(
            "requesting token for client {} from {}",
            self.credentials.client_id,
            self.token_url
        );
        let (head, body) = fetch(hyper_client, request).await?;
        // OAuth errors come with a 4xx status and a JSON body describing them.
        let token = match AccessToken::from_json(&body) {
            Ok(token) if head.status.is_success() => token,
            Err(err) if head.status.is_success() => return Err(err),
            Err(
                err @ (Error::InvalidClient
                | Error::InvalidScope(_)
                | Error::NegativeServerResponse(..)),
            ) => return Err(err),
            _ => return Err(Error::from_status(head.status, &body)),
        };
        log::info!(
            "obtained access token, expires at {:?}",
            token.expiration_time()
        );
        Ok(token)
    }
}
