//! Authenticated requests against the Graph API and the read-only lookups
//! (site, drives, folder listing) built on them.
use bytes::Bytes;
use http::{header, Method};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::client::{fetch, RequestBody, SendRequest};
use crate::error::Error;
use crate::types::{AccessToken, DriveReference};

// Unreserved characters stay as they are, everything else is escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub(crate) fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

#[derive(Deserialize, Debug)]
struct Site {
    id: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Collection<T> {
    value: Option<Vec<T>>,
}

/// A document library as listed under a site.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Drive {
    /// The drive id.
    pub id: String,
    /// Display name of the library, e.g. `Documents`.
    #[serde(default)]
    pub name: Option<String>,
}

/// Picks the drive named `name`, or the first drive when no name is given.
pub(crate) fn select_drive(drives: &[Drive], name: Option<&str>) -> Result<DriveReference, Error> {
    if drives.is_empty() {
        return Err(Error::MalformedResponse("site has no drives".to_string()));
    }
    let drive = match name {
        Some(name) => drives
            .iter()
            .find(|drive| drive.name.as_deref() == Some(name))
            .ok_or_else(|| {
                Error::UserError(format!(
                    "site has no drive named {:?}; available: {:?}",
                    name,
                    drives
                        .iter()
                        .filter_map(|drive| drive.name.as_deref())
                        .collect::<Vec<_>>()
                ))
            })?,
        None => {
            let first = &drives[0];
            if drives.len() > 1 {
                log::warn!(
                    "site has {} drives, using the first one ({:?}); set drive_name or drive_id to choose",
                    drives.len(),
                    first.name
                );
            }
            first
        }
    };
    Ok(DriveReference {
        id: drive.id.clone(),
    })
}

/// Sends requests to one Graph endpoint with one bearer token.
pub(crate) struct Graph<'a, S> {
    client: &'a S,
    base_url: &'a str,
    token: &'a AccessToken,
}

impl<'a, S> Graph<'a, S>
where
    S: SendRequest,
{
    pub(crate) fn new(client: &'a S, base_url: &'a str, token: &'a AccessToken) -> Self {
        Graph {
            client,
            base_url,
            token,
        }
    }

    /// `{base}/drives/{drive}`
    pub(crate) fn drive_url(&self, drive: &DriveReference) -> String {
        format!("{}/drives/{}", self.base_url, encode_segment(&drive.id))
    }

    /// `{base}/drives/{drive}/root:/{folder}/{file}`
    pub(crate) fn item_url(&self, drive: &DriveReference, folder: &str, file: &str) -> String {
        format!(
            "{}/root:/{}/{}",
            self.drive_url(drive),
            encode_segment(folder),
            encode_segment(file)
        )
    }

    pub(crate) async fn send(
        &self,
        method: Method,
        url: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<(http::response::Parts, Bytes), Error> {
        let mut builder = http::Request::builder()
            .method(method)
            .uri(url)
            .header(header::AUTHORIZATION, self.token.authorization());
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(RequestBody::new(body))?;

        log::debug!("{} {}", request.method(), request.uri());
        fetch(self.client, request).await
    }

    /// GETs `url` and deserializes the body of a 2xx response.
    pub(crate) async fn get_json<T>(&self, url: &str) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let (head, body) = self.send(Method::GET, url, None, Bytes::new()).await?;
        if !head.status.is_success() {
            return Err(Error::from_status(head.status, &body));
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_collection<T>(&self, url: &str) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
    {
        let collection: Collection<T> = self.get_json(url).await?;
        collection
            .value
            .ok_or_else(|| Error::MalformedResponse(format!("{} returned no value array", url)))
    }

    /// Resolves a site from its host name and server relative path.
    pub(crate) async fn site_id(&self, host: &str, path: &str) -> Result<String, Error> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        let url = format!("{}/sites/{}:{}", self.base_url, host, path);
        let site: Site = self.get_json(&url).await?;
        site.id
            .ok_or_else(|| Error::MalformedResponse("site response has no id".to_string()))
    }

    /// Lists the document libraries of a site.
    pub(crate) async fn drives(&self, site_id: &str) -> Result<Vec<Drive>, Error> {
        let url = format!("{}/sites/{}/drives", self.base_url, site_id);
        self.get_collection(&url).await
    }

    /// The items directly under the drive root, as returned by the service.
    /// Only the first page is read.
    pub(crate) async fn list_root_children(
        &self,
        drive: &DriveReference,
    ) -> Result<Vec<serde_json::Value>, Error> {
        let url = format!("{}/root/children", self.drive_url(drive));
        self.get_collection(&url).await
    }
}
