//! Folder creation under the drive root.
use bytes::Bytes;
use http::Method;
use serde::Serialize;

use crate::client::SendRequest;
use crate::error::Error;
use crate::graph::Graph;
use crate::types::{DriveItem, DriveReference, FolderDescriptor};

#[derive(Serialize)]
struct CreateFolder<'a> {
    name: &'a str,
    folder: Facet,
    #[serde(rename = "@microsoft.graph.conflictBehavior")]
    conflict_behavior: &'a str,
}

#[derive(Serialize)]
struct Facet {}

/// Folder names are single path segments.
pub(crate) fn validate_folder_name(name: &str) -> Result<(), Error> {
    if name.trim().is_empty() {
        return Err(Error::UserError("folder name must not be empty".to_string()));
    }
    if name.contains(['/', '\\']) {
        return Err(Error::UserError(format!(
            "folder name {:?} must not contain path separators",
            name
        )));
    }
    Ok(())
}

/// Creates `name` under the drive root, letting the service pick a new name
/// if a folder called `name` already exists. Every successful call creates a
/// folder, so calling this twice with the same name yields two folders.
pub(crate) async fn ensure_folder<S>(
    graph: &Graph<'_, S>,
    drive: &DriveReference,
    name: &str,
) -> Result<FolderDescriptor, Error>
where
    S: SendRequest,
{
    validate_folder_name(name)?;

    let url = format!("{}/root/children", graph.drive_url(drive));
    let body = serde_json::to_vec(&CreateFolder {
        name,
        folder: Facet {},
        conflict_behavior: "rename",
    })?;

    let (head, body) = graph
        .send(
            Method::POST,
            &url,
            Some(mime::APPLICATION_JSON.as_ref()),
            Bytes::from(body),
        )
        .await?;
    if !head.status.is_success() {
        return Err(Error::from_status(head.status, &body));
    }

    let item = DriveItem::from_json(&body)?;
    let name = item.name.clone().unwrap_or_else(|| name.to_string());
    let web_url = item.into_web_url()?;
    log::info!("created folder {} at {}", name, web_url);
    Ok(FolderDescriptor { name, web_url })
}
