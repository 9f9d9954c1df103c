//! The upload workflow: probe the target path, and upload only if nothing is there.
//!
//! A file that already exists is never replaced and no alternative name is
//! tried; its link is reported back as [`UploadResult::AlreadyExists`].
use std::path::Path;

use bytes::Bytes;
use http::{Method, StatusCode};

use crate::client::SendRequest;
use crate::error::Error;
use crate::folder::validate_folder_name;
use crate::graph::Graph;
use crate::types::{DriveItem, DriveReference, UploadResult};

/// File names need an extension after a non-empty base name.
pub(crate) fn validate_file_name(name: &str) -> Result<(), Error> {
    match name.rsplit_once('.') {
        Some((base, extension)) if !base.is_empty() && !extension.is_empty() => {}
        _ => {
            return Err(Error::UserError(format!(
                "file name {:?} must have the form <name>.<extension>",
                name
            )))
        }
    }
    if name.contains(['/', '\\']) {
        return Err(Error::UserError(format!(
            "file name {:?} must not contain path separators",
            name
        )));
    }
    Ok(())
}

enum Probe {
    Exists(String),
    AuthExpired,
    Absent,
}

async fn probe<S>(graph: &Graph<'_, S>, url: &str) -> Result<Probe, Error>
where
    S: SendRequest,
{
    let (head, body) = graph.send(Method::GET, url, None, Bytes::new()).await?;
    match head.status {
        StatusCode::OK => Ok(Probe::Exists(DriveItem::from_json(&body)?.into_web_url()?)),
        StatusCode::UNAUTHORIZED => Ok(Probe::AuthExpired),
        status => {
            log::debug!("{} answered {}, treating the file as absent", url, status);
            Ok(Probe::Absent)
        }
    }
}

/// Uploads `local_path` as `{folder}/{file_name}` unless that item already exists.
///
/// At most two requests are made: the existence probe, then the upload. The
/// upload is only started once the probe answered with something other than
/// 200 or 401.
pub(crate) async fn upload<S>(
    graph: &Graph<'_, S>,
    drive: &DriveReference,
    folder: &str,
    file_name: &str,
    local_path: &Path,
) -> UploadResult
where
    S: SendRequest,
{
    if let Err(err) = validate_folder_name(folder).and_then(|_| validate_file_name(file_name)) {
        return UploadResult::Failed(err);
    }

    let item_url = graph.item_url(drive, folder, file_name);
    match probe(graph, &item_url).await {
        Ok(Probe::Exists(web_url)) => {
            log::info!("file already exists: {}", web_url);
            return UploadResult::AlreadyExists(web_url);
        }
        Ok(Probe::AuthExpired) => return UploadResult::AuthExpired,
        Ok(Probe::Absent) => {}
        Err(err) => return UploadResult::Failed(err),
    }

    let content = match tokio::fs::read(local_path).await {
        Ok(content) => Bytes::from(content),
        Err(err) => return UploadResult::Failed(err.into()),
    };

    let upload_url = format!("{}:/content", item_url);
    let (head, body) = match graph
        .send(
            Method::PUT,
            &upload_url,
            Some(mime::APPLICATION_PDF.as_ref()),
            content,
        )
        .await
    {
        Ok(response) => response,
        Err(err) => return UploadResult::Failed(err),
    };

    if head.status == StatusCode::UNAUTHORIZED {
        return UploadResult::AuthExpired;
    }
    if !head.status.is_success() {
        return UploadResult::Failed(Error::from_status(head.status, &body));
    }
    match DriveItem::from_json(&body).and_then(DriveItem::into_web_url) {
        Ok(web_url) => {
            log::info!("uploaded {} to {}", local_path.display(), web_url);
            UploadResult::Uploaded(web_url)
        }
        Err(err) => UploadResult::Failed(err),
    }
}
