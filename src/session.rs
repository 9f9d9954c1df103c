//! The per-run state: one client, one token, one drive.
use std::path::Path;

use hyper_util::client::legacy::connect::Connect;

use crate::client::HttpClient;
use crate::config::Config;
use crate::error::Error;
use crate::folder;
use crate::graph::{self, Graph};
use crate::token::ClientCredentialsFlow;
use crate::types::{AccessToken, DriveReference, FolderDescriptor, UploadResult};
use crate::upload;

/// An authenticated connection to one document library.
///
/// The token is acquired once in [`DriveSession::connect`] and used until the
/// service rejects it. Operations report that as [`UploadResult::AuthExpired`]
/// or an error for which [`Error::is_auth_expired`] holds; call
/// [`DriveSession::reauthenticate`] before trying again.
pub struct DriveSession<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    config: Config,
    client: HttpClient<C>,
    flow: ClientCredentialsFlow,
    token: AccessToken,
    drive: DriveReference,
}

impl<C> DriveSession<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    /// Authenticates and resolves the drive selected by `config`.
    pub async fn connect(config: Config, client: HttpClient<C>) -> Result<Self, Error> {
        if config.drive_id.is_none() && config.site.is_none() {
            return Err(Error::UserError(
                "configure either a drive id or a site to select the drive".to_string(),
            ));
        }

        let flow = ClientCredentialsFlow::new(&config);
        let token = flow.token(&client).await.map_err(|err| {
            log::error!("failed to obtain access token: {}", err);
            err
        })?;
        let drive = resolve_drive(&config, &client, &token).await.map_err(|err| {
            log::error!("failed to resolve drive: {}", err);
            err
        })?;
        log::info!("using drive {}", drive.id);

        Ok(DriveSession {
            config,
            client,
            flow,
            token,
            drive,
        })
    }

    /// The drive all operations run against.
    pub fn drive(&self) -> &DriveReference {
        &self.drive
    }

    /// The current access token.
    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    /// The configuration this session was created from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the access token with a freshly acquired one.
    pub async fn reauthenticate(&mut self) -> Result<(), Error> {
        self.token = self.flow.token(&self.client).await.map_err(|err| {
            log::error!("failed to obtain access token: {}", err);
            err
        })?;
        Ok(())
    }

    fn graph(&self) -> Graph<'_, HttpClient<C>> {
        Graph::new(&self.client, self.config.graph_base(), &self.token)
    }

    /// The items under the drive root, unmodified. Only the first page is returned.
    pub async fn list_folders(&self) -> Result<Vec<serde_json::Value>, Error> {
        self.graph()
            .list_root_children(&self.drive)
            .await
            .map_err(|err| {
                log::error!("failed to list folders: {}", err);
                err
            })
    }

    /// Writes the result of [`DriveSession::list_folders`] to `path` as indented JSON.
    pub async fn save_folder_listing<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let items = self.list_folders().await?;
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(&items, &mut ser)?;
        tokio::fs::write(path.as_ref(), buf).await?;
        log::info!("folder data saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Creates folder `name` under the drive root. If the name is taken the
    /// service creates a renamed sibling; the descriptor always describes the
    /// folder that was created by this call.
    pub async fn ensure_folder(&self, name: &str) -> Result<FolderDescriptor, Error> {
        folder::ensure_folder(&self.graph(), &self.drive, name)
            .await
            .map_err(|err| {
                log::error!("failed to create folder {}: {}", name, err);
                err
            })
    }

    /// Uploads `local_path` as `{folder}/{file_name}` unless that file exists already.
    pub async fn upload<P: AsRef<Path>>(
        &self,
        folder: &str,
        file_name: &str,
        local_path: P,
    ) -> UploadResult {
        let result = upload::upload(
            &self.graph(),
            &self.drive,
            folder,
            file_name,
            local_path.as_ref(),
        )
        .await;
        match result {
            UploadResult::Failed(ref err) => {
                log::error!("failed to upload {}/{}: {}", folder, file_name, err)
            }
            UploadResult::AuthExpired => {
                log::warn!("access token rejected while uploading {}/{}", folder, file_name)
            }
            _ => {}
        }
        result
    }
}

async fn resolve_drive<C>(
    config: &Config,
    client: &HttpClient<C>,
    token: &AccessToken,
) -> Result<DriveReference, Error>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    if let Some(ref id) = config.drive_id {
        return Ok(DriveReference { id: id.clone() });
    }
    let site = config
        .site
        .as_ref()
        .ok_or_else(|| Error::UserError("no drive id and no site configured".to_string()))?;

    let graph = Graph::new(client, config.graph_base(), token);
    let site_id = graph.site_id(&site.host, &site.path).await?;
    log::debug!("resolved site {}{} to {}", site.host, site.path, site_id);
    let drives = graph.drives(&site_id).await?;
    graph::select_drive(&drives, config.drive_name.as_deref())
}
