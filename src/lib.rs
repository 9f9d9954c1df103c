//! This library uploads files into a SharePoint document library through the
//! Microsoft Graph API.
//!
//! Authentication uses the OAuth 2.0 client credentials grant: you need an
//! application registration in your tenant with its client id and a client
//! secret, and the application needs the `Sites.ReadWrite.All` (or
//! `Files.ReadWrite.All`) application permission on Graph.
//!
//! A [`DriveSession`] holds everything a run needs: it acquires one token,
//! resolves the drive once, and then offers the drive operations:
//!
//! * [`DriveSession::ensure_folder`] creates a folder under the drive root. The
//!   service renames the new folder if the name is already taken, so every call
//!   creates a folder.
//! * [`DriveSession::upload`] checks whether the target file exists and uploads
//!   only if it does not. The [`UploadResult`] tells apart an existing file, an
//!   upload, a rejected token and a failure.
//! * [`DriveSession::list_folders`] returns the items under the drive root.
//!
//! [`LinkTranslator`] turns the returned web links into paths on a file share
//! that mirrors the library.
//!
//! ```test_harness,no_run
//! use graph_upload::{Config, DefaultHyperClientBuilder, DriveSession, HyperClientBuilder};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     // Reads tenant_id, client_id, client_secret and drive_id from the environment.
//!     let config = Config::from_env().expect("configuration");
//!     let client = DefaultHyperClientBuilder::default()
//!         .build_hyper_client()
//!         .expect("hyper client");
//!
//!     let session = DriveSession::connect(config, client).await.expect("session");
//!     let folder = session.ensure_folder("Transcripts").await.expect("folder");
//!     println!("created {}", folder.web_url);
//!
//!     let (link, auth_expired) = session
//!         .upload(&folder.name, "transcript.pdf", "/tmp/transcript.pdf")
//!         .await
//!         .into_parts();
//!     println!("{:?} {}", link, auth_expired);
//! }
//! ```
//!
#![deny(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
mod folder;
mod graph;
pub mod link;
mod session;
mod token;
mod types;
mod upload;

pub use crate::client::{
    CustomHyperClientBuilder, DefaultHyperClientBuilder, HttpClient, HyperClientBuilder,
};
pub use crate::config::{parse_config, read_config, Config, ShareMapping, SiteLocator};
#[doc(inline)]
pub use crate::error::Error;
pub use crate::link::LinkTranslator;
pub use crate::session::DriveSession;
pub use crate::types::{
    AccessToken, Credentials, DriveItem, DriveReference, FolderDescriptor, UploadResult,
};
