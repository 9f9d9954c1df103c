use graph_upload::{
    client::{CustomHyperClientBuilder, HttpClient, HyperClientBuilder, SendError},
    Config, Credentials, DriveSession, Error, LinkTranslator, SiteLocator, UploadResult,
};

use std::io::Write;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use httptest::{
    matchers::*,
    responders::{delay_and_then, json_encoded, status_code},
    Expectation, Server,
};
use hyper_util::client::legacy::connect::HttpConnector;

type Session = DriveSession<HttpConnector>;

const ITEM_PATH: &str = "/v1.0/drives/drive1/root:/Test2/Bob%20Smith_Transcript_1.pdf";
const UPLOAD_PATH: &str = "/v1.0/drives/drive1/root:/Test2/Bob%20Smith_Transcript_1.pdf:/content";

fn http_client() -> HttpClient<HttpConnector> {
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build_http::<Full<Bytes>>();
    CustomHyperClientBuilder::from(client)
        .build_hyper_client()
        .expect("Hyper client to be built")
}

fn config(server: &Server) -> Config {
    let mut config = Config::new(Credentials {
        tenant_id: "tenant1".to_string(),
        client_id: "0e5f1a7c-2a11-4c33-9d2b-8b2f2c8f5d10".to_string(),
        client_secret: "s3cr3t".to_string(),
    });
    config.graph_url = server.url_str("/v1.0");
    config.authority_url = server.url_str("/login");
    config.drive_id = Some("drive1".to_string());
    config
}

fn expect_token(server: &Server, times: usize) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/login/tenant1/oauth2/v2.0/token"),
            request::body(url_decoded(all_of![
                contains(("client_id", "0e5f1a7c-2a11-4c33-9d2b-8b2f2c8f5d10")),
                contains(("client_secret", "s3cr3t")),
                contains(("scope", "https://graph.microsoft.com/.default")),
                contains(("grant_type", "client_credentials")),
            ])),
        ])
        .times(times)
        .respond_with(json_encoded(serde_json::json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "ext_expires_in": 3599,
            "access_token": "accesstoken"
        }))),
    );
}

async fn connect(server: &Server) -> Session {
    expect_token(server, 1);
    DriveSession::connect(config(server), http_client())
        .await
        .expect("session to connect")
}

fn created(body: serde_json::Value) -> impl httptest::responders::Responder {
    status_code(201)
        .append_header("Content-Type", "application/json")
        .body(body.to_string())
}

fn pdf_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"%PDF-1.4 test").expect("write temp file");
    file
}

#[tokio::test]
async fn test_connect_with_drive_id() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    assert_eq!(session.drive().id, "drive1");
    assert_eq!(session.config().drive_id.as_deref(), Some("drive1"));
    assert_eq!(session.token().as_str(), "accesstoken");
    assert!(!session.token().is_expired());
}

#[tokio::test]
async fn test_token_invalid_client() {
    let _ = env_logger::try_init();
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "POST",
            "/login/tenant1/oauth2/v2.0/token",
        ))
        .respond_with(status_code(401).body(
            serde_json::json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })
            .to_string(),
        )),
    );

    match DriveSession::connect(config(&server), http_client()).await {
        Err(Error::InvalidClient) => {}
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("connect should fail"),
    }
}

#[tokio::test]
async fn test_token_server_error() {
    let _ = env_logger::try_init();
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "POST",
            "/login/tenant1/oauth2/v2.0/token",
        ))
        .respond_with(status_code(503).body("Service Unavailable")),
    );

    match DriveSession::connect(config(&server), http_client()).await {
        Err(Error::UnexpectedStatus { status, .. }) => assert_eq!(status.as_u16(), 503),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("connect should fail"),
    }
}

#[tokio::test]
async fn test_token_error_status_without_oauth_error() {
    let _ = env_logger::try_init();
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "POST",
            "/login/tenant1/oauth2/v2.0/token",
        ))
        .respond_with(status_code(400).body("{}")),
    );

    match DriveSession::connect(config(&server), http_client()).await {
        Err(Error::UnexpectedStatus { status, .. }) => assert_eq!(status.as_u16(), 400),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("connect should fail"),
    }
}

#[tokio::test]
async fn test_connect_requires_drive_selection() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let mut config = config(&server);
    config.drive_id = None;

    match DriveSession::connect(config, http_client()).await {
        Err(Error::UserError(_)) => {}
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("connect should fail"),
    }
}

#[tokio::test]
async fn test_resolve_drive_by_name() {
    let _ = env_logger::try_init();
    let server = Server::run();
    expect_token(&server, 1);
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/v1.0/sites/contoso.sharepoint.com:/sites/Transcripts"),
            request::headers(contains(("authorization", "Bearer accesstoken"))),
        ])
        .respond_with(json_encoded(serde_json::json!({
            "id": "contoso.sharepoint.com,site1,web1",
            "name": "Transcripts",
            "webUrl": "https://contoso.sharepoint.com/sites/Transcripts"
        }))),
    );
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/v1.0/sites/contoso.sharepoint.com,site1,web1/drives",
        ))
        .respond_with(json_encoded(serde_json::json!({
            "value": [
                {"id": "b!documents", "name": "Documents", "driveType": "documentLibrary"},
                {"id": "b!transcripts", "name": "Transcripts", "driveType": "documentLibrary"}
            ]
        }))),
    );

    let mut config = config(&server);
    config.drive_id = None;
    config.drive_name = Some("Transcripts".to_string());
    config.site = Some(SiteLocator {
        host: "contoso.sharepoint.com".to_string(),
        path: "/sites/Transcripts".to_string(),
    });

    let session = DriveSession::connect(config, http_client())
        .await
        .expect("session to connect");
    assert_eq!(session.drive().id, "b!transcripts");
}

#[tokio::test]
async fn test_resolve_drive_without_drives() {
    let _ = env_logger::try_init();
    let server = Server::run();
    expect_token(&server, 1);
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/v1.0/sites/contoso.sharepoint.com:/sites/Transcripts",
        ))
        .respond_with(json_encoded(serde_json::json!({"id": "site1"}))),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/v1.0/sites/site1/drives"))
            .respond_with(json_encoded(serde_json::json!({"value": []}))),
    );

    let mut config = config(&server);
    config.drive_id = None;
    config.site = Some(SiteLocator {
        host: "contoso.sharepoint.com".to_string(),
        path: "/sites/Transcripts".to_string(),
    });

    match DriveSession::connect(config, http_client()).await {
        Err(Error::MalformedResponse(_)) => {}
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("connect should fail"),
    }
}

#[tokio::test]
async fn test_resolve_site_without_id() {
    let _ = env_logger::try_init();
    let server = Server::run();
    expect_token(&server, 1);
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/v1.0/sites/contoso.sharepoint.com:/sites/Transcripts",
        ))
        .respond_with(json_encoded(serde_json::json!({"name": "Transcripts"}))),
    );

    let mut config = config(&server);
    config.drive_id = None;
    config.site = Some(SiteLocator {
        host: "contoso.sharepoint.com".to_string(),
        path: "sites/Transcripts".to_string(),
    });

    match DriveSession::connect(config, http_client()).await {
        Err(Error::MalformedResponse(_)) => {}
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("connect should fail"),
    }
}

#[tokio::test]
async fn test_ensure_folder() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/v1.0/drives/drive1/root/children"),
            request::headers(contains(("authorization", "Bearer accesstoken"))),
            request::headers(contains(("content-type", "application/json"))),
            request::body(json_decoded(eq(serde_json::json!({
                "name": "Test2",
                "folder": {},
                "@microsoft.graph.conflictBehavior": "rename"
            })))),
        ])
        .respond_with(created(serde_json::json!({
            "id": "01FOLDER",
            "name": "Test2",
            "webUrl": "https://contoso.sharepoint.com/sites/Transcripts/Shared%20Documents/Test2",
            "folder": {"childCount": 0}
        }))),
    );

    let folder = session.ensure_folder("Test2").await.expect("folder");
    assert_eq!(folder.name, "Test2");
    assert_eq!(
        folder.web_url,
        "https://contoso.sharepoint.com/sites/Transcripts/Shared%20Documents/Test2"
    );
}

#[tokio::test]
async fn test_ensure_folder_renamed_on_conflict() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(request::method_path(
            "POST",
            "/v1.0/drives/drive1/root/children",
        ))
        .times(2)
        .respond_with(created(serde_json::json!({
            "id": "01FOLDER2",
            "name": "Test2 1",
            "webUrl": "https://contoso.sharepoint.com/sites/Transcripts/Shared%20Documents/Test2%201",
            "folder": {"childCount": 0}
        }))),
    );

    // Each call creates a folder; none of them fails because of the name.
    for _ in 0..2 {
        let folder = session.ensure_folder("Test2").await.expect("folder");
        assert_eq!(folder.name, "Test2 1");
        assert!(folder.web_url.ends_with("Test2%201"));
    }
}

#[tokio::test]
async fn test_ensure_folder_error_status() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(request::method_path(
            "POST",
            "/v1.0/drives/drive1/root/children",
        ))
        .respond_with(status_code(403).body(
            serde_json::json!({
                "error": {"code": "accessDenied", "message": "Access denied"}
            })
            .to_string(),
        )),
    );

    match session.ensure_folder("Test2").await {
        Err(Error::UnexpectedStatus { status, code, .. }) => {
            assert_eq!(status.as_u16(), 403);
            assert_eq!(code.as_deref(), Some("accessDenied"));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_ensure_folder_unauthorized() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(request::method_path(
            "POST",
            "/v1.0/drives/drive1/root/children",
        ))
        .respond_with(status_code(401)),
    );

    let err = session.ensure_folder("Test2").await.unwrap_err();
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn test_ensure_folder_without_web_url() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(request::method_path(
            "POST",
            "/v1.0/drives/drive1/root/children",
        ))
        .respond_with(created(serde_json::json!({"id": "01FOLDER", "name": "Test2"}))),
    );

    match session.ensure_folder("Test2").await {
        Err(Error::MalformedResponse(_)) => {}
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_ensure_folder_rejects_paths() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;

    match session.ensure_folder("Test2/Sub").await {
        Err(Error::UserError(_)) => {}
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_existing_file() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", ITEM_PATH),
            request::headers(contains(("authorization", "Bearer accesstoken"))),
        ])
        .respond_with(json_encoded(serde_json::json!({
            "id": "01FILE",
            "name": "Bob Smith_Transcript_1.pdf",
            "webUrl": "X",
            "file": {"mimeType": "application/pdf"}
        }))),
    );
    server.expect(
        Expectation::matching(request::method("PUT"))
            .times(0)
            .respond_with(status_code(201)),
    );

    let file = pdf_file();
    let result = session
        .upload("Test2", "Bob Smith_Transcript_1.pdf", file.path())
        .await;
    assert_eq!(result.into_parts(), (Some("X".to_string()), false));
}

#[tokio::test]
async fn test_upload_existence_check_unauthorized() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(request::method_path("GET", ITEM_PATH))
            .respond_with(status_code(401)),
    );
    server.expect(
        Expectation::matching(request::method("PUT"))
            .times(0)
            .respond_with(status_code(201)),
    );

    let file = pdf_file();
    let result = session
        .upload("Test2", "Bob Smith_Transcript_1.pdf", file.path())
        .await;
    assert!(result.is_auth_expired());
    assert_eq!(result.into_parts(), (None, true));
}

#[tokio::test]
async fn test_upload_new_file() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(request::method_path("GET", ITEM_PATH)).respond_with(
            status_code(404).body(
                serde_json::json!({
                    "error": {"code": "itemNotFound", "message": "The resource could not be found."}
                })
                .to_string(),
            ),
        ),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("PUT", UPLOAD_PATH),
            request::headers(contains(("authorization", "Bearer accesstoken"))),
            request::headers(contains(("content-type", "application/pdf"))),
            request::headers(contains(("content-length", "13"))),
        ])
        .respond_with(created(serde_json::json!({
            "id": "01FILE",
            "name": "Bob Smith_Transcript_1.pdf",
            "webUrl": "Y",
            "file": {"mimeType": "application/pdf"}
        }))),
    );

    let file = pdf_file();
    let result = session
        .upload("Test2", "Bob Smith_Transcript_1.pdf", file.path())
        .await;
    match result {
        UploadResult::Uploaded(ref url) => assert_eq!(url, "Y"),
        ref other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(result.into_parts(), (Some("Y".to_string()), false));
}

#[tokio::test]
async fn test_upload_after_server_error() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(request::method_path("GET", ITEM_PATH))
            .respond_with(status_code(500)),
    );
    server.expect(
        Expectation::matching(request::method_path("PUT", UPLOAD_PATH))
            .times(1)
            .respond_with(created(serde_json::json!({"webUrl": "Y"}))),
    );

    let file = pdf_file();
    match session
        .upload("Test2", "Bob Smith_Transcript_1.pdf", file.path())
        .await
    {
        UploadResult::Uploaded(url) => assert_eq!(url, "Y"),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_existing_file_without_web_url() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(request::method_path("GET", ITEM_PATH))
            .respond_with(json_encoded(serde_json::json!({"id": "01FILE"}))),
    );
    server.expect(
        Expectation::matching(request::method("PUT"))
            .times(0)
            .respond_with(status_code(201)),
    );

    let file = pdf_file();
    match session
        .upload("Test2", "Bob Smith_Transcript_1.pdf", file.path())
        .await
    {
        UploadResult::Failed(Error::MalformedResponse(_)) => {}
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_timeout_on_existence_check() {
    let _ = env_logger::try_init();
    let server = Server::run();
    expect_token(&server, 1);
    server.expect(
        Expectation::matching(request::method_path("GET", ITEM_PATH)).respond_with(
            delay_and_then(Duration::from_secs(3), status_code(404)),
        ),
    );
    server.expect(
        Expectation::matching(request::method("PUT"))
            .times(0)
            .respond_with(status_code(201)),
    );

    let client = http_client()
        .with_timeout(Duration::from_millis(500))
        .build_hyper_client()
        .expect("Hyper client to be built");
    let session = DriveSession::connect(config(&server), client)
        .await
        .expect("session to connect");

    let file = pdf_file();
    match session
        .upload("Test2", "Bob Smith_Transcript_1.pdf", file.path())
        .await
    {
        UploadResult::Failed(Error::SendError(SendError::Timeout)) => {}
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_put_unauthorized() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(request::method_path("GET", ITEM_PATH))
            .respond_with(status_code(404)),
    );
    server.expect(
        Expectation::matching(request::method_path("PUT", UPLOAD_PATH))
            .respond_with(status_code(401)),
    );

    let file = pdf_file();
    let result = session
        .upload("Test2", "Bob Smith_Transcript_1.pdf", file.path())
        .await;
    assert_eq!(result.into_parts(), (None, true));
}

#[tokio::test]
async fn test_upload_put_failure() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(request::method_path("GET", ITEM_PATH))
            .respond_with(status_code(404)),
    );
    server.expect(
        Expectation::matching(request::method_path("PUT", UPLOAD_PATH)).respond_with(
            status_code(507).body(
                serde_json::json!({
                    "error": {"code": "quotaLimitReached", "message": "Insufficient Space Available"}
                })
                .to_string(),
            ),
        ),
    );

    let file = pdf_file();
    match session
        .upload("Test2", "Bob Smith_Transcript_1.pdf", file.path())
        .await
    {
        UploadResult::Failed(Error::UnexpectedStatus { status, code, .. }) => {
            assert_eq!(status.as_u16(), 507);
            assert_eq!(code.as_deref(), Some("quotaLimitReached"));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_missing_local_file() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(request::method_path("GET", ITEM_PATH))
            .respond_with(status_code(404)),
    );
    server.expect(
        Expectation::matching(request::method("PUT"))
            .times(0)
            .respond_with(status_code(201)),
    );

    let dir = tempfile::tempdir().expect("temp dir");
    match session
        .upload(
            "Test2",
            "Bob Smith_Transcript_1.pdf",
            dir.path().join("missing.pdf"),
        )
        .await
    {
        UploadResult::Failed(Error::LowLevelError(_)) => {}
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_requires_extension() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;

    let file = pdf_file();
    match session.upload("Test2", "transcript", file.path()).await {
        UploadResult::Failed(Error::UserError(_)) => {}
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_save_folder_listing() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    let items = serde_json::json!([
        {"id": "01A", "name": "Test2", "webUrl": "https://contoso.sharepoint.com/Test2", "folder": {"childCount": 3}},
        {"id": "01B", "name": "Test3", "webUrl": "https://contoso.sharepoint.com/Test3", "folder": {"childCount": 0}}
    ]);
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/v1.0/drives/drive1/root/children",
        ))
        .times(2)
        .respond_with(json_encoded(serde_json::json!({
            "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#drives('drive1')/root/children",
            "value": items
        }))),
    );

    let listed = session.list_folders().await.expect("listing");
    assert_eq!(serde_json::Value::Array(listed), items);

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("folders_data_value.json");
    session
        .save_folder_listing(&path)
        .await
        .expect("listing saved");
    let saved = std::fs::read_to_string(&path).expect("listing file");
    assert!(saved.starts_with("[\n    {"));
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&saved).unwrap(),
        items
    );
}

#[tokio::test]
async fn test_reauthenticate() {
    let _ = env_logger::try_init();
    let server = Server::run();
    expect_token(&server, 2);
    let mut session = DriveSession::connect(config(&server), http_client())
        .await
        .expect("session to connect");

    session.reauthenticate().await.expect("new token");
    assert_eq!(session.token().as_str(), "accesstoken");
}

#[tokio::test]
async fn test_upload_then_translate_link() {
    let _ = env_logger::try_init();
    let server = Server::run();
    let session = connect(&server).await;
    server.expect(
        Expectation::matching(request::method_path("GET", ITEM_PATH))
            .respond_with(status_code(404)),
    );
    server.expect(
        Expectation::matching(request::method_path("PUT", UPLOAD_PATH)).respond_with(created(
            serde_json::json!({
                "name": "Bob Smith_Transcript_1.pdf",
                "webUrl": "https://contoso.sharepoint.com/sites/HistoricalTranscripts/Shared%20Documents/Test2/Bob%20Smith_Transcript_1.pdf"
            }),
        )),
    );

    let file = pdf_file();
    let result = session
        .upload("Test2", "Bob Smith_Transcript_1.pdf", file.path())
        .await;
    let translator = LinkTranslator::new(
        "https://contoso.sharepoint.com/sites/HistoricalTranscripts/Shared%20Documents/",
        "\\\\server\\share$\\",
    );
    assert_eq!(
        translator.to_network_path(result.web_url().expect("uploaded")),
        "\\\\server\\share$\\Test2\\Bob Smith_Transcript_1.pdf"
    );
}
