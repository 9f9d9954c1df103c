use getopts::{Fail, HasArg, Occur, Options};
use graph_upload::{self as graph, DefaultHyperClientBuilder, DriveSession, HyperClientBuilder, UploadResult};
use std::env;
use std::path::Path;

fn usage(program: &str, opts: &Options, err: Option<Fail>) -> ! {
    if let Some(err) = err {
        eprintln!("{}", err);
        std::process::exit(1);
    }
    println!("{}", opts.short_usage(program));
    println!(
        "{}",
        opts.usage(
            "Creates a folder in a SharePoint document library and uploads a PDF into it.\n\
             Without --config, tenant_id, client_id, client_secret and drive_id (or\n\
             site_host and site_path) are read from the environment."
        )
    );
    std::process::exit(0);
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let prog = args[0].clone();

    let mut opts = Options::new();
    opts.opt("c", "config", "JSON configuration file", "FILE", HasArg::Yes, Occur::Optional)
        .opt("d", "folder", "folder to create under the drive root", "NAME", HasArg::Yes, Occur::Req)
        .opt("f", "file", "local PDF to upload", "PATH", HasArg::Yes, Occur::Optional)
        .opt("n", "name", "file name on the service, defaults to the local one", "NAME", HasArg::Yes, Occur::Optional)
        .opt("l", "list", "save the drive root listing to this file", "FILE", HasArg::Yes, Occur::Optional)
        .optflag("h", "help", "print this help");

    let m = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => usage(&prog, &opts, Some(e)),
    };
    if m.opt_present("h") {
        usage(&prog, &opts, None);
    }

    let config = match m.opt_str("c") {
        Some(path) => graph::read_config(path).await,
        None => graph::Config::from_env(),
    }
    .unwrap_or_else(|e| {
        eprintln!("configuration: {}", e);
        std::process::exit(1);
    });

    let mut client = DefaultHyperClientBuilder::default();
    if let Some(timeout) = config.timeout() {
        client = client.with_timeout(timeout);
    }
    let client = client.build_hyper_client().unwrap_or_else(|e| {
        eprintln!("http client: {}", e);
        std::process::exit(1);
    });

    let session = DriveSession::connect(config, client).await.unwrap_or_else(|e| {
        eprintln!("connect: {}", e);
        std::process::exit(1);
    });

    let translator = session.config().link_translator();

    if let Some(list) = m.opt_str("l") {
        if let Err(e) = session.save_folder_listing(&list).await {
            eprintln!("listing: {}", e);
        }
    }

    let folder = session
        .ensure_folder(&m.opt_str("d").unwrap_or_default())
        .await
        .unwrap_or_else(|e| {
            eprintln!("create folder: {}", e);
            std::process::exit(1);
        });
    println!("folder {} at {}", folder.name, folder.web_url);

    let local = match m.opt_str("f") {
        Some(local) => local,
        None => return,
    };
    let file_name = m.opt_str("n").unwrap_or_else(|| {
        Path::new(&local)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let result = session.upload(&folder.name, &file_name, &local).await;
    match result {
        UploadResult::AlreadyExists(ref url) => println!("already exists: {}", url),
        UploadResult::Uploaded(ref url) => println!("uploaded: {}", url),
        UploadResult::AuthExpired => {
            eprintln!("access token expired, run again");
            std::process::exit(2);
        }
        UploadResult::Failed(ref e) => {
            eprintln!("upload failed: {}", e);
            std::process::exit(1);
        }
    }

    if let (Some(translator), Some(url)) = (translator, result.web_url()) {
        println!("network path: {}", translator.to_network_path(url));
    }
}
