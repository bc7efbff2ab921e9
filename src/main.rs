//! drive_exporter CLI - Export Google Docs in a Drive folder to various formats.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use drive_exporter::oauth::{ConsentOptions, InstalledAppFlow};
use drive_exporter::token_store::TokenStore;
use drive_exporter::{
    export_drive_path, Authenticator, DriveClient, ExportConfig, ExportFormat, FolderSelection,
    LogLevel,
};

/// Export Google Doc files in a Google Drive folder to various formats.
#[derive(Parser)]
#[command(name = "drive_exporter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder path on Google Drive for the document source, e.g. Work/Reports.
    drive_path: String,

    /// Format to export the documents as.
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = ExportFormat::Pdf)]
    format: ExportFormat,

    /// Directory to store the exported output.
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Export from every folder matching the path instead of only the first.
    #[arg(long)]
    all_matches: bool,

    /// Number of files requested per listing page.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
    page_size: Option<u32>,

    /// Also search shared drives.
    #[arg(long)]
    include_shared_drives: bool,

    /// Logging level.
    #[arg(
        long,
        alias = "logging_level",
        value_enum,
        ignore_case = true,
        default_value_t = LogLevel::Error
    )]
    logging_level: LogLevel,

    /// OAuth client secrets JSON of an installed application.
    #[arg(long, env = "DRIVE_EXPORTER_CLIENT_SECRET", default_value = "client_secret.json")]
    client_secret: PathBuf,

    /// Where user credentials are stored (default: ~/.credentials/drive-exporter.json).
    #[arg(long, env = "DRIVE_EXPORTER_CREDENTIALS")]
    credential_store: Option<PathBuf>,

    /// Authenticate with a service account JSON key instead of user credentials.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    service_account: Option<PathBuf>,

    /// Use an already obtained OAuth2 access token.
    #[arg(long, env = "DRIVE_EXPORTER_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Paste the authorization redirect instead of running a local web server.
    #[arg(long, alias = "noauth_local_webserver")]
    noauth_local_webserver: bool,

    /// Host name of the local authorization web server.
    #[arg(long, alias = "auth_host_name", default_value = "localhost")]
    auth_host_name: String,

    /// Ports tried for the local authorization web server.
    #[arg(
        long,
        alias = "auth_host_port",
        num_args = 1..,
        default_values_t = [8080u16, 8090]
    )]
    auth_host_port: Vec<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.logging_level);

    let auth = build_authenticator(&cli)?;
    auth.authorize()
        .await
        .context("Failed to obtain Google Drive credentials")?;

    let client = DriveClient::new(auth).include_shared_drives(cli.include_shared_drives);

    let selection = if cli.all_matches {
        FolderSelection::All
    } else {
        FolderSelection::First
    };
    let config = ExportConfig::new(cli.format, &cli.out)
        .with_folder_selection(selection)
        .with_page_size(cli.page_size);

    let written = export_drive_path(&client, &cli.drive_path, &config)
        .await
        .with_context(|| format!("Failed to export documents from {:?}", cli.drive_path))?;

    println!(
        "Exported {} document(s) as {} to {:?}",
        written, cli.format, cli.out
    );

    Ok(())
}

/// Pick the token source: access token, then service account, then user credentials.
fn build_authenticator(cli: &Cli) -> Result<Authenticator> {
    if let Some(ref token) = cli.access_token {
        return Ok(Authenticator::from_access_token(token.clone()));
    }

    if let Some(ref path) = cli.service_account {
        return Authenticator::from_service_account_file(path)
            .with_context(|| format!("Failed to load service account from {:?}", path));
    }

    let flow = InstalledAppFlow::from_file(&cli.client_secret)
        .with_context(|| format!("Failed to load client secrets from {:?}", cli.client_secret))?;

    let store_path = match cli.credential_store {
        Some(ref path) => path.clone(),
        None => TokenStore::default_path()?,
    };

    let consent = ConsentOptions {
        local_webserver: !cli.noauth_local_webserver,
        host: cli.auth_host_name.clone(),
        ports: cli.auth_host_port.clone(),
        open_browser: !cli.noauth_local_webserver,
    };

    Ok(Authenticator::installed_app(
        flow,
        TokenStore::new(store_path),
        consent,
    ))
}

fn setup_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).without_time())
        .with(filter)
        .init();
}
