//! drive_exporter - Export Google Docs from a Drive folder path.
//!
//! This library provides functionality to:
//! - Authenticate with user OAuth2 credentials, a service account or a bearer token
//! - Resolve a slash-separated folder path to Drive folder identifiers
//! - Export every Google Doc in the folder to PDF, HTML, text, RTF, ODF or Word
//!
//! # Example
//!
//! ```no_run
//! use drive_exporter::{export_drive_path, Authenticator, DriveClient, ExportConfig, ExportFormat};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = Authenticator::from_service_account_file("service-account.json")?;
//!     let client = DriveClient::new(auth);
//!
//!     let config = ExportConfig::new(ExportFormat::Pdf, "exports");
//!     let written = export_drive_path(&client, "Work/Reports", &config).await?;
//!     println!("Exported {} document(s)", written);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod exporter;
pub mod format;
pub mod models;
pub mod oauth;
pub mod query;
pub mod resolver;
pub mod token_store;

// Re-exports for convenience
pub use auth::Authenticator;
pub use client::{DriveApi, DriveClient};
pub use config::{ExportConfig, FolderSelection, LogLevel};
pub use error::{DriveError, Result};
pub use exporter::{export_drive_path, Exporter};
pub use format::ExportFormat;
pub use models::{DriveFile, FolderIdSet};
pub use resolver::PathResolver;
