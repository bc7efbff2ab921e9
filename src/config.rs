//! Run configuration passed explicitly to the resolver and export loop.

use std::path::PathBuf;

use clap::ValueEnum;

use crate::format::ExportFormat;

/// Which folders to export when the final path segment is ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderSelection {
    /// Only the first folder the provider returned.
    #[default]
    First,
    /// Every folder that matched, in provider order.
    All,
}

impl FolderSelection {
    /// Pick the folders to export from the resolved candidates.
    pub fn select<'a>(&self, ids: &'a [String]) -> &'a [String] {
        match self {
            Self::First => &ids[..ids.len().min(1)],
            Self::All => ids,
        }
    }
}

/// Settings for one export run.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub out_dir: PathBuf,
    pub folder_selection: FolderSelection,
    /// Listing page size; `None` leaves it to the provider.
    pub page_size: Option<u32>,
}

impl ExportConfig {
    pub fn new(format: ExportFormat, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            format,
            out_dir: out_dir.into(),
            folder_selection: FolderSelection::default(),
            page_size: None,
        }
    }

    pub fn with_folder_selection(mut self, selection: FolderSelection) -> Self {
        self.folder_selection = selection;
        self
    }

    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::new(ExportFormat::default(), ".")
    }
}

/// Verbosity accepted by `--logging-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    #[default]
    Error,
    Critical,
}

impl LogLevel {
    fn as_tracing(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }

    /// `EnvFilter` directive for this level.
    ///
    /// Dependencies never log below `warn`, so HTTP internals stay quiet at
    /// `DEBUG` and `INFO`.
    pub fn filter_directive(self) -> String {
        let level = self.as_tracing();
        let deps = match self {
            Self::Debug | Self::Info => "warn",
            _ => level,
        };
        format!("{deps},{}={level}", env!("CARGO_CRATE_NAME"))
    }
}
