//! Export formats supported by the Drive export endpoint for Google Docs.

use clap::ValueEnum;

const HTML_MIME: &str = "text/html";
const TEXT_MIME: &str = "text/plain";
const RTF_MIME: &str = "application/rtf";
const PDF_MIME: &str = "application/pdf";
const ODF_MIME: &str = "application/vnd.oasis.opendocument.text";
const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Output format a document is exported as.
///
/// Each key doubles as the extension of the written file, so `doc` and
/// `docx` request the same MIME type but name their output differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum ExportFormat {
    Htm,
    Html,
    Txt,
    Text,
    Rtf,
    #[default]
    Pdf,
    Odf,
    Doc,
    Docx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 9] = [
        Self::Htm,
        Self::Html,
        Self::Txt,
        Self::Text,
        Self::Rtf,
        Self::Pdf,
        Self::Odf,
        Self::Doc,
        Self::Docx,
    ];

    /// MIME type passed to the export endpoint.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Htm | Self::Html => HTML_MIME,
            Self::Txt | Self::Text => TEXT_MIME,
            Self::Rtf => RTF_MIME,
            Self::Pdf => PDF_MIME,
            Self::Odf => ODF_MIME,
            Self::Doc | Self::Docx => DOCX_MIME,
        }
    }

    /// File extension of exported files, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Htm => "htm",
            Self::Html => "html",
            Self::Txt => "txt",
            Self::Text => "text",
            Self::Rtf => "rtf",
            Self::Pdf => "pdf",
            Self::Odf => "odf",
            Self::Doc => "doc",
            Self::Docx => "docx",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
