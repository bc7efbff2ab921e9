//! Tests for the export loop against an in-memory Drive.

mod common;

use std::fs;
use std::path::Path;

use common::FakeDrive;
use drive_exporter::{
    export_drive_path, DriveError, ExportConfig, ExportFormat, Exporter, FolderSelection,
};
use tempfile::TempDir;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

mod export_all {
    use super::*;

    #[tokio::test]
    async fn empty_folder_writes_nothing() {
        let drive = FakeDrive::new().folder("f1", "Empty", None);
        let tmp = TempDir::new().unwrap();
        let config = ExportConfig::new(ExportFormat::Pdf, tmp.path().join("out"));

        let written = Exporter::new(&drive, &config).export_all("f1").await.unwrap();

        assert_eq!(written, 0);
        assert!(drive.export_calls().is_empty());
        assert!(!tmp.path().join("out").exists());
    }

    #[tokio::test]
    async fn follows_pages_until_cursor_is_absent() {
        let drive = FakeDrive::new()
            .folder("f1", "Docs", None)
            .document("d1", "Alpha", "f1")
            .document("d2", "Beta", "f1")
            .document("d3", "Gamma", "f1");
        let tmp = TempDir::new().unwrap();
        let config = ExportConfig::new(ExportFormat::Txt, tmp.path()).with_page_size(Some(1));

        let written = Exporter::new(&drive, &config).export_all("f1").await.unwrap();

        assert_eq!(written, 3);
        assert_eq!(drive.list_calls().len(), 3);
        assert_eq!(file_names(tmp.path()), vec!["Alpha.txt", "Beta.txt", "Gamma.txt"]);
        assert_eq!(
            fs::read(tmp.path().join("Beta.txt")).unwrap(),
            FakeDrive::content_for("d2")
        );
    }

    #[tokio::test]
    async fn lists_only_documents_of_the_folder() {
        let drive = FakeDrive::new()
            .folder("f1", "Docs", None)
            .folder("f2", "Other", None)
            .document("d1", "Mine", "f1")
            .spreadsheet("s1", "Budget", "f1")
            .document("d2", "Elsewhere", "f2");
        let tmp = TempDir::new().unwrap();
        let config = ExportConfig::new(ExportFormat::Pdf, tmp.path());

        let written = Exporter::new(&drive, &config).export_all("f1").await.unwrap();

        assert_eq!(written, 1);
        assert_eq!(file_names(tmp.path()), vec!["Mine.pdf"]);
        assert!(drive.list_calls()[0].contains("'f1' in parents"));
    }

    #[tokio::test]
    async fn sanitizes_path_separators() {
        let drive = FakeDrive::new()
            .folder("f1", "Docs", None)
            .document("d1", "a/b", "f1");
        let tmp = TempDir::new().unwrap();
        let config = ExportConfig::new(ExportFormat::Pdf, tmp.path());

        Exporter::new(&drive, &config).export_all("f1").await.unwrap();

        assert_eq!(file_names(tmp.path()), vec!["a_b.pdf"]);
        assert!(!tmp.path().join("a").exists());
    }

    #[tokio::test]
    async fn duplicate_names_keep_last_export() {
        let drive = FakeDrive::new()
            .folder("f1", "Docs", None)
            .document("d1", "dup", "f1")
            .document("d2", "dup", "f1");
        let tmp = TempDir::new().unwrap();
        let config = ExportConfig::new(ExportFormat::Html, tmp.path());

        let written = Exporter::new(&drive, &config).export_all("f1").await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(file_names(tmp.path()), vec!["dup.html"]);
        assert_eq!(
            fs::read(tmp.path().join("dup.html")).unwrap(),
            FakeDrive::content_for("d2")
        );
    }

    #[tokio::test]
    async fn docx_uses_word_mime_type() {
        let drive = FakeDrive::new()
            .folder("f1", "Docs", None)
            .document("d1", "Plan", "f1");
        let tmp = TempDir::new().unwrap();
        let config = ExportConfig::new(ExportFormat::Docx, tmp.path());

        Exporter::new(&drive, &config).export_all("f1").await.unwrap();

        assert_eq!(
            drive.export_calls(),
            vec![("d1".to_string(), DOCX_MIME.to_string())]
        );
        assert_eq!(file_names(tmp.path()), vec!["Plan.docx"]);
    }

    #[tokio::test]
    async fn creates_output_directory_and_overwrites() {
        let drive = FakeDrive::new()
            .folder("f1", "Docs", None)
            .document("d1", "Plan", "f1");
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("nested").join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("Plan.rtf"), "stale content that is longer than the export").unwrap();
        let config = ExportConfig::new(ExportFormat::Rtf, &out);

        Exporter::new(&drive, &config).export_all("f1").await.unwrap();

        assert_eq!(fs::read(out.join("Plan.rtf")).unwrap(), FakeDrive::content_for("d1"));
    }

    #[tokio::test]
    async fn failing_export_aborts_and_keeps_earlier_files() {
        let drive = FakeDrive::new()
            .folder("f1", "Docs", None)
            .document("d1", "First", "f1")
            .document("d2", "Second", "f1")
            .document("d3", "Third", "f1")
            .failing_export("d2");
        let tmp = TempDir::new().unwrap();
        let config = ExportConfig::new(ExportFormat::Pdf, tmp.path());

        let err = Exporter::new(&drive, &config).export_all("f1").await.unwrap_err();

        assert!(matches!(err, DriveError::ApiError { status: 500, .. }));
        assert_eq!(file_names(tmp.path()), vec!["First.pdf"]);
        assert_eq!(drive.export_calls().len(), 2);
    }

    #[tokio::test]
    async fn unwritable_output_is_a_filesystem_error() {
        let drive = FakeDrive::new()
            .folder("f1", "Docs", None)
            .document("d1", "Plan", "f1");
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();
        let config = ExportConfig::new(ExportFormat::Pdf, &blocker);

        let err = Exporter::new(&drive, &config).export_all("f1").await.unwrap_err();

        assert!(matches!(err, DriveError::Filesystem { .. }));
    }
}

mod drive_path {
    use super::*;

    fn ambiguous_drive() -> FakeDrive {
        FakeDrive::new()
            .folder("w1", "Work", None)
            .folder("n1", "Notes", Some("w1"))
            .folder("n2", "Notes", Some("w1"))
            .document("d1", "Monday", "n1")
            .document("d2", "Tuesday", "n2")
    }

    #[tokio::test]
    async fn first_selection_exports_first_match_only() {
        let drive = ambiguous_drive();
        let tmp = TempDir::new().unwrap();
        let config = ExportConfig::new(ExportFormat::Pdf, tmp.path());

        let written = export_drive_path(&drive, "Work/Notes", &config).await.unwrap();

        assert_eq!(written, 1);
        assert_eq!(file_names(tmp.path()), vec!["Monday.pdf"]);
    }

    #[tokio::test]
    async fn all_selection_exports_every_match() {
        let drive = ambiguous_drive();
        let tmp = TempDir::new().unwrap();
        let config = ExportConfig::new(ExportFormat::Pdf, tmp.path())
            .with_folder_selection(FolderSelection::All);

        let written = export_drive_path(&drive, "Work/Notes", &config).await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(file_names(tmp.path()), vec!["Monday.pdf", "Tuesday.pdf"]);
    }

    #[tokio::test]
    async fn unresolved_path_exports_nothing() {
        let drive = ambiguous_drive();
        let tmp = TempDir::new().unwrap();
        let config = ExportConfig::new(ExportFormat::Pdf, tmp.path());

        let err = export_drive_path(&drive, "Work/Missing", &config)
            .await
            .unwrap_err();

        assert!(matches!(err, DriveError::FolderNotFound { ref name } if name == "Missing"));
        assert!(drive.export_calls().is_empty());
    }
}
