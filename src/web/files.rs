//! Protocol document downloads.
//!
//! Each route returns one fixed file from `<static>/files` as an attachment
//! under its original name.

use super::AppState;
use crate::error::{AppError, AppResult};
use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const EXTRACTION_PROTOCOL: &str = "Extraction protocolls version 5_4.xlsx";
pub const EXTRACTION_INSTRUCTIONS: &str =
    "The perovskite database instructions for entering data version 5.4.pdf";
pub const DATABASE_INSTRUCTIONS: &str =
    "The perovskite database description of data content 5.4.pdf";

/// Route path and the file it serves.
pub const PROTOCOL_FILES: [(&str, &str); 3] = [
    ("/return_extractionProtocol", EXTRACTION_PROTOCOL),
    ("/return_extractionInstructions", EXTRACTION_INSTRUCTIONS),
    ("/return_databaseInstructions", DATABASE_INSTRUCTIONS),
];

pub fn router() -> Router<Arc<AppState>> {
    PROTOCOL_FILES
        .into_iter()
        .fold(Router::new(), |router, (path, file_name)| {
            router.route(
                path,
                get(move |State(state): State<Arc<AppState>>| async move {
                    send_attachment(&state.files_dir(), file_name).await
                }),
            )
        })
}

/// Content type picked from the file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("csv") => "text/csv; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// `Content-Disposition` value keeping the file's name.
pub fn attachment_disposition(file_name: &str) -> String {
    format!(
        "attachment; filename=\"{}\"",
        file_name.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

/// Read `dir/file_name` and return it as an attachment.
pub async fn send_attachment(dir: &Path, file_name: &str) -> AppResult<Response> {
    let path = dir.join(file_name);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::file_not_found(file_name)
        } else {
            AppError::internal(format!("Failed to read {}: {}", path.display(), e))
        }
    })?;

    info!(
        file = %file_name,
        size = %humansize::format_size(bytes.len(), humansize::WINDOWS),
        "Serving download"
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(file_name).to_string()),
            (header::CONTENT_DISPOSITION, attachment_disposition(file_name)),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(DATABASE_INSTRUCTIONS), "application/pdf");
        assert_eq!(
            content_type_for(EXTRACTION_PROTOCOL),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(content_type_for("notes"), "application/octet-stream");
    }

    #[test]
    fn test_attachment_disposition_keeps_name() {
        assert_eq!(
            attachment_disposition(EXTRACTION_PROTOCOL),
            "attachment; filename=\"Extraction protocolls version 5_4.xlsx\""
        );
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = send_attachment(dir.path(), EXTRACTION_PROTOCOL)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileNotFound { .. }));
    }
}
