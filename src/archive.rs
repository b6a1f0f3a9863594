use crate::error::{ArchiveError, FsError};
use crate::path;
use crate::workspace::Workspace;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ARCHIVE_NAME: &str = "portfolio.zip";

fn mime_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "md" => "text/markdown",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "zip" => "application/zip",
        _ => "text/plain",
    }
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// A file handed to the browser for download.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Download {
    pub file_name: String,
    pub url: String,
}

/// Single file download with its effective content.
pub fn download_file(workspace: &Workspace, target: &str) -> Result<Download, FsError> {
    if workspace.registry().is_dir(target) {
        return Err(FsError::IsADirectory(target.to_string()));
    }
    let content = workspace
        .content(target)
        .ok_or_else(|| FsError::NotFound(target.to_string()))?;
    let file_name = path::file_name(target).to_string();
    Ok(Download {
        url: data_url(mime_for(&file_name), content.as_bytes()),
        file_name,
    })
}

/// Zip every visible file. Archive entry names are the record paths
/// without the leading slash.
pub fn export_project(workspace: &Workspace) -> Result<Vec<u8>, ArchiveError> {
    let files: Vec<_> = workspace
        .registry()
        .records()
        .iter()
        .filter(|r| !r.is_marker())
        .collect();
    if files.is_empty() {
        return Err(ArchiveError::Empty);
    }
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for record in &files {
        let content = workspace.content(&record.path).unwrap_or(&record.content);
        zip.start_file(record.path.trim_start_matches('/'), options)?;
        zip.write_all(content.as_bytes())?;
    }
    let bytes = zip.finish()?.into_inner();
    tracing::info!(files = files.len(), bytes = bytes.len(), "project exported");
    Ok(bytes)
}

pub fn export_project_download(workspace: &Workspace) -> Result<Download, ArchiveError> {
    let bytes = export_project(workspace)?;
    Ok(Download {
        file_name: ARCHIVE_NAME.to_string(),
        url: data_url(mime_for(ARCHIVE_NAME), &bytes),
    })
}
