//! Text extraction for lesson transcripts.
//! Supports: TXT, PDF

use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

/// Extensions accepted as lesson transcripts.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["txt", "pdf"];

// Runs of spaces or tabs left behind by PDF layout.
static INLINE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("Invalid regex: inline whitespace"));

/// Whether `file_name` has a transcript extension (case-insensitive).
pub fn is_supported(file_name: &str) -> bool {
    extension_of(file_name)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_of(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Extract text content from file data based on the file extension.
pub fn extract_text_from_file(file_name: &str, file_data: &[u8]) -> Result<String, String> {
    let extension = extension_of(file_name).unwrap_or_default();

    info!("Extracting text from file: {} (type: {})", file_name, extension);

    match extension.as_str() {
        "txt" => String::from_utf8(file_data.to_vec()).map_err(|e| format!("Invalid UTF-8 content: {}", e)),
        "pdf" => extract_pdf_text(file_data),
        _ => Err(format!("Unsupported file extension: {}", extension)),
    }
}

fn extract_pdf_text(file_data: &[u8]) -> Result<String, String> {
    match pdf_extract::extract_text_from_mem(file_data) {
        Ok(text) => {
            let cleaned = clean_extracted_text(&text);
            info!("PDF extraction successful: {} characters", cleaned.chars().count());
            Ok(cleaned)
        }
        Err(e) => {
            warn!("PDF extraction failed: {}", e);
            Err(format!("Failed to extract PDF text: {}", e))
        }
    }
}

/// Trims lines, collapses inline whitespace and drops empty lines.
fn clean_extracted_text(text: &str) -> String {
    text.lines()
        .map(|line| INLINE_WHITESPACE.replace_all(line.trim(), " "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
