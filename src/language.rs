use serde::{Deserialize, Serialize};

/// How the host should present a file when it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Code,
    Preview,
    Markdown,
}

/// Language tag for a file name, based on its extension.
pub fn detect(name: &str) -> &'static str {
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return if name == "Dockerfile" { "dockerfile" } else { "plaintext" },
    };
    match ext.as_str() {
        "html" | "htm" => "html",
        "css" => "css",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "json" => "json",
        "md" | "markdown" => "markdown",
        "kt" | "kts" => "kotlin",
        "dart" => "dart",
        "yaml" | "yml" => "yaml",
        "xml" => "xml",
        "gradle" => "gradle",
        "sh" | "bash" => "shell",
        "rs" => "rust",
        "py" => "python",
        _ => "plaintext",
    }
}

pub fn display_mode(language: &str) -> Option<DisplayMode> {
    match language {
        "html" => Some(DisplayMode::Preview),
        "markdown" => Some(DisplayMode::Markdown),
        "plaintext" => None,
        _ => Some(DisplayMode::Code),
    }
}
