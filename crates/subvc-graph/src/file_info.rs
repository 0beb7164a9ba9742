/// Descriptive metadata derived from a file path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// Last path component.
    pub file_name: String,
    /// Lower-cased text after the last dot of the name; empty for dotfiles
    /// and names without a dot.
    pub file_extension: String,
    /// MIME type guessed from the extension.
    pub content_type: String,
}

const OCTET_STREAM: &str = "application/octet-stream";

impl FileInfo {
    pub fn from_path(path: &str) -> Self {
        let file_name = path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(path)
            .to_string();
        let file_extension = match file_name.rfind('.') {
            Some(0) | None => String::new(),
            Some(idx) => file_name[idx + 1..].to_ascii_lowercase(),
        };
        let content_type = content_type_for(&file_extension).to_string();
        Self {
            file_name,
            file_extension,
            content_type,
        }
    }
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "txt" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "json" => "application/json",
        "yaml" | "yml" => "application/yaml",
        "toml" => "application/toml",
        "js" | "mjs" => "text/javascript",
        "ts" => "text/x-typescript",
        "py" => "text/x-python",
        "java" => "text/x-java",
        "c" | "h" => "text/x-c",
        "cpp" | "cc" | "hpp" => "text/x-c++",
        "rs" => "text/x-rust",
        "go" => "text/x-go",
        "rb" => "text/x-ruby",
        "sh" => "application/x-sh",
        "sql" => "application/sql",
        "ipynb" => "application/x-ipynb+json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => OCTET_STREAM,
    }
}
