use std::path::Path;

use weedfs_core::models::DEFAULT_UPLOAD_NAME;

/// Name to upload a local file under: its file name, unless overridden.
pub fn upload_name(path: &Path, name: Option<&str>) -> String {
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_UPLOAD_NAME)
        .to_string()
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
