//! HTTP downloads for remote origins.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::error::OriginError;

/// Timeout for a single HTTP request, body included.
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Download `url` into `dest_dir/file_name` and return the full path.
///
/// `dest_dir` must already exist. Nothing is retried.
///
/// # Errors
///
/// [`OriginError::Download`] on a transport failure or a non-success HTTP
/// status, [`OriginError::Io`] when the file cannot be written.
pub fn download(url: &str, dest_dir: &Path, file_name: &str) -> Result<PathBuf, OriginError> {
    if !dest_dir.is_dir() {
        return Err(OriginError::Io {
            path: dest_dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let failed = |detail: String| OriginError::Download {
        url: url.to_owned(),
        detail,
    };

    let client = Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| failed(format!("failed to create HTTP client: {e}")))?;

    debug!("GET {url}");
    let mut response = client.get(url).send().map_err(|e| failed(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("HTTP {status}")));
    }

    let path = dest_dir.join(file_name);
    let mut file = File::create(&path).map_err(OriginError::io(&path))?;
    let bytes = io::copy(&mut response, &mut file).map_err(|e| failed(e.to_string()))?;
    info!("Downloaded {url} ({bytes} bytes) to {}", path.display());
    Ok(path)
}

/// The final path segment of `url`, used as the local file name.
///
/// Query strings and fragments are not part of the name.
///
/// # Errors
///
/// [`OriginError::Download`] when the URL ends in `/`.
pub fn file_name(url: &str) -> Result<&str, OriginError> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(OriginError::Download {
            url: url.to_owned(),
            detail: "URL has no file name".to_owned(),
        }),
    }
}
