use std::path::PathBuf;

use crate::error::FetchError;

/// Retrieves module source text from `url`.
///
/// `file://` URLs and bare paths are read from disk. `http://` and `https://`
/// need the `http` feature.
pub async fn fetch_source(url: &str) -> Result<String, FetchError> {
    match url.split_once("://") {
        Some(("file", path)) => read_file(PathBuf::from(path)).await,
        Some(("http" | "https", _)) => fetch_http(url).await,
        Some(_) => Err(FetchError::UnsupportedScheme(url.to_owned())),
        None => read_file(PathBuf::from(url)).await,
    }
}

async fn read_file(path: PathBuf) -> Result<String, FetchError> {
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Ok(text),
        Err(source) => Err(FetchError::Io { path, source }),
    }
}

#[cfg(feature = "http")]
async fn fetch_http(url: &str) -> Result<String, FetchError> {
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.text().await?)
}

#[cfg(not(feature = "http"))]
async fn fetch_http(url: &str) -> Result<String, FetchError> {
    Err(FetchError::UnsupportedScheme(url.to_owned()))
}
