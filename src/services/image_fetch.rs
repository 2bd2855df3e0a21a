//! Remote image download for the LinkedIn importer

use std::io::Write;
use tempfile::NamedTempFile;
use url::Url;

pub const FALLBACK_FILENAME: &str = "linkedin_image.jpg";

/// A downloaded image waiting to be moved into media storage
#[derive(Debug)]
pub struct DownloadedImage {
    pub file: NamedTempFile,
    /// Name taken from the URL, used for the stored extension
    pub filename: String,
}

/// Last path segment when it looks like a file name
pub fn filename_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| name.contains('.'))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Stream an image into a temporary file; `None` on any failure
pub async fn download_image(client: &reqwest::Client, url: &str) -> Option<DownloadedImage> {
    match fetch_to_temp(client, url).await {
        Ok(file) => Some(DownloadedImage {
            file,
            filename: filename_from_url(url),
        }),
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Failed to download image");
            None
        }
    }
}

async fn fetch_to_temp(client: &reqwest::Client, url: &str) -> anyhow::Result<NamedTempFile> {
    let mut response = client.get(url).send().await?.error_for_status()?;

    let mut file = NamedTempFile::new()?;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)?;
    }
    file.flush()?;
    Ok(file)
}
