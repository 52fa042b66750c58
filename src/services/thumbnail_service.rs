use std::io::Cursor;
use std::sync::LazyLock;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;

use crate::domain::Article;
use crate::errors::{NewsError, NewsResult};

pub const THUMB_SIZE: u32 = 96;
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").unwrap());

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Best candidate image for an article: its feed image, else the first
/// absolute `<img>` in the summary.
pub fn extract_thumbnail_url(article: &Article) -> Option<String> {
    if let Some(url) = article.image_url.as_deref().filter(|u| is_http(u)) {
        return Some(url.to_string());
    }

    let fragment = Html::parse_fragment(&article.summary.content);
    fragment
        .select(&IMG_SELECTOR)
        .filter_map(|img| img.value().attr("src"))
        .find(|src| is_http(src))
        .map(str::to_string)
}

pub struct ThumbnailService {
    client: Client,
    max_bytes: usize,
}

impl ThumbnailService {
    pub fn new() -> NewsResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("newsfeed/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            max_bytes: MAX_IMAGE_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Download, crop to a square and re-encode as a WebP data URI.
    /// Returns `None` on any failure.
    pub async fn fetch_thumbnail(&self, url: &str) -> Option<String> {
        match self.try_fetch(url).await {
            Ok(data_uri) => Some(data_uri),
            Err(e) => {
                debug!(url, error = %e, "Thumbnail generation failed");
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> NewsResult<String> {
        let mut response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(NewsError::Upstream(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let too_large =
            || NewsError::Upstream(format!("{} is larger than {} bytes", url, self.max_bytes));
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(too_large());
        }

        // Content-Length may be absent or wrong
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        // Decoding is CPU bound
        tokio::task::spawn_blocking(move || encode_thumbnail(&bytes))
            .await
            .map_err(std::io::Error::from)?
    }
}

pub fn encode_thumbnail(bytes: &[u8]) -> NewsResult<String> {
    let image = image::load_from_memory(bytes)?;
    let square = image.resize_to_fill(THUMB_SIZE, THUMB_SIZE, FilterType::Lanczos3);
    let rgba = DynamicImage::ImageRgba8(square.to_rgba8());

    let mut buffer = Cursor::new(Vec::new());
    rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?;

    Ok(format!(
        "data:image/webp;base64,{}",
        STANDARD.encode(buffer.into_inner())
    ))
}
