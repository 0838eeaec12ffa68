//! Image localization for page bundles
//!
//! In the bundle layout every image a record references (body `<img>` tags,
//! the featured image, product gallery images) is downloaded next to the
//! record's `index.md`. Localized `<img>` tags in the body become Hugo
//! `{{< img >}}` shortcodes pointing at the local copy. A failed download is
//! logged and leaves that image pointing at its remote URL.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, info, warn};

/// Per-request timeout for image downloads
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Extensions kept as-is; anything else is saved as `.jpg`
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "bmp"];
const FALLBACK_EXTENSION: &str = "jpg";
const FALLBACK_STEM: &str = "image";

static IMG_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\ssrc\s*=\s*"([^"]+)"[^>]*>"#).expect("img pattern is valid")
});

static ALT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\salt\s*=\s*"([^"]*)""#).expect("alt pattern is valid"));

/// Error fetching one image
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP status {0}")]
    Status(u16),
}

/// Downloads image bytes by URL
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP fetcher
#[cfg(feature = "bundle-images")]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "bundle-images")]
impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("wp-hugo-export/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "bundle-images")]
impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .map_err(|e| FetchError::Request(format!("Failed to read body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

/// `src` of every `<img>` tag, in document order, without duplicates
pub fn image_sources(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    IMG_TAG_RE
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .filter(|src| seen.insert(src.clone()))
        .collect()
}

/// Absolute download URL for an image source as written in the record
///
/// Protocol-relative sources get `https:`; site-relative ones need
/// `site_url`. Inline `data:` images are never downloaded.
pub fn absolute_url(source: &str, site_url: Option<&str>) -> Option<String> {
    let source = source.trim();
    if source.is_empty() || source.starts_with("data:") {
        return None;
    }
    if source.starts_with("//") {
        return Some(format!("https:{}", source));
    }
    if source.contains("://") {
        return Some(source.to_string());
    }

    let site = site_url?.trim_end_matches('/');
    Some(match source.strip_prefix('/') {
        Some(path) => format!("{}/{}", site, path),
        None => format!("{}/{}", site, source),
    })
}

/// File name of the local copy: the URL's base name with a known image
/// extension, lowercased
pub fn local_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = match path.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, p)| p),
        None => path,
    };
    let file = path.rsplit('/').next().unwrap_or_default();

    let (stem, extension) = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext.to_ascii_lowercase()),
        _ => (file, String::new()),
    };
    let extension = if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        extension
    } else {
        FALLBACK_EXTENSION.to_string()
    };

    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem.as_str() };

    format!("{}.{}", stem, extension)
}

/// `name`, or `name` with `-2`, `-3`, … before the extension when taken
fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let (stem, extension) = name.rsplit_once('.').unwrap_or((name, FALLBACK_EXTENSION));
    (2..)
        .map(|n| format!("{}-{}.{}", stem, n, extension))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Images of one record that were saved into its bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalImages {
    /// (source as written in the record, local file name), download order
    entries: Vec<(String, String)>,
}

impl LocalImages {
    /// Local file name for a source, if it was downloaded
    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, name)| name.as_str())
    }

    /// Local name for a source, or the source itself
    pub fn resolve(&self, source: &str) -> String {
        self.get(source).unwrap_or(source).to_string()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(_, name)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Downloads a record's images into its bundle directory
pub struct ImageLocalizer<'a> {
    fetcher: &'a dyn ImageFetcher,
    site_url: Option<&'a str>,
}

impl<'a> ImageLocalizer<'a> {
    pub fn new(fetcher: &'a dyn ImageFetcher, site_url: Option<&'a str>) -> Self {
        Self { fetcher, site_url }
    }

    /// Download every source into `bundle_dir`. Failures are logged and
    /// skipped; only images actually saved are returned.
    pub fn localize(&self, sources: &[String], bundle_dir: &Path) -> LocalImages {
        let mut local = LocalImages::default();
        let mut taken: HashSet<String> = HashSet::new();

        for source in sources {
            if source.is_empty() || local.get(source).is_some() {
                continue;
            }
            let Some(url) = absolute_url(source, self.site_url) else {
                warn!("Cannot resolve image URL '{}', left as is", source);
                continue;
            };

            let bytes = match self.fetcher.fetch(&url) {
                Ok(bytes) if bytes.is_empty() => {
                    warn!("Failed to download {}: empty response body", url);
                    continue;
                }
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Failed to download {}: {}", url, e);
                    continue;
                }
            };

            let name = unique_name(&local_name(&url), &taken);
            let path = bundle_dir.join(&name);
            if let Err(e) =
                std::fs::create_dir_all(bundle_dir).and_then(|_| std::fs::write(&path, &bytes))
            {
                warn!("Failed to save {} to {}: {}", url, path.display(), e);
                continue;
            }

            debug!("Downloaded {} to {}", url, path.display());
            taken.insert(name.clone());
            local.entries.push((source.clone(), name));
        }

        if !local.is_empty() {
            info!(
                "Saved {} of {} image(s) into {}",
                local.len(),
                sources.len(),
                bundle_dir.display()
            );
        }
        local
    }
}

/// Replace `<img>` tags whose source was downloaded with `{{< img >}}`
/// shortcodes. Other tags are left untouched.
///
/// Expects the entity-decoded body. The alt text comes from the tag, or
/// `fallback_alt` when it has none.
pub fn rewrite_img_tags(html: &str, images: &LocalImages, fallback_alt: &str) -> String {
    if images.is_empty() {
        return html.to_string();
    }
    IMG_TAG_RE
        .replace_all(html, |caps: &Captures| match images.get(&caps[1]) {
            Some(name) => {
                let alt = ALT_RE
                    .captures(&caps[0])
                    .map(|alt| alt[1].to_string())
                    .filter(|alt| !alt.is_empty())
                    .unwrap_or_else(|| fallback_alt.replace('"', "\\\""));
                format!("{{{{< img src=\"{}\" alt=\"{}\" >}}}}", name, alt)
            }
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// In-memory fetcher serving canned responses, recording every request
#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::{FetchError, ImageFetcher};

    #[derive(Default)]
    pub struct StaticFetcher {
        responses: HashMap<String, Result<Vec<u8>, u16>>,
        pub requested: RefCell<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn serve(mut self, url: &str, bytes: &[u8]) -> Self {
            self.responses.insert(url.to_string(), Ok(bytes.to_vec()));
            self
        }

        pub fn status(mut self, url: &str, status: u16) -> Self {
            self.responses.insert(url.to_string(), Err(status));
            self
        }
    }

    impl ImageFetcher for StaticFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requested.borrow_mut().push(url.to_string());
            match self.responses.get(url) {
                Some(Ok(bytes)) => Ok(bytes.clone()),
                Some(Err(status)) => Err(FetchError::Status(*status)),
                None => Err(FetchError::Request(format!("connection refused: {}", url))),
            }
        }
    }
}
