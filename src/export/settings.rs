//! Export settings file support
//!
//! Handles parsing of `wp-hugo-export.toml`, which maps content types to a
//! Hugo layout and output directory and picks the output layout.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::database::ConfigError;
use crate::models::ContentType;

/// Settings filename looked up in the WordPress root
pub const SETTINGS_FILENAME: &str = "wp-hugo-export.toml";

/// Directory under the export root that holds the content tree
pub const DEFAULT_CONTENT_DIR: &str = "content";

/// How artifacts are laid out on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLayout {
    /// `content/{dir}/{date}-{slug}.md` (default)
    #[default]
    Flat,
    /// `content/{dir}/{slug}/index.md`, a Hugo page bundle
    Bundle,
}

impl std::str::FromStr for OutputLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(OutputLayout::Flat),
            "bundle" => Ok(OutputLayout::Bundle),
            _ => Err(format!("Unknown output layout: {}. Use 'flat' or 'bundle'.", s)),
        }
    }
}

impl fmt::Display for OutputLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputLayout::Flat => write!(f, "flat"),
            OutputLayout::Bundle => write!(f, "bundle"),
        }
    }
}

/// Per-type section. Unset fields fall back to the type's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSettings {
    /// Hugo layout written to the `layout` key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    /// Directory under the content dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

/// Resolved layout and directory of one content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTarget<'a> {
    pub layout: &'a str,
    pub dir: &'a str,
}

/// Main settings structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default)]
    pub output_layout: OutputLayout,

    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Download images into page bundles (bundle layout only)
    #[serde(default = "default_true")]
    pub download_images: bool,

    /// Base URL for site-relative image sources. Read from the `home`
    /// option when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,

    #[serde(default)]
    pub post: TypeSettings,

    #[serde(default)]
    pub page: TypeSettings,

    #[serde(default)]
    pub product: TypeSettings,
}

fn default_content_dir() -> String {
    DEFAULT_CONTENT_DIR.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_layout: OutputLayout::default(),
            content_dir: default_content_dir(),
            download_images: true,
            site_url: None,
            post: TypeSettings::default(),
            page: TypeSettings::default(),
            product: TypeSettings::default(),
        }
    }
}

impl ExportSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from an explicit file. The file must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e.to_string()))?;
        Self::parse(&content)
    }

    /// Load `wp-hugo-export.toml` from the WordPress root, or the defaults
    /// when there is none
    pub fn load_from_root(wp_root: &Path) -> Result<Self, ConfigError> {
        let path = Self::default_path(wp_root);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn default_path(wp_root: &Path) -> PathBuf {
        wp_root.join(SETTINGS_FILENAME)
    }

    /// Parse and validate settings from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializationError(e.to_string()))
    }

    /// Directories must be relative and stay below the export root
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_dir("content_dir", &self.content_dir)?;
        if let Some(url) = self
            .site_url
            .as_deref()
            .filter(|url| !(url.starts_with("http://") || url.starts_with("https://")))
        {
            return Err(ConfigError::InvalidValue(format!(
                "site_url must be an http(s) URL, got '{}'",
                url
            )));
        }
        for (name, section) in [
            ("post.dir", &self.post),
            ("page.dir", &self.page),
            ("product.dir", &self.product),
        ] {
            if let Some(dir) = &section.dir {
                validate_dir(name, dir)?;
            }
        }
        for (name, section) in [
            ("post.layout", &self.post),
            ("page.layout", &self.page),
            ("product.layout", &self.product),
        ] {
            if section.layout.as_deref().is_some_and(|l| l.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }

    /// Whether records get their images downloaded into the bundle
    pub fn localizes_images(&self) -> bool {
        self.output_layout == OutputLayout::Bundle && self.download_images
    }

    /// Layout and directory for a content type; `None` for unrecognized types
    pub fn target(&self, content_type: &ContentType) -> Option<TypeTarget<'_>> {
        let (section, layout, dir) = match content_type {
            ContentType::Post => (&self.post, "post", "posts"),
            ContentType::Page => (&self.page, "page", "pages"),
            ContentType::Product => (&self.product, "product", "products"),
            ContentType::Other(_) => return None,
        };
        Some(TypeTarget {
            layout: section.layout.as_deref().unwrap_or(layout),
            dir: section.dir.as_deref().unwrap_or(dir),
        })
    }
}

fn validate_dir(name: &str, dir: &str) -> Result<(), ConfigError> {
    let path = Path::new(dir);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if dir.trim().is_empty() || escapes {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be a relative directory below the export root, got '{}'",
            name, dir
        )));
    }
    Ok(())
}

/// Generate a sample settings file content
pub fn sample_settings() -> &'static str {
    r#"# WordPress → Hugo export settings
# Place this file in the WordPress root as wp-hugo-export.toml, or pass it
# with --settings.

# Output layout: "flat" (content/posts/2024-01-02-slug.md, default)
# or "bundle" (content/posts/slug/index.md)
output_layout = "flat"

# Directory under the export root holding the content tree
content_dir = "content"

# Bundle layout only: download each record's images next to its index.md
# and rewrite <img> tags to {{< img >}} shortcodes
download_images = true

# Base URL for site-relative image sources; defaults to the WordPress
# "home" option
# site_url = "https://example.com"

[post]
layout = "post"
dir = "posts"

[page]
layout = "page"
dir = "pages"

[product]
layout = "product"
dir = "products"
"#
}
