//! Shared serialization options.

use serde::{Deserialize, Serialize};

/// Name of the media rendition preferred for archive export.
pub const DEFAULT_MEDIA_RENDITION: &str = "archive";

/// Options controlling serialization and archive export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializeOptions {
    /// Base URL prepended to relative file/page URLs.
    pub base_url: String,
    /// Content variation requested by the consumer.
    pub variation: String,
    /// When true, files missing from storage degrade to sentinel values
    /// instead of aborting serialization.
    pub allow_missing_files: bool,
    /// Media rendition name preferred for archive export.
    pub media_rendition: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            variation: "default".to_string(),
            allow_missing_files: false,
            media_rendition: DEFAULT_MEDIA_RENDITION.to_string(),
        }
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_variation(mut self, variation: impl Into<String>) -> Self {
        self.variation = variation.into();
        self
    }

    #[must_use]
    pub fn with_allow_missing_files(mut self, allow: bool) -> Self {
        self.allow_missing_files = allow;
        self
    }

    /// Build an absolute URL from a possibly relative path.
    pub fn absolute_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            let base = self.base_url.trim_end_matches('/');
            let path = url.trim_start_matches('/');
            format!("{base}/{path}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_url_joins_base() {
        let options = SerializeOptions::new().with_base_url("https://cms.example.com");
        assert_eq!(
            options.absolute_url("/media/a.png"),
            "https://cms.example.com/media/a.png"
        );
        assert_eq!(
            options.absolute_url("media/a.png"),
            "https://cms.example.com/media/a.png"
        );
    }

    #[test]
    fn absolute_url_keeps_absolute_input() {
        let options = SerializeOptions::new().with_base_url("https://cms.example.com");
        assert_eq!(
            options.absolute_url("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }
}
