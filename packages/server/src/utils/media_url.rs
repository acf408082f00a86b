use crate::config::MediaConfig;
use crate::extractors::origin::RequestOrigin;

/// Builds the public URL of a stored blob.
///
/// Shape is `{base}{prefix}/{hash}/{name}`, where `base` is the request origin
/// or nothing at all. A configured `public_base_url` replaces both base and
/// prefix.
#[derive(Debug, Clone)]
pub struct MediaUrls {
    prefix: String,
    public_base: Option<String>,
}

impl MediaUrls {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            prefix: config.url_prefix.clone(),
            public_base: config
                .public_base_url
                .as_deref()
                .map(|b| b.trim_end_matches('/').to_string())
                .filter(|b| !b.is_empty()),
        }
    }

    pub fn url(&self, hash: &str, name: &str, origin: &RequestOrigin) -> String {
        if let Some(base) = &self.public_base {
            return format!("{base}/{hash}/{name}");
        }
        match &origin.0 {
            Some(origin) => format!("{}{}/{hash}/{name}", origin.base_url(), self.prefix),
            None => format!("{}/{hash}/{name}", self.prefix),
        }
    }
}
