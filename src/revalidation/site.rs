//! Destination sites that accept revalidation calls.

use std::fmt;

use url::Url;

/// A front-end deployment that can be told to refresh a path.
pub trait DestinationSite: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    /// Human-readable name used in diagnostics.
    fn label(&self) -> &str;

    /// Endpoint to call for `path`, or `None` when the site does not accept
    /// revalidation.
    fn revalidation_url(&self, path: &str) -> Option<Url>;
}

/// Site described by configuration.
///
/// The endpoint is `revalidate_url?path=<path>[&secret=<secret>]`.
#[derive(Debug, Clone)]
pub struct ConfiguredSite {
    id: String,
    label: String,
    revalidate_url: Option<Url>,
    secret: Option<String>,
}

impl ConfiguredSite {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            revalidate_url: None,
            secret: None,
        }
    }

    pub fn with_revalidate_url(mut self, url: Url) -> Self {
        self.revalidate_url = Some(url);
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

impl DestinationSite for ConfiguredSite {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn revalidation_url(&self, path: &str) -> Option<Url> {
        let mut url = self.revalidate_url.clone()?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("path", path);
            if let Some(secret) = self.secret.as_deref() {
                query.append_pair("secret", secret);
            }
        }
        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> ConfiguredSite {
        ConfiguredSite::new("blog", "Blog")
    }

    #[test]
    fn no_revalidate_url_means_no_endpoint() {
        assert!(site().revalidation_url("/a").is_none());
    }

    #[test]
    fn endpoint_carries_path_and_secret() {
        let site = site()
            .with_revalidate_url(
                Url::parse("https://blog.example.com/api/revalidate").expect("url"),
            )
            .with_secret("s3cr3t");

        let url = site.revalidation_url("/news/hello world").expect("endpoint");
        assert_eq!(
            url.as_str(),
            "https://blog.example.com/api/revalidate?path=%2Fnews%2Fhello+world&secret=s3cr3t"
        );
    }

    #[test]
    fn existing_query_is_preserved() {
        let site = site().with_revalidate_url(
            Url::parse("https://blog.example.com/api/revalidate?lang=en").expect("url"),
        );

        let url = site.revalidation_url("/").expect("endpoint");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("lang".to_string(), "en".to_string()),
                ("path".to_string(), "/".to_string()),
            ]
        );
    }
}
