//! Normalization and deduplication of candidate paths.

use std::collections::BTreeSet;

use metrics::counter;
use tracing::warn;
use url::Url;

pub const DEFAULT_LISTING_ROOT: &str = "items";

const METRIC_PATHS_REJECTED: &str = "revalidator_paths_rejected_total";

/// Applies the normalization rules in a fixed order:
///
/// 1. drop paths that carry a URL scheme or a protocol-relative prefix
/// 2. lower-case
/// 3. spaces become `-`
/// 4. collapse the listing root (`/items` → `/`, `/items/42` → `/42`)
/// 5. deduplicate
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    listing_root: String,
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_LISTING_ROOT)
    }
}

impl PathNormalizer {
    /// `listing_root` is a single segment, with or without slashes.
    pub fn new(listing_root: &str) -> Self {
        let segment = listing_root.trim().trim_matches('/').to_lowercase();
        Self {
            listing_root: format!("/{segment}"),
        }
    }

    /// Normalized, sorted, distinct paths.
    pub fn normalize<I, S>(&self, paths: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        paths
            .into_iter()
            .filter_map(|path| self.normalize_path(path.as_ref()))
            .collect()
    }

    /// False when `path` would be dropped. Rejections are logged and counted
    /// here, so callers can discard everything derived from the path.
    pub fn admits(&self, path: &str) -> bool {
        self.normalize_path(path).is_some()
    }

    /// Normalize one path; `None` when the path is rejected.
    pub fn normalize_path(&self, path: &str) -> Option<String> {
        if has_scheme(path) {
            reject(path, "scheme");
            return None;
        }

        let lowered = path.to_lowercase().replace(' ', "-");
        let collapsed = self.collapse_listing_root(lowered);

        if collapsed.is_empty() {
            return None;
        }
        // Case folding and dash substitution can turn an inert value into a scheme.
        if has_scheme(&collapsed) {
            reject(path, "scheme_after_normalization");
            return None;
        }

        Some(collapsed)
    }

    fn collapse_listing_root(&self, mut path: String) -> String {
        // The listing root is "/" when configured empty; nothing to collapse then.
        if self.listing_root == "/" {
            return path;
        }

        loop {
            let rest = match path.strip_prefix(self.listing_root.as_str()) {
                Some(rest) => rest,
                None => return path,
            };
            if rest.is_empty() || rest == "/" {
                return "/".to_string();
            }
            if !rest.starts_with('/') {
                return path;
            }
            path = rest.to_string();
        }
    }
}

fn has_scheme(path: &str) -> bool {
    let trimmed = path.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("\\\\") || Url::parse(trimmed).is_ok()
}

fn reject(path: &str, reason: &'static str) {
    warn!(path, reason, "Rejected candidate path");
    counter!(METRIC_PATHS_REJECTED, "reason" => reason).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn rejects_schemes_and_protocol_relative_paths() {
        let normalizer = PathNormalizer::default();
        let out = normalizer.normalize([
            "javascript:alert(1)",
            "JavaScript:alert(1)",
            "https://evil.example/x",
            "mailto:someone@example.com",
            "//evil.example/x",
            " data:text/html,hi",
            "/safe",
        ]);
        assert_eq!(out, set(&["/safe"]));
    }

    #[test]
    fn admits_matches_normalization() {
        let normalizer = PathNormalizer::default();
        assert!(normalizer.admits("/News/Hello World"));
        assert!(normalizer.admits("/items"));
        assert!(!normalizer.admits("https://evil.example/x/y"));
        assert!(!normalizer.admits("//evil.example/x"));
        assert!(!normalizer.admits(""));
    }

    #[test]
    fn colon_inside_a_path_is_fine() {
        let normalizer = PathNormalizer::default();
        assert_eq!(
            normalizer.normalize_path("/docs/a:b"),
            Some("/docs/a:b".to_string())
        );
    }

    #[test]
    fn case_folds_and_dashes_spaces() {
        let normalizer = PathNormalizer::default();
        assert_eq!(
            normalizer.normalize_path("/Blog/Hello World"),
            Some("/blog/hello-world".to_string())
        );
    }

    #[test]
    fn listing_root_collapses() {
        let normalizer = PathNormalizer::default();
        assert_eq!(normalizer.normalize_path("/items/42"), Some("/42".to_string()));
        assert_eq!(normalizer.normalize_path("/items"), Some("/".to_string()));
        assert_eq!(normalizer.normalize_path("/items/"), Some("/".to_string()));
        assert_eq!(normalizer.normalize_path("/Items/42"), Some("/42".to_string()));
        assert_eq!(normalizer.normalize_path("/items/items/7"), Some("/7".to_string()));
        assert_eq!(
            normalizer.normalize_path("/itemsets/1"),
            Some("/itemsets/1".to_string())
        );
        assert_eq!(
            normalizer.normalize_path("/blog/items/1"),
            Some("/blog/items/1".to_string())
        );
    }

    #[test]
    fn custom_listing_root() {
        let normalizer = PathNormalizer::new("/Node/");
        assert_eq!(normalizer.normalize_path("/node/12"), Some("/12".to_string()));
        assert_eq!(
            normalizer.normalize_path("/items/12"),
            Some("/items/12".to_string())
        );
    }

    #[test]
    fn deduplicates_after_normalization() {
        let normalizer = PathNormalizer::default();
        let out = normalizer.normalize(["/A b", "/a-b", "/a b", "/items/a-b", ""]);
        assert_eq!(out, set(&["/a-b"]));
    }

    #[test]
    fn normalization_is_idempotent() {
        let normalizer = PathNormalizer::default();
        let inputs = [
            "/Items/Items/Hello World",
            "/items",
            "Java Script:alert(1)",
            "/Blog/Ünïcode Ärticle",
            "/a/b/",
            "relative/Path",
            "/{field_missing}/X",
        ];

        let once = normalizer.normalize(inputs);
        let twice = normalizer.normalize(&once);
        assert_eq!(once, twice);
        assert!(!once.contains("java-script:alert(1)"));
    }
}
