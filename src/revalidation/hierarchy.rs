//! Structural ancestors of a URL path.

/// Ancestor paths of `path`, most specific first, root last.
///
/// The path itself is not included and `/` has no ancestors.
pub fn ancestors(path: &str) -> Vec<String> {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Vec::new();
    }

    let segments: Vec<&str> = trimmed.strip_prefix('/').unwrap_or(trimmed).split('/').collect();

    let mut out: Vec<String> = (1..segments.len())
        .rev()
        .map(|end| format!("/{}", segments[..end].join("/")))
        .collect();
    out.push("/".to_string());
    out
}
