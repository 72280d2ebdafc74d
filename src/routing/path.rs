//! Path canonicalization shared by registration and request matching.

/// Removes exactly one trailing `/` from paths longer than one byte.
///
/// The root path `/` is returned unchanged. No other rewriting happens: case is
/// preserved and repeated slashes are not collapsed, so `//` becomes `/` only
/// because its length exceeds one.
///
/// ```
/// use chainroute::normalize_path;
///
/// assert_eq!(normalize_path("/users/"), "/users");
/// assert_eq!(normalize_path("/users"), "/users");
/// assert_eq!(normalize_path("/"), "/");
/// ```
pub fn normalize_path(path: &str) -> String {
    match path.strip_suffix('/') {
        Some(stripped) if path.len() > 1 => stripped.to_string(),
        _ => path.to_string(),
    }
}

/// Segment-aware prefix test used to decide whether scoped middleware applies.
///
/// `prefix` matches when `path` starts with it and the match ends on a segment
/// boundary: the two are equal, the prefix itself ends with `/`, or the next
/// byte of `path` is `/`. The empty prefix matches every path.
///
/// ```
/// use chainroute::prefix_matches;
///
/// assert!(prefix_matches("/admin", "/admin"));
/// assert!(prefix_matches("/admin", "/admin/users"));
/// assert!(!prefix_matches("/ab", "/abc"));
/// ```
pub fn prefix_matches(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}
