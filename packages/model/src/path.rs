//! Site path helpers.
//!
//! Site paths are root-relative and slash-delimited. Container entries end
//! with a trailing slash (`/news/`), leaf entries do not (`/news/index.html`).

/// Returns the last segment of a path without its trailing slash.
pub fn name_of(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Returns the path of the parent container, or `None` for `/`.
pub fn parent_path(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let cut = trimmed.rfind('/')?;
    Some(trimmed[..=cut].to_string())
}

/// Builds the path of a child entry below `parent`.
pub fn child_path(parent: &str, name: &str, container: bool) -> String {
    let mut path = String::with_capacity(parent.len() + name.len() + 2);
    path.push_str(parent);
    if !path.ends_with('/') {
        path.push('/');
    }
    path.push_str(name);
    if container {
        path.push('/');
    }
    path
}

/// Splits the part of `path` below `base` into segments.
///
/// Returns `None` when `path` does not lie under `base`.
pub fn relative_segments<'a>(base: &str, path: &'a str) -> Option<Vec<&'a str>> {
    let base = base.trim_end_matches('/');
    let rest = path.strip_prefix(base)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    Some(rest.split('/').filter(|s| !s.is_empty()).collect())
}

/// True when `path` equals `ancestor` or lies below it.
pub fn is_same_or_below(ancestor: &str, path: &str) -> bool {
    let ancestor = ancestor.trim_end_matches('/');
    match path.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Replaces the `old_prefix` of `path` with `new_prefix`.
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_same_or_below(old_prefix, path) {
        return None;
    }
    if path == old_prefix {
        return Some(new_prefix.to_string());
    }
    let rest = &path[old_prefix.trim_end_matches('/').len()..];
    Some(format!("{}{}", new_prefix.trim_end_matches('/'), rest))
}
