//! URL path normalization.

/// Returns the canonical form of a URL path.
///
/// + repeated slashes collapse into one
/// + `.` elements are removed
/// + `..` elements remove the element before them, and are dropped at the root
///
/// The result always begins with `/`, and keeps the trailing slash of the
/// input unless it is just `/`.
pub fn clean_path(p: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in p.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }

    let trailing_slash = p.ends_with('/') || p.ends_with("/.") || p.ends_with("/..");

    let mut out = String::with_capacity(p.len() + 1);
    for part in &parts {
        out.push('/');
        out.push_str(part);
    }
    if out.is_empty() || trailing_slash {
        out.push('/');
    }
    out
}

/// Joins a base path and a relative path the way route groups compose them.
///
/// A trailing slash on `relative` is preserved.
pub(crate) fn join_paths(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_owned();
    }
    let joined = clean_path(&format!("{}/{}", base, relative));
    if relative.ends_with('/') && !joined.ends_with('/') {
        format!("{}/", joined)
    } else {
        joined
    }
}
