//! Object key and URL path composition.

/// Join path segments with `/`, normalising the result like a POSIX path
/// join: empty and `.` segments are dropped, `..` removes the previous
/// segment (never climbing above the start), and the result has no leading
/// or doubled slashes.
pub fn join_key<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for part in parts {
        for segment in part.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                segment => segments.push(segment),
            }
        }
    }
    segments.join("/")
}

/// Concatenate a key prefix and a name verbatim, minus any leading slashes.
pub fn prefixed_key(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name)
        .trim_start_matches('/')
        .to_string()
}
