/// Normalizes a dropped relative path the way the library stores folder paths:
/// backslashes become `/`, and empty, `.` and `..` segments are dropped.
pub fn sanitize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Splits a sanitized relative path into its directory part and file name.
pub fn split_dir_file(path: &str) -> (Option<String>, String) {
    let path = sanitize_path(path);
    match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir.to_string()), file.to_string()),
        None => (None, path),
    }
}
