/// The path a request resolves to once the file service has decoded it.
///
/// Percent escapes are decoded (`%2F` included), empty and `.` segments are
/// dropped. Returns `None` for paths the file service refuses to serve: escapes
/// that do not decode to UTF-8 and `..` segments.
pub fn canonical_path(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).ok()?;

    let mut segments = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            segment => segments.push(segment),
        }
    }
    Some(format!("/{}", segments.join("/")))
}
