use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Replace characters that are invalid on common filesystems
/// (`\ / : * ? " < > |`) with `_`.
///
/// Names that would resolve to the directory itself or its parent (``,
/// `.`, `..`) are replaced as well, so a remote entry can never escape the
/// folder it is listed in. Applying this twice gives the same result.
pub fn sanitize_name(name: &str) -> String {
    let clean: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    match clean.as_str() {
        "" | "." => "_".to_string(),
        ".." => "__".to_string(),
        _ => clean,
    }
}

/// Append `suffix` to the final component of `path` without touching any
/// existing extension: `a.tar` + `.gz` is `a.tar.gz`.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Insert `-{suffix}` before the last extension of `name`, or append it when
/// there is none: `report.pdf` + `1a2b` is `report-1a2b.pdf`.
pub fn insert_suffix(name: &str, suffix: &str) -> String {
    match name.rfind('.') {
        Some(dot_pos) if dot_pos > 0 => {
            let (stem, ext) = name.split_at(dot_pos);
            format!("{}-{}{}", stem, suffix, ext)
        }
        _ => format!("{}-{}", name, suffix),
    }
}
