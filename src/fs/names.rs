use crate::error::{DavError, DavResult};

/// Characters the access protocol reserves in path segments
const DISALLOWED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Extensions created from backend templates instead of an empty upload
pub const OFFICE_EXTENSIONS: &[&str] = &["docx", "xlsx", "pptx"];

/// Reject names the backend or the protocol cannot represent
pub fn validate_name(name: &str) -> DavResult<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.trim() != name
        || name.chars().any(|c| c.is_control() || DISALLOWED.contains(&c));
    if bad {
        return Err(DavError::forbidden(format!("invalid name: {name:?}")));
    }
    Ok(())
}

/// Lower-cased extension of `name`, if any
pub fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_office_document(name: &str) -> bool {
    extension(name).is_some_and(|ext| OFFICE_EXTENSIONS.contains(&ext.as_str()))
}

/// Content type sent with new uploads
pub fn mime_for(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("txt") | Some("md") => "text/plain",
        Some("csv") => "text/csv",
        Some("html") | Some("htm") => "text/html",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("zip") => "application/zip",
        Some("mp4") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        _ => "application/octet-stream",
    }
}
