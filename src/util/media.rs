//! File-type classification
//!
//! Decides how an attachment is previewed from its MIME type, or from the
//! file extension when the server sent no MIME type.

use std::fmt;

/// Broad attachment category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Image,
    Video,
    Audio,
    Pdf,
    Document,
    Archive,
    Other,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Video => "video",
            FileKind::Audio => "audio",
            FileKind::Pdf => "pdf",
            FileKind::Document => "document",
            FileKind::Archive => "archive",
            FileKind::Other => "other",
        }
    }

    /// Whether the kind can be shown inline in the feed
    pub fn is_previewable(&self) -> bool {
        matches!(self, FileKind::Image | FileKind::Video)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a file by MIME type, falling back to the name's extension
pub fn classify(name: &str, mime_type: Option<&str>) -> FileKind {
    mime_type
        .and_then(from_mime)
        .unwrap_or_else(|| from_extension(name))
}

/// Classify by MIME type; `None` when the type says nothing useful
pub fn from_mime(mime_type: &str) -> Option<FileKind> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let (top, sub) = essence.split_once('/')?;

    let kind = match (top, sub) {
        ("image", _) => FileKind::Image,
        ("video", _) => FileKind::Video,
        ("audio", _) => FileKind::Audio,
        ("application", "pdf") => FileKind::Pdf,
        ("application", "zip" | "gzip" | "x-tar" | "x-7z-compressed" | "vnd.rar") => {
            FileKind::Archive
        }
        ("application", "msword" | "rtf")
        | ("text", "plain" | "markdown" | "csv") => FileKind::Document,
        ("application", s) if s.starts_with("vnd.openxmlformats") || s.starts_with("vnd.ms-") => {
            FileKind::Document
        }
        ("application", "octet-stream") => return None,
        _ => FileKind::Other,
    };
    Some(kind)
}

/// Classify by file extension, ignoring any query string or fragment
pub fn from_extension(name: &str) -> FileKind {
    let path = name.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or(path);
    let Some((_, ext)) = file.rsplit_once('.') else {
        return FileKind::Other;
    };

    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "webp" | "heic" | "bmp" | "svg" => FileKind::Image,
        "mp4" | "mov" | "webm" | "mkv" | "avi" | "m4v" => FileKind::Video,
        "mp3" | "wav" | "m4a" | "aac" | "ogg" | "flac" => FileKind::Audio,
        "pdf" => FileKind::Pdf,
        "doc" | "docx" | "txt" | "rtf" | "md" | "csv" | "xls" | "xlsx" | "ppt" | "pptx" => {
            FileKind::Document
        }
        "zip" | "rar" | "7z" | "tar" | "gz" => FileKind::Archive,
        _ => FileKind::Other,
    }
}
