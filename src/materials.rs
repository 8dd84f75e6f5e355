//! Chapter material descriptors and file-type inference.
//!
//! Materials are embedded in each chapter as an ordered JSON array rather
//! than a separate table; the type of each entry is inferred from its file
//! extension at attach time. Stored paths are storage-relative and
//! normalised to forward slashes.

use serde::{Deserialize, Serialize};

/// Kind of learning material, inferred from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    Video,
    Audio,
    Pdf,
    Ppt,
    Doc,
    Image,
    Archive,
    Other,
}

/// One entry in a chapter's ordered materials array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    #[serde(rename = "type")]
    pub kind: MaterialType,
    pub path: String,
}

impl Material {
    /// Build a material from a storage-relative path, inferring its type.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let normalised = normalise_path(path);
        Self {
            kind: infer_type(&normalised),
            path: normalised,
        }
    }
}

/// Infer the material type from a path's file extension.
#[must_use]
pub fn infer_type(path: &str) -> MaterialType {
    let ext = path
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "mkv" | "webm" | "mov" | "avi" => MaterialType::Video,
        "mp3" | "wav" | "ogg" | "m4a" => MaterialType::Audio,
        "pdf" => MaterialType::Pdf,
        "ppt" | "pptx" => MaterialType::Ppt,
        "doc" | "docx" | "odt" | "txt" => MaterialType::Doc,
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" => MaterialType::Image,
        "zip" | "tar" | "gz" | "rar" | "7z" => MaterialType::Archive,
        _ => MaterialType::Other,
    }
}

/// Replace backslashes so persisted paths are platform-independent.
#[must_use]
pub fn normalise_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Serialise an ordered material list to its stored JSON form.
///
/// # Errors
/// Returns any error produced by the JSON serialiser.
pub fn to_json(materials: &[Material]) -> Result<String, serde_json::Error> {
    serde_json::to_string(materials)
}

/// Parse the stored JSON form back into an ordered material list.
///
/// # Errors
/// Returns an error when the stored payload is not a valid material array.
pub fn from_json(raw: &str) -> Result<Vec<Material>, serde_json::Error> {
    serde_json::from_str(raw)
}
