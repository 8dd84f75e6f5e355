//! Certificate rendering seam.
//!
//! The PDF engine proper is an external collaborator; the store only needs
//! something that turns a [`CertificateSpec`] into a stored document and
//! reports the storage-relative URL. Tests substitute their own renderer
//! through the [`CertificateRenderer`] trait.

use std::{fs, io, path::PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;

/// Failure while producing the certificate document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("certificate rendering failed: {0}")]
    Io(#[from] io::Error),
}

/// Everything the fixed certificate layout displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSpec<'a> {
    pub awardee: &'a str,
    pub course_name: &'a str,
    /// Shown only when the issuing path knows the completion rollup.
    pub completion_percent: Option<i32>,
    /// Unique file stem, `{username}-{unix_millis}`.
    pub file_stem: &'a str,
}

/// Renders a certificate document and returns its stored URL.
pub trait CertificateRenderer: Send + Sync {
    /// Write the document and return the storage-relative URL.
    ///
    /// # Errors
    /// Returns a [`RenderError`] when the document cannot be produced; the
    /// caller must not persist a tracking row in that case.
    fn render(&self, spec: &CertificateSpec<'_>) -> Result<String, RenderError>;
}

/// Plain-document renderer writing the fixed layout to a local directory.
pub struct FileCertificateRenderer {
    out_dir: PathBuf,
}

impl FileCertificateRenderer {
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self { out_dir: out_dir.into() }
    }
}

impl CertificateRenderer for FileCertificateRenderer {
    fn render(&self, spec: &CertificateSpec<'_>) -> Result<String, RenderError> {
        fs::create_dir_all(&self.out_dir)?;
        let file_name = format!("{}.txt", spec.file_stem);
        let mut body = format!(
            "Certificate of Completion\n\nAwarded to {}\nfor completing the course\n{}\n",
            spec.awardee, spec.course_name,
        );
        if let Some(pct) = spec.completion_percent {
            body.push_str(&format!("\nCompletion: {pct}%\n"));
        }
        fs::write(self.out_dir.join(&file_name), body)?;
        Ok(format!("certificates/{file_name}"))
    }
}

/// Build the unique file stem for a certificate document.
///
/// The username is reduced to filesystem-safe characters; the timestamp
/// keeps concurrent issuances for different courses from colliding.
#[must_use]
pub fn certificate_file_stem(username: &str, at: NaiveDateTime) -> String {
    let safe: String = username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{safe}-{}", at.and_utc().timestamp_millis())
}
