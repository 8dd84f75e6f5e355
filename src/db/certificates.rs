//! Idempotent certificate issuance.
//!
//! At most one certificate exists per `(user_email, course_id)`; repeat
//! issuance returns the stored record unchanged. The document is rendered
//! before the tracking row is written, so a rendering failure leaves no
//! row behind.

use chrono::{NaiveDateTime, Utc};
use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;
use tracing::warn;

use super::{connection::DbConnection, error::StoreError, progress::course_progress_rollup};
use crate::{
    cert::{CertificateRenderer, CertificateSpec, certificate_file_stem},
    models::{Certificate, NewCertificate},
};

/// Input for certificate issuance.
#[derive(Debug, Clone)]
pub struct IssueRequest<'a> {
    pub user_email: &'a str,
    pub course_id: i32,
    pub username: &'a str,
    pub course_name: &'a str,
}

/// Result of an issuance attempt.
#[derive(Debug)]
pub enum IssueOutcome {
    /// A fresh certificate was rendered and recorded.
    Issued(Certificate),
    /// A certificate already existed; it is returned unchanged.
    AlreadyIssued(Certificate),
    /// Completion-gated path: the course is not finished, nothing recorded.
    NotYetComplete { course_percent: i32 },
}

/// Issue a certificate as of `at`, rendering only when none exists.
///
/// # Errors
/// Returns a rendering error when the document cannot be produced, or any
/// database error; neither leaves a tracking row behind.
#[must_use = "handle the result"]
pub async fn issue_certificate_at(
    conn: &mut DbConnection,
    renderer: &dyn CertificateRenderer,
    req: &IssueRequest<'_>,
    completion_percent: Option<i32>,
    at: NaiveDateTime,
) -> Result<IssueOutcome, StoreError> {
    if let Some(existing) = get_certificate(conn, req.user_email, req.course_id).await? {
        return Ok(IssueOutcome::AlreadyIssued(existing));
    }

    let file_stem = certificate_file_stem(req.username, at);
    let url = renderer.render(&CertificateSpec {
        awardee: req.username,
        course_name: req.course_name,
        completion_percent,
        file_stem: &file_stem,
    })?;

    use crate::schema::certificates::dsl as cert;
    let inserted = diesel::insert_into(cert::certificates)
        .values(&NewCertificate {
            user_email: req.user_email,
            course_id: req.course_id,
            certificate_url: &url,
            issued_at: at,
        })
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;

    if inserted == 0 {
        // lost a race with a concurrent issuance; the stored row wins
        warn!(
            user_email = req.user_email,
            course_id = req.course_id,
            orphaned = %url,
            "concurrent certificate issuance, returning existing record"
        );
        let existing = get_certificate(conn, req.user_email, req.course_id)
            .await?
            .ok_or(StoreError::NotFound)?;
        return Ok(IssueOutcome::AlreadyIssued(existing));
    }

    let stored = get_certificate(conn, req.user_email, req.course_id)
        .await?
        .ok_or(StoreError::NotFound)?;
    Ok(IssueOutcome::Issued(stored))
}

/// Issue a certificate now.
///
/// # Errors
/// See [`issue_certificate_at`].
#[must_use = "handle the result"]
pub async fn issue_certificate(
    conn: &mut DbConnection,
    renderer: &dyn CertificateRenderer,
    req: &IssueRequest<'_>,
) -> Result<IssueOutcome, StoreError> {
    issue_certificate_at(conn, renderer, req, None, Utc::now().naive_utc()).await
}

/// Completion-gated issuance: render only at a 100% course rollup.
///
/// Below the gate this returns [`IssueOutcome::NotYetComplete`] and records
/// nothing; the caller reports it as an explanation, not an error.
///
/// # Errors
/// See [`issue_certificate_at`].
#[must_use = "handle the result"]
pub async fn issue_certificate_if_complete(
    conn: &mut DbConnection,
    renderer: &dyn CertificateRenderer,
    req: &IssueRequest<'_>,
    student: &str,
) -> Result<IssueOutcome, StoreError> {
    let course_percent = course_progress_rollup(conn, student, req.course_id).await?;
    if course_percent < 100 {
        return Ok(IssueOutcome::NotYetComplete { course_percent });
    }
    issue_certificate_at(
        conn,
        renderer,
        req,
        Some(course_percent),
        Utc::now().naive_utc(),
    )
    .await
}

/// Fetch the certificate for a user/course pair, if any.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn get_certificate(
    conn: &mut DbConnection,
    email: &str,
    course: i32,
) -> QueryResult<Option<Certificate>> {
    use crate::schema::certificates::dsl as cert;
    cert::certificates
        .filter(cert::user_email.eq(email))
        .filter(cert::course_id.eq(course))
        .first::<Certificate>(conn)
        .await
        .optional()
}

/// List every certificate issued to a user, newest first.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_certificates_for_user(
    conn: &mut DbConnection,
    email: &str,
) -> QueryResult<Vec<Certificate>> {
    use crate::schema::certificates::dsl as cert;
    cert::certificates
        .filter(cert::user_email.eq(email))
        .order(cert::issued_at.desc())
        .load::<Certificate>(conn)
        .await
}
