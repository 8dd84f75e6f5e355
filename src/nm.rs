//! Federation bridge to the external Naan Mudhalvan (NM) platform.
//!
//! The bridge translates between NM identifiers and the local catalogue
//! using `course_unique_code` as the join key. Inbound federation
//! endpoints (subscribe, access) never raise errors to the caller: the
//! external system expects a fixed response shape, so failures collapse
//! into domain booleans and are logged locally. The outbound publish path
//! is admin-facing and does surface errors.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    db::{DbConnection, StoreError, enroll, find_course_by_code, find_enrollment},
    models::{Course, CourseStatus, NmApprovalStatus},
};

/// Default bound on outbound NM calls; there is no retry behind it.
pub const DEFAULT_TIMEOUT_SECS: u64 = 25;

/// Failures in the NM bridge.
#[derive(Debug, Error)]
pub enum NmError {
    /// The outbound call itself failed (connect, timeout, decode).
    #[error("NM upstream call failed: {0}")]
    Upstream(#[from] reqwest::Error),
    /// The platform answered with a non-success status.
    #[error("NM rejected the request with status {0}")]
    Status(u16),
    /// The local course is not in a state this operation accepts.
    #[error("local course state does not permit this operation: {0}")]
    LocalState(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<diesel::result::Error> for NmError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Store(err.into())
    }
}

/// Course snapshot pushed to the NM platform on publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NmCoursePayload {
    pub course_unique_code: String,
    pub course_name: String,
    pub description: Option<String>,
    /// The denormalised content snapshot, when one has been built.
    pub course_content: Option<serde_json::Value>,
}

/// Acknowledgement returned by the platform for a published course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NmAck {
    pub reference_id: String,
}

/// Inbound subscribe request from the NM platform.
#[derive(Debug, Clone, Deserialize)]
pub struct NmSubscribeRequest {
    pub user_id: String,
    pub course_id: String,
}

/// Fixed response shape for subscribe; the caller inspects the flag only.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NmSubscribeResponse {
    pub subscribed: bool,
    pub reference_id: String,
}

/// Inbound access check from the NM platform.
#[derive(Debug, Clone, Deserialize)]
pub struct NmAccessRequest {
    pub user_id: String,
    pub course_id: String,
}

/// Fixed response shape for access checks.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NmAccessResponse {
    pub access_status: bool,
    pub redirect_url: Option<String>,
}

/// Outbound transport to the NM platform; tests substitute a stub.
#[async_trait]
pub trait NmTransport: Send + Sync {
    /// Push a course snapshot and return the platform's acknowledgement.
    ///
    /// # Errors
    /// Returns an [`NmError`] when the call fails or is rejected.
    async fn publish_course(&self, payload: &NmCoursePayload) -> Result<NmAck, NmError>;
}

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct NmClientConfig {
    pub base_url: String,
    pub token: String,
    pub timeout_secs: u64,
    /// Compatibility exception for the platform's certificate chain:
    /// disables TLS verification for this client only. Never a default.
    pub legacy_tls_compat: bool,
}

/// Token-authenticated HTTPS transport with a bounded timeout.
pub struct HttpNmTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpNmTransport {
    /// Build the transport from configuration.
    ///
    /// # Errors
    /// Returns an [`NmError`] when the underlying client cannot be built.
    pub fn new(config: &NmClientConfig) -> Result<Self, NmError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs));
        if config.legacy_tls_compat {
            warn!("NM transport built with certificate verification disabled (legacy_tls_compat)");
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl NmTransport for HttpNmTransport {
    async fn publish_course(&self, payload: &NmCoursePayload) -> Result<NmAck, NmError> {
        let response = self
            .client
            .post(format!("{}/course/publish", self.base_url))
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NmError::Status(status.as_u16()));
        }
        Ok(response.json::<NmAck>().await?)
    }
}

/// Local identity under which an NM user is enrolled.
///
/// NM user ids live in a different namespace from locally generated custom
/// IDs; the prefix keeps the two from colliding.
#[must_use]
pub fn federated_custom_id(nm_user_id: &str) -> String {
    format!("NM-{nm_user_id}")
}

/// Handle an inbound subscribe request.
///
/// Resolves the external course id through `course_unique_code` and
/// enrolls the user if no enrollment exists; NM-originated enrollments get
/// the same access window as local ones. This never returns an error: the
/// response flag is the whole contract.
pub async fn subscribe(conn: &mut DbConnection, req: &NmSubscribeRequest) -> NmSubscribeResponse {
    let reference_id = format!("SUB-{}-{}", req.user_id, req.course_id);
    let subscribed = match find_course_by_code(conn, &req.course_id).await {
        Ok(Some(course)) => {
            let student = federated_custom_id(&req.user_id);
            match enroll(conn, &student, course.id).await {
                Ok(_) => true,
                // an existing enrollment still counts as subscribed
                Err(StoreError::Conflict) => true,
                Err(err) => {
                    error!(%err, course_code = %req.course_id, "NM subscribe failed");
                    false
                }
            }
        }
        Ok(None) => {
            warn!(course_code = %req.course_id, "NM subscribe for unknown course code");
            false
        }
        Err(err) => {
            error!(%err, "NM subscribe lookup failed");
            false
        }
    };
    NmSubscribeResponse { subscribed, reference_id }
}

/// Handle an inbound access check.
///
/// Returns a deep link under `portal_base` when a live (unexpired)
/// enrollment exists. Failures are swallowed into `access_status: false`.
pub async fn access(
    conn: &mut DbConnection,
    req: &NmAccessRequest,
    portal_base: &str,
) -> NmAccessResponse {
    let denied = NmAccessResponse { access_status: false, redirect_url: None };
    let course = match find_course_by_code(conn, &req.course_id).await {
        Ok(Some(course)) => course,
        Ok(None) => return denied,
        Err(err) => {
            error!(%err, "NM access lookup failed");
            return denied;
        }
    };
    let student = federated_custom_id(&req.user_id);
    match find_enrollment(conn, &student, course.id).await {
        Ok(Some(enrollment)) if Utc::now().naive_utc() <= enrollment.completion_deadline => {
            NmAccessResponse {
                access_status: true,
                redirect_url: Some(format!(
                    "{}/course/{}",
                    portal_base.trim_end_matches('/'),
                    course.id
                )),
            }
        }
        Ok(_) => denied,
        Err(err) => {
            error!(%err, "NM access enrollment lookup failed");
            denied
        }
    }
}

/// Publish a local course to the NM platform, two-phase.
///
/// Phase one marks the course `pending` locally before anything leaves the
/// process; phase two records `sent_to_nm` plus the platform reference only
/// after a successful acknowledgement. A transport failure therefore leaves
/// the course visibly `pending` for a manual re-trigger rather than
/// silently out of sync.
///
/// # Errors
/// Returns [`NmError::LocalState`] when the course is missing or already
/// approved, and any transport error from the outbound call.
#[must_use = "handle the result"]
pub async fn publish_course(
    conn: &mut DbConnection,
    transport: &dyn NmTransport,
    course_id: i32,
) -> Result<NmAck, NmError> {
    use crate::schema::courses::dsl as c;
    let course: Course = c::courses
        .filter(c::id.eq(course_id))
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| NmError::LocalState(format!("course {course_id} not found")))?;
    if course.status == CourseStatus::Approved.as_str() {
        return Err(NmError::LocalState("course is already approved".into()));
    }

    let payload = NmCoursePayload {
        course_unique_code: course.course_unique_code.clone(),
        course_name: course.course_name.clone(),
        description: course.description.clone(),
        course_content: course
            .course_content
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(StoreError::from)?,
    };

    // phase one: visible intent before the call leaves the process
    diesel::update(c::courses.filter(c::id.eq(course_id)))
        .set(c::nm_approval_status.eq(NmApprovalStatus::Pending.as_str()))
        .execute(conn)
        .await?;

    let ack = transport.publish_course(&payload).await?;

    // phase two: confirm only after the acknowledgement
    diesel::update(c::courses.filter(c::id.eq(course_id)))
        .set((
            c::status.eq(CourseStatus::SentToNm.as_str()),
            c::nm_reference_id.eq(&ack.reference_id),
            c::nm_last_sync.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .await?;

    info!(course_id, reference_id = %ack.reference_id, "course published to NM");
    Ok(ack)
}

/// Inbound approval callback: `sent_to_nm`/`pending` becomes `approved`.
///
/// Re-delivery of the callback for an already approved course is a no-op.
///
/// # Errors
/// Returns [`NmError::LocalState`] when the code is unknown or the course
/// was never sent for approval.
#[must_use = "handle the result"]
pub async fn confirm_approval(conn: &mut DbConnection, course_code: &str) -> Result<(), NmError> {
    use crate::schema::courses::dsl as c;
    let course = find_course_by_code(conn, course_code)
        .await
        .map_err(StoreError::from)?
        .ok_or_else(|| NmError::LocalState(format!("unknown course code {course_code}")))?;

    if course.status == CourseStatus::Approved.as_str() {
        return Ok(());
    }
    let awaiting = course.status == CourseStatus::SentToNm.as_str()
        || course.nm_approval_status == NmApprovalStatus::Pending.as_str();
    if !awaiting {
        return Err(NmError::LocalState(
            "course was never sent for approval".into(),
        ));
    }

    diesel::update(c::courses.filter(c::id.eq(course.id)))
        .set((
            c::status.eq(CourseStatus::Approved.as_str()),
            c::nm_approval_status.eq(NmApprovalStatus::Approved.as_str()),
            c::nm_last_sync.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .await?;
    info!(course_id = course.id, "NM approval confirmed");
    Ok(())
}
