//! Federation bridge behaviour against a stubbed NM transport.
#![cfg(feature = "sqlite")]
#![allow(clippy::indexing_slicing, reason = "tests index known fixtures")]

mod common;

use std::sync::Mutex;

use async_trait::async_trait;
use common::{memory_conn, seed_course};
use lmsd::{
    db::{self, ACCESS_WINDOW_DAYS},
    models::{CourseStatus, NmApprovalStatus},
    nm::{
        self,
        NmAccessRequest,
        NmAck,
        NmCoursePayload,
        NmError,
        NmSubscribeRequest,
        NmTransport,
    },
};

#[derive(Default)]
struct StubTransport {
    fail: bool,
    sent: Mutex<Vec<NmCoursePayload>>,
}

#[async_trait]
impl NmTransport for StubTransport {
    async fn publish_course(&self, payload: &NmCoursePayload) -> Result<NmAck, NmError> {
        self.sent.lock().expect("lock").push(payload.clone());
        if self.fail {
            return Err(NmError::Status(503));
        }
        Ok(NmAck { reference_id: format!("REF-{}", payload.course_unique_code) })
    }
}

#[tokio::test]
async fn publish_records_the_reference_only_after_the_ack() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Federated").await;
    let transport = StubTransport::default();

    let ack = nm::publish_course(&mut conn, &transport, course.id)
        .await
        .expect("publish");
    assert_eq!(ack.reference_id, format!("REF-{}", course.course_unique_code));

    let sent = transport.sent.lock().expect("lock");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].course_unique_code, course.course_unique_code);
    drop(sent);

    let stored = db::get_course(&mut conn, course.id)
        .await
        .expect("get course")
        .expect("course exists");
    assert_eq!(stored.status, CourseStatus::SentToNm.as_str());
    assert_eq!(stored.nm_approval_status, NmApprovalStatus::Pending.as_str());
    assert_eq!(stored.nm_reference_id.as_deref(), Some(ack.reference_id.as_str()));
    assert!(stored.nm_last_sync.is_some());
}

#[tokio::test]
async fn a_failed_publish_leaves_the_course_visibly_pending() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Unreachable").await;
    let transport = StubTransport { fail: true, ..StubTransport::default() };

    let result = nm::publish_course(&mut conn, &transport, course.id).await;
    assert!(matches!(result, Err(NmError::Status(503))));

    let stored = db::get_course(&mut conn, course.id)
        .await
        .expect("get course")
        .expect("course exists");
    assert_eq!(stored.status, CourseStatus::Draft.as_str());
    assert_eq!(stored.nm_approval_status, NmApprovalStatus::Pending.as_str());
    assert!(stored.nm_reference_id.is_none());
}

#[tokio::test]
async fn an_approved_course_cannot_be_republished() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Settled").await;
    let transport = StubTransport::default();

    nm::publish_course(&mut conn, &transport, course.id)
        .await
        .expect("publish");
    nm::confirm_approval(&mut conn, &course.course_unique_code)
        .await
        .expect("approve");

    let result = nm::publish_course(&mut conn, &transport, course.id).await;
    assert!(matches!(result, Err(NmError::LocalState(_))));
}

#[tokio::test]
async fn approval_is_idempotent_but_requires_a_prior_send() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Approvals").await;
    let transport = StubTransport::default();

    let never_sent = nm::confirm_approval(&mut conn, &course.course_unique_code).await;
    assert!(matches!(never_sent, Err(NmError::LocalState(_))));

    nm::publish_course(&mut conn, &transport, course.id)
        .await
        .expect("publish");
    nm::confirm_approval(&mut conn, &course.course_unique_code)
        .await
        .expect("approve");
    // re-delivered callback
    nm::confirm_approval(&mut conn, &course.course_unique_code)
        .await
        .expect("approve again");

    let stored = db::get_course(&mut conn, course.id)
        .await
        .expect("get course")
        .expect("course exists");
    assert_eq!(stored.status, CourseStatus::Approved.as_str());
    assert_eq!(stored.nm_approval_status, NmApprovalStatus::Approved.as_str());

    let unknown = nm::confirm_approval(&mut conn, "CRS-NOSUCH00").await;
    assert!(matches!(unknown, Err(NmError::LocalState(_))));
}

#[tokio::test]
async fn subscribe_enrolls_under_the_federated_identity() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Inbound").await;
    let req = NmSubscribeRequest {
        user_id: "7421".to_owned(),
        course_id: course.course_unique_code.clone(),
    };

    let response = nm::subscribe(&mut conn, &req).await;
    assert!(response.subscribed);

    let enrollment = db::find_enrollment(&mut conn, "NM-7421", course.id)
        .await
        .expect("lookup")
        .expect("enrolled");
    assert_eq!(
        enrollment.completion_deadline - enrollment.enrolled_at,
        chrono::Duration::days(ACCESS_WINDOW_DAYS)
    );

    // repeat subscription stays positive without a second row
    let response = nm::subscribe(&mut conn, &req).await;
    assert!(response.subscribed);
    let rows = db::list_enrollments_for_student(&mut conn, "NM-7421")
        .await
        .expect("list");
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn subscribe_to_an_unknown_code_reports_false() {
    let mut conn = memory_conn().await;
    let response = nm::subscribe(
        &mut conn,
        &NmSubscribeRequest {
            user_id: "7421".to_owned(),
            course_id: "CRS-NOSUCH00".to_owned(),
        },
    )
    .await;
    assert!(!response.subscribed);
}

#[tokio::test]
async fn access_links_only_live_enrollments() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Gate").await;
    nm::subscribe(
        &mut conn,
        &NmSubscribeRequest {
            user_id: "7421".to_owned(),
            course_id: course.course_unique_code.clone(),
        },
    )
    .await;

    let granted = nm::access(
        &mut conn,
        &NmAccessRequest {
            user_id: "7421".to_owned(),
            course_id: course.course_unique_code.clone(),
        },
        "https://portal.example.gov/",
    )
    .await;
    assert!(granted.access_status);
    assert_eq!(
        granted.redirect_url.as_deref(),
        Some(format!("https://portal.example.gov/course/{}", course.id).as_str())
    );

    let stranger = nm::access(
        &mut conn,
        &NmAccessRequest {
            user_id: "9999".to_owned(),
            course_id: course.course_unique_code.clone(),
        },
        "https://portal.example.gov",
    )
    .await;
    assert!(!stranger.access_status);
    assert!(stranger.redirect_url.is_none());
}
