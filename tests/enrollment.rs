//! Enrollment lifecycle and the time-boxed access window.
#![cfg(feature = "sqlite")]

mod common;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use common::{memory_conn, seed_course, seed_student};
use lmsd::db::{self, ACCESS_WINDOW_DAYS, StoreError};

fn enrolled_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 10)
        .expect("valid date")
        .and_hms_opt(9, 0, 0)
        .expect("valid time")
}

#[tokio::test]
async fn enrollment_sets_the_access_deadline() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Deadlines").await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;

    let row = db::enroll_at(&mut conn, &student, course.id, enrolled_at())
        .await
        .expect("enroll");
    assert_eq!(
        row.completion_deadline,
        enrolled_at() + Duration::days(ACCESS_WINDOW_DAYS)
    );
    assert!(!row.completed);
}

#[tokio::test]
async fn double_enrollment_conflicts_and_keeps_one_row() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Dupes").await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;

    db::enroll_at(&mut conn, &student, course.id, enrolled_at())
        .await
        .expect("first enroll");
    let second = db::enroll_at(&mut conn, &student, course.id, enrolled_at()).await;
    assert!(matches!(second, Err(StoreError::Conflict)));

    let rows = db::list_enrollments_for_student(&mut conn, &student)
        .await
        .expect("list");
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn enrolling_in_a_missing_course_is_not_found() {
    let mut conn = memory_conn().await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;
    let result = db::enroll_at(&mut conn, &student, 999, enrolled_at()).await;
    assert!(matches!(result, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn access_holds_inside_the_window_and_expires_after() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Windows").await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;
    db::enroll_at(&mut conn, &student, course.id, enrolled_at())
        .await
        .expect("enroll");

    let inside = enrolled_at() + Duration::days(ACCESS_WINDOW_DAYS - 1);
    db::verify_access_at(&mut conn, &student, course.id, inside)
        .await
        .expect("access inside window");

    let boundary = enrolled_at() + Duration::days(ACCESS_WINDOW_DAYS);
    db::verify_access_at(&mut conn, &student, course.id, boundary)
        .await
        .expect("access at the deadline");

    let after = enrolled_at() + Duration::days(ACCESS_WINDOW_DAYS + 1);
    let expired = db::verify_access_at(&mut conn, &student, course.id, after).await;
    assert!(matches!(expired, Err(StoreError::Expired)));
}

#[tokio::test]
async fn access_requires_an_enrollment() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Strangers").await;
    let result = db::verify_access_at(&mut conn, "STUNOB001", course.id, enrolled_at()).await;
    assert!(matches!(result, Err(StoreError::NotEnrolled)));
}

#[tokio::test]
async fn unenroll_removes_the_row_and_is_not_repeatable() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Leavers").await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;
    db::enroll_at(&mut conn, &student, course.id, enrolled_at())
        .await
        .expect("enroll");

    db::unenroll(&mut conn, &student, course.id).await.expect("unenroll");
    let gone = db::find_enrollment(&mut conn, &student, course.id)
        .await
        .expect("lookup");
    assert!(gone.is_none());

    let again = db::unenroll(&mut conn, &student, course.id).await;
    assert!(matches!(again, Err(StoreError::NotFound)));
}
