//! Enrollment records and the time-boxed access gate.
//!
//! Access validity is checked lazily at verification time against the
//! stored deadline; no background expiry sweeper exists.

use chrono::{Duration, NaiveDateTime, Utc};
use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::{connection::DbConnection, error::StoreError};
use crate::models::{Enrollment, NewEnrollment};

/// Length of the licensed access window granted at enrollment.
pub const ACCESS_WINDOW_DAYS: i64 = 90;

/// Enroll a student in a course as of `at`.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the course does not exist and
/// [`StoreError::Conflict`] when the pair is already enrolled.
#[must_use = "handle the result"]
pub async fn enroll_at(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
    at: NaiveDateTime,
) -> Result<Enrollment, StoreError> {
    use crate::schema::{courses::dsl as c, enrollments::dsl as e};
    let exists: Option<i32> = c::courses
        .filter(c::id.eq(course))
        .select(c::id)
        .first(conn)
        .await
        .optional()?;
    if exists.is_none() {
        return Err(StoreError::NotFound);
    }

    let row = diesel::insert_into(e::enrollments)
        .values(&NewEnrollment {
            custom_id: student,
            course_id: course,
            enrolled_at: at,
            completion_deadline: at + Duration::days(ACCESS_WINDOW_DAYS),
            completed: false,
        })
        .get_result(conn)
        .await?;
    Ok(row)
}

/// Enroll a student in a course now.
///
/// # Errors
/// See [`enroll_at`].
#[must_use = "handle the result"]
pub async fn enroll(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
) -> Result<Enrollment, StoreError> {
    enroll_at(conn, student, course, Utc::now().naive_utc()).await
}

/// Check whether a student may access a course as of `at`.
///
/// # Errors
/// Returns [`StoreError::NotEnrolled`] when no enrollment exists and
/// [`StoreError::Expired`] when the completion deadline has passed.
#[must_use = "handle the result"]
pub async fn verify_access_at(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
    at: NaiveDateTime,
) -> Result<Enrollment, StoreError> {
    let row = find_enrollment(conn, student, course)
        .await?
        .ok_or(StoreError::NotEnrolled)?;
    if at > row.completion_deadline {
        return Err(StoreError::Expired);
    }
    Ok(row)
}

/// Check whether a student may access a course right now.
///
/// # Errors
/// See [`verify_access_at`].
#[must_use = "handle the result"]
pub async fn verify_access(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
) -> Result<Enrollment, StoreError> {
    verify_access_at(conn, student, course, Utc::now().naive_utc()).await
}

/// Remove an enrollment unconditionally; no soft-delete or grace period.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the pair is not enrolled.
#[must_use = "handle the result"]
pub async fn unenroll(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
) -> Result<(), StoreError> {
    use crate::schema::enrollments::dsl as e;
    let deleted = diesel::delete(
        e::enrollments
            .filter(e::custom_id.eq(student))
            .filter(e::course_id.eq(course)),
    )
    .execute(conn)
    .await?;
    if deleted == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Fetch the enrollment row for a student/course pair, if any.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_enrollment(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
) -> QueryResult<Option<Enrollment>> {
    use crate::schema::enrollments::dsl as e;
    e::enrollments
        .filter(e::custom_id.eq(student))
        .filter(e::course_id.eq(course))
        .first::<Enrollment>(conn)
        .await
        .optional()
}

/// List a student's enrollments, most recent first.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_enrollments_for_student(
    conn: &mut DbConnection,
    student: &str,
) -> QueryResult<Vec<Enrollment>> {
    use crate::schema::enrollments::dsl as e;
    e::enrollments
        .filter(e::custom_id.eq(student))
        .order(e::enrolled_at.desc())
        .load::<Enrollment>(conn)
        .await
}

/// Flag an enrollment as completed.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the pair is not enrolled.
#[must_use = "handle the result"]
pub async fn mark_completed(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
) -> Result<(), StoreError> {
    use crate::schema::enrollments::dsl as e;
    let updated = diesel::update(
        e::enrollments
            .filter(e::custom_id.eq(student))
            .filter(e::course_id.eq(course)),
    )
    .set(e::completed.eq(true))
    .execute(conn)
    .await?;
    if updated == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}
