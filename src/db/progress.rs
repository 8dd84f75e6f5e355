//! Per-chapter progress tracking, the course rollup, and reward grants.
//!
//! Progress is keyed by `(custom_id, course_id, chapter_id)` so the engine
//! can represent different completion levels across chapters; the course
//! figure is a derived rollup. Reward evaluation runs in the same
//! transaction as the progress write, and duplicate grants are suppressed
//! by the rewards table's uniqueness constraint rather than a
//! read-then-insert check.

use chrono::{NaiveDateTime, Utc};
use diesel::{prelude::*, result::QueryResult};
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::{connection::DbConnection, error::StoreError};
use crate::{
    models::{NewProgress, NewReward, ProgressRow, Reward},
    rewards::{Metric, RewardRule, qualifying},
};

/// Outcome of a progress update.
#[derive(Debug)]
pub struct ProgressOutcome {
    /// The chapter percentage as stored (after clamping).
    pub chapter_percent: i32,
    /// Derived course-level completion after the write.
    pub course_percent: i32,
    /// Reward bands granted for the first time by this update.
    pub granted: Vec<RewardRule>,
}

/// Record a student's progress through one chapter as of `at`.
///
/// Upserts the per-chapter row, recomputes the course rollup, grants any
/// newly crossed completion bands, and flags the enrollment completed when
/// the rollup reaches 100 — all in one transaction.
///
/// # Errors
/// Returns [`StoreError::Validation`] when the chapter does not belong to
/// the module or the module to the course.
#[must_use = "handle the result"]
pub async fn update_progress_at(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
    module: i32,
    chapter: i32,
    percent: i32,
    at: NaiveDateTime,
) -> Result<ProgressOutcome, StoreError> {
    let chapter_percent = percent.clamp(0, 100);
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            verify_tree_linkage(conn, course, module, chapter).await?;

            use crate::schema::progress::dsl as p;
            diesel::insert_into(p::progress)
                .values(&NewProgress {
                    custom_id: student,
                    course_id: course,
                    module_id: module,
                    chapter_id: chapter,
                    progress_percent: chapter_percent,
                    last_visited_at: at,
                })
                .on_conflict((p::custom_id, p::course_id, p::chapter_id))
                .do_update()
                .set((
                    p::module_id.eq(module),
                    p::progress_percent.eq(chapter_percent),
                    p::last_visited_at.eq(at),
                ))
                .execute(conn)
                .await?;

            let course_percent = compute_rollup(conn, student, course).await?;
            let granted =
                grant_rewards(conn, student, course, Metric::Completion, course_percent, at)
                    .await?;

            if course_percent >= 100 {
                use crate::schema::enrollments::dsl as e;
                diesel::update(
                    e::enrollments
                        .filter(e::custom_id.eq(student))
                        .filter(e::course_id.eq(course)),
                )
                .set(e::completed.eq(true))
                .execute(conn)
                .await?;
            }

            Ok(ProgressOutcome { chapter_percent, course_percent, granted })
        })
    })
    .await
}

/// Record a student's progress through one chapter now.
///
/// # Errors
/// See [`update_progress_at`].
#[must_use = "handle the result"]
pub async fn update_progress(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
    module: i32,
    chapter: i32,
    percent: i32,
) -> Result<ProgressOutcome, StoreError> {
    update_progress_at(conn, student, course, module, chapter, percent, Utc::now().naive_utc())
        .await
}

/// Record a quiz score and grant any quiz-axis rewards it earns.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the course does not exist,
/// otherwise any database error.
#[must_use = "handle the result"]
pub async fn record_quiz_score_at(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
    score_percent: i32,
    at: NaiveDateTime,
) -> Result<Vec<RewardRule>, StoreError> {
    let score = score_percent.clamp(0, 100);
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            use crate::schema::courses::dsl as c;
            let exists: Option<i32> = c::courses
                .filter(c::id.eq(course))
                .select(c::id)
                .first(conn)
                .await
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::NotFound);
            }
            grant_rewards(conn, student, course, Metric::QuizScore, score, at).await
        })
    })
    .await
}

/// Record a quiz score now.
///
/// # Errors
/// See [`record_quiz_score_at`].
#[must_use = "handle the result"]
pub async fn record_quiz_score(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
    score_percent: i32,
) -> Result<Vec<RewardRule>, StoreError> {
    record_quiz_score_at(conn, student, course, score_percent, Utc::now().naive_utc()).await
}

/// Derived course-level completion: mean chapter percentage across every
/// chapter of the course, counting untouched chapters as 0.
///
/// # Errors
/// Returns any error produced by the underlying database queries.
#[must_use = "handle the result"]
pub async fn course_progress_rollup(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
) -> Result<i32, StoreError> {
    compute_rollup(conn, student, course).await
}

async fn compute_rollup(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
) -> Result<i32, StoreError> {
    use crate::schema::{chapters::dsl as ch, modules::dsl as m, progress::dsl as p};

    let module_ids: Vec<i32> = m::modules
        .filter(m::course_id.eq(course))
        .select(m::id)
        .load(conn)
        .await?;
    let chapter_count: i64 = ch::chapters
        .filter(ch::module_id.eq_any(&module_ids))
        .count()
        .get_result(conn)
        .await?;
    if chapter_count == 0 {
        return Ok(0);
    }

    let total: Option<i64> = p::progress
        .filter(p::custom_id.eq(student))
        .filter(p::course_id.eq(course))
        .select(diesel::dsl::sum(p::progress_percent))
        .first(conn)
        .await?;
    let mean = total.unwrap_or(0) / chapter_count;
    Ok(i32::try_from(mean).unwrap_or(100).clamp(0, 100))
}

/// Insert one reward row per qualifying band, skipping already granted
/// names via the uniqueness constraint.
async fn grant_rewards(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
    metric: Metric,
    achieved: i32,
    at: NaiveDateTime,
) -> Result<Vec<RewardRule>, StoreError> {
    use crate::schema::rewards::dsl as r;
    let mut granted = Vec::new();
    for rule in qualifying(metric, achieved) {
        let inserted = diesel::insert_into(r::rewards)
            .values(&NewReward {
                custom_id: student,
                course_id: course,
                reward_name: rule.name,
                reward_points: rule.points,
                achieved_percent: achieved,
                created_at: at,
            })
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;
        if inserted > 0 {
            granted.push(*rule);
        }
    }
    Ok(granted)
}

async fn verify_tree_linkage(
    conn: &mut DbConnection,
    course: i32,
    module: i32,
    chapter: i32,
) -> Result<(), StoreError> {
    use crate::schema::{chapters::dsl as ch, modules::dsl as m};
    let owner_module: Option<i32> = ch::chapters
        .filter(ch::id.eq(chapter))
        .select(ch::module_id)
        .first(conn)
        .await
        .optional()?;
    if owner_module != Some(module) {
        return Err(StoreError::Validation(format!(
            "chapter {chapter} does not belong to module {module}"
        )));
    }
    let owner_course: Option<i32> = m::modules
        .filter(m::id.eq(module))
        .select(m::course_id)
        .first(conn)
        .await
        .optional()?;
    if owner_course != Some(course) {
        return Err(StoreError::Validation(format!(
            "module {module} does not belong to course {course}"
        )));
    }
    Ok(())
}

/// List a student's progress rows for a course, most recently visited first.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_progress_for_student(
    conn: &mut DbConnection,
    student: &str,
    course: i32,
) -> QueryResult<Vec<ProgressRow>> {
    use crate::schema::progress::dsl as p;
    p::progress
        .filter(p::custom_id.eq(student))
        .filter(p::course_id.eq(course))
        .order(p::last_visited_at.desc())
        .load::<ProgressRow>(conn)
        .await
}

/// List every reward a student has earned, newest first.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_rewards_for_student(
    conn: &mut DbConnection,
    student: &str,
) -> QueryResult<Vec<Reward>> {
    use crate::schema::rewards::dsl as r;
    r::rewards
        .filter(r::custom_id.eq(student))
        .order(r::created_at.desc())
        .load::<Reward>(conn)
        .await
}

/// Total reward points per student, highest first.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn leaderboard(
    conn: &mut DbConnection,
    limit: i64,
) -> QueryResult<Vec<(String, i64)>> {
    use crate::schema::rewards::dsl as r;
    let rows: Vec<(String, Option<i64>)> = r::rewards
        .group_by(r::custom_id)
        .select((r::custom_id, diesel::dsl::sum(r::reward_points)))
        .order(diesel::dsl::sum(r::reward_points).desc())
        .limit(limit)
        .load(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(student, points)| (student, points.unwrap_or(0)))
        .collect())
}
