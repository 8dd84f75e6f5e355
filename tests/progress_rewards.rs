//! Progress rollup arithmetic and threshold-triggered reward grants.
#![cfg(feature = "sqlite")]
#![allow(clippy::indexing_slicing, reason = "tests index known fixtures")]

mod common;

use chrono::{NaiveDate, NaiveDateTime};
use common::{memory_conn, seed_student, seed_tree};
use lmsd::db::{self, StoreError};

fn visited_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 2, 5)
        .expect("valid date")
        .and_hms_opt(15, 30, 0)
        .expect("valid time")
}

#[tokio::test]
async fn rollup_averages_over_every_chapter_counting_untouched_as_zero() {
    let mut conn = memory_conn().await;
    let (course, modules, chapters) = seed_tree(&mut conn).await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;

    // one of four chapters fully done: floor(100 / 4) = 25
    let outcome = db::update_progress_at(
        &mut conn,
        &student,
        course.id,
        modules[0].id,
        chapters[0].id,
        100,
        visited_at(),
    )
    .await
    .expect("progress");
    assert_eq!(outcome.chapter_percent, 100);
    assert_eq!(outcome.course_percent, 25);
    assert!(outcome.granted.is_empty());

    // second chapter at 50: floor(150 / 4) = 37
    let outcome = db::update_progress_at(
        &mut conn,
        &student,
        course.id,
        modules[0].id,
        chapters[1].id,
        50,
        visited_at(),
    )
    .await
    .expect("progress");
    assert_eq!(outcome.course_percent, 37);
}

#[tokio::test]
async fn updates_overwrite_the_chapter_row_instead_of_stacking() {
    let mut conn = memory_conn().await;
    let (course, modules, chapters) = seed_tree(&mut conn).await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;

    for percent in [30, 60, 45] {
        db::update_progress_at(
            &mut conn,
            &student,
            course.id,
            modules[0].id,
            chapters[0].id,
            percent,
            visited_at(),
        )
        .await
        .expect("progress");
    }

    let rows = db::list_progress_for_student(&mut conn, &student, course.id)
        .await
        .expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].progress_percent, 45);
}

#[tokio::test]
async fn out_of_range_percentages_are_clamped() {
    let mut conn = memory_conn().await;
    let (course, modules, chapters) = seed_tree(&mut conn).await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;

    let outcome = db::update_progress_at(
        &mut conn,
        &student,
        course.id,
        modules[0].id,
        chapters[0].id,
        250,
        visited_at(),
    )
    .await
    .expect("progress");
    assert_eq!(outcome.chapter_percent, 100);

    let outcome = db::update_progress_at(
        &mut conn,
        &student,
        course.id,
        modules[0].id,
        chapters[0].id,
        -10,
        visited_at(),
    )
    .await
    .expect("progress");
    assert_eq!(outcome.chapter_percent, 0);
}

#[tokio::test]
async fn progress_rejects_a_chapter_outside_the_claimed_module() {
    let mut conn = memory_conn().await;
    let (course, modules, chapters) = seed_tree(&mut conn).await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;

    // chapters[2] belongs to modules[1]
    let result = db::update_progress_at(
        &mut conn,
        &student,
        course.id,
        modules[0].id,
        chapters[2].id,
        50,
        visited_at(),
    )
    .await;
    assert!(matches!(result, Err(StoreError::Validation(_))));
}

#[tokio::test]
async fn completing_the_course_grants_each_band_exactly_once() {
    let mut conn = memory_conn().await;
    let (course, modules, chapters) = seed_tree(&mut conn).await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;
    db::enroll_at(&mut conn, &student, course.id, visited_at())
        .await
        .expect("enroll");

    let pairs = [
        (modules[0].id, chapters[0].id),
        (modules[0].id, chapters[1].id),
        (modules[1].id, chapters[2].id),
        (modules[1].id, chapters[3].id),
    ];
    let mut last = None;
    for (module, chapter) in pairs {
        last = Some(
            db::update_progress_at(&mut conn, &student, course.id, module, chapter, 100, visited_at())
                .await
                .expect("progress"),
        );
    }
    let outcome = last.expect("at least one update");
    assert_eq!(outcome.course_percent, 100);

    let rewards = db::list_rewards_for_student(&mut conn, &student)
        .await
        .expect("list rewards");
    let mut names: Vec<&str> = rewards.iter().map(|r| r.reward_name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["course-advanced", "course-complete", "course-halfway"]);

    // replaying the final update must not duplicate any grant
    let replay = db::update_progress_at(
        &mut conn,
        &student,
        course.id,
        modules[1].id,
        chapters[3].id,
        100,
        visited_at(),
    )
    .await
    .expect("replay");
    assert!(replay.granted.is_empty());
    let rewards = db::list_rewards_for_student(&mut conn, &student)
        .await
        .expect("list rewards");
    assert_eq!(rewards.len(), 3);

    let enrollment = db::find_enrollment(&mut conn, &student, course.id)
        .await
        .expect("lookup")
        .expect("enrolled");
    assert!(enrollment.completed);
}

#[tokio::test]
async fn deleting_a_module_drops_its_progress_from_the_rollup() {
    let mut conn = memory_conn().await;
    let (course, modules, chapters) = seed_tree(&mut conn).await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;
    db::enroll_at(&mut conn, &student, course.id, visited_at())
        .await
        .expect("enroll");

    for chapter in [chapters[0].id, chapters[1].id] {
        db::update_progress_at(&mut conn, &student, course.id, modules[0].id, chapter, 100, visited_at())
            .await
            .expect("progress");
    }
    let before = db::course_progress_rollup(&mut conn, &student, course.id)
        .await
        .expect("rollup");
    assert_eq!(before, 50);

    db::delete_module(&mut conn, modules[0].id).await.expect("delete module");

    // nothing of the student's work survives, so the rollup starts over
    let after = db::course_progress_rollup(&mut conn, &student, course.id)
        .await
        .expect("rollup");
    assert_eq!(after, 0);
    let rows = db::list_progress_for_student(&mut conn, &student, course.id)
        .await
        .expect("list");
    assert!(rows.is_empty());

    // a small update over the surviving chapters must not cross any band
    let outcome = db::update_progress_at(
        &mut conn,
        &student,
        course.id,
        modules[1].id,
        chapters[2].id,
        10,
        visited_at(),
    )
    .await
    .expect("progress");
    assert_eq!(outcome.course_percent, 5);
    assert!(outcome.granted.is_empty());
    let enrollment = db::find_enrollment(&mut conn, &student, course.id)
        .await
        .expect("lookup")
        .expect("enrolled");
    assert!(!enrollment.completed);
}

#[tokio::test]
async fn deleting_a_chapter_drops_its_progress_row() {
    let mut conn = memory_conn().await;
    let (course, modules, chapters) = seed_tree(&mut conn).await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;

    db::update_progress_at(
        &mut conn,
        &student,
        course.id,
        modules[0].id,
        chapters[0].id,
        100,
        visited_at(),
    )
    .await
    .expect("progress");

    db::delete_chapter(&mut conn, chapters[0].id).await.expect("delete chapter");

    let rows = db::list_progress_for_student(&mut conn, &student, course.id)
        .await
        .expect("list");
    assert!(rows.is_empty());
    let rollup = db::course_progress_rollup(&mut conn, &student, course.id)
        .await
        .expect("rollup");
    assert_eq!(rollup, 0);
}

#[tokio::test]
async fn quiz_scores_for_an_unknown_course_are_not_found() {
    let mut conn = memory_conn().await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;

    let result = db::record_quiz_score_at(&mut conn, &student, 999, 95, visited_at()).await;
    assert!(matches!(result, Err(StoreError::NotFound)));

    let rewards = db::list_rewards_for_student(&mut conn, &student)
        .await
        .expect("list rewards");
    assert!(rewards.is_empty());
}

#[tokio::test]
async fn quiz_scores_grant_on_their_own_axis() {
    let mut conn = memory_conn().await;
    let (course, _, _) = seed_tree(&mut conn).await;
    let student = seed_student(&mut conn, "mala@example.edu", "mala").await;

    let granted = db::record_quiz_score_at(&mut conn, &student, course.id, 92, visited_at())
        .await
        .expect("quiz score");
    let mut names: Vec<&str> = granted.iter().map(|r| r.name).collect();
    names.sort_unstable();
    assert_eq!(names, ["quiz-excellence", "quiz-merit"]);

    // a later lower score earns nothing new
    let granted = db::record_quiz_score_at(&mut conn, &student, course.id, 80, visited_at())
        .await
        .expect("quiz score");
    assert!(granted.is_empty());
}

#[tokio::test]
async fn leaderboard_orders_students_by_total_points() {
    let mut conn = memory_conn().await;
    let (course, modules, chapters) = seed_tree(&mut conn).await;
    let high = seed_student(&mut conn, "high@example.edu", "hig").await;
    let low = seed_student(&mut conn, "low@example.edu", "low").await;

    for (module, chapter) in [
        (modules[0].id, chapters[0].id),
        (modules[0].id, chapters[1].id),
        (modules[1].id, chapters[2].id),
        (modules[1].id, chapters[3].id),
    ] {
        db::update_progress_at(&mut conn, &high, course.id, module, chapter, 100, visited_at())
            .await
            .expect("progress");
    }
    db::record_quiz_score_at(&mut conn, &low, course.id, 76, visited_at())
        .await
        .expect("quiz score");

    let board = db::leaderboard(&mut conn, 10).await.expect("leaderboard");
    assert_eq!(board.len(), 2);
    assert_eq!(board[0], (high.clone(), 175));
    assert_eq!(board[1], (low.clone(), 20));
}
