//! Ordering behaviour of the module/chapter content tree.
#![cfg(feature = "sqlite")]
#![allow(clippy::indexing_slicing, reason = "tests index known fixtures")]

mod common;

use common::{memory_conn, seed_course, seed_tree};
use lmsd::db::{self, StoreError};

#[tokio::test]
async fn modules_append_with_dense_one_based_indices() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Indexing").await;

    for name in ["M1", "M2", "M3"] {
        db::create_module(&mut conn, course.id, name)
            .await
            .expect("create module");
    }
    let modules = db::list_modules(&mut conn, course.id).await.expect("list");
    let indices: Vec<i32> = modules.iter().map(|m| m.order_index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
}

#[tokio::test]
async fn deleting_a_middle_module_closes_the_gap() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Gaps").await;
    let mut ids = Vec::new();
    for name in ["M1", "M2", "M3"] {
        ids.push(
            db::create_module(&mut conn, course.id, name)
                .await
                .expect("create module")
                .id,
        );
    }

    db::delete_module(&mut conn, ids[1]).await.expect("delete");

    let modules = db::list_modules(&mut conn, course.id).await.expect("list");
    let remaining: Vec<(&str, i32)> = modules
        .iter()
        .map(|m| (m.module_name.as_str(), m.order_index))
        .collect();
    assert_eq!(remaining, vec![("M1", 1), ("M3", 2)]);
}

#[tokio::test]
async fn reorder_moves_a_module_and_keeps_indices_dense() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Moves").await;
    let mut ids = Vec::new();
    for name in ["A", "B", "C", "D"] {
        ids.push(
            db::create_module(&mut conn, course.id, name)
                .await
                .expect("create module")
                .id,
        );
    }

    db::reorder_module(&mut conn, ids[3], 2).await.expect("reorder");

    let modules = db::list_modules(&mut conn, course.id).await.expect("list");
    let names: Vec<&str> = modules.iter().map(|m| m.module_name.as_str()).collect();
    assert_eq!(names, vec!["A", "D", "B", "C"]);
    let indices: Vec<i32> = modules.iter().map(|m| m.order_index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn reorder_clamps_out_of_range_positions() {
    let mut conn = memory_conn().await;
    let course = seed_course(&mut conn, "Clamp").await;
    let mut ids = Vec::new();
    for name in ["A", "B", "C"] {
        ids.push(
            db::create_module(&mut conn, course.id, name)
                .await
                .expect("create module")
                .id,
        );
    }

    db::reorder_module(&mut conn, ids[0], 99).await.expect("reorder");

    let modules = db::list_modules(&mut conn, course.id).await.expect("list");
    let names: Vec<&str> = modules.iter().map(|m| m.module_name.as_str()).collect();
    assert_eq!(names, vec!["B", "C", "A"]);
}

#[tokio::test]
async fn chapter_deletion_renumbers_within_its_module_only() {
    let mut conn = memory_conn().await;
    let (_, modules, chapters) = seed_tree(&mut conn).await;

    // first chapter of the first module
    db::delete_chapter(&mut conn, chapters[0].id)
        .await
        .expect("delete chapter");

    let first = db::list_chapters(&mut conn, modules[0].id).await.expect("list");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].order_index, 1);

    let second = db::list_chapters(&mut conn, modules[1].id).await.expect("list");
    let indices: Vec<i32> = second.iter().map(|c| c.order_index).collect();
    assert_eq!(indices, vec![1, 2]);
}

#[tokio::test]
async fn snapshot_tracks_every_mutation() {
    let mut conn = memory_conn().await;
    let (course, modules, chapters) = seed_tree(&mut conn).await;

    let stored = db::get_course(&mut conn, course.id)
        .await
        .expect("get course")
        .expect("course exists");
    let content = db::parse_course_content(&stored)
        .expect("valid snapshot")
        .expect("snapshot present");
    assert_eq!(content.modules.len(), 2);
    assert_eq!(content.modules[0].chapters.len(), 2);
    assert_eq!(content.modules[0].module_name, "Ownership");

    db::rename_module(&mut conn, modules[0].id, "Borrowing")
        .await
        .expect("rename");
    db::delete_chapter(&mut conn, chapters[1].id)
        .await
        .expect("delete chapter");

    let stored = db::get_course(&mut conn, course.id)
        .await
        .expect("get course")
        .expect("course exists");
    let content = db::parse_course_content(&stored)
        .expect("valid snapshot")
        .expect("snapshot present");
    assert_eq!(content.modules[0].module_name, "Borrowing");
    assert_eq!(content.modules[0].chapters.len(), 1);
    assert_eq!(content.modules[0].chapters[0].order_index, 1);
}

#[tokio::test]
async fn content_operations_reject_missing_parents() {
    let mut conn = memory_conn().await;
    let missing = db::create_module(&mut conn, 999, "orphan").await;
    assert!(matches!(missing, Err(StoreError::NotFound)));

    let missing = db::create_chapter(&mut conn, 999, "orphan", &[]).await;
    assert!(matches!(missing, Err(StoreError::NotFound)));

    let missing = db::delete_module(&mut conn, 999).await;
    assert!(matches!(missing, Err(StoreError::NotFound)));
}
