//! Shared fixtures for integration tests.
#![cfg(feature = "sqlite")]
#![allow(dead_code, reason = "each test target uses a subset of these helpers")]

use diesel_async::AsyncConnection;
use lmsd::{
    db::{self, CourseDraft, DbConnection, NewAccount},
    materials::Material,
    models::{Chapter, Course, Module, PricingType, Role},
};

/// Fresh in-memory database with migrations applied.
pub async fn memory_conn() -> DbConnection {
    let mut conn = DbConnection::establish(":memory:")
        .await
        .expect("failed to create in-memory connection");
    db::apply_migrations(&mut conn, "")
        .await
        .expect("failed to apply migrations");
    conn
}

/// Insert a free course with no content.
pub async fn seed_course(conn: &mut DbConnection, name: &str) -> Course {
    db::create_course(
        conn,
        &CourseDraft {
            course_name: name,
            category_id: None,
            description: None,
            requirements: None,
            overview: None,
            pricing: PricingType::Free,
            price_amount: 0,
            course_image: None,
            course_video: None,
            created_by: None,
        },
    )
    .await
    .expect("failed to seed course")
}

/// Insert a course with two modules of two chapters each.
pub async fn seed_tree(conn: &mut DbConnection) -> (Course, Vec<Module>, Vec<Chapter>) {
    let course = seed_course(conn, "Rust Basics").await;
    let mut modules = Vec::new();
    let mut chapters = Vec::new();
    for module_name in ["Ownership", "Lifetimes"] {
        let module = db::create_module(conn, course.id, module_name)
            .await
            .expect("failed to seed module");
        for suffix in ["1", "2"] {
            let chapter = db::create_chapter(
                conn,
                module.id,
                &format!("{module_name} {suffix}"),
                &[Material::from_path(&format!("uploads/{module_name}-{suffix}.mp4"))],
            )
            .await
            .expect("failed to seed chapter");
            chapters.push(chapter);
        }
        modules.push(module);
    }
    (course, modules, chapters)
}

/// Register a student account and return its custom ID.
pub async fn seed_student(conn: &mut DbConnection, email: &str, name: &str) -> String {
    let (_, detail) = db::create_user(
        conn,
        &NewAccount {
            email,
            username: name,
            password_hash: "hash",
            role: Role::Student,
            full_name: name,
            mobile_number: None,
            image_path: None,
        },
    )
    .await
    .expect("failed to seed student");
    detail.custom_id
}
