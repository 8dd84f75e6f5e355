//! Manage database connections and domain queries.
//!
//! This module tree exposes helpers for creating pooled Diesel connections,
//! running embedded migrations, and executing application queries grouped
//! by domain concerns: identity, taxonomy, catalogue, content tree,
//! enrollment, progress/rewards, and certificates.

mod certificates;
mod connection;
mod content;
mod courses;
mod enrollments;
mod error;
mod identity;
mod migrations;
mod progress;
mod taxonomy;


pub use self::{
    certificates::{
        IssueOutcome,
        IssueRequest,
        get_certificate,
        issue_certificate,
        issue_certificate_at,
        issue_certificate_if_complete,
        list_certificates_for_user,
    },
    connection::{Backend, DbConnection, DbPool, MIGRATIONS, establish_pool},
    content::{
        ChapterNode,
        CourseContent,
        ModuleNode,
        create_chapter,
        create_module,
        delete_chapter,
        delete_module,
        list_chapters,
        list_modules,
        parse_course_content,
        rebuild_course_content,
        rename_chapter,
        rename_module,
        reorder_chapter,
        reorder_module,
        update_chapter_materials,
    },
    courses::{
        CourseDraft,
        CourseEdit,
        CourseUpdate,
        create_course,
        delete_course,
        find_course_by_code,
        get_course,
        list_courses,
        update_course,
    },
    enrollments::{
        ACCESS_WINDOW_DAYS,
        enroll,
        enroll_at,
        find_enrollment,
        list_enrollments_for_student,
        mark_completed,
        unenroll,
        verify_access,
        verify_access_at,
    },
    error::StoreError,
    identity::{
        NewAccount,
        create_user,
        delete_user,
        generate_custom_id,
        get_role_detail,
        get_user_by_email,
    },
    migrations::{apply_migrations, run_migrations},
    progress::{
        ProgressOutcome,
        course_progress_rollup,
        leaderboard,
        list_progress_for_student,
        list_rewards_for_student,
        record_quiz_score,
        record_quiz_score_at,
        update_progress,
        update_progress_at,
    },
    taxonomy::{
        create_category,
        create_mainstream,
        create_substream,
        delete_category,
        delete_mainstream,
        delete_substream,
        list_categories,
        list_mainstreams,
        list_substreams,
        rename_category,
        rename_mainstream,
        rename_substream,
    },
};
