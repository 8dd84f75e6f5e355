//! Core library for the lmsd learning-management engine.
//!
//! This crate owns the course catalogue, the ordered module/chapter content
//! tree, enrollment with time-boxed access, per-chapter progress tracking
//! with threshold-triggered rewards, idempotent certificate issuance, and
//! the federation bridge to the external Naan Mudhalvan (NM) platform.
//! Only one database backend (either `sqlite` or `postgres`) should be
//! enabled at a time.
cfg_if::cfg_if! {
    if #[cfg(all(feature = "sqlite", feature = "postgres", not(feature = "lint")))] {
        compile_error!("Choose either sqlite or postgres, not both");
    } else if #[cfg(feature = "sqlite")] {
        pub use diesel::sqlite::Sqlite as DbBackend;
    } else if #[cfg(feature = "postgres")] {
        pub use diesel::pg::Pg as DbBackend;
    } else {
        compile_error!("Either the 'sqlite' or 'postgres' feature must be enabled");
    }
}

pub mod cert;
pub mod config;
pub mod db;
pub mod materials;
pub mod models;
pub mod nm;
pub mod rewards;
pub mod schema;
pub mod users;
