//! Course catalogue operations.
//!
//! Creation sanitises free-text and pricing input, update carries the file
//! replacement bookkeeping, and delete cascades to the content tree while
//! reporting every stored file path the caller must release.

use diesel::{AsChangeset, prelude::*, result::QueryResult};
use diesel_async::{AsyncConnection, RunQueryDsl};
use rand::{Rng, distributions::Alphanumeric, thread_rng};

use super::{connection::DbConnection, error::StoreError};
use crate::{
    materials,
    models::{Course, NewCourse, NmApprovalStatus, PricingType},
};

/// Attempts at generating a fresh unique code before giving up.
const CODE_ATTEMPTS: usize = 3;

/// Input for creating a course.
#[derive(Debug, Clone)]
pub struct CourseDraft<'a> {
    pub course_name: &'a str,
    pub category_id: Option<i32>,
    pub description: Option<&'a str>,
    pub requirements: Option<&'a str>,
    pub overview: Option<&'a str>,
    pub pricing: PricingType,
    pub price_amount: i32,
    pub course_image: Option<&'a str>,
    pub course_video: Option<&'a str>,
    pub created_by: Option<&'a str>,
}

/// Partial update for a course; `None` leaves a field unchanged and the
/// nested `Option` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct CourseEdit {
    pub course_name: Option<String>,
    pub category_id: Option<Option<i32>>,
    pub description: Option<Option<String>>,
    pub requirements: Option<Option<String>>,
    pub overview: Option<Option<String>>,
    pub pricing: Option<PricingType>,
    pub price_amount: Option<i32>,
    pub course_image: Option<String>,
    pub course_video: Option<String>,
    pub is_active: Option<bool>,
}

/// Result of a course update: the new row plus any replaced file paths the
/// caller must delete from storage.
#[derive(Debug)]
pub struct CourseUpdate {
    pub course: Course,
    pub released_files: Vec<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::courses, treat_none_as_null = true)]
struct CourseRevision {
    course_name: String,
    category_id: Option<i32>,
    description: Option<String>,
    requirements: Option<String>,
    overview: Option<String>,
    pricing_type: String,
    price_amount: i32,
    course_image: Option<String>,
    course_video: Option<String>,
    is_active: bool,
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn fresh_unique_code() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("CRS-{}", suffix.to_uppercase())
}

/// Price that actually applies under the pricing type: free always costs 0.
const fn effective_price(pricing: PricingType, amount: i32) -> i32 {
    match pricing {
        PricingType::Free => 0,
        PricingType::Paid => amount,
    }
}

/// Create a course with sanitised input and a fresh unique code.
///
/// # Errors
/// Returns [`StoreError::Validation`] for an empty name or a negative paid
/// price, and [`StoreError::Conflict`] if no unique code could be found.
#[must_use = "handle the result"]
pub async fn create_course(
    conn: &mut DbConnection,
    draft: &CourseDraft<'_>,
) -> Result<Course, StoreError> {
    let Some(name) = blank_to_none(Some(draft.course_name)) else {
        return Err(StoreError::Validation("course name must not be empty".into()));
    };
    if draft.pricing == PricingType::Paid && draft.price_amount < 0 {
        return Err(StoreError::Validation("price must not be negative".into()));
    }

    use crate::schema::courses::dsl::courses;
    for _ in 0..CODE_ATTEMPTS {
        let code = fresh_unique_code();
        let row = diesel::insert_into(courses)
            .values(&NewCourse {
                course_name: name,
                category_id: draft.category_id,
                description: blank_to_none(draft.description),
                requirements: blank_to_none(draft.requirements),
                overview: blank_to_none(draft.overview),
                pricing_type: draft.pricing.as_str(),
                price_amount: effective_price(draft.pricing, draft.price_amount),
                course_image: blank_to_none(draft.course_image),
                course_video: blank_to_none(draft.course_video),
                is_active: true,
                created_by: blank_to_none(draft.created_by),
                course_unique_code: &code,
                nm_approval_status: NmApprovalStatus::None.as_str(),
                status: crate::models::CourseStatus::Draft.as_str(),
            })
            .get_result::<Course>(conn)
            .await;
        match row {
            Ok(course) => return Ok(course),
            // a code collision is the only unique constraint on this table
            Err(e) => match StoreError::from(e) {
                StoreError::Conflict => {}
                other => return Err(other),
            },
        }
    }
    Err(StoreError::Conflict)
}

/// Apply a partial edit, returning replaced file paths for release.
///
/// A previous image or video path is released only when a differing new one
/// is supplied. When pricing becomes free the stored amount is forced to 0.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the course does not exist.
#[must_use = "handle the result"]
pub async fn update_course(
    conn: &mut DbConnection,
    course_id: i32,
    edit: CourseEdit,
) -> Result<CourseUpdate, StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            use crate::schema::courses::dsl as c;
            let existing: Course = c::courses
                .filter(c::id.eq(course_id))
                .first(conn)
                .await
                .optional()?
                .ok_or(StoreError::NotFound)?;

            let mut released_files = Vec::new();
            let next_image = match edit.course_image {
                Some(new_path) => {
                    if let Some(old) = existing.course_image.as_deref()
                        && old != new_path
                    {
                        released_files.push(old.to_owned());
                    }
                    Some(new_path)
                }
                None => existing.course_image.clone(),
            };
            let next_video = match edit.course_video {
                Some(new_path) => {
                    if let Some(old) = existing.course_video.as_deref()
                        && old != new_path
                    {
                        released_files.push(old.to_owned());
                    }
                    Some(new_path)
                }
                None => existing.course_video.clone(),
            };

            let pricing = match edit.pricing {
                Some(p) => p,
                None => PricingType::parse(&existing.pricing_type).unwrap_or(PricingType::Free),
            };
            let amount = edit.price_amount.unwrap_or(existing.price_amount);

            let revision = CourseRevision {
                course_name: edit.course_name.unwrap_or_else(|| existing.course_name.clone()),
                category_id: edit.category_id.unwrap_or(existing.category_id),
                description: edit.description.unwrap_or_else(|| existing.description.clone()),
                requirements: edit
                    .requirements
                    .unwrap_or_else(|| existing.requirements.clone()),
                overview: edit.overview.unwrap_or_else(|| existing.overview.clone()),
                pricing_type: pricing.as_str().to_owned(),
                price_amount: effective_price(pricing, amount),
                course_image: next_image,
                course_video: next_video,
                is_active: edit.is_active.unwrap_or(existing.is_active),
            };

            let course: Course = diesel::update(c::courses.filter(c::id.eq(course_id)))
                .set(&revision)
                .get_result(conn)
                .await?;
            Ok(CourseUpdate { course, released_files })
        })
    })
    .await
}

/// Delete a course and its entire content tree.
///
/// Removes progress, chapters, modules, enrollments, rewards, and
/// certificates for the course in one transaction and returns every stored
/// file path (course image/video plus chapter materials) so the caller can
/// release them. Certificates go with the course: their rows reference it,
/// and a certificate URL for a course that no longer exists is dead weight.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the course does not exist.
#[must_use = "handle the result"]
pub async fn delete_course(
    conn: &mut DbConnection,
    course_id: i32,
) -> Result<Vec<String>, StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            use crate::schema::{
                certificates::dsl as cert,
                chapters::dsl as ch,
                courses::dsl as c,
                enrollments::dsl as e,
                modules::dsl as m,
                progress::dsl as p,
                rewards::dsl as r,
            };

            let course: Course = c::courses
                .filter(c::id.eq(course_id))
                .first(conn)
                .await
                .optional()?
                .ok_or(StoreError::NotFound)?;

            let mut files: Vec<String> = Vec::new();
            files.extend(course.course_image.clone());
            files.extend(course.course_video.clone());

            let module_ids: Vec<i32> = m::modules
                .filter(m::course_id.eq(course_id))
                .select(m::id)
                .load(conn)
                .await?;

            let material_blobs: Vec<String> = ch::chapters
                .filter(ch::module_id.eq_any(&module_ids))
                .select(ch::materials_json)
                .load(conn)
                .await?;
            for blob in &material_blobs {
                for material in materials::from_json(blob)? {
                    files.push(material.path);
                }
            }

            // progress references chapters and modules, so it goes first
            diesel::delete(p::progress.filter(p::course_id.eq(course_id)))
                .execute(conn)
                .await?;
            diesel::delete(ch::chapters.filter(ch::module_id.eq_any(&module_ids)))
                .execute(conn)
                .await?;
            diesel::delete(m::modules.filter(m::course_id.eq(course_id)))
                .execute(conn)
                .await?;
            diesel::delete(e::enrollments.filter(e::course_id.eq(course_id)))
                .execute(conn)
                .await?;
            diesel::delete(r::rewards.filter(r::course_id.eq(course_id)))
                .execute(conn)
                .await?;
            diesel::delete(cert::certificates.filter(cert::course_id.eq(course_id)))
                .execute(conn)
                .await?;
            diesel::delete(c::courses.filter(c::id.eq(course_id)))
                .execute(conn)
                .await?;
            Ok(files)
        })
    })
    .await
}

/// Fetch a course by id.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn get_course(conn: &mut DbConnection, course_id: i32) -> QueryResult<Option<Course>> {
    use crate::schema::courses::dsl as c;
    c::courses
        .filter(c::id.eq(course_id))
        .first::<Course>(conn)
        .await
        .optional()
}

/// List all courses ordered by name.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_courses(conn: &mut DbConnection) -> QueryResult<Vec<Course>> {
    use crate::schema::courses::dsl as c;
    c::courses.order(c::course_name.asc()).load::<Course>(conn).await
}

/// Resolve a course by its public unique code (the NM join key).
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_course_by_code(
    conn: &mut DbConnection,
    code: &str,
) -> QueryResult<Option<Course>> {
    use crate::schema::courses::dsl as c;
    c::courses
        .filter(c::course_unique_code.eq(code))
        .first::<Course>(conn)
        .await
        .optional()
}
