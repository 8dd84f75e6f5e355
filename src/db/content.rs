//! Ordered module/chapter content tree and the denormalised course snapshot.
//!
//! `order_index` is dense and 1-based within its parent scope. Every
//! mutation below runs in a single transaction that also rebuilds the
//! owning course's `course_content` JSON snapshot, so readers never observe
//! gapped indices or a partially written snapshot.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use super::{connection::DbConnection, error::StoreError};
use crate::{
    materials::Material,
    models::{Chapter, Course, Module, NewChapter, NewModule},
};

/// JSON materialisation of a course's module/chapter tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseContent {
    pub modules: Vec<ModuleNode>,
}

/// One module entry in the snapshot, chapters in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleNode {
    pub module_id: i32,
    pub module_name: String,
    pub order_index: i32,
    pub chapters: Vec<ChapterNode>,
}

/// One chapter entry in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterNode {
    pub chapter_id: i32,
    pub chapter_name: String,
    pub order_index: i32,
}

/// Decode a course row's stored snapshot.
///
/// # Errors
/// Returns an error when the stored snapshot is not valid JSON.
pub fn parse_course_content(course: &Course) -> Result<Option<CourseContent>, serde_json::Error> {
    course
        .course_content
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
}

/// List a course's modules in display order.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_modules(conn: &mut DbConnection, course: i32) -> QueryResult<Vec<Module>> {
    use crate::schema::modules::dsl as m;
    m::modules
        .filter(m::course_id.eq(course))
        .order(m::order_index.asc())
        .load::<Module>(conn)
        .await
}

/// List a module's chapters in display order.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_chapters(conn: &mut DbConnection, module: i32) -> QueryResult<Vec<Chapter>> {
    use crate::schema::chapters::dsl as ch;
    ch::chapters
        .filter(ch::module_id.eq(module))
        .order(ch::order_index.asc())
        .load::<Chapter>(conn)
        .await
}

/// Rebuild the owning course's JSON snapshot from the ordered tree.
///
/// Must run inside the transaction of the mutation that invalidated the
/// snapshot; the read and the overwrite then commit together.
///
/// # Errors
/// Returns any database or serialisation error.
#[must_use = "handle the result"]
pub async fn rebuild_course_content(
    conn: &mut DbConnection,
    course: i32,
) -> Result<(), StoreError> {
    let module_rows = list_modules(conn, course).await?;
    let mut nodes = Vec::with_capacity(module_rows.len());
    for module in module_rows {
        let chapter_rows = list_chapters(conn, module.id).await?;
        nodes.push(ModuleNode {
            module_id: module.id,
            module_name: module.module_name,
            order_index: module.order_index,
            chapters: chapter_rows
                .into_iter()
                .map(|chapter| ChapterNode {
                    chapter_id: chapter.id,
                    chapter_name: chapter.chapter_name,
                    order_index: chapter.order_index,
                })
                .collect(),
        });
    }
    let snapshot = serde_json::to_string(&CourseContent { modules: nodes })?;

    use crate::schema::courses::dsl as c;
    diesel::update(c::courses.filter(c::id.eq(course)))
        .set(c::course_content.eq(snapshot))
        .execute(conn)
        .await?;
    Ok(())
}

/// Append a module at the end of a course.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the course does not exist.
#[must_use = "handle the result"]
pub async fn create_module(
    conn: &mut DbConnection,
    course: i32,
    name: &str,
) -> Result<Module, StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            use crate::schema::{courses::dsl as c, modules::dsl as m};
            let exists: Option<i32> = c::courses
                .filter(c::id.eq(course))
                .select(c::id)
                .first(conn)
                .await
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::NotFound);
            }

            let last: Option<i32> = m::modules
                .filter(m::course_id.eq(course))
                .select(diesel::dsl::max(m::order_index))
                .first(conn)
                .await?;
            let module: Module = diesel::insert_into(m::modules)
                .values(&NewModule {
                    course_id: course,
                    module_name: name,
                    order_index: last.unwrap_or(0) + 1,
                })
                .get_result(conn)
                .await?;

            rebuild_course_content(conn, course).await?;
            Ok(module)
        })
    })
    .await
}

/// Rename a module and refresh the snapshot.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the module does not exist.
#[must_use = "handle the result"]
pub async fn rename_module(
    conn: &mut DbConnection,
    module: i32,
    name: &str,
) -> Result<Module, StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            use crate::schema::modules::dsl as m;
            let updated: Module = diesel::update(m::modules.filter(m::id.eq(module)))
                .set(m::module_name.eq(name))
                .get_result(conn)
                .await
                .optional()?
                .ok_or(StoreError::NotFound)?;
            rebuild_course_content(conn, updated.course_id).await?;
            Ok(updated)
        })
    })
    .await
}

/// Delete a module (and its chapters) and close the ordering gap.
///
/// The surviving siblings are renumbered to a dense `1..N` sequence in the
/// same transaction. Progress recorded against the removed chapters is
/// deleted with them, so the course rollup only ever averages over content
/// that still exists.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the module does not exist.
#[must_use = "handle the result"]
pub async fn delete_module(conn: &mut DbConnection, module: i32) -> Result<(), StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            use crate::schema::{chapters::dsl as ch, modules::dsl as m, progress::dsl as p};
            let row: Module = m::modules
                .filter(m::id.eq(module))
                .first(conn)
                .await
                .optional()?
                .ok_or(StoreError::NotFound)?;

            // progress references the chapters, so it goes first
            diesel::delete(p::progress.filter(p::module_id.eq(module)))
                .execute(conn)
                .await?;
            diesel::delete(ch::chapters.filter(ch::module_id.eq(module)))
                .execute(conn)
                .await?;
            diesel::delete(m::modules.filter(m::id.eq(module)))
                .execute(conn)
                .await?;

            renumber_modules(conn, row.course_id).await?;
            rebuild_course_content(conn, row.course_id).await?;
            Ok(())
        })
    })
    .await
}

/// Move a module to a new 1-based position among its siblings.
///
/// The whole sibling set is resequenced, so an out-of-range target clamps
/// to the ends and no duplicate index can persist.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the module does not exist.
#[must_use = "handle the result"]
pub async fn reorder_module(
    conn: &mut DbConnection,
    module: i32,
    new_position: i32,
) -> Result<(), StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            use crate::schema::modules::dsl as m;
            let row: Module = m::modules
                .filter(m::id.eq(module))
                .first(conn)
                .await
                .optional()?
                .ok_or(StoreError::NotFound)?;

            let siblings: Vec<(i32, i32)> = m::modules
                .filter(m::course_id.eq(row.course_id))
                .order(m::order_index.asc())
                .select((m::id, m::order_index))
                .load(conn)
                .await?;
            let order = resequenced(&siblings, module, new_position);
            let max_order = siblings.iter().map(|&(_, o)| o).max().unwrap_or(0);

            // shift everything clear of the target range, then assign finals
            diesel::update(m::modules.filter(m::course_id.eq(row.course_id)))
                .set(m::order_index.eq(m::order_index + max_order))
                .execute(conn)
                .await?;
            let mut next = 1;
            for sibling in order {
                diesel::update(m::modules.filter(m::id.eq(sibling)))
                    .set(m::order_index.eq(next))
                    .execute(conn)
                    .await?;
                next += 1;
            }

            rebuild_course_content(conn, row.course_id).await?;
            Ok(())
        })
    })
    .await
}

/// Append a chapter at the end of a module.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the module does not exist.
#[must_use = "handle the result"]
pub async fn create_chapter(
    conn: &mut DbConnection,
    module: i32,
    name: &str,
    chapter_materials: &[Material],
) -> Result<Chapter, StoreError> {
    let blob = crate::materials::to_json(chapter_materials)?;
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            use crate::schema::{chapters::dsl as ch, modules::dsl as m};
            let owner: Module = m::modules
                .filter(m::id.eq(module))
                .first(conn)
                .await
                .optional()?
                .ok_or(StoreError::NotFound)?;

            let last: Option<i32> = ch::chapters
                .filter(ch::module_id.eq(module))
                .select(diesel::dsl::max(ch::order_index))
                .first(conn)
                .await?;
            let chapter: Chapter = diesel::insert_into(ch::chapters)
                .values(&NewChapter {
                    module_id: module,
                    chapter_name: name,
                    materials_json: &blob,
                    order_index: last.unwrap_or(0) + 1,
                })
                .get_result(conn)
                .await?;

            rebuild_course_content(conn, owner.course_id).await?;
            Ok(chapter)
        })
    })
    .await
}

/// Rename a chapter and refresh the snapshot.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the chapter does not exist.
#[must_use = "handle the result"]
pub async fn rename_chapter(
    conn: &mut DbConnection,
    chapter: i32,
    name: &str,
) -> Result<Chapter, StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            use crate::schema::{chapters::dsl as ch, modules::dsl as m};
            let updated: Chapter = diesel::update(ch::chapters.filter(ch::id.eq(chapter)))
                .set(ch::chapter_name.eq(name))
                .get_result(conn)
                .await
                .optional()?
                .ok_or(StoreError::NotFound)?;
            let owner_course: i32 = m::modules
                .filter(m::id.eq(updated.module_id))
                .select(m::course_id)
                .first(conn)
                .await?;
            rebuild_course_content(conn, owner_course).await?;
            Ok(updated)
        })
    })
    .await
}

/// Replace a chapter's ordered materials array.
///
/// The snapshot holds only names and ids, so no rebuild is needed here.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the chapter does not exist.
#[must_use = "handle the result"]
pub async fn update_chapter_materials(
    conn: &mut DbConnection,
    chapter: i32,
    chapter_materials: &[Material],
) -> Result<Chapter, StoreError> {
    let blob = crate::materials::to_json(chapter_materials)?;
    use crate::schema::chapters::dsl as ch;
    diesel::update(ch::chapters.filter(ch::id.eq(chapter)))
        .set(ch::materials_json.eq(blob))
        .get_result(conn)
        .await
        .optional()?
        .ok_or(StoreError::NotFound)
}

/// Delete a chapter and close the ordering gap within its module.
///
/// The chapter's progress rows are deleted in the same transaction; see
/// [`delete_module`].
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the chapter does not exist.
#[must_use = "handle the result"]
pub async fn delete_chapter(conn: &mut DbConnection, chapter: i32) -> Result<(), StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            use crate::schema::{chapters::dsl as ch, modules::dsl as m, progress::dsl as p};
            let row: Chapter = ch::chapters
                .filter(ch::id.eq(chapter))
                .first(conn)
                .await
                .optional()?
                .ok_or(StoreError::NotFound)?;

            diesel::delete(p::progress.filter(p::chapter_id.eq(chapter)))
                .execute(conn)
                .await?;
            diesel::delete(ch::chapters.filter(ch::id.eq(chapter)))
                .execute(conn)
                .await?;
            renumber_chapters(conn, row.module_id).await?;

            let owner_course: i32 = m::modules
                .filter(m::id.eq(row.module_id))
                .select(m::course_id)
                .first(conn)
                .await?;
            rebuild_course_content(conn, owner_course).await?;
            Ok(())
        })
    })
    .await
}

/// Move a chapter to a new 1-based position within its module.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when the chapter does not exist.
#[must_use = "handle the result"]
pub async fn reorder_chapter(
    conn: &mut DbConnection,
    chapter: i32,
    new_position: i32,
) -> Result<(), StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            use crate::schema::{chapters::dsl as ch, modules::dsl as m};
            let row: Chapter = ch::chapters
                .filter(ch::id.eq(chapter))
                .first(conn)
                .await
                .optional()?
                .ok_or(StoreError::NotFound)?;

            let siblings: Vec<(i32, i32)> = ch::chapters
                .filter(ch::module_id.eq(row.module_id))
                .order(ch::order_index.asc())
                .select((ch::id, ch::order_index))
                .load(conn)
                .await?;
            let order = resequenced(&siblings, chapter, new_position);
            let max_order = siblings.iter().map(|&(_, o)| o).max().unwrap_or(0);

            diesel::update(ch::chapters.filter(ch::module_id.eq(row.module_id)))
                .set(ch::order_index.eq(ch::order_index + max_order))
                .execute(conn)
                .await?;
            let mut next = 1;
            for sibling in order {
                diesel::update(ch::chapters.filter(ch::id.eq(sibling)))
                    .set(ch::order_index.eq(next))
                    .execute(conn)
                    .await?;
                next += 1;
            }

            let owner_course: i32 = m::modules
                .filter(m::id.eq(row.module_id))
                .select(m::course_id)
                .first(conn)
                .await?;
            rebuild_course_content(conn, owner_course).await?;
            Ok(())
        })
    })
    .await
}

/// Renumber a course's modules to a dense 1..N sequence.
///
/// Processes siblings in ascending current order; each new index is no
/// larger than the one it replaces, so the per-parent uniqueness constraint
/// holds at every intermediate statement.
async fn renumber_modules(conn: &mut DbConnection, course: i32) -> QueryResult<()> {
    use crate::schema::modules::dsl as m;
    let rows: Vec<(i32, i32)> = m::modules
        .filter(m::course_id.eq(course))
        .order(m::order_index.asc())
        .select((m::id, m::order_index))
        .load(conn)
        .await?;
    let mut next = 1;
    for (module_id, current) in rows {
        if current != next {
            diesel::update(m::modules.filter(m::id.eq(module_id)))
                .set(m::order_index.eq(next))
                .execute(conn)
                .await?;
        }
        next += 1;
    }
    Ok(())
}

/// Renumber a module's chapters to a dense 1..N sequence.
async fn renumber_chapters(conn: &mut DbConnection, module: i32) -> QueryResult<()> {
    use crate::schema::chapters::dsl as ch;
    let rows: Vec<(i32, i32)> = ch::chapters
        .filter(ch::module_id.eq(module))
        .order(ch::order_index.asc())
        .select((ch::id, ch::order_index))
        .load(conn)
        .await?;
    let mut next = 1;
    for (chapter_id, current) in rows {
        if current != next {
            diesel::update(ch::chapters.filter(ch::id.eq(chapter_id)))
                .set(ch::order_index.eq(next))
                .execute(conn)
                .await?;
        }
        next += 1;
    }
    Ok(())
}

/// Compute the sibling id order after moving `target` to `new_position`
/// (1-based, clamped to the ends).
fn resequenced(siblings: &[(i32, i32)], target: i32, new_position: i32) -> Vec<i32> {
    let mut ids: Vec<i32> = siblings
        .iter()
        .map(|&(sibling_id, _)| sibling_id)
        .filter(|&sibling_id| sibling_id != target)
        .collect();
    let slot = usize::try_from(new_position.max(1) - 1)
        .unwrap_or(0)
        .min(ids.len());
    ids.insert(slot, target);
    ids
}
