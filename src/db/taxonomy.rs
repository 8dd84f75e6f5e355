//! Flat taxonomy tables: categories, mainstreams, and substreams.
//!
//! All three tables share the same `(id, name)` shape and the same CRUD
//! surface, so the operations are stamped out per table.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::{connection::DbConnection, error::StoreError};
use crate::models::Taxon;

macro_rules! taxonomy_ops {
    ($table:ident, $create:ident, $list:ident, $rename:ident, $delete:ident) => {
        /// Insert a taxonomy entry.
        ///
        /// # Errors
        /// Returns [`StoreError::Conflict`] when the name already exists.
        #[must_use = "handle the result"]
        pub async fn $create(conn: &mut DbConnection, entry: &str) -> Result<Taxon, StoreError> {
            use crate::schema::$table::dsl::{$table, name};
            let row = diesel::insert_into($table)
                .values(name.eq(entry))
                .get_result(conn)
                .await?;
            Ok(row)
        }

        /// List all entries ordered by name.
        ///
        /// # Errors
        /// Returns any error produced by the underlying database query.
        #[must_use = "handle the result"]
        pub async fn $list(conn: &mut DbConnection) -> QueryResult<Vec<Taxon>> {
            use crate::schema::$table::dsl::{$table, name};
            $table.order(name.asc()).load::<Taxon>(conn).await
        }

        /// Rename an entry.
        ///
        /// # Errors
        /// Returns [`StoreError::NotFound`] when the id does not exist and
        /// [`StoreError::Conflict`] when the new name is taken.
        #[must_use = "handle the result"]
        pub async fn $rename(
            conn: &mut DbConnection,
            entry_id: i32,
            new_name: &str,
        ) -> Result<(), StoreError> {
            use crate::schema::$table::dsl::{$table, id, name};
            let updated = diesel::update($table.filter(id.eq(entry_id)))
                .set(name.eq(new_name))
                .execute(conn)
                .await?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        }

        /// Delete an entry.
        ///
        /// # Errors
        /// Returns [`StoreError::NotFound`] when the id does not exist.
        #[must_use = "handle the result"]
        pub async fn $delete(conn: &mut DbConnection, entry_id: i32) -> Result<(), StoreError> {
            use crate::schema::$table::dsl::{$table, id};
            let deleted = diesel::delete($table.filter(id.eq(entry_id)))
                .execute(conn)
                .await?;
            if deleted == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        }
    };
}

taxonomy_ops!(categories, create_category, list_categories, rename_category, delete_category);
taxonomy_ops!(mainstreams, create_mainstream, list_mainstreams, rename_mainstream, delete_mainstream);
taxonomy_ops!(substreams, create_substream, list_substreams, rename_substream, delete_substream);
