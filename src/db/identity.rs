//! Identity store: users, role-detail rows, and custom-ID generation.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::{connection::DbConnection, error::StoreError};
use crate::models::{
    NewAdminDetail,
    NewStudentDetail,
    NewSuperadminDetail,
    NewUser,
    Role,
    RoleDetail,
    User,
};

/// Input for creating a user together with its role-detail row.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub full_name: &'a str,
    pub mobile_number: Option<&'a str>,
    pub image_path: Option<&'a str>,
}

/// Derive the next human-readable custom ID for a role.
///
/// The value comes from a per-role counter row bumped in the caller's
/// transaction, so concurrent creations cannot observe the same count.
/// The format is a display convention only: `SUPERADMIN001`, `ADMIN042`,
/// or `STU` plus the first three letters of the student's name upper-cased
/// and the zero-padded number.
///
/// # Errors
/// Returns any error produced while bumping the counter row.
#[must_use = "handle the result"]
pub async fn generate_custom_id(
    conn: &mut DbConnection,
    role: Role,
    name: &str,
) -> QueryResult<String> {
    use crate::schema::id_counters::dsl as ctr;
    let tag = role.id_tag();
    let value: i32 = diesel::insert_into(ctr::id_counters)
        .values((ctr::role_tag.eq(tag), ctr::next_value.eq(1)))
        .on_conflict(ctr::role_tag)
        .do_update()
        .set(ctr::next_value.eq(ctr::next_value + 1))
        .returning(ctr::next_value)
        .get_result(conn)
        .await?;
    Ok(match role {
        Role::Student => {
            let initials: String = name
                .chars()
                .filter(|c| c.is_alphabetic())
                .take(3)
                .collect::<String>()
                .to_uppercase();
            format!("{tag}{initials}{value:03}")
        }
        Role::Superadmin | Role::Admin => format!("{tag}{value:03}"),
    })
}

/// Create a user and its role-detail row atomically.
///
/// The user row, the counter bump, and the detail row all commit or roll
/// back together.
///
/// # Errors
/// Returns [`StoreError::Conflict`] when the email is already registered,
/// otherwise any database error.
#[must_use = "handle the result"]
pub async fn create_user(
    conn: &mut DbConnection,
    account: &NewAccount<'_>,
) -> Result<(User, RoleDetail), StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            use crate::schema::users::dsl as u;
            let user: User = diesel::insert_into(u::users)
                .values(&NewUser {
                    email: account.email,
                    username: account.username,
                    password: account.password_hash,
                    role: account.role.as_str(),
                })
                .get_result(conn)
                .await?;

            let custom_id = generate_custom_id(conn, account.role, account.full_name).await?;
            let detail = insert_detail(conn, account, user.id, &custom_id).await?;
            Ok((user, detail))
        })
    })
    .await
}

async fn insert_detail(
    conn: &mut DbConnection,
    account: &NewAccount<'_>,
    user_id: i32,
    custom_id: &str,
) -> QueryResult<RoleDetail> {
    match account.role {
        Role::Superadmin => {
            use crate::schema::superadmin_details::dsl::superadmin_details;
            diesel::insert_into(superadmin_details)
                .values(&NewSuperadminDetail {
                    user_id,
                    custom_id,
                    full_name: account.full_name,
                    mobile_number: account.mobile_number,
                    image_path: account.image_path,
                })
                .get_result(conn)
                .await
        }
        Role::Admin => {
            use crate::schema::admin_details::dsl::admin_details;
            diesel::insert_into(admin_details)
                .values(&NewAdminDetail {
                    user_id,
                    custom_id,
                    full_name: account.full_name,
                    mobile_number: account.mobile_number,
                    image_path: account.image_path,
                })
                .get_result(conn)
                .await
        }
        Role::Student => {
            use crate::schema::student_details::dsl::student_details;
            diesel::insert_into(student_details)
                .values(&NewStudentDetail {
                    user_id,
                    custom_id,
                    full_name: account.full_name,
                    mobile_number: account.mobile_number,
                    image_path: account.image_path,
                })
                .get_result(conn)
                .await
        }
    }
}

/// Look up a user record by email.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn get_user_by_email(
    conn: &mut DbConnection,
    account_email: &str,
) -> QueryResult<Option<User>> {
    use crate::schema::users::dsl::{email, users};
    users
        .filter(email.eq(account_email))
        .first::<User>(conn)
        .await
        .optional()
}

/// Fetch the role-detail row for a user.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn get_role_detail(
    conn: &mut DbConnection,
    role: Role,
    for_user_id: i32,
) -> QueryResult<Option<RoleDetail>> {
    match role {
        Role::Superadmin => {
            use crate::schema::superadmin_details::dsl::{superadmin_details, user_id};
            superadmin_details
                .filter(user_id.eq(for_user_id))
                .first::<RoleDetail>(conn)
                .await
                .optional()
        }
        Role::Admin => {
            use crate::schema::admin_details::dsl::{admin_details, user_id};
            admin_details
                .filter(user_id.eq(for_user_id))
                .first::<RoleDetail>(conn)
                .await
                .optional()
        }
        Role::Student => {
            use crate::schema::student_details::dsl::{student_details, user_id};
            student_details
                .filter(user_id.eq(for_user_id))
                .first::<RoleDetail>(conn)
                .await
                .optional()
        }
    }
}

/// Delete a user and every dependent record.
///
/// Removes the role-detail row, enrollments, progress, and rewards keyed by
/// the user's custom ID, plus certificates keyed by email, in one
/// transaction.
///
/// # Errors
/// Returns [`StoreError::NotFound`] when no such user exists, or
/// [`StoreError::Validation`] when the stored role value is unrecognised.
#[must_use = "handle the result"]
pub async fn delete_user(conn: &mut DbConnection, account_email: &str) -> Result<(), StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        Box::pin(async move {
            let Some(user) = get_user_by_email(conn, account_email).await? else {
                return Err(StoreError::NotFound);
            };
            let role = Role::parse(&user.role)
                .ok_or_else(|| StoreError::Validation(format!("unknown role {:?}", user.role)))?;

            if let Some(detail) = get_role_detail(conn, role, user.id).await? {
                delete_student_records(conn, &detail.custom_id).await?;
                delete_detail_row(conn, role, user.id).await?;
            }

            {
                use crate::schema::certificates::dsl as cert;
                diesel::delete(cert::certificates.filter(cert::user_email.eq(account_email)))
                    .execute(conn)
                    .await?;
            }
            use crate::schema::users::dsl as u;
            diesel::delete(u::users.filter(u::id.eq(user.id)))
                .execute(conn)
                .await?;
            Ok(())
        })
    })
    .await
}

async fn delete_student_records(conn: &mut DbConnection, student: &str) -> QueryResult<()> {
    {
        use crate::schema::enrollments::dsl as e;
        diesel::delete(e::enrollments.filter(e::custom_id.eq(student)))
            .execute(conn)
            .await?;
    }
    {
        use crate::schema::progress::dsl as p;
        diesel::delete(p::progress.filter(p::custom_id.eq(student)))
            .execute(conn)
            .await?;
    }
    use crate::schema::rewards::dsl as r;
    diesel::delete(r::rewards.filter(r::custom_id.eq(student)))
        .execute(conn)
        .await?;
    Ok(())
}

async fn delete_detail_row(
    conn: &mut DbConnection,
    role: Role,
    for_user_id: i32,
) -> QueryResult<()> {
    match role {
        Role::Superadmin => {
            use crate::schema::superadmin_details::dsl::{superadmin_details, user_id};
            diesel::delete(superadmin_details.filter(user_id.eq(for_user_id)))
                .execute(conn)
                .await?;
        }
        Role::Admin => {
            use crate::schema::admin_details::dsl::{admin_details, user_id};
            diesel::delete(admin_details.filter(user_id.eq(for_user_id)))
                .execute(conn)
                .await?;
        }
        Role::Student => {
            use crate::schema::student_details::dsl::{student_details, user_id};
            diesel::delete(student_details.filter(user_id.eq(for_user_id)))
                .execute(conn)
                .await?;
        }
    }
    Ok(())
}
