use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Account roles recognised by the identity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Student,
}

impl Role {
    /// Storage representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Superadmin => "superadmin",
            Self::Admin => "admin",
            Self::Student => "student",
        }
    }

    /// Prefix used when deriving a human-readable custom ID.
    #[must_use]
    pub const fn id_tag(self) -> &'static str {
        match self {
            Self::Superadmin => "SUPERADMIN",
            Self::Admin => "ADMIN",
            Self::Student => "STU",
        }
    }

    /// Parse the storage representation back into a role.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "superadmin" => Some(Self::Superadmin),
            "admin" => Some(Self::Admin),
            "student" => Some(Self::Student),
            _ => None,
        }
    }
}

/// Whether a course is offered free of charge or against payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingType {
    Free,
    Paid,
}

impl PricingType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Self::Free),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Local lifecycle of a course with respect to the NM platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Draft,
    SentToNm,
    Approved,
}

impl CourseStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::SentToNm => "sent_to_nm",
            Self::Approved => "approved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "sent_to_nm" => Some(Self::SentToNm),
            "approved" => Some(Self::Approved),
            _ => None,
        }
    }
}

/// Approval state reported by (or pending with) the NM platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NmApprovalStatus {
    None,
    Pending,
    Approved,
}

impl NmApprovalStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            _ => None,
        }
    }
}

#[derive(Queryable, Serialize, Deserialize, Debug)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub role: &'a str,
}

/// Role-detail row shape shared by all three detail tables.
#[derive(Queryable, Serialize, Deserialize, Debug)]
pub struct RoleDetail {
    pub id: i32,
    pub user_id: i32,
    pub custom_id: String,
    pub full_name: String,
    pub mobile_number: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::superadmin_details)]
pub struct NewSuperadminDetail<'a> {
    pub user_id: i32,
    pub custom_id: &'a str,
    pub full_name: &'a str,
    pub mobile_number: Option<&'a str>,
    pub image_path: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::admin_details)]
pub struct NewAdminDetail<'a> {
    pub user_id: i32,
    pub custom_id: &'a str,
    pub full_name: &'a str,
    pub mobile_number: Option<&'a str>,
    pub image_path: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::student_details)]
pub struct NewStudentDetail<'a> {
    pub user_id: i32,
    pub custom_id: &'a str,
    pub full_name: &'a str,
    pub mobile_number: Option<&'a str>,
    pub image_path: Option<&'a str>,
}

#[derive(Queryable, Serialize, Deserialize, Debug)]
pub struct Taxon {
    pub id: i32,
    pub name: String,
}

#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
pub struct Course {
    pub id: i32,
    pub course_name: String,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub overview: Option<String>,
    pub pricing_type: String,
    pub price_amount: i32,
    pub course_image: Option<String>,
    pub course_video: Option<String>,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub course_unique_code: String,
    pub nm_approval_status: String,
    pub status: String,
    pub nm_reference_id: Option<String>,
    pub nm_last_sync: Option<NaiveDateTime>,
    pub course_content: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::courses)]
pub struct NewCourse<'a> {
    pub course_name: &'a str,
    pub category_id: Option<i32>,
    pub description: Option<&'a str>,
    pub requirements: Option<&'a str>,
    pub overview: Option<&'a str>,
    pub pricing_type: &'a str,
    pub price_amount: i32,
    pub course_image: Option<&'a str>,
    pub course_video: Option<&'a str>,
    pub is_active: bool,
    pub created_by: Option<&'a str>,
    pub course_unique_code: &'a str,
    pub nm_approval_status: &'a str,
    pub status: &'a str,
}

#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
pub struct Module {
    pub id: i32,
    pub course_id: i32,
    pub module_name: String,
    pub order_index: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::modules)]
pub struct NewModule<'a> {
    pub course_id: i32,
    pub module_name: &'a str,
    pub order_index: i32,
}

#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
pub struct Chapter {
    pub id: i32,
    pub module_id: i32,
    pub chapter_name: String,
    pub materials_json: String,
    pub order_index: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::chapters)]
pub struct NewChapter<'a> {
    pub module_id: i32,
    pub chapter_name: &'a str,
    pub materials_json: &'a str,
    pub order_index: i32,
}

#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
pub struct Enrollment {
    pub id: i32,
    pub custom_id: String,
    pub course_id: i32,
    pub enrolled_at: NaiveDateTime,
    pub completion_deadline: NaiveDateTime,
    pub completed: bool,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::enrollments)]
pub struct NewEnrollment<'a> {
    pub custom_id: &'a str,
    pub course_id: i32,
    pub enrolled_at: NaiveDateTime,
    pub completion_deadline: NaiveDateTime,
    pub completed: bool,
}

#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
pub struct ProgressRow {
    pub id: i32,
    pub custom_id: String,
    pub course_id: i32,
    pub module_id: i32,
    pub chapter_id: i32,
    pub progress_percent: i32,
    pub last_visited_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::progress)]
pub struct NewProgress<'a> {
    pub custom_id: &'a str,
    pub course_id: i32,
    pub module_id: i32,
    pub chapter_id: i32,
    pub progress_percent: i32,
    pub last_visited_at: NaiveDateTime,
}

#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
pub struct Reward {
    pub id: i32,
    pub custom_id: String,
    pub course_id: i32,
    pub reward_name: String,
    pub reward_points: i32,
    pub achieved_percent: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::rewards)]
pub struct NewReward<'a> {
    pub custom_id: &'a str,
    pub course_id: i32,
    pub reward_name: &'a str,
    pub reward_points: i32,
    pub achieved_percent: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
pub struct Certificate {
    pub id: i32,
    pub user_email: String,
    pub course_id: i32,
    pub certificate_url: String,
    pub issued_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::certificates)]
pub struct NewCertificate<'a> {
    pub user_email: &'a str,
    pub course_id: i32,
    pub certificate_url: &'a str,
    pub issued_at: NaiveDateTime,
}
