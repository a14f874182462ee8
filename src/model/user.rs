use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::role::Role;

/// A person as listed by the teacher roster and the lookup endpoints.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Person {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub employee_id: Option<String>,
    pub student_id: Option<String>,
    pub phone: String,
}

/// A student row with its batch, as listed by the student roster.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Student {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub student_id: Option<String>,
    pub phone: String,
    pub batch_id: Option<i64>,
    pub batch_year: Option<String>,
}

pub fn full_name(first: &str, last: &str) -> String {
    format!("{first} {last}").trim().to_string()
}
