use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

/// A teacher assigned to teach a course in an academic year.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct TeacherAssignment {
    pub id: i64,
    pub teacher_id: i64,
    pub teacher_username: String,
    pub teacher_first_name: String,
    pub course_id: i64,
    pub course_code: String,
    pub course_name: String,
    pub academic_year_id: i64,
    pub start_year: i64,
    pub end_year: i64,
}

/// A student enrolled in a course for an academic year.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub student_username: String,
    pub student_first_name: String,
    pub course_id: i64,
    pub course_code: String,
    pub course_name: String,
    pub academic_year_id: i64,
    #[schema(value_type = String, format = "date")]
    pub enrolled_date: NaiveDate,
}
