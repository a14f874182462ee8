use serde::Serialize;
use utoipa::ToSchema;

/// Cohort admitted under a department and program in a given year span.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Batch {
    pub id: i64,
    pub year: String,
    pub department_id: i64,
    pub department_name: String,
    pub program_id: i64,
    pub program_name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct AcademicYear {
    pub id: i64,
    pub batch_id: i64,
    pub batch_year: String,
    pub start_year: i64,
    pub end_year: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Semester {
    pub id: i64,
    pub academic_year_id: i64,
    pub number: i64,
    pub name: String,
    pub start_year: i64,
    pub end_year: i64,
    pub batch_year: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub credits: i64,
    pub department_id: i64,
    pub department_name: String,
    pub semester_id: i64,
    pub semester_number: i64,
}

/// `{id, code, name}` triple returned by the lookup endpoints.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct CourseBrief {
    pub id: i64,
    pub code: String,
    pub name: String,
}
