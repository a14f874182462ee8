use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::model::academic::CourseBrief;
use crate::utils::attendance_stats::{AttendanceSummary, course_summary};
use crate::utils::validation::lenient_int;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    /// Omit to list the courses a report can be run for.
    #[serde(default, deserialize_with = "lenient_int")]
    pub course_id: Option<i64>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct ReportStudent {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub student_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportRow {
    pub student: ReportStudent,
    #[serde(flatten)]
    pub summary: AttendanceSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseBrief>,
    pub report_data: Vec<ReportRow>,
    pub courses: Vec<CourseBrief>,
}

/// Course Attendance Report
#[utoipa::path(
    get,
    path = "/api/admin/reports",
    params(ReportQuery),
    responses(
        (status = 200, description = "Per-student attendance for the course", body = CourseReport),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn course_report(
    pool: web::Data<SqlitePool>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref();
    let courses = sqlx::query_as::<_, CourseBrief>("SELECT id, code, name FROM courses ORDER BY id")
        .fetch_all(pool)
        .await?;

    let Some(course_id) = query.course_id else {
        return Ok(HttpResponse::Ok().json(CourseReport {
            course: None,
            report_data: Vec::new(),
            courses,
        }));
    };

    let course = courses
        .iter()
        .find(|c| c.id == course_id)
        .cloned()
        .ok_or_else(|| AppError::not_found("Course"))?;

    let students = sqlx::query_as::<_, ReportStudent>(
        r#"
        SELECT DISTINCT u.id, u.username, u.first_name, u.last_name, u.student_id
        FROM users u
        JOIN student_courses sc ON sc.student_id = u.id
        WHERE sc.course_id = ? AND u.role = 'student'
        ORDER BY u.id
        "#,
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    let mut report_data = Vec::with_capacity(students.len());
    for student in students {
        // every academic year the course ran in
        let summary = course_summary(pool, student.id, course_id, None).await?;
        report_data.push(ReportRow { student, summary });
    }

    Ok(HttpResponse::Ok().json(CourseReport {
        course: Some(course),
        report_data,
        courses,
    }))
}
