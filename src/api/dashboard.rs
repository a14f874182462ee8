use actix_web::{HttpResponse, web};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;

use crate::api::attendance::assignments_of;
use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::academic::CourseBrief;
use crate::model::assignment::TeacherAssignment;
use crate::model::role::Role;
use crate::utils::attendance_stats::{AttendanceSummary, course_summary, overall_percentage};

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct AdminCounts {
    pub total_students: i64,
    pub total_teachers: i64,
    pub total_courses: i64,
    pub total_departments: i64,
    pub total_batches: i64,
    pub total_programs: i64,
    pub total_academic_years: i64,
    pub total_semesters: i64,
    pub total_enrollments: i64,
    pub total_assignments: i64,
    pub total_sessions: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseProgress {
    pub course: CourseBrief,
    #[serde(flatten)]
    pub summary: AttendanceSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SemesterProgress {
    pub semester_id: i64,
    pub number: i64,
    pub name: String,
    pub courses: Vec<CourseProgress>,
}

/// Tagged with the caller's role.
#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    Admin {
        #[serde(flatten)]
        counts: AdminCounts,
        avg_attendance: f64,
    },
    Teacher {
        courses: Vec<TeacherAssignment>,
        total_courses: usize,
    },
    Student {
        semesters: Vec<SemesterProgress>,
    },
}

async fn admin_dashboard(pool: &SqlitePool) -> Result<Dashboard, AppError> {
    let counts = sqlx::query_as::<_, AdminCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users WHERE role = 'student') AS total_students,
            (SELECT COUNT(*) FROM users WHERE role = 'teacher') AS total_teachers,
            (SELECT COUNT(*) FROM courses) AS total_courses,
            (SELECT COUNT(*) FROM departments) AS total_departments,
            (SELECT COUNT(*) FROM batches) AS total_batches,
            (SELECT COUNT(*) FROM programs) AS total_programs,
            (SELECT COUNT(*) FROM academic_years) AS total_academic_years,
            (SELECT COUNT(*) FROM semesters) AS total_semesters,
            (SELECT COUNT(*) FROM student_courses) AS total_enrollments,
            (SELECT COUNT(*) FROM teacher_courses) AS total_assignments,
            (SELECT COUNT(*) FROM attendance_sessions) AS total_sessions
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(Dashboard::Admin {
        counts,
        avg_attendance: overall_percentage(pool).await?,
    })
}

#[derive(FromRow)]
struct EnrollmentRow {
    course_id: i64,
    code: String,
    name: String,
    academic_year_id: i64,
    semester_id: i64,
    semester_number: i64,
    semester_name: String,
}

async fn student_dashboard(pool: &SqlitePool, student_id: i64) -> Result<Dashboard, AppError> {
    let rows = sqlx::query_as::<_, EnrollmentRow>(
        r#"
        SELECT c.id AS course_id, c.code, c.name, sc.academic_year_id,
               s.id AS semester_id, s.number AS semester_number, s.name AS semester_name
        FROM student_courses sc
        JOIN courses c ON c.id = sc.course_id
        JOIN semesters s ON s.id = c.semester_id
        WHERE sc.student_id = ?
        ORDER BY s.id, sc.id
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let mut semesters: Vec<SemesterProgress> = Vec::new();
    for row in rows {
        let summary = course_summary(pool, student_id, row.course_id, Some(row.academic_year_id)).await?;
        let progress = CourseProgress {
            course: CourseBrief {
                id: row.course_id,
                code: row.code,
                name: row.name,
            },
            summary,
        };
        // rows arrive grouped by semester
        match semesters.last_mut() {
            Some(current) if current.semester_id == row.semester_id => current.courses.push(progress),
            _ => semesters.push(SemesterProgress {
                semester_id: row.semester_id,
                number: row.semester_number,
                name: row.semester_name,
                courses: vec![progress],
            }),
        }
    }

    Ok(Dashboard::Student { semesters })
}

/// Dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Role specific overview", body = Object, example = json!({
            "role": "teacher", "courses": [], "total_courses": 0
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref();
    let dashboard = match auth.role {
        Role::Admin => admin_dashboard(pool).await?,
        Role::Teacher => {
            let courses = assignments_of(pool, auth.user_id).await?;
            Dashboard::Teacher {
                total_courses: courses.len(),
                courses,
            }
        }
        Role::Student => student_dashboard(pool, auth.user_id).await?,
    };
    Ok(HttpResponse::Ok().json(dashboard))
}
