use std::collections::BTreeSet;

use actix_web::{HttpResponse, web};
use chrono::Local;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{error, info};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::Notice;
use crate::error::AppError;
use crate::model::assignment::{Enrollment, TeacherAssignment};
use crate::model::role::Role;
use crate::roster::{Reference, RosterConfig, RosterEntity, check_refs};
use crate::utils::validation::{FieldErrors, Form, lenient_ids, lenient_int};

// ---------- Teacher assignment ----------

pub struct TeacherAssignments;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignmentForm {
    #[serde(default, deserialize_with = "lenient_int")]
    pub teacher: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub course: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub academic_year: Option<i64>,
}

#[derive(Debug)]
pub struct AssignmentFields {
    pub teacher_id: i64,
    pub course_id: i64,
    pub academic_year_id: i64,
}

impl Form for AssignmentForm {
    type Clean = AssignmentFields;

    fn clean(self, errors: &mut FieldErrors) -> AssignmentFields {
        AssignmentFields {
            teacher_id: errors.required_id("teacher", self.teacher),
            course_id: errors.required_id("course", self.course),
            academic_year_id: errors.required_id("academic_year", self.academic_year),
        }
    }
}

impl AssignmentFields {
    fn references(&self) -> [Reference; 3] {
        [
            Reference::person("teacher", self.teacher_id, Role::Teacher),
            Reference::row("course", "courses", self.course_id),
            Reference::row("academic_year", "academic_years", self.academic_year_id),
        ]
    }
}

impl RosterEntity for TeacherAssignments {
    const CONFIG: RosterConfig = RosterConfig {
        label: "Teacher assignment",
        table: "teacher_courses",
        alias: "tc",
        select: r#"
            SELECT tc.id, tc.teacher_id, u.username AS teacher_username,
                   u.first_name AS teacher_first_name,
                   tc.course_id, c.code AS course_code, c.name AS course_name,
                   tc.academic_year_id, ay.start_year, ay.end_year
            FROM teacher_courses tc
            JOIN users u ON u.id = tc.teacher_id
            JOIN courses c ON c.id = tc.course_id
            JOIN academic_years ay ON ay.id = tc.academic_year_id
        "#,
        base_filter: None,
        search_fields: &["u.username", "u.first_name", "c.name", "c.code"],
        filters: &[],
        options: &[],
    };

    type Row = TeacherAssignment;
    type CreateForm = AssignmentForm;
    type UpdateForm = AssignmentForm;

    async fn insert(pool: &SqlitePool, form: AssignmentFields) -> Result<i64, AppError> {
        check_refs(pool, &form.references()).await?;
        let result = sqlx::query(
            "INSERT INTO teacher_courses (teacher_id, course_id, academic_year_id) VALUES (?, ?, ?)",
        )
        .bind(form.teacher_id)
        .bind(form.course_id)
        .bind(form.academic_year_id)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(pool: &SqlitePool, id: i64, form: AssignmentFields) -> Result<(), AppError> {
        check_refs(pool, &form.references()).await?;
        sqlx::query(
            r#"
            UPDATE teacher_courses
            SET teacher_id = ?, course_id = ?, academic_year_id = ?
            WHERE id = ?
            "#,
        )
        .bind(form.teacher_id)
        .bind(form.course_id)
        .bind(form.academic_year_id)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

// ---------- Enrollment ----------

pub struct Enrollments;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EnrollmentForm {
    #[serde(default, deserialize_with = "lenient_int")]
    pub student: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub course: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub academic_year: Option<i64>,
}

#[derive(Debug)]
pub struct EnrollmentFields {
    pub student_id: i64,
    pub course_id: i64,
    pub academic_year_id: i64,
}

impl Form for EnrollmentForm {
    type Clean = EnrollmentFields;

    fn clean(self, errors: &mut FieldErrors) -> EnrollmentFields {
        EnrollmentFields {
            student_id: errors.required_id("student", self.student),
            course_id: errors.required_id("course", self.course),
            academic_year_id: errors.required_id("academic_year", self.academic_year),
        }
    }
}

impl EnrollmentFields {
    fn references(&self) -> [Reference; 3] {
        [
            Reference::person("student", self.student_id, Role::Student),
            Reference::row("course", "courses", self.course_id),
            Reference::row("academic_year", "academic_years", self.academic_year_id),
        ]
    }
}

impl RosterEntity for Enrollments {
    const CONFIG: RosterConfig = RosterConfig {
        label: "Enrollment",
        table: "student_courses",
        alias: "sc",
        select: r#"
            SELECT sc.id, sc.student_id, u.username AS student_username,
                   u.first_name AS student_first_name,
                   sc.course_id, c.code AS course_code, c.name AS course_name,
                   sc.academic_year_id, sc.enrolled_date
            FROM student_courses sc
            JOIN users u ON u.id = sc.student_id
            JOIN courses c ON c.id = sc.course_id
        "#,
        base_filter: None,
        search_fields: &["u.username", "u.first_name", "c.name", "c.code"],
        filters: &[],
        options: &[],
    };

    type Row = Enrollment;
    type CreateForm = EnrollmentForm;
    type UpdateForm = EnrollmentForm;

    async fn insert(pool: &SqlitePool, form: EnrollmentFields) -> Result<i64, AppError> {
        check_refs(pool, &form.references()).await?;
        let result = sqlx::query(
            r#"
            INSERT INTO student_courses (student_id, course_id, academic_year_id, enrolled_date)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(form.student_id)
        .bind(form.course_id)
        .bind(form.academic_year_id)
        .bind(Local::now().date_naive())
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(pool: &SqlitePool, id: i64, form: EnrollmentFields) -> Result<(), AppError> {
        check_refs(pool, &form.references()).await?;
        sqlx::query(
            r#"
            UPDATE student_courses
            SET student_id = ?, course_id = ?, academic_year_id = ?
            WHERE id = ?
            "#,
        )
        .bind(form.student_id)
        .bind(form.course_id)
        .bind(form.academic_year_id)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

// ---------- Bulk enrollment ----------

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkEnrollRequest {
    #[serde(default, deserialize_with = "lenient_int")]
    pub batch_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub semester_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub student_ids: Vec<i64>,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub course_ids: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkEnrollResponse {
    pub created: u64,
    pub existing: u64,
    pub notice: Notice,
}

fn not_a_choice(id: i64) -> String {
    format!("Select a valid choice. {id} is not one of the available choices.")
}

/// Ids in `ids` with no matching row in `table` (optionally of `role`).
async fn missing_ids(
    pool: &SqlitePool,
    table: &str,
    role: Option<Role>,
    ids: &BTreeSet<i64>,
) -> Result<Vec<i64>, AppError> {
    let mut missing = Vec::new();
    for id in ids {
        let found: i64 = match role {
            Some(role) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ? AND role = ?")
                    .bind(id)
                    .bind(role)
                    .fetch_one(pool)
                    .await?
            }
            None => {
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE id = ?"))
                    .bind(id)
                    .fetch_one(pool)
                    .await?
            }
        };
        if found == 0 {
            missing.push(*id);
        }
    }
    Ok(missing)
}

/// Enroll Students in Courses
#[utoipa::path(
    post,
    path = "/api/admin/bulk-enroll",
    request_body = BulkEnrollRequest,
    responses(
        (status = 200, description = "Every student enrolled in every course", body = BulkEnrollResponse),
        (status = 400, description = "Batch, semester, student or course invalid"),
        (status = 401, description = "Unauthorized"),
        (status = 303, description = "Caller is not an admin")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn bulk_enroll(
    pool: web::Data<SqlitePool>,
    payload: web::Json<BulkEnrollRequest>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref();
    let request = payload.into_inner();
    let students: BTreeSet<i64> = request.student_ids.into_iter().collect();
    let courses: BTreeSet<i64> = request.course_ids.into_iter().collect();

    let mut errors = FieldErrors::new();
    let batch_id = errors.required_id("batch_id", request.batch_id);
    let semester_id = errors.required_id("semester_id", request.semester_id);
    errors.finish(())?;

    check_refs(
        pool,
        &[
            Reference::row("batch_id", "batches", batch_id),
            Reference::row("semester_id", "semesters", semester_id),
        ],
    )
    .await?;

    let mut errors = FieldErrors::new();
    for id in missing_ids(pool, "users", Some(Role::Student), &students).await? {
        errors.add("student_ids", not_a_choice(id));
    }
    for id in missing_ids(pool, "courses", None, &courses).await? {
        errors.add("course_ids", not_a_choice(id));
    }
    errors.finish(())?;

    let academic_year_id: i64 =
        sqlx::query_scalar("SELECT academic_year_id FROM semesters WHERE id = ?")
            .bind(semester_id)
            .fetch_one(pool)
            .await?;
    let today = Local::now().date_naive();

    let mut tx = pool.begin().await?;
    let mut created = 0;
    for student_id in &students {
        for course_id in &courses {
            let result = sqlx::query(
                r#"
                INSERT INTO student_courses (student_id, course_id, academic_year_id, enrolled_date)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (student_id, course_id, academic_year_id) DO NOTHING
                "#,
            )
            .bind(student_id)
            .bind(course_id)
            .bind(academic_year_id)
            .bind(today)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, student_id, course_id, "Bulk enrollment insert failed");
                AppError::from(e)
            })?;
            created += result.rows_affected();
        }
    }
    tx.commit().await?;

    let existing = (students.len() * courses.len()) as u64 - created;
    info!(batch_id, semester_id, created, existing, "Bulk enrollment done");

    Ok(HttpResponse::Ok().json(BulkEnrollResponse {
        created,
        existing,
        notice: Notice::success("Students enrolled successfully."),
    }))
}
