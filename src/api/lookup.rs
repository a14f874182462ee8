//! Small JSON endpoints backing the admin pages' dependent selects.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, SqlitePool};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::model::academic::CourseBrief;
use crate::model::user::full_name;
use crate::utils::validation::lenient_int;

#[derive(Debug, Deserialize, IntoParams)]
pub struct BatchQuery {
    #[serde(default, deserialize_with = "lenient_int")]
    pub batch_id: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SemesterQuery {
    #[serde(default, deserialize_with = "lenient_int")]
    pub semester_id: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StudentQuery {
    #[serde(default, deserialize_with = "lenient_int")]
    pub student_id: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TeacherQuery {
    #[serde(default, deserialize_with = "lenient_int")]
    pub teacher_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NamedId {
    pub id: i64,
    pub name: String,
}

#[derive(FromRow)]
struct NameParts {
    id: i64,
    first_name: String,
    last_name: String,
}

#[utoipa::path(
    get,
    path = "/api/admin/lookup/students-by-batch",
    params(BatchQuery),
    responses((status = 200, description = "Students of the batch", body = Object, example = json!({
        "students": [{"id": 7, "name": "Jane Smith"}]
    }))),
    security(("bearer_auth" = [])),
    tag = "Lookup"
)]
pub async fn students_by_batch(
    pool: web::Data<SqlitePool>,
    query: web::Query<BatchQuery>,
) -> Result<HttpResponse, AppError> {
    let rows = sqlx::query_as::<_, NameParts>(
        r#"
        SELECT u.id, u.first_name, u.last_name
        FROM users u
        JOIN student_profiles sp ON sp.user_id = u.id
        WHERE u.role = 'student' AND sp.batch_id = ?
        ORDER BY u.id
        "#,
    )
    .bind(query.batch_id)
    .fetch_all(pool.get_ref())
    .await?;

    let students: Vec<NamedId> = rows
        .into_iter()
        .map(|r| NamedId {
            id: r.id,
            name: full_name(&r.first_name, &r.last_name),
        })
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "students": students })))
}

#[utoipa::path(
    get,
    path = "/api/admin/lookup/courses-by-semester",
    params(SemesterQuery),
    responses((status = 200, description = "Courses of the semester", body = Object, example = json!({
        "courses": [{"id": 3, "name": "CS101 - Programming"}]
    }))),
    security(("bearer_auth" = [])),
    tag = "Lookup"
)]
pub async fn courses_by_semester(
    pool: web::Data<SqlitePool>,
    query: web::Query<SemesterQuery>,
) -> Result<HttpResponse, AppError> {
    let courses = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, code || ' - ' || name FROM courses WHERE semester_id = ? ORDER BY id",
    )
    .bind(query.semester_id)
    .fetch_all(pool.get_ref())
    .await?
    .into_iter()
    .map(|(id, name)| NamedId { id, name })
    .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(json!({ "courses": courses })))
}

#[utoipa::path(
    get,
    path = "/api/admin/lookup/student-courses",
    params(StudentQuery),
    responses((status = 200, description = "Courses the student is enrolled in", body = Object, example = json!({
        "enrolled_courses": [{"id": 3, "code": "CS101", "name": "Programming"}]
    }))),
    security(("bearer_auth" = [])),
    tag = "Lookup"
)]
pub async fn student_courses(
    pool: web::Data<SqlitePool>,
    query: web::Query<StudentQuery>,
) -> Result<HttpResponse, AppError> {
    let enrolled_courses = match query.student_id {
        Some(student_id) => {
            sqlx::query_as::<_, CourseBrief>(
                r#"
                SELECT c.id, c.code, c.name
                FROM courses c
                JOIN student_courses sc ON sc.course_id = c.id
                WHERE sc.student_id = ?
                ORDER BY sc.id
                "#,
            )
            .bind(student_id)
            .fetch_all(pool.get_ref())
            .await?
        }
        None => Vec::new(),
    };
    Ok(HttpResponse::Ok().json(json!({ "enrolled_courses": enrolled_courses })))
}

#[utoipa::path(
    get,
    path = "/api/admin/lookup/teacher-courses",
    params(TeacherQuery),
    responses((status = 200, description = "Courses assigned to the teacher", body = Object, example = json!({
        "assigned_courses": [{"id": 3, "code": "CS101", "name": "Programming"}]
    }))),
    security(("bearer_auth" = [])),
    tag = "Lookup"
)]
pub async fn teacher_courses(
    pool: web::Data<SqlitePool>,
    query: web::Query<TeacherQuery>,
) -> Result<HttpResponse, AppError> {
    let assigned_courses = match query.teacher_id {
        Some(teacher_id) => {
            sqlx::query_as::<_, CourseBrief>(
                r#"
                SELECT c.id, c.code, c.name
                FROM courses c
                JOIN teacher_courses tc ON tc.course_id = c.id
                WHERE tc.teacher_id = ?
                ORDER BY tc.id
                "#,
            )
            .bind(teacher_id)
            .fetch_all(pool.get_ref())
            .await?
        }
        None => Vec::new(),
    };
    Ok(HttpResponse::Ok().json(json!({ "assigned_courses": assigned_courses })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveStudentCourse {
    #[serde(default, deserialize_with = "lenient_int")]
    pub student_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub course_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveTeacherCourse {
    #[serde(default, deserialize_with = "lenient_int")]
    pub teacher_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub course_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemovalResult {
    pub success: bool,
    pub message: String,
}

impl RemovalResult {
    fn new(success: bool, message: &str) -> Self {
        Self {
            success,
            message: message.to_string(),
        }
    }
}

/// Deletes every `table` row linking `person_column` to the course. A person
/// enrolled in the same course for several years loses all of them.
async fn remove_link(
    pool: &SqlitePool,
    table: &str,
    person_column: &str,
    person_id: Option<i64>,
    course_id: Option<i64>,
) -> Result<u64, AppError> {
    let (Some(person_id), Some(course_id)) = (person_id, course_id) else {
        return Ok(0);
    };
    let result = sqlx::query(&format!(
        "DELETE FROM {table} WHERE {person_column} = ? AND course_id = ?"
    ))
    .bind(person_id)
    .bind(course_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[utoipa::path(
    post,
    path = "/api/admin/lookup/remove-student-course",
    request_body = RemoveStudentCourse,
    responses((status = 200, description = "Outcome of the removal", body = RemovalResult)),
    security(("bearer_auth" = [])),
    tag = "Lookup"
)]
pub async fn remove_student_course(
    pool: web::Data<SqlitePool>,
    payload: web::Json<RemoveStudentCourse>,
) -> Result<HttpResponse, AppError> {
    let removed = remove_link(
        pool.get_ref(),
        "student_courses",
        "student_id",
        payload.student_id,
        payload.course_id,
    )
    .await?;

    let result = if removed > 0 {
        info!(student_id = ?payload.student_id, course_id = ?payload.course_id, "Enrollment removed");
        RemovalResult::new(true, "Course removed successfully")
    } else {
        RemovalResult::new(false, "Enrollment not found")
    };
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    post,
    path = "/api/admin/lookup/remove-teacher-course",
    request_body = RemoveTeacherCourse,
    responses((status = 200, description = "Outcome of the removal", body = RemovalResult)),
    security(("bearer_auth" = [])),
    tag = "Lookup"
)]
pub async fn remove_teacher_course(
    pool: web::Data<SqlitePool>,
    payload: web::Json<RemoveTeacherCourse>,
) -> Result<HttpResponse, AppError> {
    let removed = remove_link(
        pool.get_ref(),
        "teacher_courses",
        "teacher_id",
        payload.teacher_id,
        payload.course_id,
    )
    .await?;

    let result = if removed > 0 {
        info!(teacher_id = ?payload.teacher_id, course_id = ?payload.course_id, "Assignment removed");
        RemovalResult::new(true, "Course assignment removed successfully")
    } else {
        RemovalResult::new(false, "Assignment not found")
    };
    Ok(HttpResponse::Ok().json(result))
}

#[cfg(test)]
mod tests {
    use crate::test_app;
    use crate::test_support::{Fixture, admin_get, admin_post, test_pool};
    use actix_web::{http::StatusCode, test as atest};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn lookups_return_named_choices() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let app = test_app!(pool.clone());

        let uri = format!("/api/admin/lookup/students-by-batch?batch_id={}", fx.batch);
        let body: Value = atest::call_and_read_body_json(&app, admin_get(fx.admin, &uri)).await;
        assert_eq!(body, json!({"students": [{"id": fx.student, "name": "Stu Dent"}]}));

        let uri = format!("/api/admin/lookup/courses-by-semester?semester_id={}", fx.semester);
        let body: Value = atest::call_and_read_body_json(&app, admin_get(fx.admin, &uri)).await;
        assert_eq!(body, json!({"courses": [{"id": fx.course, "name": "CS101 - Programming"}]}));

        let uri = format!("/api/admin/lookup/student-courses?student_id={}", fx.student);
        let body: Value = atest::call_and_read_body_json(&app, admin_get(fx.admin, &uri)).await;
        assert_eq!(
            body,
            json!({"enrolled_courses": [{"id": fx.course, "code": "CS101", "name": "Programming"}]})
        );

        let uri = format!("/api/admin/lookup/teacher-courses?teacher_id={}", fx.teacher);
        let body: Value = atest::call_and_read_body_json(&app, admin_get(fx.admin, &uri)).await;
        assert_eq!(body["assigned_courses"][0]["code"], "CS101");
    }

    #[actix_web::test]
    async fn lookups_without_an_id_are_empty() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let app = test_app!(pool.clone());

        for (uri, key) in [
            ("/api/admin/lookup/student-courses", "enrolled_courses"),
            ("/api/admin/lookup/teacher-courses?teacher_id=", "assigned_courses"),
            ("/api/admin/lookup/students-by-batch", "students"),
        ] {
            let body: Value = atest::call_and_read_body_json(&app, admin_get(fx.admin, uri)).await;
            assert_eq!(body[key], json!([]), "{uri}");
        }
    }

    #[actix_web::test]
    async fn removal_reports_success_then_not_found() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let app = test_app!(pool.clone());

        let payload = json!({"student_id": fx.student, "course_id": fx.course});
        let body: Value = atest::call_and_read_body_json(
            &app,
            admin_post(fx.admin, "/api/admin/lookup/remove-student-course", payload.clone()),
        )
        .await;
        assert_eq!(body, json!({"success": true, "message": "Course removed successfully"}));

        let body: Value = atest::call_and_read_body_json(
            &app,
            admin_post(fx.admin, "/api/admin/lookup/remove-student-course", payload),
        )
        .await;
        assert_eq!(body, json!({"success": false, "message": "Enrollment not found"}));

        let body: Value = atest::call_and_read_body_json(
            &app,
            admin_post(
                fx.admin,
                "/api/admin/lookup/remove-teacher-course",
                json!({"teacher_id": fx.teacher, "course_id": fx.course}),
            ),
        )
        .await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Course assignment removed successfully");

        let body: Value = atest::call_and_read_body_json(
            &app,
            admin_post(fx.admin, "/api/admin/lookup/remove-teacher-course", json!({})),
        )
        .await;
        assert_eq!(body, json!({"success": false, "message": "Assignment not found"}));
    }

    #[actix_web::test]
    async fn malformed_ids_are_json_bad_requests() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let app = test_app!(pool.clone());

        let resp = atest::call_service(
            &app,
            admin_get(fx.admin, "/api/admin/lookup/students-by-batch?batch_id=abc"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = atest::read_body_json(resp).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["message"].as_str().unwrap().contains("Enter a whole number"));

        let resp = atest::call_service(
            &app,
            admin_post(
                fx.admin,
                "/api/admin/lookup/remove-student-course",
                json!({"student_id": "abc", "course_id": fx.course}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = atest::read_body_json(resp).await;
        assert_eq!(body["code"], "BAD_REQUEST");
    }
}
