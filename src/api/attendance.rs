use std::collections::HashMap;

use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, error, info};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::Notice;
use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::academic::CourseBrief;
use crate::model::assignment::TeacherAssignment;
use crate::model::attendance::{AttendanceRecord, AttendanceSession, AttendanceStatus};
use crate::utils::attendance_stats::{AttendanceSummary, course_summary};
use crate::utils::validation::{FieldErrors, trimmed};

const ASSIGNMENT_SELECT: &str = r#"
    SELECT tc.id, tc.teacher_id, u.username AS teacher_username,
           u.first_name AS teacher_first_name,
           tc.course_id, c.code AS course_code, c.name AS course_name,
           tc.academic_year_id, ay.start_year, ay.end_year
    FROM teacher_courses tc
    JOIN users u ON u.id = tc.teacher_id
    JOIN courses c ON c.id = tc.course_id
    JOIN academic_years ay ON ay.id = tc.academic_year_id
"#;

const SESSION_SELECT: &str = r#"
    SELECT s.id, s.course_id, s.teacher_id, s.date, s.start_time, s.end_time,
           s.academic_year_id, s.topic,
           COALESCE(SUM(CASE WHEN a.status = 'present' THEN 1 ELSE 0 END), 0) AS present_count,
           COALESCE(SUM(CASE WHEN a.status = 'absent' THEN 1 ELSE 0 END), 0) AS absent_count,
           COALESCE(SUM(CASE WHEN a.status = 'late' THEN 1 ELSE 0 END), 0) AS late_count
    FROM attendance_sessions s
    LEFT JOIN attendance a ON a.session_id = s.id
"#;

/// Assignments held by `teacher_id`, oldest first.
pub async fn assignments_of(
    pool: &SqlitePool,
    teacher_id: i64,
) -> Result<Vec<TeacherAssignment>, sqlx::Error> {
    sqlx::query_as::<_, TeacherAssignment>(&format!(
        "{ASSIGNMENT_SELECT} WHERE tc.teacher_id = ? ORDER BY tc.id"
    ))
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}

/// The assignment, provided it belongs to the calling teacher.
async fn own_assignment(
    pool: &SqlitePool,
    assignment_id: i64,
    teacher_id: i64,
) -> Result<TeacherAssignment, AppError> {
    sqlx::query_as::<_, TeacherAssignment>(&format!(
        "{ASSIGNMENT_SELECT} WHERE tc.id = ? AND tc.teacher_id = ?"
    ))
    .bind(assignment_id)
    .bind(teacher_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Assignment"))
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct EnrolledStudent {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub student_id: Option<String>,
}

async fn enrolled_students(
    pool: &SqlitePool,
    assignment: &TeacherAssignment,
) -> Result<Vec<EnrolledStudent>, sqlx::Error> {
    sqlx::query_as::<_, EnrolledStudent>(
        r#"
        SELECT DISTINCT u.id, u.username, u.first_name, u.last_name, u.student_id
        FROM users u
        JOIN student_courses sc ON sc.student_id = u.id
        WHERE sc.course_id = ? AND sc.academic_year_id = ?
        ORDER BY u.username
        "#,
    )
    .bind(assignment.course_id)
    .bind(assignment.academic_year_id)
    .fetch_all(pool)
    .await
}

/// My Assignments
#[utoipa::path(
    get,
    path = "/api/teacher/courses",
    responses(
        (status = 200, description = "Assignments of the calling teacher", body = [TeacherAssignment]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn teacher_courses(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, AppError> {
    let courses = assignments_of(pool.get_ref(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(courses))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkingSheet {
    pub assignment: TeacherAssignment,
    pub students: Vec<EnrolledStudent>,
}

/// Attendance Sheet
#[utoipa::path(
    get,
    path = "/api/teacher/assignments/{assignment_id}/attendance",
    params(("assignment_id", Path, description = "Teacher assignment ID")),
    responses(
        (status = 200, description = "Assignment and its enrolled students", body = MarkingSheet),
        (status = 404, description = "Assignment not found or not yours")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn marking_sheet(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let assignment = own_assignment(pool.get_ref(), path.into_inner(), auth.user_id).await?;
    let students = enrolled_students(pool.get_ref(), &assignment).await?;
    Ok(HttpResponse::Ok().json(MarkingSheet {
        assignment,
        students,
    }))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MarkAttendanceRequest {
    #[schema(example = "2025-03-14")]
    pub date: Option<String>,
    #[schema(example = "09:00")]
    pub start_time: Option<String>,
    #[schema(example = "10:00")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 200))]
    pub topic: Option<String>,
    /// Student id -> `present` | `absent` | `late`. Missing students are absent.
    #[serde(default)]
    pub attendance: HashMap<String, String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAttendanceResponse {
    pub session_id: i64,
    pub marked: usize,
    pub notice: Notice,
}

fn parse_date(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty());
    let Some(raw) = raw else {
        errors.add(field, crate::utils::validation::REQUIRED);
        return None;
    };
    let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok();
    if parsed.is_none() {
        errors.add(field, "Enter a valid date.");
    }
    parsed
}

fn parse_time(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<NaiveTime> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty());
    let Some(raw) = raw else {
        errors.add(field, crate::utils::validation::REQUIRED);
        return None;
    };
    let parsed = NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok();
    if parsed.is_none() {
        errors.add(field, "Enter a valid time.");
    }
    parsed
}

/// Resolves every enrolled student's status; unsubmitted students are absent.
fn statuses_for(
    errors: &mut FieldErrors,
    students: &[EnrolledStudent],
    submitted: &HashMap<String, String>,
) -> Vec<(i64, AttendanceStatus)> {
    students
        .iter()
        .filter_map(|student| {
            let Some(raw) = submitted.get(&student.id.to_string()).map(|s| s.trim()) else {
                return Some((student.id, AttendanceStatus::Absent));
            };
            match raw.parse::<AttendanceStatus>() {
                Ok(status) => Some((student.id, status)),
                Err(_) => {
                    errors.add(
                        "attendance",
                        format!(
                            "Select a valid choice. {raw} is not one of the available choices."
                        ),
                    );
                    None
                }
            }
        })
        .collect()
}

/// Mark Attendance
#[utoipa::path(
    post,
    path = "/api/teacher/assignments/{assignment_id}/attendance",
    params(("assignment_id", Path, description = "Teacher assignment ID")),
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "Session and records created", body = MarkAttendanceResponse),
        (status = 400, description = "Invalid date, time or status"),
        (status = 404, description = "Assignment not found or not yours"),
        (status = 409, description = "A session already starts at that time")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<MarkAttendanceRequest>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref();
    let assignment = own_assignment(pool, path.into_inner(), auth.user_id).await?;
    let students = enrolled_students(pool, &assignment).await?;

    let mut errors = FieldErrors::of(&*payload);
    let date = parse_date(&mut errors, "date", payload.date.as_deref());
    let start_time = parse_time(&mut errors, "start_time", payload.start_time.as_deref());
    let end_time = parse_time(&mut errors, "end_time", payload.end_time.as_deref());
    let topic = payload.topic.clone().unwrap_or_default();
    let statuses = statuses_for(&mut errors, &students, &payload.attendance);
    let (Some(date), Some(start_time), Some(end_time)) = (date, start_time, end_time) else {
        return Err(errors.into());
    };
    errors.finish(())?;

    let mut tx = pool.begin().await?;

    let session_id = sqlx::query(
        r#"
        INSERT INTO attendance_sessions
        (course_id, teacher_id, date, start_time, end_time, academic_year_id, topic)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(assignment.course_id)
    .bind(auth.user_id)
    .bind(date)
    .bind(start_time)
    .bind(end_time)
    .bind(assignment.academic_year_id)
    .bind(&topic)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        debug!(error = %e, assignment_id = assignment.id, "Session insert rejected");
        AppError::from(e)
    })?
    .last_insert_rowid();

    let marked_at = Utc::now();
    for (student_id, status) in &statuses {
        sqlx::query(
            r#"
            INSERT INTO attendance (session_id, student_id, status, marked_at, marked_by)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(session_id)
        .bind(student_id)
        .bind(status)
        .bind(marked_at)
        .bind(auth.user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, session_id, student_id, "Attendance insert failed");
            AppError::from(e)
        })?;
    }

    tx.commit().await?;
    info!(
        session_id,
        assignment_id = assignment.id,
        marked = statuses.len(),
        "Attendance marked"
    );

    Ok(HttpResponse::Ok().json(MarkAttendanceResponse {
        session_id,
        marked: statuses.len(),
        notice: Notice::success("Attendance marked successfully!"),
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceHistory {
    pub assignment: TeacherAssignment,
    pub sessions: Vec<AttendanceSession>,
}

/// Attendance History
#[utoipa::path(
    get,
    path = "/api/teacher/assignments/{assignment_id}/history",
    params(("assignment_id", Path, description = "Teacher assignment ID")),
    responses(
        (status = 200, description = "Sessions newest first with status counts", body = AttendanceHistory),
        (status = 404, description = "Assignment not found or not yours")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn attendance_history(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let assignment = own_assignment(pool.get_ref(), path.into_inner(), auth.user_id).await?;

    let sessions = sqlx::query_as::<_, AttendanceSession>(&format!(
        r#"
        {SESSION_SELECT}
        WHERE s.course_id = ? AND s.academic_year_id = ?
        GROUP BY s.id
        ORDER BY s.date DESC, s.start_time DESC
        "#
    ))
    .bind(assignment.course_id)
    .bind(assignment.academic_year_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(AttendanceHistory {
        assignment,
        sessions,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionDetail {
    pub session: AttendanceSession,
    pub records: Vec<AttendanceRecord>,
}

/// Session Detail
#[utoipa::path(
    get,
    path = "/api/teacher/sessions/{session_id}",
    params(("session_id", Path, description = "Attendance session ID")),
    responses(
        (status = 200, description = "Records of the session", body = SessionDetail),
        (status = 404, description = "Session not found or not yours")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn session_detail(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();

    let session = sqlx::query_as::<_, AttendanceSession>(&format!(
        "{SESSION_SELECT} WHERE s.id = ? AND s.teacher_id = ? GROUP BY s.id"
    ))
    .bind(session_id)
    .bind(auth.user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Session"))?;

    let records = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT a.id, a.session_id, a.student_id, u.username AS student_username,
               u.first_name AS student_first_name, u.last_name AS student_last_name,
               a.status, a.marked_at, a.marked_by, s.date, s.start_time
        FROM attendance a
        JOIN users u ON u.id = a.student_id
        JOIN attendance_sessions s ON s.id = a.session_id
        WHERE a.session_id = ?
        ORDER BY u.username
        "#,
    )
    .bind(session_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(SessionDetail { session, records }))
}

#[derive(Debug, FromRow)]
struct EnrolledCourse {
    id: i64,
    code: String,
    name: String,
    academic_year_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseAttendance {
    pub course: CourseBrief,
    pub academic_year_id: i64,
    pub summary: AttendanceSummary,
    pub attendances: Vec<AttendanceRecord>,
}

/// My Attendance
#[utoipa::path(
    get,
    path = "/api/student/attendance",
    responses(
        (status = 200, description = "Per enrolled course, the caller's records newest first", body = [CourseAttendance]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn student_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref();
    let enrollments = sqlx::query_as::<_, EnrolledCourse>(
        r#"
        SELECT c.id, c.code, c.name, sc.academic_year_id
        FROM student_courses sc
        JOIN courses c ON c.id = sc.course_id
        WHERE sc.student_id = ?
        ORDER BY sc.id
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(pool)
    .await?;

    let mut data = Vec::with_capacity(enrollments.len());
    for enrollment in enrollments {
        let attendances = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT a.id, a.session_id, a.student_id, u.username AS student_username,
                   u.first_name AS student_first_name, u.last_name AS student_last_name,
                   a.status, a.marked_at, a.marked_by, s.date, s.start_time
            FROM attendance a
            JOIN users u ON u.id = a.student_id
            JOIN attendance_sessions s ON s.id = a.session_id
            WHERE a.student_id = ? AND s.course_id = ? AND s.academic_year_id = ?
            ORDER BY s.date DESC, s.start_time DESC
            "#,
        )
        .bind(auth.user_id)
        .bind(enrollment.id)
        .bind(enrollment.academic_year_id)
        .fetch_all(pool)
        .await?;

        let summary = course_summary(
            pool,
            auth.user_id,
            enrollment.id,
            Some(enrollment.academic_year_id),
        )
        .await?;

        data.push(CourseAttendance {
            course: CourseBrief {
                id: enrollment.id,
                code: enrollment.code,
                name: enrollment.name,
            },
            academic_year_id: enrollment.academic_year_id,
            summary,
            attendances,
        });
    }

    Ok(HttpResponse::Ok().json(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::test_app;
    use crate::test_support::{Fixture, authed_get, authed_post, create_user, test_pool};
    use actix_web::{http::StatusCode, test as atest};
    use serde_json::{Value, json};

    #[test]
    fn unsubmitted_students_default_to_absent() {
        let students: Vec<EnrolledStudent> = [1, 2]
            .into_iter()
            .map(|id| EnrolledStudent {
                id,
                username: format!("s{id}"),
                first_name: String::new(),
                last_name: String::new(),
                student_id: None,
            })
            .collect();
        let submitted = HashMap::from([("1".to_string(), "late".to_string())]);

        let mut errors = FieldErrors::new();
        let statuses = statuses_for(&mut errors, &students, &submitted);
        assert!(errors.is_empty());
        assert_eq!(
            statuses,
            vec![(1, AttendanceStatus::Late), (2, AttendanceStatus::Absent)]
        );

        let bogus = HashMap::from([("2".to_string(), "excused".to_string())]);
        let mut errors = FieldErrors::new();
        statuses_for(&mut errors, &students, &bogus);
        assert_eq!(
            errors.get("attendance"),
            ["Select a valid choice. excused is not one of the available choices."]
        );
    }

    #[test]
    fn times_accept_with_or_without_seconds() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            parse_time(&mut errors, "t", Some("09:30")),
            NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert_eq!(
            parse_time(&mut errors, "t", Some("09:30:15")),
            NaiveTime::from_hms_opt(9, 30, 15)
        );
        assert!(errors.is_empty());
        assert_eq!(parse_time(&mut errors, "t", Some("9.30")), None);
        assert_eq!(parse_date(&mut errors, "d", Some("14/03/2025")), None);
        assert_eq!(parse_date(&mut errors, "missing", None), None);
        assert_eq!(errors.get("t"), ["Enter a valid time."]);
        assert_eq!(errors.get("d"), ["Enter a valid date."]);
        assert_eq!(errors.get("missing"), ["This field is required."]);
    }

    #[actix_web::test]
    async fn marking_three_students_two_present() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let second = fx.add_student(&pool, "student2").await;
        let third = fx.add_student(&pool, "student3").await;
        fx.enroll(&pool, second).await;
        fx.enroll(&pool, third).await;
        let app = test_app!(pool.clone());

        let uri = format!("/api/teacher/assignments/{}/attendance", fx.assignment);
        let sheet: Value = atest::call_and_read_body_json(
            &app,
            authed_get(fx.teacher, Role::Teacher, &uri),
        )
        .await;
        let usernames: Vec<&str> = sheet["students"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["username"].as_str().unwrap())
            .collect();
        assert_eq!(usernames, ["student1", "student2", "student3"]);

        let mut attendance = serde_json::Map::new();
        attendance.insert(fx.student.to_string(), json!("present"));
        attendance.insert(second.to_string(), json!("present"));
        let payload = json!({
            "date": "2025-03-14", "start_time": "09:00", "end_time": "10:00",
            "topic": "Loops", "attendance": attendance
        });
        let resp = atest::call_service(&app, authed_post(fx.teacher, Role::Teacher, &uri, payload.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = atest::read_body_json(resp).await;
        assert_eq!(body["marked"], 3);
        assert_eq!(body["notice"]["message"], "Attendance marked successfully!");

        for (student, attended) in [(fx.student, 1), (second, 1), (third, 0)] {
            let summary = course_summary(&pool, student, fx.course, Some(fx.academic_year))
                .await
                .unwrap();
            assert_eq!(summary.total_sessions, 1);
            assert_eq!(summary.attended_sessions, attended);
        }
        let attended: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM attendance WHERE status IN ('present', 'late')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(attended, 2);

        let replay = atest::call_service(&app, authed_post(fx.teacher, Role::Teacher, &uri, payload)).await;
        assert_eq!(replay.status(), StatusCode::CONFLICT);
        let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance_sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(sessions, 1);
    }

    #[actix_web::test]
    async fn invalid_status_writes_nothing() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let app = test_app!(pool.clone());

        let uri = format!("/api/teacher/assignments/{}/attendance", fx.assignment);
        let mut attendance = serde_json::Map::new();
        attendance.insert(fx.student.to_string(), json!("sleeping"));
        let payload = json!({
            "date": "2025-03-14", "start_time": "09:00", "end_time": "10:00",
            "attendance": attendance
        });
        let resp = atest::call_service(&app, authed_post(fx.teacher, Role::Teacher, &uri, payload)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance_sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(sessions, 0);
    }

    #[actix_web::test]
    async fn overlong_topic_is_a_field_error() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let app = test_app!(pool.clone());

        let uri = format!("/api/teacher/assignments/{}/attendance", fx.assignment);
        let payload = json!({
            "date": "2025-03-14", "start_time": "09:00", "end_time": "10:00",
            "topic": "t".repeat(201)
        });
        let resp = atest::call_service(&app, authed_post(fx.teacher, Role::Teacher, &uri, payload)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = atest::read_body_json(resp).await;
        assert_eq!(
            body["errors"]["topic"][0],
            "Ensure this value has at most 200 characters (it has 201)."
        );
    }

    #[actix_web::test]
    async fn other_teachers_cannot_touch_the_assignment() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let intruder = create_user(&pool, "teacher2", Role::Teacher).await;
        let session = fx.session(&pool, 9).await;
        let app = test_app!(pool.clone());

        for uri in [
            format!("/api/teacher/assignments/{}/attendance", fx.assignment),
            format!("/api/teacher/assignments/{}/history", fx.assignment),
            format!("/api/teacher/sessions/{session}"),
        ] {
            let resp = atest::call_service(&app, authed_get(intruder, Role::Teacher, &uri)).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }

        let courses: Value = atest::call_and_read_body_json(
            &app,
            authed_get(intruder, Role::Teacher, "/api/teacher/courses"),
        )
        .await;
        assert_eq!(courses, json!([]));
    }

    #[actix_web::test]
    async fn history_counts_statuses_newest_first() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let other = fx.add_student(&pool, "student2").await;
        let early = fx.session(&pool, 9).await;
        let late = fx.session(&pool, 11).await;
        fx.record(&pool, early, fx.student, AttendanceStatus::Present).await;
        fx.record(&pool, early, other, AttendanceStatus::Late).await;
        fx.record(&pool, late, fx.student, AttendanceStatus::Absent).await;
        let app = test_app!(pool.clone());

        let uri = format!("/api/teacher/assignments/{}/history", fx.assignment);
        let body: Value =
            atest::call_and_read_body_json(&app, authed_get(fx.teacher, Role::Teacher, &uri)).await;
        let sessions = body["sessions"].as_array().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0]["id"], late);
        assert_eq!(sessions[0]["absent_count"], 1);
        assert_eq!(sessions[1]["present_count"], 1);
        assert_eq!(sessions[1]["late_count"], 1);
        assert_eq!(sessions[1]["absent_count"], 0);

        let uri = format!("/api/teacher/sessions/{early}");
        let body: Value =
            atest::call_and_read_body_json(&app, authed_get(fx.teacher, Role::Teacher, &uri)).await;
        assert_eq!(body["session"]["id"], early);
        assert_eq!(body["records"].as_array().unwrap().len(), 2);
        assert_eq!(body["records"][0]["student_username"], "student1");
        assert_eq!(body["records"][0]["status"], "present");
    }

    #[actix_web::test]
    async fn student_sees_own_records_per_course() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let first = fx.session(&pool, 9).await;
        let second = fx.session(&pool, 10).await;
        fx.record(&pool, first, fx.student, AttendanceStatus::Present).await;
        fx.record(&pool, second, fx.student, AttendanceStatus::Absent).await;
        let app = test_app!(pool.clone());

        let body: Value = atest::call_and_read_body_json(
            &app,
            authed_get(fx.student, Role::Student, "/api/student/attendance"),
        )
        .await;
        assert_eq!(body[0]["course"]["code"], "CS101");
        assert_eq!(body[0]["summary"]["percentage"], 50.0);
        let marks = body[0]["attendances"].as_array().unwrap();
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[0]["session_id"], second);
        assert_eq!(marks[0]["status"], "absent");
    }
}
