use actix_http::Request;
use actix_web::test::TestRequest;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions};
use std::str::FromStr;

use crate::auth::jwt::generate_access_token;
use crate::model::attendance::AttendanceStatus;
use crate::model::role::Role;

/// Builds the service under test with the same route table as `main`.
#[macro_export]
macro_rules! test_app {
    ($pool:expr) => {{
        let config = $crate::config::Config::for_tests();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($pool))
                .app_data(actix_web::web::Data::new(config.clone()))
                .configure(|cfg| $crate::routes::configure(cfg, config.clone())),
        )
        .await
    }};
}

/// A private in-memory database. One connection, never recycled, or the data is gone.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/// Inserts an account with an unusable password.
pub async fn create_user(pool: &SqlitePool, username: &str, role: Role) -> i64 {
    sqlx::query("INSERT INTO users (username, password, role) VALUES (?, '!', ?)")
        .bind(username)
        .bind(role)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub fn token_for(user_id: i64, username: &str, role: Role) -> String {
    generate_access_token(user_id, username.to_string(), role, "test-secret", 900).unwrap()
}

fn authed(req: TestRequest, user_id: i64, role: Role) -> TestRequest {
    let token = token_for(user_id, &format!("user{user_id}"), role);
    req.peer_addr("127.0.0.1:9000".parse().unwrap())
        .insert_header(("Authorization", format!("Bearer {token}")))
}

pub fn authed_get(user_id: i64, role: Role, uri: &str) -> Request {
    authed(TestRequest::get().uri(uri), user_id, role).to_request()
}

pub fn authed_post(user_id: i64, role: Role, uri: &str, body: Value) -> Request {
    authed(TestRequest::post().uri(uri), user_id, role)
        .set_json(body)
        .to_request()
}

pub fn admin_get(admin_id: i64, uri: &str) -> Request {
    authed_get(admin_id, Role::Admin, uri)
}

pub fn admin_post(admin_id: i64, uri: &str, body: Value) -> Request {
    authed_post(admin_id, Role::Admin, uri, body)
}

async fn insert(pool: &SqlitePool, sql: &str, binds: &[i64]) -> i64 {
    binds
        .iter()
        .fold(sqlx::query(sql), |q, v| q.bind(*v))
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

/// One of everything: CS department, B.Tech 2024-2028 batch, semester 1 of
/// 2024-2025, course CS101 taught by `teacher1` and taken by `student1`.
pub struct Fixture {
    pub department: i64,
    pub program: i64,
    pub batch: i64,
    pub academic_year: i64,
    pub semester: i64,
    pub course: i64,
    pub admin: i64,
    pub teacher: i64,
    pub student: i64,
    pub assignment: i64,
    pub enrollment: i64,
}

impl Fixture {
    pub async fn build(pool: &SqlitePool) -> Self {
        let admin = create_user(pool, "admin", Role::Admin).await;
        let teacher = sqlx::query(
            r#"
            INSERT INTO users (username, password, first_name, last_name, role, employee_id)
            VALUES ('teacher1', '!', 'Tea', 'Cher', 'teacher', 'EMP001')
            "#,
        )
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let department = insert(
            pool,
            "INSERT INTO departments (name, code) VALUES ('Computer Science', 'CS')",
            &[],
        )
        .await;
        let program = insert(pool, "INSERT INTO programs (name, code) VALUES ('B.Tech', 'BT')", &[]).await;
        let batch = insert(
            pool,
            "INSERT INTO batches (year, department_id, program_id) VALUES ('2024-2028', ?, ?)",
            &[department, program],
        )
        .await;
        let academic_year = insert(
            pool,
            "INSERT INTO academic_years (batch_id, start_year, end_year) VALUES (?, 2024, 2025)",
            &[batch],
        )
        .await;
        let semester = insert(
            pool,
            "INSERT INTO semesters (academic_year_id, number, name) VALUES (?, 1, 'Sem 1')",
            &[academic_year],
        )
        .await;
        let course = insert(
            pool,
            r#"
            INSERT INTO courses (name, code, credits, department_id, semester_id)
            VALUES ('Programming', 'CS101', 3, ?, ?)
            "#,
            &[department, semester],
        )
        .await;

        let mut fx = Fixture {
            department,
            program,
            batch,
            academic_year,
            semester,
            course,
            admin,
            teacher,
            student: 0,
            assignment: 0,
            enrollment: 0,
        };

        fx.student = sqlx::query(
            r#"
            INSERT INTO users (username, password, first_name, last_name, role, student_id)
            VALUES ('student1', '!', 'Stu', 'Dent', 'student', 'STU001')
            "#,
        )
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();
        insert(
            pool,
            "INSERT INTO student_profiles (user_id, batch_id) VALUES (?, ?)",
            &[fx.student, batch],
        )
        .await;

        fx.assignment = insert(
            pool,
            "INSERT INTO teacher_courses (teacher_id, course_id, academic_year_id) VALUES (?, ?, ?)",
            &[teacher, course, academic_year],
        )
        .await;
        fx.enrollment = fx.enroll(pool, fx.student).await;
        fx
    }

    /// A student in the fixture batch, not enrolled anywhere.
    pub async fn add_student(&self, pool: &SqlitePool, username: &str) -> i64 {
        let id = create_user(pool, username, Role::Student).await;
        insert(
            pool,
            "INSERT INTO student_profiles (user_id, batch_id) VALUES (?, ?)",
            &[id, self.batch],
        )
        .await;
        id
    }

    /// A course in the fixture department and semester, named after its code.
    pub async fn add_course(&self, pool: &SqlitePool, code: &str) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO courses (name, code, credits, department_id, semester_id)
            VALUES (?, ?, 3, ?, ?)
            "#,
        )
        .bind(code)
        .bind(code)
        .bind(self.department)
        .bind(self.semester)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    /// Enrolls the student in the fixture course for the fixture academic year.
    pub async fn enroll(&self, pool: &SqlitePool, student: i64) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO student_courses (student_id, course_id, academic_year_id, enrolled_date)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(student)
        .bind(self.course)
        .bind(self.academic_year)
        .bind(NaiveDate::from_ymd_opt(2024, 8, 1).unwrap())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    /// 2023-2024 for the fixture batch.
    pub async fn other_academic_year(&self, pool: &SqlitePool) -> i64 {
        insert(
            pool,
            "INSERT INTO academic_years (batch_id, start_year, end_year) VALUES (?, 2023, 2024)",
            &[self.batch],
        )
        .await
    }

    /// A one hour session of the fixture course starting at `hour`.
    pub async fn session(&self, pool: &SqlitePool, hour: u32) -> i64 {
        self.session_in(pool, self.academic_year, hour).await
    }

    pub async fn session_in(&self, pool: &SqlitePool, academic_year: i64, hour: u32) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO attendance_sessions
            (course_id, teacher_id, date, start_time, end_time, academic_year_id, topic)
            VALUES (?, ?, ?, ?, ?, ?, '')
            "#,
        )
        .bind(self.course)
        .bind(self.teacher)
        .bind(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
        .bind(NaiveTime::from_hms_opt(hour, 0, 0).unwrap())
        .bind(NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap())
        .bind(academic_year)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    pub async fn record(
        &self,
        pool: &SqlitePool,
        session: i64,
        student: i64,
        status: AttendanceStatus,
    ) {
        sqlx::query(
            r#"
            INSERT INTO attendance (session_id, student_id, status, marked_at, marked_by)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(session)
        .bind(student)
        .bind(status)
        .bind(Utc::now())
        .bind(self.teacher)
        .execute(pool)
        .await
        .unwrap();
    }
}
