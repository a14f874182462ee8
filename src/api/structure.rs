use serde::Deserialize;
use validator::Validate;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::academic::{AcademicYear, Batch, Course, Semester};
use crate::model::department::{Department, Program};
use crate::roster::options::OptionSet;
use crate::roster::{FilterKind, FilterParam, Reference, RosterConfig, RosterEntity, check_refs};
use crate::utils::validation::{FieldErrors, Form, lenient_int, trimmed};

// ---------- Department ----------

pub struct Departments;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DepartmentForm {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(max = 100))]
    #[schema(example = "Computer Science")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(max = 10))]
    #[schema(example = "CS")]
    pub code: Option<String>,
}

#[derive(Debug)]
pub struct DepartmentFields {
    pub name: String,
    pub code: String,
}

impl Form for DepartmentForm {
    type Clean = DepartmentFields;

    fn clean(self, _: &mut FieldErrors) -> DepartmentFields {
        DepartmentFields {
            name: self.name.unwrap_or_default(),
            code: self.code.unwrap_or_default(),
        }
    }
}

impl RosterEntity for Departments {
    const CONFIG: RosterConfig = RosterConfig {
        label: "Department",
        table: "departments",
        alias: "d",
        select: "SELECT d.id, d.name, d.code, d.head_id FROM departments d",
        base_filter: None,
        search_fields: &["d.name", "d.code"],
        filters: &[],
        options: &[],
    };

    type Row = Department;
    type CreateForm = DepartmentForm;
    type UpdateForm = DepartmentForm;

    async fn insert(pool: &SqlitePool, form: DepartmentFields) -> Result<i64, AppError> {
        let result = sqlx::query("INSERT INTO departments (name, code) VALUES (?, ?)")
            .bind(&form.name)
            .bind(&form.code)
            .execute(pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(pool: &SqlitePool, id: i64, form: DepartmentFields) -> Result<(), AppError> {
        sqlx::query("UPDATE departments SET name = ?, code = ? WHERE id = ?")
            .bind(&form.name)
            .bind(&form.code)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

// ---------- Program ----------

pub struct Programs;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProgramForm {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(max = 50))]
    #[schema(example = "B.Tech")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(max = 10))]
    #[schema(example = "BT")]
    pub code: Option<String>,
}

#[derive(Debug)]
pub struct ProgramFields {
    pub name: String,
    pub code: String,
}

impl Form for ProgramForm {
    type Clean = ProgramFields;

    fn clean(self, _: &mut FieldErrors) -> ProgramFields {
        ProgramFields {
            name: self.name.unwrap_or_default(),
            code: self.code.unwrap_or_default(),
        }
    }
}

impl RosterEntity for Programs {
    const CONFIG: RosterConfig = RosterConfig {
        label: "Program",
        table: "programs",
        alias: "p",
        select: "SELECT p.id, p.name, p.code FROM programs p",
        base_filter: None,
        search_fields: &["p.name", "p.code"],
        filters: &[],
        options: &[],
    };

    type Row = Program;
    type CreateForm = ProgramForm;
    type UpdateForm = ProgramForm;

    async fn insert(pool: &SqlitePool, form: ProgramFields) -> Result<i64, AppError> {
        let result = sqlx::query("INSERT INTO programs (name, code) VALUES (?, ?)")
            .bind(&form.name)
            .bind(&form.code)
            .execute(pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(pool: &SqlitePool, id: i64, form: ProgramFields) -> Result<(), AppError> {
        sqlx::query("UPDATE programs SET name = ?, code = ? WHERE id = ?")
            .bind(&form.name)
            .bind(&form.code)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

// ---------- Batch ----------

pub struct Batches;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BatchForm {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(max = 9))]
    #[schema(example = "2024-2028")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub department: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub program: Option<i64>,
}

#[derive(Debug)]
pub struct BatchFields {
    pub year: String,
    pub department_id: i64,
    pub program_id: i64,
}

impl Form for BatchForm {
    type Clean = BatchFields;

    fn clean(self, errors: &mut FieldErrors) -> BatchFields {
        BatchFields {
            year: self.year.unwrap_or_default(),
            department_id: errors.required_id("department", self.department),
            program_id: errors.required_id("program", self.program),
        }
    }
}

impl BatchFields {
    fn references(&self) -> [Reference; 2] {
        [
            Reference::row("department", "departments", self.department_id),
            Reference::row("program", "programs", self.program_id),
        ]
    }
}

impl RosterEntity for Batches {
    const CONFIG: RosterConfig = RosterConfig {
        label: "Batch",
        table: "batches",
        alias: "b",
        select: r#"
            SELECT b.id, b.year, b.department_id, d.name AS department_name,
                   b.program_id, p.name AS program_name
            FROM batches b
            JOIN departments d ON d.id = b.department_id
            JOIN programs p ON p.id = b.program_id
        "#,
        base_filter: None,
        search_fields: &["b.year", "d.name", "p.name"],
        filters: &[],
        options: &[],
    };

    type Row = Batch;
    type CreateForm = BatchForm;
    type UpdateForm = BatchForm;

    async fn insert(pool: &SqlitePool, form: BatchFields) -> Result<i64, AppError> {
        check_refs(pool, &form.references()).await?;
        let result =
            sqlx::query("INSERT INTO batches (year, department_id, program_id) VALUES (?, ?, ?)")
                .bind(&form.year)
                .bind(form.department_id)
                .bind(form.program_id)
                .execute(pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(pool: &SqlitePool, id: i64, form: BatchFields) -> Result<(), AppError> {
        check_refs(pool, &form.references()).await?;
        sqlx::query("UPDATE batches SET year = ?, department_id = ?, program_id = ? WHERE id = ?")
            .bind(&form.year)
            .bind(form.department_id)
            .bind(form.program_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

// ---------- Academic year ----------

pub struct AcademicYears;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AcademicYearForm {
    #[serde(default, deserialize_with = "lenient_int")]
    pub batch: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[validate(required)]
    #[schema(example = 2024)]
    pub start_year: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[validate(required)]
    #[schema(example = 2025)]
    pub end_year: Option<i64>,
}

#[derive(Debug)]
pub struct AcademicYearFields {
    pub batch_id: i64,
    pub start_year: i64,
    pub end_year: i64,
}

impl Form for AcademicYearForm {
    type Clean = AcademicYearFields;

    fn clean(self, errors: &mut FieldErrors) -> AcademicYearFields {
        AcademicYearFields {
            batch_id: errors.required_id("batch", self.batch),
            start_year: self.start_year.unwrap_or_default(),
            end_year: self.end_year.unwrap_or_default(),
        }
    }
}

impl RosterEntity for AcademicYears {
    const CONFIG: RosterConfig = RosterConfig {
        label: "Academic year",
        table: "academic_years",
        alias: "ay",
        select: r#"
            SELECT ay.id, ay.batch_id, b.year AS batch_year, ay.start_year, ay.end_year
            FROM academic_years ay
            JOIN batches b ON b.id = ay.batch_id
        "#,
        base_filter: None,
        search_fields: &["b.year", "ay.start_year", "ay.end_year"],
        filters: &[],
        options: &[],
    };

    type Row = AcademicYear;
    type CreateForm = AcademicYearForm;
    type UpdateForm = AcademicYearForm;

    async fn insert(pool: &SqlitePool, form: AcademicYearFields) -> Result<i64, AppError> {
        check_refs(pool, &[Reference::row("batch", "batches", form.batch_id)]).await?;
        let result = sqlx::query(
            "INSERT INTO academic_years (batch_id, start_year, end_year) VALUES (?, ?, ?)",
        )
        .bind(form.batch_id)
        .bind(form.start_year)
        .bind(form.end_year)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(pool: &SqlitePool, id: i64, form: AcademicYearFields) -> Result<(), AppError> {
        check_refs(pool, &[Reference::row("batch", "batches", form.batch_id)]).await?;
        sqlx::query(
            "UPDATE academic_years SET batch_id = ?, start_year = ?, end_year = ? WHERE id = ?",
        )
        .bind(form.batch_id)
        .bind(form.start_year)
        .bind(form.end_year)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

// ---------- Semester ----------

pub struct Semesters;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SemesterForm {
    #[serde(default, deserialize_with = "lenient_int")]
    pub academic_year: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[validate(required, range(min = 1, max = 2))]
    #[schema(example = 1)]
    pub number: Option<i64>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 50))]
    #[schema(example = "Sem 1")]
    pub name: Option<String>,
}

#[derive(Debug)]
pub struct SemesterFields {
    pub academic_year_id: i64,
    pub number: i64,
    pub name: String,
}

impl Form for SemesterForm {
    type Clean = SemesterFields;

    fn clean(self, errors: &mut FieldErrors) -> SemesterFields {
        SemesterFields {
            academic_year_id: errors.required_id("academic_year", self.academic_year),
            number: self.number.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
        }
    }
}

impl RosterEntity for Semesters {
    const CONFIG: RosterConfig = RosterConfig {
        label: "Semester",
        table: "semesters",
        alias: "s",
        select: r#"
            SELECT s.id, s.academic_year_id, s.number, s.name,
                   ay.start_year, ay.end_year, b.year AS batch_year
            FROM semesters s
            JOIN academic_years ay ON ay.id = s.academic_year_id
            JOIN batches b ON b.id = ay.batch_id
        "#,
        base_filter: None,
        search_fields: &["b.year", "s.name", "s.number"],
        filters: &[],
        options: &[],
    };

    type Row = Semester;
    type CreateForm = SemesterForm;
    type UpdateForm = SemesterForm;

    async fn insert(pool: &SqlitePool, form: SemesterFields) -> Result<i64, AppError> {
        check_refs(
            pool,
            &[Reference::row("academic_year", "academic_years", form.academic_year_id)],
        )
        .await?;
        let result =
            sqlx::query("INSERT INTO semesters (academic_year_id, number, name) VALUES (?, ?, ?)")
                .bind(form.academic_year_id)
                .bind(form.number)
                .bind(&form.name)
                .execute(pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(pool: &SqlitePool, id: i64, form: SemesterFields) -> Result<(), AppError> {
        check_refs(
            pool,
            &[Reference::row("academic_year", "academic_years", form.academic_year_id)],
        )
        .await?;
        sqlx::query("UPDATE semesters SET academic_year_id = ?, number = ?, name = ? WHERE id = ?")
            .bind(form.academic_year_id)
            .bind(form.number)
            .bind(&form.name)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

// ---------- Course ----------

pub struct Courses;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CourseForm {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(max = 200))]
    #[schema(example = "Programming")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(max = 20))]
    #[schema(example = "CS101")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[validate(required, range(min = 1, max = 10))]
    #[schema(example = 3)]
    pub credits: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub department: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub semester: Option<i64>,
}

#[derive(Debug)]
pub struct CourseFields {
    pub name: String,
    pub code: String,
    pub credits: i64,
    pub department_id: i64,
    pub semester_id: i64,
}

impl Form for CourseForm {
    type Clean = CourseFields;

    fn clean(self, errors: &mut FieldErrors) -> CourseFields {
        CourseFields {
            name: self.name.unwrap_or_default(),
            code: self.code.unwrap_or_default(),
            credits: self.credits.unwrap_or_default(),
            department_id: errors.required_id("department", self.department),
            semester_id: errors.required_id("semester", self.semester),
        }
    }
}

impl CourseFields {
    fn references(&self) -> [Reference; 2] {
        [
            Reference::row("department", "departments", self.department_id),
            Reference::row("semester", "semesters", self.semester_id),
        ]
    }
}

impl RosterEntity for Courses {
    const CONFIG: RosterConfig = RosterConfig {
        label: "Course",
        table: "courses",
        alias: "c",
        select: r#"
            SELECT c.id, c.name, c.code, c.credits,
                   c.department_id, d.name AS department_name,
                   c.semester_id, s.number AS semester_number
            FROM courses c
            JOIN departments d ON d.id = c.department_id
            JOIN semesters s ON s.id = c.semester_id
        "#,
        base_filter: None,
        search_fields: &["c.name", "c.code", "d.name"],
        filters: &[
            FilterParam {
                param: "department",
                column: "c.department_id",
                kind: FilterKind::Id,
            },
            FilterParam {
                param: "semester",
                column: "c.semester_id",
                kind: FilterKind::Id,
            },
        ],
        options: &[OptionSet::Departments, OptionSet::Semesters],
    };

    type Row = Course;
    type CreateForm = CourseForm;
    type UpdateForm = CourseForm;

    async fn insert(pool: &SqlitePool, form: CourseFields) -> Result<i64, AppError> {
        check_refs(pool, &form.references()).await?;
        let result = sqlx::query(
            r#"
            INSERT INTO courses (name, code, credits, department_id, semester_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&form.name)
        .bind(&form.code)
        .bind(form.credits)
        .bind(form.department_id)
        .bind(form.semester_id)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(pool: &SqlitePool, id: i64, form: CourseFields) -> Result<(), AppError> {
        check_refs(pool, &form.references()).await?;
        sqlx::query(
            r#"
            UPDATE courses
            SET name = ?, code = ?, credits = ?, department_id = ?, semester_id = ?
            WHERE id = ?
            "#,
        )
        .bind(&form.name)
        .bind(&form.code)
        .bind(form.credits)
        .bind(form.department_id)
        .bind(form.semester_id)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_app;
    use crate::test_support::{Fixture, admin_get, admin_post, test_pool};
    use actix_web::{http::StatusCode, test as atest};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn course_validation_covers_ranges_and_references() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let app = test_app!(pool.clone());

        let req = admin_post(
            fx.admin,
            "/api/admin/courses",
            json!({
                "add": "", "name": "Networks", "code": "CS301",
                "credits": "11", "department": fx.department, "semester": 9999
            }),
        );
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = atest::read_body_json(resp).await;
        assert_eq!(
            body["errors"]["credits"][0],
            "Ensure this value is less than or equal to 10."
        );

        let req = admin_post(
            fx.admin,
            "/api/admin/courses",
            json!({
                "add": "", "name": "Networks", "code": "CS301",
                "credits": "4", "department": fx.department, "semester": 9999
            }),
        );
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = atest::read_body_json(resp).await;
        assert_eq!(
            body["errors"]["semester"][0],
            "Select a valid choice. That choice is not one of the available choices."
        );
        assert!(body["errors"].get("department").is_none());
    }

    #[actix_web::test]
    async fn course_list_filters_and_offers_options() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let app = test_app!(pool.clone());

        let req = admin_post(
            fx.admin,
            "/api/admin/courses",
            json!({
                "add": "", "name": "Data Structures", "code": "CS201",
                "credits": 3, "department": fx.department, "semester": fx.semester
            }),
        );
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::OK);

        let uri = format!("/api/admin/courses?department={}", fx.department);
        let body: Value = atest::call_and_read_body_json(&app, admin_get(fx.admin, &uri)).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["filters"]["department"], fx.department.to_string());
        assert_eq!(body["options"]["departments"].as_array().unwrap().len(), 1);
        assert_eq!(body["options"]["semesters"].as_array().unwrap().len(), 1);

        let body: Value = atest::call_and_read_body_json(
            &app,
            admin_get(fx.admin, "/api/admin/courses?department=9999"),
        )
        .await;
        assert_eq!(body["total"], 0);

        let body: Value = atest::call_and_read_body_json(
            &app,
            admin_get(fx.admin, "/api/admin/courses?search=computer"),
        )
        .await;
        assert_eq!(body["total"], 2, "department name is searchable");

        let resp = atest::call_service(&app, admin_get(fx.admin, "/api/admin/courses?semester=x")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn batch_triple_is_unique() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let app = test_app!(pool.clone());

        let req = admin_post(
            fx.admin,
            "/api/admin/batches",
            json!({"add": "", "year": "2024-2028", "department": fx.department, "program": fx.program}),
        );
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[actix_web::test]
    async fn semester_number_is_one_or_two() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let app = test_app!(pool.clone());

        let req = admin_post(
            fx.admin,
            "/api/admin/semesters",
            json!({"add": "", "academic_year": fx.academic_year, "number": 3}),
        );
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = admin_post(
            fx.admin,
            "/api/admin/semesters",
            json!({"add": "", "academic_year": fx.academic_year, "number": "2"}),
        );
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(body["notice"]["message"], "Semester created successfully.");
        assert_eq!(body["total"], 2);
    }

    #[actix_web::test]
    async fn academic_year_search_matches_years_as_text() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        fx.other_academic_year(&pool).await;
        let app = test_app!(pool.clone());

        let body: Value = atest::call_and_read_body_json(
            &app,
            admin_get(fx.admin, "/api/admin/academic_years?search=2023"),
        )
        .await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["start_year"], 2023);
    }

    #[actix_web::test]
    async fn deleting_a_course_cascades() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let app = test_app!(pool.clone());

        let req = admin_post(fx.admin, "/api/admin/courses", json!({"delete_id": fx.course}));
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::OK);

        for table in ["student_courses", "teacher_courses"] {
            let left: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(left, 0, "{table} not cleared");
        }
    }
}
