use serde::Deserialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::password::hash_password;
use crate::error::AppError;
use crate::model::role::Role;
use crate::model::user::{Person, Student};
use crate::roster::options::OptionSet;
use crate::roster::{FilterKind, FilterParam, Reference, RosterConfig, RosterEntity, check_refs};
use crate::utils::validation::{FieldErrors, Form, NON_FIELD, REQUIRED, lenient_int, trimmed};

/// Account fields common to every person form.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProfileForm {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(required, length(max = 150))]
    #[schema(example = "jdoe")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(email, length(max = 254))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 15))]
    pub phone: Option<String>,
}

#[derive(Debug)]
pub struct Profile {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

fn valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

impl ProfileForm {
    fn clean(self, errors: &mut FieldErrors) -> Profile {
        let username = self.username.unwrap_or_default();
        if !valid_username(&username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        Profile {
            username,
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            phone: self.phone.unwrap_or_default(),
        }
    }
}

/// Both entries are required; a mismatch is a form-wide error.
fn clean_passwords(
    errors: &mut FieldErrors,
    password1: Option<String>,
    password2: Option<String>,
) -> String {
    let password1 = password1.filter(|p| !p.is_empty());
    let password2 = password2.filter(|p| !p.is_empty());
    match (password1, password2) {
        (Some(p1), Some(p2)) => {
            if p1 != p2 {
                errors.add(NON_FIELD, "Passwords do not match.");
            }
            p1
        }
        (p1, p2) => {
            if p1.is_none() {
                errors.add("password1", REQUIRED);
            }
            if p2.is_none() {
                errors.add("password2", REQUIRED);
            }
            String::new()
        }
    }
}

fn hashed(password: &str) -> Result<String, AppError> {
    hash_password(password).map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

async fn insert_person(
    tx: &mut Transaction<'_, Sqlite>,
    profile: &Profile,
    role: Role,
    password_hash: &str,
    employee_id: Option<&str>,
    student_id: Option<&str>,
) -> Result<i64, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO users
        (username, password, first_name, last_name, email, role, employee_id, student_id, phone)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&profile.username)
    .bind(password_hash)
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .bind(&profile.email)
    .bind(role)
    .bind(employee_id)
    .bind(student_id)
    .bind(&profile.phone)
    .execute(&mut **tx)
    .await?;
    Ok(result.last_insert_rowid())
}

// ---------- Student ----------

pub struct Students;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StudentCreateForm {
    #[serde(flatten)]
    #[validate(nested)]
    pub profile: ProfileForm,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 20))]
    #[schema(example = "S-2024-001")]
    pub student_id: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub batch: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StudentUpdateForm {
    #[serde(flatten)]
    #[validate(nested)]
    pub profile: ProfileForm,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 20))]
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub batch: Option<i64>,
}

#[derive(Debug)]
pub struct StudentFields {
    pub profile: Profile,
    pub student_id: Option<String>,
    pub batch_id: i64,
}

#[derive(Debug)]
pub struct NewStudent {
    pub fields: StudentFields,
    pub password: String,
}

impl Form for StudentCreateForm {
    type Clean = NewStudent;

    fn clean(self, errors: &mut FieldErrors) -> NewStudent {
        let fields = StudentFields {
            profile: self.profile.clean(errors),
            student_id: self.student_id,
            batch_id: errors.required_id("batch", self.batch),
        };
        let password = clean_passwords(errors, self.password1, self.password2);
        NewStudent { fields, password }
    }
}

impl Form for StudentUpdateForm {
    type Clean = StudentFields;

    fn clean(self, errors: &mut FieldErrors) -> StudentFields {
        StudentFields {
            profile: self.profile.clean(errors),
            student_id: self.student_id,
            batch_id: errors.required_id("batch", self.batch),
        }
    }
}

impl RosterEntity for Students {
    const CONFIG: RosterConfig = RosterConfig {
        label: "Student",
        table: "users",
        alias: "u",
        select: r#"
            SELECT u.id, u.username, u.first_name, u.last_name, u.email, u.role,
                   u.student_id, u.phone, sp.batch_id, b.year AS batch_year
            FROM users u
            LEFT JOIN student_profiles sp ON sp.user_id = u.id
            LEFT JOIN batches b ON b.id = sp.batch_id
        "#,
        base_filter: Some("u.role = 'student'"),
        search_fields: &[
            "u.username",
            "u.first_name",
            "u.last_name",
            "u.email",
            "u.student_id",
        ],
        filters: &[
            FilterParam {
                param: "role",
                column: "u.role",
                kind: FilterKind::Role,
            },
            FilterParam {
                param: "batch",
                column: "sp.batch_id",
                kind: FilterKind::Id,
            },
        ],
        options: &[OptionSet::Batches, OptionSet::Courses],
    };

    type Row = Student;
    type CreateForm = StudentCreateForm;
    type UpdateForm = StudentUpdateForm;

    async fn insert(pool: &SqlitePool, new: NewStudent) -> Result<i64, AppError> {
        let NewStudent { fields, password } = new;
        check_refs(pool, &[Reference::row("batch", "batches", fields.batch_id)]).await?;
        let password_hash = hashed(&password)?;

        let mut tx = pool.begin().await?;
        let id = insert_person(
            &mut tx,
            &fields.profile,
            Role::Student,
            &password_hash,
            None,
            fields.student_id.as_deref(),
        )
        .await?;
        sqlx::query("INSERT INTO student_profiles (user_id, batch_id) VALUES (?, ?)")
            .bind(id)
            .bind(fields.batch_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update(pool: &SqlitePool, id: i64, fields: StudentFields) -> Result<(), AppError> {
        check_refs(pool, &[Reference::row("batch", "batches", fields.batch_id)]).await?;

        let mut tx = pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE users
            SET username = ?, first_name = ?, last_name = ?, email = ?, student_id = ?, phone = ?
            WHERE id = ?
            "#,
        )
        .bind(&fields.profile.username)
        .bind(&fields.profile.first_name)
        .bind(&fields.profile.last_name)
        .bind(&fields.profile.email)
        .bind(fields.student_id.as_deref())
        .bind(&fields.profile.phone)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            INSERT INTO student_profiles (user_id, batch_id) VALUES (?, ?)
            ON CONFLICT (user_id) DO UPDATE SET batch_id = excluded.batch_id
            "#,
        )
        .bind(id)
        .bind(fields.batch_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

// ---------- Teacher ----------

pub struct Teachers;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TeacherCreateForm {
    #[serde(flatten)]
    #[validate(nested)]
    pub profile: ProfileForm,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 20))]
    #[schema(example = "EMP-001")]
    pub employee_id: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TeacherUpdateForm {
    #[serde(flatten)]
    #[validate(nested)]
    pub profile: ProfileForm,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 20))]
    pub employee_id: Option<String>,
}

#[derive(Debug)]
pub struct TeacherFields {
    pub profile: Profile,
    pub employee_id: Option<String>,
}

#[derive(Debug)]
pub struct NewTeacher {
    pub fields: TeacherFields,
    pub password: String,
}

impl Form for TeacherCreateForm {
    type Clean = NewTeacher;

    fn clean(self, errors: &mut FieldErrors) -> NewTeacher {
        let fields = TeacherFields {
            profile: self.profile.clean(errors),
            employee_id: self.employee_id,
        };
        let password = clean_passwords(errors, self.password1, self.password2);
        NewTeacher { fields, password }
    }
}

impl Form for TeacherUpdateForm {
    type Clean = TeacherFields;

    fn clean(self, errors: &mut FieldErrors) -> TeacherFields {
        TeacherFields {
            profile: self.profile.clean(errors),
            employee_id: self.employee_id,
        }
    }
}

impl RosterEntity for Teachers {
    const CONFIG: RosterConfig = RosterConfig {
        label: "Teacher",
        table: "users",
        alias: "u",
        select: r#"
            SELECT u.id, u.username, u.first_name, u.last_name, u.email, u.role,
                   u.employee_id, u.student_id, u.phone
            FROM users u
        "#,
        base_filter: Some("u.role = 'teacher'"),
        search_fields: &[
            "u.username",
            "u.first_name",
            "u.last_name",
            "u.email",
            "u.employee_id",
        ],
        filters: &[FilterParam {
            param: "role",
            column: "u.role",
            kind: FilterKind::Role,
        }],
        options: &[OptionSet::Batches, OptionSet::Courses],
    };

    type Row = Person;
    type CreateForm = TeacherCreateForm;
    type UpdateForm = TeacherUpdateForm;

    async fn insert(pool: &SqlitePool, new: NewTeacher) -> Result<i64, AppError> {
        let password_hash = hashed(&new.password)?;
        let mut tx = pool.begin().await?;
        let id = insert_person(
            &mut tx,
            &new.fields.profile,
            Role::Teacher,
            &password_hash,
            new.fields.employee_id.as_deref(),
            None,
        )
        .await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update(pool: &SqlitePool, id: i64, fields: TeacherFields) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET username = ?, first_name = ?, last_name = ?, email = ?, employee_id = ?, phone = ?
            WHERE id = ?
            "#,
        )
        .bind(&fields.profile.username)
        .bind(&fields.profile.first_name)
        .bind(&fields.profile.last_name)
        .bind(&fields.profile.email)
        .bind(fields.employee_id.as_deref())
        .bind(&fields.profile.phone)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
