use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Choice lists offered next to a roster for filtering and form selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSet {
    Batches,
    Courses,
    Departments,
    Semesters,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Choice {
    pub id: i64,
    pub label: String,
}

impl OptionSet {
    pub fn key(self) -> &'static str {
        match self {
            OptionSet::Batches => "batches",
            OptionSet::Courses => "courses",
            OptionSet::Departments => "departments",
            OptionSet::Semesters => "semesters",
        }
    }

    fn sql(self) -> &'static str {
        match self {
            OptionSet::Batches => {
                r#"
                SELECT b.id, p.code || ' - ' || d.code || ' - Batch ' || b.year AS label
                FROM batches b
                JOIN programs p ON p.id = b.program_id
                JOIN departments d ON d.id = b.department_id
                ORDER BY b.id
                "#
            }
            OptionSet::Courses => "SELECT id, code || ' - ' || name AS label FROM courses ORDER BY id",
            OptionSet::Departments => {
                "SELECT id, code || ' - ' || name AS label FROM departments ORDER BY id"
            }
            OptionSet::Semesters => {
                r#"
                SELECT s.id,
                       ay.start_year || '-' || ay.end_year || ' (' || b.year || ') - Sem ' || s.number AS label
                FROM semesters s
                JOIN academic_years ay ON ay.id = s.academic_year_id
                JOIN batches b ON b.id = ay.batch_id
                ORDER BY s.id
                "#
            }
        }
    }

    pub async fn load(self, pool: &SqlitePool) -> Result<Vec<Choice>, sqlx::Error> {
        sqlx::query_as::<_, Choice>(self.sql()).fetch_all(pool).await
    }
}

pub async fn load_all(
    pool: &SqlitePool,
    sets: &[OptionSet],
) -> Result<BTreeMap<&'static str, Vec<Choice>>, sqlx::Error> {
    let mut options = BTreeMap::new();
    for set in sets {
        options.insert(set.key(), set.load(pool).await?);
    }
    Ok(options)
}
