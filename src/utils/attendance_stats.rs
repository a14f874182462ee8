use serde::Serialize;
use sqlx::SqlitePool;
use strum::IntoEnumIterator;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceStatus;

/// Decimal places kept on every attendance percentage the service reports.
pub const PERCENT_PRECISION: i32 = 2;

/// SQL list of the statuses that count as having attended a session.
pub fn attended_statuses() -> String {
    let statuses: Vec<String> = AttendanceStatus::iter()
        .filter(|s| s.counts_as_attended())
        .map(|s| format!("'{s}'"))
        .collect();
    format!("({})", statuses.join(", "))
}

/// `attended / total * 100`, rounded half away from zero. Zero when no
/// session was held.
pub fn percentage(attended: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let scale = 10f64.powi(PERCENT_PRECISION);
    (attended as f64 / total as f64 * 100.0 * scale).round() / scale
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub total_sessions: i64,
    pub attended_sessions: i64,
    pub percentage: f64,
}

impl AttendanceSummary {
    pub fn new(attended_sessions: i64, total_sessions: i64) -> Self {
        Self {
            total_sessions,
            attended_sessions,
            percentage: percentage(attended_sessions, total_sessions),
        }
    }
}

/// Sessions held for `course_id` and how many of them `student_id` attended.
/// With `academic_year_id` both counts are restricted to that year.
pub async fn course_summary(
    pool: &SqlitePool,
    student_id: i64,
    course_id: i64,
    academic_year_id: Option<i64>,
) -> Result<AttendanceSummary, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM attendance_sessions
        WHERE course_id = ?
        AND (? IS NULL OR academic_year_id = ?)
        "#,
    )
    .bind(course_id)
    .bind(academic_year_id)
    .bind(academic_year_id)
    .fetch_one(pool)
    .await?;

    let statuses = attended_statuses();
    let attended_sql = format!(
        r#"
        SELECT COUNT(*)
        FROM attendance a
        JOIN attendance_sessions s ON s.id = a.session_id
        WHERE a.student_id = ?
        AND s.course_id = ?
        AND (? IS NULL OR s.academic_year_id = ?)
        AND a.status IN {statuses}
        "#
    );
    let attended: i64 = sqlx::query_scalar(&attended_sql)
        .bind(student_id)
        .bind(course_id)
        .bind(academic_year_id)
        .bind(academic_year_id)
        .fetch_one(pool)
        .await?;

    Ok(AttendanceSummary::new(attended, total))
}

/// Share of all recorded marks that are present or late.
pub async fn overall_percentage(pool: &SqlitePool) -> Result<f64, sqlx::Error> {
    let sql = format!(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status IN {} THEN 1 ELSE 0 END), 0) FROM attendance",
        attended_statuses()
    );
    let (total, attended): (i64, i64) = sqlx::query_as(&sql).fetch_one(pool).await?;
    Ok(percentage(attended, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, test_pool};

    #[test]
    fn present_and_late_form_the_attended_list() {
        assert_eq!(attended_statuses(), "('present', 'late')");
    }

    #[test]
    fn zero_sessions_is_zero_percent() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(AttendanceSummary::new(0, 0).percentage, 0.0);
    }

    #[test]
    fn rounds_to_two_places() {
        assert_eq!(percentage(3, 5), 60.0);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(1, 8), 12.5);
        assert_eq!(percentage(7, 7), 100.0);
    }

    #[test]
    fn more_attendance_never_lowers_the_percentage() {
        let total = 13;
        let mut previous = percentage(0, total);
        for attended in 1..=total {
            let current = percentage(attended, total);
            assert!(current >= previous, "{attended}/{total} dropped");
            previous = current;
        }
    }

    #[actix_web::test]
    async fn summary_counts_present_and_late_only() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;

        let statuses = [
            AttendanceStatus::Present,
            AttendanceStatus::Late,
            AttendanceStatus::Absent,
            AttendanceStatus::Present,
            AttendanceStatus::Absent,
        ];
        for (hour, status) in statuses.iter().enumerate() {
            let session = fx.session(&pool, 9 + hour as u32).await;
            fx.record(&pool, session, fx.student, *status).await;
        }

        let summary = course_summary(&pool, fx.student, fx.course, Some(fx.academic_year))
            .await
            .unwrap();
        assert_eq!(summary, AttendanceSummary::new(3, 5));
        assert_eq!(summary.percentage, 60.0);

        assert_eq!(overall_percentage(&pool).await.unwrap(), 60.0);
    }

    #[actix_web::test]
    async fn summary_without_sessions_is_zero() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;

        let summary = course_summary(&pool, fx.student, fx.course, None).await.unwrap();
        assert_eq!(summary.total_sessions, 0);
        assert_eq!(summary.percentage, 0.0);
        assert_eq!(overall_percentage(&pool).await.unwrap(), 0.0);
    }

    #[actix_web::test]
    async fn academic_year_filter_restricts_both_counts() {
        let pool = test_pool().await;
        let fx = Fixture::build(&pool).await;
        let other_year = fx.other_academic_year(&pool).await;

        let this_year = fx.session(&pool, 9).await;
        fx.record(&pool, this_year, fx.student, AttendanceStatus::Present).await;
        let last_year = fx.session_in(&pool, other_year, 9).await;
        fx.record(&pool, last_year, fx.student, AttendanceStatus::Present).await;
        fx.session(&pool, 10).await;

        let scoped = course_summary(&pool, fx.student, fx.course, Some(fx.academic_year))
            .await
            .unwrap();
        assert_eq!(scoped, AttendanceSummary::new(1, 2));

        let all_years = course_summary(&pool, fx.student, fx.course, None).await.unwrap();
        assert_eq!(all_years, AttendanceSummary::new(2, 3));
    }
}
