use crate::api::assignment::{AssignmentForm, BulkEnrollRequest, BulkEnrollResponse, EnrollmentForm};
use crate::api::attendance::{
    AttendanceHistory, CourseAttendance, EnrolledStudent, MarkAttendanceRequest,
    MarkAttendanceResponse, MarkingSheet, SessionDetail,
};
use crate::api::dashboard::{AdminCounts, CourseProgress, SemesterProgress};
use crate::api::lookup::{NamedId, RemovalResult, RemoveStudentCourse, RemoveTeacherCourse};
use crate::api::people::{
    ProfileForm, StudentCreateForm, StudentUpdateForm, TeacherCreateForm, TeacherUpdateForm,
};
use crate::api::report::{CourseReport, ReportRow, ReportStudent};
use crate::api::structure::{
    AcademicYearForm, BatchForm, CourseForm, DepartmentForm, ProgramForm, SemesterForm,
};
use crate::api::{Notice, NoticeLevel};
use crate::auth::handlers::LoginResponse;
use crate::model::academic::{AcademicYear, Batch, Course, CourseBrief, Semester};
use crate::model::assignment::{Enrollment, TeacherAssignment};
use crate::model::attendance::{AttendanceRecord, AttendanceSession, AttendanceStatus};
use crate::model::department::{Department, Program};
use crate::model::role::Role;
use crate::model::user::{Person, Student};
use crate::models::LoginReqDto;
use crate::roster::options::Choice;
use crate::utils::attendance_stats::AttendanceSummary;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Student Attendance Management System API",
        version = "1.0.0",
        description = r#"
## Student Attendance Management System

Tracks class attendance for an academic institution: the academic structure,
who teaches and who takes which course, per-session attendance marks and the
percentages derived from them.

### Roles
- **Admin** manages the academic structure, people, assignments and enrollments, and reads reports
- **Teacher** marks attendance for assigned courses and reviews past sessions
- **Student** reads their own attendance

### Admin rosters
Every roster lives at `GET|POST /api/admin/{entity}` where `entity` is one of
`departments`, `programs`, `batches`, `academic_years`, `semesters`, `courses`,
`students`, `teachers`, `teacher_assignments`, `enrollments`.

- `GET` takes `search`, `page` and the entity's filter parameters and returns
  `{items, page, num_pages, per_page, total, search, filters, options}`
- `POST` with `add` creates, with `update_id` updates, with `delete_id` deletes.
  The response is the refreshed page plus a `notice`; validation failures return
  `400` with `errors` keyed by field (`__all__` for form-wide errors)

### 🔐 Security
Every `/api` endpoint requires a **JWT Bearer** access token. Calling another
role's endpoint answers `303` towards `/api/dashboard`.
"#,
    ),
    paths(
        crate::auth::handlers::login,

        crate::api::dashboard::dashboard,

        crate::api::report::course_report,
        crate::api::assignment::bulk_enroll,

        crate::api::lookup::students_by_batch,
        crate::api::lookup::courses_by_semester,
        crate::api::lookup::student_courses,
        crate::api::lookup::teacher_courses,
        crate::api::lookup::remove_student_course,
        crate::api::lookup::remove_teacher_course,

        crate::api::attendance::teacher_courses,
        crate::api::attendance::marking_sheet,
        crate::api::attendance::mark_attendance,
        crate::api::attendance::attendance_history,
        crate::api::attendance::session_detail,
        crate::api::attendance::student_attendance
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            Role,
            Notice,
            NoticeLevel,
            Choice,
            Person,
            Student,
            Department,
            Program,
            Batch,
            AcademicYear,
            Semester,
            Course,
            CourseBrief,
            TeacherAssignment,
            Enrollment,
            AttendanceStatus,
            AttendanceSession,
            AttendanceRecord,
            AttendanceSummary,
            DepartmentForm,
            ProgramForm,
            BatchForm,
            AcademicYearForm,
            SemesterForm,
            CourseForm,
            ProfileForm,
            StudentCreateForm,
            StudentUpdateForm,
            TeacherCreateForm,
            TeacherUpdateForm,
            AssignmentForm,
            EnrollmentForm,
            BulkEnrollRequest,
            BulkEnrollResponse,
            NamedId,
            RemoveStudentCourse,
            RemoveTeacherCourse,
            RemovalResult,
            EnrolledStudent,
            MarkingSheet,
            MarkAttendanceRequest,
            MarkAttendanceResponse,
            AttendanceHistory,
            SessionDetail,
            CourseAttendance,
            AdminCounts,
            CourseProgress,
            SemesterProgress,
            ReportStudent,
            ReportRow,
            CourseReport
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Dashboard", description = "Role specific overview"),
        (name = "Admin", description = "Reports and bulk enrollment"),
        (name = "Lookup", description = "Lookups backing the admin forms"),
        (name = "Teacher", description = "Attendance marking and history"),
        (name = "Student", description = "Own attendance"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_bearer_scheme_and_paths() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
        assert!(json["paths"]["/api/teacher/assignments/{assignment_id}/attendance"]["post"].is_object());
        assert!(json["paths"]["/api/admin/bulk-enroll"]["post"].is_object());
    }
}
