use crate::{
    api::{
        assignment::{self, Enrollments, TeacherAssignments},
        attendance, dashboard, lookup,
        people::{Students, Teachers},
        report,
        structure::{AcademicYears, Batches, Courses, Departments, Programs, Semesters},
    },
    auth::{
        handlers,
        middleware::{admin_only, auth_middleware, student_only, teacher_only},
    },
    config::Config,
    error::AppError,
    roster::{self, RosterEntity},
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let burst = requests_per_min.max(1);
    let per_ms = (60_000 / burst as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(burst)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(GovernorConfig::default);
    Governor::new(&cfg)
}

/// GET lists a page, POST dispatches add / update_id / delete_id.
fn roster_resource<E: RosterEntity>(path: &str) -> actix_web::Resource {
    web::resource(path)
        .route(web::get().to(roster::display::<E>))
        .route(web::post().to(roster::mutate::<E>))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Malformed query strings, paths and bodies answer like every other
    // request error.
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _| {
        AppError::BadRequest(err.to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _| {
        AppError::BadRequest(err.to_string()).into()
    }))
    .app_data(web::JsonConfig::default().error_handler(|err, _| {
        AppError::BadRequest(err.to_string()).into()
    }));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(handlers::me)
            .route("/dashboard", web::get().to(dashboard::dashboard))
            .service(
                web::scope("/admin")
                    .wrap(from_fn(admin_only))
                    .service(roster_resource::<Departments>("/departments"))
                    .service(roster_resource::<Programs>("/programs"))
                    .service(roster_resource::<Batches>("/batches"))
                    .service(roster_resource::<AcademicYears>("/academic_years"))
                    .service(roster_resource::<Semesters>("/semesters"))
                    .service(roster_resource::<Courses>("/courses"))
                    .service(roster_resource::<Students>("/students"))
                    .service(roster_resource::<Teachers>("/teachers"))
                    .service(roster_resource::<TeacherAssignments>("/teacher_assignments"))
                    .service(roster_resource::<Enrollments>("/enrollments"))
                    .route("/reports", web::get().to(report::course_report))
                    .route("/bulk-enroll", web::post().to(assignment::bulk_enroll))
                    .service(
                        web::scope("/lookup")
                            .route("/students-by-batch", web::get().to(lookup::students_by_batch))
                            .route(
                                "/courses-by-semester",
                                web::get().to(lookup::courses_by_semester),
                            )
                            .route("/student-courses", web::get().to(lookup::student_courses))
                            .route("/teacher-courses", web::get().to(lookup::teacher_courses))
                            .route(
                                "/remove-student-course",
                                web::post().to(lookup::remove_student_course),
                            )
                            .route(
                                "/remove-teacher-course",
                                web::post().to(lookup::remove_teacher_course),
                            ),
                    ),
            )
            .service(
                web::scope("/teacher")
                    .wrap(from_fn(teacher_only))
                    .route("/courses", web::get().to(attendance::teacher_courses))
                    .service(
                        web::resource("/assignments/{assignment_id}/attendance")
                            .route(web::get().to(attendance::marking_sheet))
                            .route(web::post().to(attendance::mark_attendance)),
                    )
                    .route(
                        "/assignments/{assignment_id}/history",
                        web::get().to(attendance::attendance_history),
                    )
                    .route(
                        "/sessions/{session_id}",
                        web::get().to(attendance::session_detail),
                    ),
            )
            .service(
                web::scope("/student")
                    .wrap(from_fn(student_only))
                    .route("/attendance", web::get().to(attendance::student_attendance)),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token
//       └─ role guard on /admin, /teacher, /student

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a rotated pair
