use crate::api::Notice;
use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header,
    web::Data,
};
use serde_json::json;
use tracing::debug;

fn unauthorized(req: ServiceRequest, body: serde_json::Value) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(body);
    req.into_response(resp.map_into_boxed_body())
}

/// Authenticates the bearer access token and stores the caller as [`AuthUser`].
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req.headers().get(header::AUTHORIZATION) {
        Some(h) => h.to_str().map_err(|_| {
            actix_web::error::ErrorUnauthorized(
                json!({"error": "Invalid Authorization header encoding"}),
            )
        })?,
        None => {
            return Ok(unauthorized(
                req,
                json!({"error": "Missing Authorization header"}),
            ));
        }
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            return Ok(unauthorized(
                req,
                json!({"error": "Authorization header must start with Bearer"}),
            ));
        }
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            return Ok(unauthorized(
                req,
                json!({"error": "Invalid or expired token", "details": e}),
            ));
        }
    };

    if claims.token_type != TokenType::Access {
        return Ok(unauthorized(
            req,
            json!({"error": "Access token required"}),
        ));
    }

    let auth_user = AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role: claims.role,
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}

/// Lets the request through only when the authenticated caller holds one of
/// `allowed`; otherwise redirects to the dashboard with an error notice.
async fn role_gate(
    req: ServiceRequest,
    next: Next<BoxBody>,
    allowed: &'static [Role],
) -> Result<ServiceResponse<BoxBody>, Error> {
    let permitted = req
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.has_role(allowed));

    match permitted {
        Some(true) => next.call(req).await,
        Some(false) => {
            let location = req
                .app_data::<Data<Config>>()
                .map(|c| c.dashboard_path())
                .unwrap_or_else(|| "/".to_string());
            debug!(path = %req.path(), allowed = ?allowed, "Role check denied");

            let resp = HttpResponse::SeeOther()
                .insert_header((header::LOCATION, location))
                .json(Notice::error("You don't have permission to access this page."));
            Ok(req.into_response(resp.map_into_boxed_body()))
        }
        None => Ok(unauthorized(req, json!({"error": "Not authenticated"}))),
    }
}

pub async fn admin_only(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    role_gate(req, next, &[Role::Admin]).await
}

pub async fn teacher_only(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    role_gate(req, next, &[Role::Teacher]).await
}

pub async fn student_only(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    role_gate(req, next, &[Role::Student]).await
}
