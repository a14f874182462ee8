use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::AppError,
    models::{Claims, LoginReqDto, TokenType, UserSql},
};
use actix_web::{HttpRequest, HttpResponse, Responder, get, web};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issues an access/refresh pair and records the refresh token's `jti`.
async fn issue_token_pair(
    pool: &SqlitePool,
    config: &Config,
    user_id: i64,
    username: &str,
    role: crate::model::role::Role,
) -> Result<LoginResponse, AppError> {
    let access_token = generate_access_token(
        user_id,
        username.to_string(),
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign access token: {e}")))?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user_id,
        username.to_string(),
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign refresh token: {e}")))?;

    debug!(user_id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(&refresh_claims.jti)
        .bind(refresh_claims.exp as i64)
        .execute(pool)
        .await?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// Login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair issued", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::BadRequest("Username or password required".into()));
    }

    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, password, role, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Database error while fetching user");
        AppError::from(e)
    })?
    .ok_or_else(|| {
        info!("Invalid credentials: user not found");
        AppError::Unauthorized("Invalid credentials".into())
    })?;

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account disabled");
        return Err(AppError::PermissionDenied("Account disabled".into()));
    }

    let pair = issue_token_pair(
        pool.get_ref(),
        config.get_ref(),
        db_user.id,
        &db_user.username,
        db_user.role,
    )
    .await?;

    // last_login_at is informational; a failure here must not block login
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = datetime('now') WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, role = %db_user.role, "Login successful");
    Ok(HttpResponse::Ok().json(pair))
}

#[get("/me")]
pub async fn me(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(auth)
}

fn refresh_claims(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let claims = verify_token(bearer_token(req)?, &config.jwt_secret).ok()?;
    (claims.token_type == TokenType::Refresh).then_some(claims)
}

/// Rotates a refresh token: the presented one is revoked, a new pair issued.
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let claims = refresh_claims(&req, &config)
        .ok_or_else(|| AppError::Unauthorized("Invalid token".into()))?;

    let mut tx = pool.begin().await?;

    let revoked = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ? AND revoked = 0")
        .bind(&claims.jti)
        .execute(&mut *tx)
        .await?;
    if revoked.rows_affected() == 0 {
        return Err(AppError::Unauthorized("Refresh token revoked or unknown".into()));
    }

    let (username, role, is_active): (String, crate::model::role::Role, bool) =
        sqlx::query_as("SELECT username, role, is_active FROM users WHERE id = ?")
            .bind(claims.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;
    if !is_active {
        return Err(AppError::PermissionDenied("Account disabled".into()));
    }

    tx.commit().await?;

    let pair = issue_token_pair(pool.get_ref(), &config, claims.user_id, &username, role).await?;
    Ok(HttpResponse::Ok().json(pair))
}

/// Revokes the presented refresh token. Always answers 204.
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> impl Responder {
    if let Some(claims) = refresh_claims(&req, &config) {
        if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
            .bind(&claims.jti)
            .execute(pool.get_ref())
            .await
        {
            error!(error = %e, "Failed to revoke refresh token");
        }
    }

    HttpResponse::NoContent().finish()
}
