/// Registration and login endpoints
use crate::{
    api::extract::ValidatedJson,
    auth::issue_token,
    context::AppContext,
    error::ApiResult,
    users::User,
};
use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Token plus the authenticated user
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

/// Build authentication routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Create an account and return a session token
async fn register(
    State(ctx): State<AppContext>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let user = ctx.users.create(&req.name, &req.email, &req.password).await?;

    tracing::info!("registered user {} ({})", user.id, user.email);

    let token = issue_token(
        &user,
        &ctx.config.authentication.jwt_secret,
        ctx.config.authentication.token_ttl,
    )?;

    Ok((StatusCode::CREATED, Json(SessionResponse { token, user })))
}

/// Verify credentials and return a session token
async fn login(
    State(ctx): State<AppContext>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let user = ctx.users.authenticate(&req.email, &req.password).await?;

    let token = issue_token(
        &user,
        &ctx.config.authentication.jwt_secret,
        ctx.config.authentication.token_ttl,
    )?;

    Ok(Json(SessionResponse { token, user }))
}
