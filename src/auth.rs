/// Authentication extractors and utilities
///
/// Credential resolution is a strategy: production wires in the JWT
/// resolver, tests inject a fake. Handlers only ever see the resolved
/// user through the extractors below.
use crate::{
    context::AppContext,
    error::{ApiError, ApiResult},
    users::{Role, User, UserStore},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Resolve a bearer credential to a user
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> ApiResult<User>;
}

/// JWT claims carried by issued tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Expiry, seconds since epoch
    pub exp: i64,
    /// Issued-at, seconds since epoch
    pub iat: i64,
}

/// Issue an HS256 token for a user
pub fn issue_token(user: &User, jwt_secret: &str, ttl_seconds: i64) -> ApiResult<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.to_string(),
        exp: now + ttl_seconds,
        iat: now,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to issue token: {}", e)))
}

/// Verify a JWT and return its claims
pub fn verify_token(token: &str, jwt_secret: &str) -> ApiResult<Claims> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (5 minutes)
    validation.leeway = 300;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("JWT verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Authentication("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    ApiError::Authentication("Invalid token signature".to_string())
                }
                _ => ApiError::Authentication("Invalid token".to_string()),
            }
        })
}

/// Production resolver: decode the JWT, then load the user it names
pub struct JwtCredentialResolver {
    jwt_secret: String,
    users: UserStore,
}

impl JwtCredentialResolver {
    pub fn new(jwt_secret: String, users: UserStore) -> Self {
        Self { jwt_secret, users }
    }
}

#[async_trait]
impl CredentialResolver for JwtCredentialResolver {
    async fn resolve(&self, token: &str) -> ApiResult<User> {
        let claims = verify_token(token, &self.jwt_secret)?;

        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| ApiError::Authentication("Invalid token subject".to_string()))?;

        self.users
            .get(user_id)
            .await
            .map_err(|_| ApiError::Authentication("Unknown user".to_string()))
    }
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Authenticated context - resolves the caller from the bearer credential
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Authentication("Authentication required".to_string()))?;

        let user = state.credential_resolver.resolve(&token).await?;

        Ok(AuthContext { user })
    }
}

/// Admin authentication context - requires role `admin`
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub admin: User,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let AuthContext { user } = AuthContext::from_request_parts(parts, state).await?;

        if !user.role.is_admin() {
            tracing::warn!("user {} attempted an admin operation", user.id);
            return Err(ApiError::Authorization(
                "Admin privileges required".to_string(),
            ));
        }

        Ok(AdminAuthContext { admin: user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    fn sample_user() -> User {
        User {
            id: 7,
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            role: Role::User,
            created_at: Utc::now(),
        }
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn issue_then_verify_round_trip() {
        let token = issue_token(&sample_user(), SECRET, 3600).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "7");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(&sample_user(), SECRET, 3600).unwrap();
        let err = verify_token(&token, "another-secret-another-secret!!!").unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Issued an hour in the past, beyond the 300s leeway
        let token = issue_token(&sample_user(), SECRET, -3600).unwrap();
        let err = verify_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123token"),
        );
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc123token"));

        let mut bare = HeaderMap::new();
        bare.insert(header::AUTHORIZATION, HeaderValue::from_static("abc123token"));
        assert_eq!(extract_bearer_token(&bare), None);

        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
