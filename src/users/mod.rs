/// User accounts: registration, credential verification, roles
use crate::error::{ApiError, ApiResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> ApiResult<Self> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(ApiError::Integrity(format!("Invalid role: {}", s))),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// A user account. The credential hash never leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

/// User storage manager
#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a new user with a hashed credential
    pub async fn create(&self, name: &str, email: &str, password: &str) -> ApiResult<User> {
        if self.email_exists(email).await? {
            return Err(ApiError::Conflict("Email already in use".to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?
            .to_string();

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .bind(Role::User.as_str())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            email: email.to_string(),
            role: Role::User,
            created_at: now,
        })
    }

    /// Verify credentials and return the user
    pub async fn authenticate(&self, email: &str, password: &str) -> ApiResult<User> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::Authentication("Invalid email or password".to_string()))?;

        let stored_hash: String = row.get("password_hash");
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| ApiError::Integrity(format!("Invalid stored credential: {}", e)))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| ApiError::Authentication("Invalid email or password".to_string()))?;

        Self::map_row(&row)
    }

    /// Fetch a user by id
    pub async fn get(&self, id: i64) -> ApiResult<User> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Self::map_row(&row)
    }

    /// Fetch a user by email
    pub async fn get_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Check whether an email is already registered
    pub async fn email_exists(&self, email: &str) -> ApiResult<bool> {
        Ok(self.get_by_email(email).await?.is_some())
    }

    /// Promote or demote a user
    pub async fn set_role(&self, id: i64, role: Role) -> ApiResult<()> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }

        Ok(())
    }

    fn map_row(row: &sqlx::sqlite::SqliteRow) -> ApiResult<User> {
        let role_str: String = row.get("role");
        let created_at_str: String = row.get("created_at");
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| ApiError::Integrity(format!("Invalid user timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            role: Role::parse(&role_str)?,
            created_at,
        })
    }
}
