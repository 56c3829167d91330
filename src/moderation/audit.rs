/// Append-only audit log of moderation decisions
use crate::error::{ApiError, ApiResult};
use crate::moderation::ModerationDecision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// One recorded moderation decision. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalAuditEntry {
    pub id: i64,
    pub event_id: Uuid,
    pub admin_id: i64,
    pub action: ModerationDecision,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit log manager. Exposes append and chronological read only.
#[derive(Clone)]
pub struct AuditLog {
    db: SqlitePool,
}

impl AuditLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append one entry for a decision
    pub async fn record(
        &self,
        event_id: Uuid,
        admin_id: i64,
        action: ModerationDecision,
        reason: Option<&str>,
    ) -> ApiResult<ApprovalAuditEntry> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO event_approvals (event_id, admin_id, action, reason, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(event_id.to_string())
        .bind(admin_id)
        .bind(action.as_str())
        .bind(reason)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(ApprovalAuditEntry {
            id: result.last_insert_rowid(),
            event_id,
            admin_id,
            action,
            reason: reason.map(str::to_string),
            created_at: now,
        })
    }

    /// All entries for an event, oldest first
    pub async fn for_event(&self, event_id: Uuid) -> ApiResult<Vec<ApprovalAuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, admin_id, action, reason, created_at
            FROM event_approvals
            WHERE event_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(event_id.to_string())
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    fn map_row(row: &sqlx::sqlite::SqliteRow) -> ApiResult<ApprovalAuditEntry> {
        let event_id_str: String = row.get("event_id");
        let event_id = Uuid::parse_str(&event_id_str)
            .map_err(|e| ApiError::Integrity(format!("Invalid event id in audit log: {}", e)))?;

        let action_str: String = row.get("action");
        let action = ModerationDecision::parse(&action_str)?;

        let created_at_str: String = row.get("created_at");
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| ApiError::Integrity(format!("Invalid audit timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(ApprovalAuditEntry {
            id: row.get("id"),
            event_id,
            admin_id: row.get("admin_id"),
            action,
            reason: row.get("reason"),
            created_at,
        })
    }
}
