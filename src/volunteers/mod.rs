/// Volunteer registrations tied to an event and a position
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// One volunteer sign-up. `user_name`/`user_email` are populated on
/// joined reads for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerRegistration {
    pub id: i64,
    pub event_id: Uuid,
    pub user_id: i64,
    pub position: String,
    pub registered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

/// Registrations for one event, grouped for the owner dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventVolunteers {
    pub event_id: Uuid,
    pub volunteers: Vec<VolunteerRegistration>,
}

/// Volunteer registration manager
#[derive(Clone)]
pub struct VolunteerRegistry {
    db: SqlitePool,
}

impl VolunteerRegistry {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Register a user for a position. A (event, user, position) triple
    /// may appear at most once, enforced by an explicit existence check.
    pub async fn register(
        &self,
        event_id: Uuid,
        user_id: i64,
        position: &str,
    ) -> ApiResult<VolunteerRegistration> {
        if self.is_registered(event_id, user_id, position).await? {
            return Err(ApiError::Validation(
                "Already registered for this position".to_string(),
            ));
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO volunteer_registrations (event_id, user_id, position, registered_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(event_id.to_string())
        .bind(user_id)
        .bind(position)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        metrics::VOLUNTEER_SIGNUPS_TOTAL.inc();

        Ok(VolunteerRegistration {
            id: result.last_insert_rowid(),
            event_id,
            user_id,
            position: position.to_string(),
            registered_at: now,
            user_name: None,
            user_email: None,
        })
    }

    /// Remove a registration; not-found when it does not exist
    pub async fn unregister(&self, event_id: Uuid, user_id: i64, position: &str) -> ApiResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM volunteer_registrations
            WHERE event_id = ? AND user_id = ? AND position = ?
            "#,
        )
        .bind(event_id.to_string())
        .bind(user_id)
        .bind(position)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(
                "Volunteer registration not found".to_string(),
            ));
        }

        Ok(())
    }

    /// Check whether a user already holds a position for an event
    pub async fn is_registered(
        &self,
        event_id: Uuid,
        user_id: i64,
        position: &str,
    ) -> ApiResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT 1 FROM volunteer_registrations
            WHERE event_id = ? AND user_id = ? AND position = ?
            LIMIT 1
            "#,
        )
        .bind(event_id.to_string())
        .bind(user_id)
        .bind(position)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.is_some())
    }

    /// All registrations for an event with the volunteer's name/email
    pub async fn for_event(&self, event_id: Uuid) -> ApiResult<Vec<VolunteerRegistration>> {
        let rows = sqlx::query(
            r#"
            SELECT vr.id, vr.event_id, vr.user_id, vr.position, vr.registered_at,
                   u.name AS user_name, u.email AS user_email
            FROM volunteer_registrations vr
            JOIN users u ON vr.user_id = u.id
            WHERE vr.event_id = ?
            ORDER BY vr.registered_at
            "#,
        )
        .bind(event_id.to_string())
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(Self::map_joined_row).collect()
    }

    /// Registrations for every event owned by a user, grouped by event
    pub async fn for_owner_events(&self, owner_id: i64) -> ApiResult<Vec<EventVolunteers>> {
        let rows = sqlx::query(
            r#"
            SELECT vr.id, vr.event_id, vr.user_id, vr.position, vr.registered_at,
                   u.name AS user_name, u.email AS user_email
            FROM volunteer_registrations vr
            JOIN users u ON vr.user_id = u.id
            JOIN events e ON vr.event_id = e.id
            WHERE e.user_id = ?
            ORDER BY e.date, vr.registered_at
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: Vec<EventVolunteers> = Vec::new();
        for row in &rows {
            let registration = Self::map_joined_row(row)?;
            match grouped
                .iter_mut()
                .find(|g| g.event_id == registration.event_id)
            {
                Some(group) => group.volunteers.push(registration),
                None => grouped.push(EventVolunteers {
                    event_id: registration.event_id,
                    volunteers: vec![registration],
                }),
            }
        }

        Ok(grouped)
    }

    /// Drop registrations for positions the owner removed from the event
    pub async fn cleanup_removed_positions(
        &self,
        event_id: Uuid,
        current_positions: &[String],
    ) -> ApiResult<u64> {
        let existing = self.for_event(event_id).await?;
        let mut removed = 0;

        for registration in existing {
            if !current_positions.contains(&registration.position) {
                sqlx::query(
                    r#"
                    DELETE FROM volunteer_registrations
                    WHERE event_id = ? AND user_id = ? AND position = ?
                    "#,
                )
                .bind(event_id.to_string())
                .bind(registration.user_id)
                .bind(&registration.position)
                .execute(&self.db)
                .await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(
                "Removed {} stale volunteer registration(s) for event {}",
                removed,
                event_id
            );
        }

        Ok(removed)
    }

    fn map_joined_row(row: &sqlx::sqlite::SqliteRow) -> ApiResult<VolunteerRegistration> {
        let event_id_str: String = row.get("event_id");
        let event_id = Uuid::parse_str(&event_id_str)
            .map_err(|e| ApiError::Integrity(format!("Invalid event id: {}", e)))?;

        let registered_at_str: String = row.get("registered_at");
        let registered_at = DateTime::parse_from_rfc3339(&registered_at_str)
            .map_err(|e| ApiError::Integrity(format!("Invalid registration timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(VolunteerRegistration {
            id: row.get("id"),
            event_id,
            user_id: row.get("user_id"),
            position: row.get("position"),
            registered_at,
            user_name: row.try_get("user_name").ok(),
            user_email: row.try_get("user_email").ok(),
        })
    }
}
