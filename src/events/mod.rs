/// Event records and CRUD storage
///
/// Events are submitted by users, reviewed by admins (see `moderation`),
/// and carry an ordered set of volunteer position names.
use crate::error::{ApiError, ApiResult};
use crate::moderation::EventStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// An event record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub volunteer_positions: Vec<String>,
    pub user_id: Option<i64>,
    pub status: EventStatus,
    pub submitted_at: DateTime<Utc>,
    pub approved_by: Option<i64>,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating an event
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub volunteer_positions: Vec<String>,
}

/// Partial update; `None` fields retain their stored value
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub volunteer_positions: Option<Vec<String>>,
}

/// Normalize a position list into an ordered set of distinct names
pub fn normalize_positions(positions: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    positions
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty() && seen.insert(p.clone()))
        .collect()
}

/// Parse the stored positions column. Malformed JSON is an integrity
/// error, not an empty list.
fn parse_positions(raw: &str) -> ApiResult<Vec<String>> {
    serde_json::from_str::<Vec<String>>(raw).map_err(|e| {
        ApiError::Integrity(format!("Malformed volunteer_positions column: {}", e))
    })
}

fn parse_timestamp(raw: &str, column: &str) -> ApiResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApiError::Integrity(format!("Invalid {} timestamp: {}", column, e)))
}

const EVENT_COLUMNS: &str = "id, title, date, location, description, image, \
                             volunteer_positions, user_id, status, submitted_at, \
                             approved_by, created_at, updated_at";

/// Event storage manager
#[derive(Clone)]
pub struct EventStore {
    db: SqlitePool,
}

impl EventStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a new event in pending state
    pub async fn create(&self, input: NewEvent, owner: Option<i64>) -> ApiResult<Event> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let positions = normalize_positions(&input.volunteer_positions);
        let positions_json = serde_json::to_string(&positions)
            .map_err(|e| ApiError::Internal(format!("Failed to serialize positions: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO events
            (id, title, date, location, description, image, volunteer_positions,
             user_id, status, submitted_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&input.title)
        .bind(input.date.to_rfc3339())
        .bind(&input.location)
        .bind(&input.description)
        .bind(&input.image)
        .bind(&positions_json)
        .bind(owner)
        .bind(EventStatus::Pending.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        crate::metrics::EVENTS_CREATED_TOTAL.inc();

        Ok(Event {
            id,
            title: input.title,
            date: input.date,
            location: input.location,
            description: input.description,
            image: input.image,
            volunteer_positions: positions,
            user_id: owner,
            status: EventStatus::Pending,
            submitted_at: now,
            approved_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// List all events ordered by date ascending
    pub async fn list(&self) -> ApiResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM events ORDER BY date",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    /// Fetch one event by id
    pub async fn get(&self, id: Uuid) -> ApiResult<Event> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM events WHERE id = ?",
            EVENT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

        Self::map_row(&row)
    }

    /// Update the owner-editable fields; `None` retains the stored value
    pub async fn update(&self, id: Uuid, patch: EventPatch) -> ApiResult<Event> {
        let positions_json = match &patch.volunteer_positions {
            Some(positions) => Some(
                serde_json::to_string(&normalize_positions(positions)).map_err(|e| {
                    ApiError::Internal(format!("Failed to serialize positions: {}", e))
                })?,
            ),
            None => None,
        };

        let result = sqlx::query(
            r#"
            UPDATE events SET
                title               = COALESCE(?, title),
                date                = COALESCE(?, date),
                location            = COALESCE(?, location),
                description         = COALESCE(?, description),
                image               = COALESCE(?, image),
                volunteer_positions = COALESCE(?, volunteer_positions),
                updated_at          = ?
            WHERE id = ?
            "#,
        )
        .bind(&patch.title)
        .bind(patch.date.map(|d| d.to_rfc3339()))
        .bind(&patch.location)
        .bind(&patch.description)
        .bind(&patch.image)
        .bind(&positions_json)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Event not found".to_string()));
        }

        self.get(id).await
    }

    /// Delete an event, returning the deleted record
    pub async fn delete(&self, id: Uuid) -> ApiResult<Event> {
        let event = self.get(id).await?;

        sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.db)
            .await?;

        Ok(event)
    }

    /// List pending events, oldest-submitted first
    pub async fn list_pending(&self) -> ApiResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM events WHERE status = 'pending' ORDER BY submitted_at",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    /// Ownership predicate consulted by the route layer
    pub async fn is_owned_by(&self, id: Uuid, user_id: i64) -> ApiResult<bool> {
        let row = sqlx::query("SELECT user_id FROM events WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => {
                let owner: Option<i64> = row.get("user_id");
                Ok(owner == Some(user_id))
            }
            None => Ok(false),
        }
    }

    /// Scan stored position columns and fail on malformed data.
    /// Run at startup so corruption surfaces before serving requests.
    pub async fn verify_integrity(&self) -> ApiResult<()> {
        let rows = sqlx::query("SELECT id, volunteer_positions FROM events")
            .fetch_all(&self.db)
            .await?;

        for row in rows {
            let id: String = row.get("id");
            let raw: String = row.get("volunteer_positions");
            parse_positions(&raw).map_err(|e| {
                ApiError::Integrity(format!("event {}: {}", id, e))
            })?;
        }

        Ok(())
    }

    fn map_row(row: &sqlx::sqlite::SqliteRow) -> ApiResult<Event> {
        let id_str: String = row.get("id");
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| ApiError::Integrity(format!("Invalid event id: {}", e)))?;

        let status_str: String = row.get("status");
        let status = EventStatus::parse(&status_str)?;

        let positions_raw: String = row.get("volunteer_positions");
        let volunteer_positions = parse_positions(&positions_raw)?;

        let date: String = row.get("date");
        let submitted_at: String = row.get("submitted_at");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        Ok(Event {
            id,
            title: row.get("title"),
            date: parse_timestamp(&date, "date")?,
            location: row.get("location"),
            description: row.get("description"),
            image: row.get("image"),
            volunteer_positions,
            user_id: row.get("user_id"),
            status,
            submitted_at: parse_timestamp(&submitted_at, "submitted_at")?,
            approved_by: row.get("approved_by"),
            created_at: parse_timestamp(&created_at, "created_at")?,
            updated_at: parse_timestamp(&updated_at, "updated_at")?,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;

    /// Create the events table in an in-memory database
    pub async fn create_events_table(db: &SqlitePool) {
        sqlx::query(
            r#"
            CREATE TABLE events (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                date TEXT NOT NULL,
                location TEXT NOT NULL,
                description TEXT,
                image TEXT,
                volunteer_positions TEXT NOT NULL DEFAULT '[]',
                user_id INTEGER,
                status TEXT NOT NULL DEFAULT 'pending',
                submitted_at TEXT NOT NULL,
                approved_by INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(db)
        .await
        .unwrap();
    }
}
