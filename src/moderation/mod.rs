/// Admin moderation workflow
///
/// Every submitted event starts out pending and is resolved by an admin
/// to approved or rejected. Decisions are terminal: each transition is
/// gated on the current status being pending, so a second decision on
/// the same event reports not-found rather than overwriting the first.
/// Each decision appends one audit entry, bumps the moderation metric,
/// and dispatches a best-effort notification to the submitter.
pub mod audit;

pub use audit::{ApprovalAuditEntry, AuditLog};

use crate::error::{ApiError, ApiResult};
use crate::events::{Event, EventStore};
use crate::metrics;
use crate::notify::DecisionNotifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Review state of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Awaiting a moderation decision
    Pending,
    /// Terminal
    Approved,
    /// Terminal
    Rejected,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> ApiResult<Self> {
        match s {
            "pending" => Ok(EventStatus::Pending),
            "approved" => Ok(EventStatus::Approved),
            "rejected" => Ok(EventStatus::Rejected),
            _ => Err(ApiError::Integrity(format!("Invalid event status: {}", s))),
        }
    }

    /// Pending is the only state a decision may be applied to
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (EventStatus::Pending, EventStatus::Approved)
                | (EventStatus::Pending, EventStatus::Rejected)
        )
    }
}

/// The two possible moderation decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationDecision {
    Approved,
    Rejected,
}

impl ModerationDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationDecision::Approved => "approved",
            ModerationDecision::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> ApiResult<Self> {
        match s {
            "approved" => Ok(ModerationDecision::Approved),
            "rejected" => Ok(ModerationDecision::Rejected),
            _ => Err(ApiError::Integrity(format!(
                "Invalid moderation action: {}",
                s
            ))),
        }
    }

    pub fn resulting_status(&self) -> EventStatus {
        match self {
            ModerationDecision::Approved => EventStatus::Approved,
            ModerationDecision::Rejected => EventStatus::Rejected,
        }
    }
}

/// Post-transition record handed to notification consumers and metrics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationEvent {
    pub action: ModerationDecision,
    pub admin_id: i64,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Decision counts for one calendar day
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDecisionCount {
    pub day: String,
    pub approved: i64,
    pub rejected: i64,
}

/// Decision counts for one admin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDecisionCount {
    pub admin_id: i64,
    pub approved: i64,
    pub rejected: i64,
}

/// Aggregate moderation statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationStats {
    pub by_day: Vec<DailyDecisionCount>,
    pub by_admin: Vec<AdminDecisionCount>,
}

/// Moderation service orchestrating decisions, audit, and notification
#[derive(Clone)]
pub struct ModerationService {
    db: SqlitePool,
    events: EventStore,
    audit: AuditLog,
    notifier: Arc<dyn DecisionNotifier>,
}

impl ModerationService {
    pub fn new(
        db: SqlitePool,
        events: EventStore,
        audit: AuditLog,
        notifier: Arc<dyn DecisionNotifier>,
    ) -> Self {
        Self {
            db,
            events,
            audit,
            notifier,
        }
    }

    /// Approve a pending event
    pub async fn approve(
        &self,
        id: Uuid,
        admin_id: i64,
        reason: Option<&str>,
    ) -> ApiResult<Event> {
        self.decide(id, admin_id, ModerationDecision::Approved, reason)
            .await
    }

    /// Reject a pending event
    pub async fn reject(&self, id: Uuid, admin_id: i64, reason: Option<&str>) -> ApiResult<Event> {
        self.decide(id, admin_id, ModerationDecision::Rejected, reason)
            .await
    }

    /// The pending review queue, oldest-submitted first
    pub async fn list_pending(&self) -> ApiResult<Vec<Event>> {
        self.events.list_pending().await
    }

    /// Approve a batch of events, stopping at the first failure.
    /// Items decided before the failure stay decided.
    pub async fn bulk_approve(
        &self,
        ids: &[Uuid],
        admin_id: i64,
        reason: Option<&str>,
    ) -> ApiResult<Vec<Event>> {
        self.bulk_decide(ids, admin_id, ModerationDecision::Approved, reason)
            .await
    }

    /// Reject a batch of events, stopping at the first failure
    pub async fn bulk_reject(
        &self,
        ids: &[Uuid],
        admin_id: i64,
        reason: Option<&str>,
    ) -> ApiResult<Vec<Event>> {
        self.bulk_decide(ids, admin_id, ModerationDecision::Rejected, reason)
            .await
    }

    /// Chronological audit trail for one event
    pub async fn audit_trail(&self, event_id: Uuid) -> ApiResult<Vec<ApprovalAuditEntry>> {
        self.audit.for_event(event_id).await
    }

    /// Decision counts grouped by day and by admin
    pub async fn stats(&self) -> ApiResult<ModerationStats> {
        let day_rows = sqlx::query(
            r#"
            SELECT substr(created_at, 1, 10) AS day, action, COUNT(*) AS count
            FROM event_approvals
            GROUP BY day, action
            ORDER BY day
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut by_day: Vec<DailyDecisionCount> = Vec::new();
        for row in day_rows {
            let day: String = row.get("day");
            let action = ModerationDecision::parse(&row.get::<String, _>("action"))?;
            let count: i64 = row.get("count");

            if by_day.last().map(|d| d.day.as_str()) != Some(day.as_str()) {
                by_day.push(DailyDecisionCount {
                    day: day.clone(),
                    approved: 0,
                    rejected: 0,
                });
            }
            let entry = by_day.last_mut().unwrap();
            match action {
                ModerationDecision::Approved => entry.approved += count,
                ModerationDecision::Rejected => entry.rejected += count,
            }
        }

        let admin_rows = sqlx::query(
            r#"
            SELECT admin_id, action, COUNT(*) AS count
            FROM event_approvals
            GROUP BY admin_id, action
            ORDER BY admin_id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut by_admin: Vec<AdminDecisionCount> = Vec::new();
        for row in admin_rows {
            let admin_id: i64 = row.get("admin_id");
            let action = ModerationDecision::parse(&row.get::<String, _>("action"))?;
            let count: i64 = row.get("count");

            if by_admin.last().map(|a| a.admin_id) != Some(admin_id) {
                by_admin.push(AdminDecisionCount {
                    admin_id,
                    approved: 0,
                    rejected: 0,
                });
            }
            let entry = by_admin.last_mut().unwrap();
            match action {
                ModerationDecision::Approved => entry.approved += count,
                ModerationDecision::Rejected => entry.rejected += count,
            }
        }

        Ok(ModerationStats { by_day, by_admin })
    }

    /// Apply one decision. The UPDATE is gated on the pending state, so
    /// a decided or unknown event affects zero rows and reports
    /// not-found without touching the audit log.
    async fn decide(
        &self,
        id: Uuid,
        admin_id: i64,
        decision: ModerationDecision,
        reason: Option<&str>,
    ) -> ApiResult<Event> {
        let next = decision.resulting_status();
        debug_assert!(EventStatus::Pending.can_transition_to(next));

        let result = sqlx::query(
            r#"
            UPDATE events
            SET status = ?, approved_by = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(next.as_str())
        .bind(admin_id)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(EventStatus::Pending.as_str())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Event not found".to_string()));
        }

        let event = self.events.get(id).await?;

        self.audit.record(id, admin_id, decision, reason).await?;

        metrics::MODERATION_DECISIONS_TOTAL
            .with_label_values(&[decision.as_str()])
            .inc();

        // The decision is durable once the row is updated. Notification
        // is best-effort and must never unwind the transition.
        let notice = ModerationEvent {
            action: decision,
            admin_id,
            event_id: id,
            timestamp: Utc::now(),
            reason: reason.map(str::to_string),
        };
        if let Err(e) = self.notifier.decision_made(&event, &notice).await {
            tracing::warn!("decision notification failed for event {}: {}", id, e);
        }

        Ok(event)
    }

    async fn bulk_decide(
        &self,
        ids: &[Uuid],
        admin_id: i64,
        decision: ModerationDecision,
        reason: Option<&str>,
    ) -> ApiResult<Vec<Event>> {
        let mut decided = Vec::with_capacity(ids.len());
        for id in ids {
            decided.push(self.decide(*id, admin_id, decision, reason).await?);
        }
        Ok(decided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{test_support::create_events_table, NewEvent};
    use crate::moderation::audit::test_support::create_approvals_table;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// Records every dispatched decision
    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<ModerationEvent>>,
    }

    #[async_trait]
    impl DecisionNotifier for RecordingNotifier {
        async fn decision_made(&self, _event: &Event, notice: &ModerationEvent) -> ApiResult<()> {
            self.seen.lock().await.push(notice.clone());
            Ok(())
        }
    }

    /// Always fails, to prove notification errors never surface
    struct FailingNotifier;

    #[async_trait]
    impl DecisionNotifier for FailingNotifier {
        async fn decision_made(&self, _event: &Event, _notice: &ModerationEvent) -> ApiResult<()> {
            Err(ApiError::Internal("smtp down".to_string()))
        }
    }

    async fn service_with(
        notifier: Arc<dyn DecisionNotifier>,
    ) -> (ModerationService, EventStore, AuditLog) {
        let db = SqlitePool::connect(":memory:").await.unwrap();
        create_events_table(&db).await;
        create_approvals_table(&db).await;

        let events = EventStore::new(db.clone());
        let audit = AuditLog::new(db.clone());
        let service =
            ModerationService::new(db, events.clone(), audit.clone(), notifier);
        (service, events, audit)
    }

    async fn seed_pending(events: &EventStore, title: &str) -> Event {
        events
            .create(
                NewEvent {
                    title: title.to_string(),
                    date: Utc::now(),
                    location: "Town Hall".to_string(),
                    description: None,
                    image: None,
                    volunteer_positions: vec![],
                },
                Some(42),
            )
            .await
            .unwrap()
    }

    #[test]
    fn pending_is_the_only_decidable_state() {
        assert!(EventStatus::Pending.can_transition_to(EventStatus::Approved));
        assert!(EventStatus::Pending.can_transition_to(EventStatus::Rejected));
        assert!(!EventStatus::Approved.can_transition_to(EventStatus::Rejected));
        assert!(!EventStatus::Rejected.can_transition_to(EventStatus::Approved));
        assert!(!EventStatus::Approved.can_transition_to(EventStatus::Pending));
    }

    #[test]
    fn decision_parse_round_trip() {
        assert_eq!(
            ModerationDecision::parse("approved").unwrap(),
            ModerationDecision::Approved
        );
        assert_eq!(
            ModerationDecision::parse("rejected").unwrap(),
            ModerationDecision::Rejected
        );
        assert!(ModerationDecision::parse("declined").is_err());
    }

    #[tokio::test]
    async fn approve_updates_event_and_appends_one_audit_entry() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (service, events, _) = service_with(notifier.clone()).await;
        let event = seed_pending(&events, "Food Drive").await;

        let decided = service.approve(event.id, 9, None).await.unwrap();
        assert_eq!(decided.status, EventStatus::Approved);
        assert_eq!(decided.approved_by, Some(9));

        let trail = service.audit_trail(event.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, ModerationDecision::Approved);
        assert_eq!(trail[0].admin_id, 9);

        let seen = notifier.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].event_id, event.id);
        assert_eq!(seen[0].action, ModerationDecision::Approved);
    }

    #[tokio::test]
    async fn reject_records_reason_in_audit_trail() {
        let (service, events, _) = service_with(Arc::new(RecordingNotifier::default())).await;
        let event = seed_pending(&events, "Bake Sale").await;

        let decided = service
            .reject(event.id, 1, Some("incomplete info"))
            .await
            .unwrap();
        assert_eq!(decided.status, EventStatus::Rejected);

        let trail = service.audit_trail(event.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, ModerationDecision::Rejected);
        assert_eq!(trail[0].reason.as_deref(), Some("incomplete info"));
    }

    #[tokio::test]
    async fn approving_unknown_id_is_not_found_and_leaves_no_audit_entry() {
        let (service, _, _) = service_with(Arc::new(RecordingNotifier::default())).await;
        let missing = Uuid::nil();

        let err = service.approve(missing, 1, None).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.to_string(), "Event not found");

        assert!(service.audit_trail(missing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn decisions_are_terminal() {
        let (service, events, _) = service_with(Arc::new(RecordingNotifier::default())).await;
        let event = seed_pending(&events, "Book Swap").await;

        service.approve(event.id, 1, None).await.unwrap();

        // Second decision reports not-found and appends nothing
        let err = service.reject(event.id, 2, None).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let stored = events.get(event.id).await.unwrap();
        assert_eq!(stored.status, EventStatus::Approved);
        assert_eq!(stored.approved_by, Some(1));
        assert_eq!(service.audit_trail(event.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_pending_is_fifo_and_excludes_decided() {
        let (service, events, _) = service_with(Arc::new(RecordingNotifier::default())).await;
        let first = seed_pending(&events, "First").await;
        let second = seed_pending(&events, "Second").await;
        let third = seed_pending(&events, "Third").await;

        service.approve(second.id, 1, None).await.unwrap();

        let pending = service.list_pending().await.unwrap();
        let ids: Vec<Uuid> = pending.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![first.id, third.id]);
    }

    #[tokio::test]
    async fn bulk_approve_decides_every_id() {
        let (service, events, _) = service_with(Arc::new(RecordingNotifier::default())).await;
        let a = seed_pending(&events, "A").await;
        let b = seed_pending(&events, "B").await;

        let decided = service.bulk_approve(&[a.id, b.id], 5, None).await.unwrap();
        assert_eq!(decided.len(), 2);
        assert!(decided.iter().all(|e| e.status == EventStatus::Approved));
    }

    #[tokio::test]
    async fn bulk_approve_stops_at_missing_id() {
        let (service, events, _) = service_with(Arc::new(RecordingNotifier::default())).await;
        let e1 = seed_pending(&events, "E1").await;
        let missing = Uuid::nil();
        let e3 = seed_pending(&events, "E3").await;

        let err = service
            .bulk_approve(&[e1.id, missing, e3.id], 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // Fail-fast, non-atomic: E1 stays approved, E3 was never reached
        assert_eq!(
            events.get(e1.id).await.unwrap().status,
            EventStatus::Approved
        );
        assert_eq!(
            events.get(e3.id).await.unwrap().status,
            EventStatus::Pending
        );
    }

    #[tokio::test]
    async fn notification_failure_does_not_unwind_the_decision() {
        let (service, events, _) = service_with(Arc::new(FailingNotifier)).await;
        let event = seed_pending(&events, "Garage Sale").await;

        let decided = service.approve(event.id, 1, None).await.unwrap();
        assert_eq!(decided.status, EventStatus::Approved);
        assert_eq!(service.audit_trail(event.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stats_group_by_day_and_admin() {
        let (service, events, _) = service_with(Arc::new(RecordingNotifier::default())).await;
        let a = seed_pending(&events, "A").await;
        let b = seed_pending(&events, "B").await;
        let c = seed_pending(&events, "C").await;

        service.approve(a.id, 1, None).await.unwrap();
        service.approve(b.id, 1, None).await.unwrap();
        service.reject(c.id, 2, None).await.unwrap();

        let stats = service.stats().await.unwrap();

        assert_eq!(stats.by_day.len(), 1);
        assert_eq!(stats.by_day[0].approved, 2);
        assert_eq!(stats.by_day[0].rejected, 1);

        assert_eq!(stats.by_admin.len(), 2);
        let admin1 = stats.by_admin.iter().find(|a| a.admin_id == 1).unwrap();
        assert_eq!(admin1.approved, 2);
        assert_eq!(admin1.rejected, 0);
        let admin2 = stats.by_admin.iter().find(|a| a.admin_id == 2).unwrap();
        assert_eq!(admin2.rejected, 1);
    }
}
