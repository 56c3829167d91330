/// Decision notification consumers
///
/// The moderation transition publishes a `ModerationEvent` after the
/// row update commits; consumers run after the fact and their failures
/// never affect the decision itself.
use crate::error::ApiResult;
use crate::events::Event;
use crate::mailer::Mailer;
use crate::moderation::ModerationEvent;
use crate::users::UserStore;
use async_trait::async_trait;

/// Consumer of post-transition moderation events
#[async_trait]
pub trait DecisionNotifier: Send + Sync {
    async fn decision_made(&self, event: &Event, notice: &ModerationEvent) -> ApiResult<()>;
}

/// Emails the event submitter about the decision.
/// Skips silently when the event has no resolvable owner email.
pub struct EmailNotifier {
    users: UserStore,
    mailer: Mailer,
}

impl EmailNotifier {
    pub fn new(users: UserStore, mailer: Mailer) -> Self {
        Self { users, mailer }
    }
}

#[async_trait]
impl DecisionNotifier for EmailNotifier {
    async fn decision_made(&self, event: &Event, notice: &ModerationEvent) -> ApiResult<()> {
        let Some(owner_id) = event.user_id else {
            tracing::debug!(
                "event {} has no submitter on record, skipping notification",
                event.id
            );
            return Ok(());
        };

        let owner = match self.users.get(owner_id).await {
            Ok(owner) => owner,
            Err(e) => {
                tracing::debug!(
                    "submitter {} of event {} not resolvable ({}), skipping notification",
                    owner_id,
                    event.id,
                    e
                );
                return Ok(());
            }
        };

        self.mailer
            .send_decision_email(
                &owner.email,
                &owner.name,
                &event.title,
                notice.action.as_str(),
                notice.reason.as_deref(),
            )
            .await
    }
}

/// Discards every notice. Useful where no delivery channel exists.
pub struct NullNotifier;

#[async_trait]
impl DecisionNotifier for NullNotifier {
    async fn decision_made(&self, _event: &Event, _notice: &ModerationEvent) -> ApiResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{test_support::create_events_table, EventStore, NewEvent};
    use crate::users::test_support::create_users_table;
    use chrono::Utc;
    use sqlx::SqlitePool;

    async fn setup() -> (EmailNotifier, EventStore, UserStore) {
        let db = SqlitePool::connect(":memory:").await.unwrap();
        create_events_table(&db).await;
        create_users_table(&db).await;

        let users = UserStore::new(db.clone());
        let events = EventStore::new(db);
        let mailer = Mailer::new(None).unwrap();
        (EmailNotifier::new(users.clone(), mailer), events, users)
    }

    fn notice_for(event: &Event) -> ModerationEvent {
        ModerationEvent {
            action: crate::moderation::ModerationDecision::Approved,
            admin_id: 1,
            event_id: event.id,
            timestamp: Utc::now(),
            reason: None,
        }
    }

    #[tokio::test]
    async fn missing_owner_is_skipped_without_error() {
        let (notifier, events, _) = setup().await;
        let event = events
            .create(
                NewEvent {
                    title: "Anonymous Drive".to_string(),
                    date: Utc::now(),
                    location: "Old Mill".to_string(),
                    description: None,
                    image: None,
                    volunteer_positions: vec![],
                },
                None,
            )
            .await
            .unwrap();

        let result = notifier.decision_made(&event, &notice_for(&event)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unresolvable_owner_is_skipped_without_error() {
        let (notifier, events, _) = setup().await;
        let event = events
            .create(
                NewEvent {
                    title: "Ghost Event".to_string(),
                    date: Utc::now(),
                    location: "Nowhere".to_string(),
                    description: None,
                    image: None,
                    volunteer_positions: vec![],
                },
                Some(9999),
            )
            .await
            .unwrap();

        let result = notifier.decision_made(&event, &notice_for(&event)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn resolvable_owner_is_notified() {
        let (notifier, events, users) = setup().await;
        let owner = users
            .create("Pat", "pat@example.com", "s3cure-pass")
            .await
            .unwrap();
        let event = events
            .create(
                NewEvent {
                    title: "Tree Planting".to_string(),
                    date: Utc::now(),
                    location: "Hilltop".to_string(),
                    description: None,
                    image: None,
                    volunteer_positions: vec![],
                },
                Some(owner.id),
            )
            .await
            .unwrap();

        // Unconfigured mailer logs instead of sending; the dispatch
        // path itself must succeed.
        let result = notifier.decision_made(&event, &notice_for(&event)).await;
        assert!(result.is_ok());
    }
}
