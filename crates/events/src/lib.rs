//! Event fan-out to connected team members
//!
//! One bounded channel per connected user, registered in a shared hub.
//! Publishing never blocks: a subscriber whose channel is full or closed is
//! dropped from the registry, and the caller is unaffected. Lifecycle and
//! solve paths treat publishing as best-effort bookkeeping.

use ctf_platform_models::TeamEvent;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

struct Subscriber {
    team_id: Uuid,
    tx: mpsc::Sender<TeamEvent>,
}

/// Shared registry of per-user event channels
pub struct EventHub {
    channel_capacity: usize,
    subscribers: RwLock<HashMap<Uuid, Subscriber>>,
}

impl EventHub {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            channel_capacity,
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a user connection; a prior registration for the same user is
    /// replaced (its receiver sees a closed channel)
    pub async fn subscribe(&self, user_id: Uuid, team_id: Uuid) -> mpsc::Receiver<TeamEvent> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(user_id, Subscriber { team_id, tx });
        debug!(user_id = %user_id, team_id = %team_id, "Event subscriber registered");
        rx
    }

    pub async fn unsubscribe(&self, user_id: Uuid) {
        let mut subscribers = self.subscribers.write().await;
        subscribers.remove(&user_id);
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Publish to one user, non-blocking
    pub async fn publish_to_user(&self, user_id: Uuid, event: TeamEvent) {
        let dropped = {
            let subscribers = self.subscribers.read().await;
            match subscribers.get(&user_id) {
                Some(sub) => Self::try_deliver(user_id, sub, &event),
                None => None,
            }
        };
        self.drop_subscribers(dropped.into_iter().collect()).await;
    }

    /// Publish to every connected member of a team except `exclude_user`,
    /// non-blocking
    pub async fn publish_to_team_except(
        &self,
        team_id: Uuid,
        exclude_user: Uuid,
        event: TeamEvent,
    ) {
        let dropped: Vec<Uuid> = {
            let subscribers = self.subscribers.read().await;
            subscribers
                .iter()
                .filter(|(user_id, sub)| sub.team_id == team_id && **user_id != exclude_user)
                .filter_map(|(user_id, sub)| Self::try_deliver(*user_id, sub, &event))
                .collect()
        };
        self.drop_subscribers(dropped).await;
    }

    /// Returns the user id when the subscriber must be deregistered
    fn try_deliver(user_id: Uuid, sub: &Subscriber, event: &TeamEvent) -> Option<Uuid> {
        match sub.tx.try_send(event.clone()) {
            Ok(()) => None,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(user_id = %user_id, "Event channel full, dropping subscriber");
                Some(user_id)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Some(user_id),
        }
    }

    async fn drop_subscribers(&self, user_ids: Vec<Uuid>) {
        if user_ids.is_empty() {
            return;
        }
        let mut subscribers = self.subscribers.write().await;
        for user_id in user_ids {
            subscribers.remove(&user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctf_platform_models::EventKind;

    #[tokio::test]
    async fn team_publish_excludes_initiator() {
        let hub = EventHub::new(8);
        let team = Uuid::new_v4();
        let starter = Uuid::new_v4();
        let teammate = Uuid::new_v4();

        let mut starter_rx = hub.subscribe(starter, team).await;
        let mut teammate_rx = hub.subscribe(teammate, team).await;

        let event = TeamEvent::new(EventKind::InstanceStarted, team, Uuid::new_v4());
        hub.publish_to_team_except(team, starter, event).await;

        let received = teammate_rx.try_recv().unwrap();
        assert_eq!(received.kind, EventKind::InstanceStarted);
        assert!(starter_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_channel_drops_subscriber_without_blocking() {
        let hub = EventHub::new(1);
        let team = Uuid::new_v4();
        let user = Uuid::new_v4();

        let _rx = hub.subscribe(user, team).await;

        let challenge = Uuid::new_v4();
        hub.publish_to_user(user, TeamEvent::new(EventKind::InstanceStarted, team, challenge))
            .await;
        // Second publish overflows the capacity-1 channel; the subscriber is
        // dropped rather than the publisher blocking
        hub.publish_to_user(user, TeamEvent::new(EventKind::InstanceStopped, team, challenge))
            .await;

        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn other_teams_do_not_receive() {
        let hub = EventHub::new(8);
        let team_a = Uuid::new_v4();
        let team_b = Uuid::new_v4();
        let member_b = Uuid::new_v4();

        let mut rx = hub.subscribe(member_b, team_b).await;

        hub.publish_to_team_except(
            team_a,
            Uuid::new_v4(),
            TeamEvent::new(EventKind::ChallengeSolved, team_a, Uuid::new_v4()),
        )
        .await;

        assert!(rx.try_recv().is_err());
    }
}
