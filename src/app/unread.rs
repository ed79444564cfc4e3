use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::app::error::ServiceResult;
use crate::infra::store::{MessageFilter, Stores};

/// Counts approved, unread messages addressed to a user.
#[derive(Clone)]
pub struct UnreadCounter {
    stores: Stores,
}

impl UnreadCounter {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn count_unread(&self, user_id: Uuid) -> ServiceResult<i64> {
        Ok(self
            .stores
            .messages
            .count(&MessageFilter::unread_for(user_id))
            .await?)
    }

    pub async fn count_unread_in_match(&self, user_id: Uuid, match_id: Uuid) -> ServiceResult<i64> {
        Ok(self
            .stores
            .messages
            .count(&MessageFilter::unread_for(user_id).in_match(match_id))
            .await?)
    }
}

/// Background poll of a user's unread count.
///
/// The latest count is published on a `watch` channel. The task stops when
/// the badge is stopped or dropped.
pub struct UnreadBadge {
    receiver: watch::Receiver<i64>,
    task: JoinHandle<()>,
}

impl UnreadBadge {
    pub fn spawn(counter: UnreadCounter, user_id: Uuid, every: Duration) -> Self {
        let (sender, receiver) = watch::channel(0);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match counter.count_unread(user_id).await {
                    Ok(count) => {
                        sender.send_if_modified(|current| {
                            if *current == count {
                                false
                            } else {
                                *current = count;
                                true
                            }
                        });
                    }
                    Err(err) => {
                        tracing::warn!(user_id = %user_id, error = %err, "unread poll failed");
                    }
                }
                if sender.is_closed() {
                    break;
                }
            }
        });

        Self { receiver, task }
    }

    pub fn current(&self) -> i64 {
        *self.receiver.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.receiver.clone()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for UnreadBadge {
    fn drop(&mut self) {
        self.task.abort();
    }
}
