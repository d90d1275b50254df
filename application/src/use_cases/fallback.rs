//! Fallback Scheduler
//!
//! One cancelable timer per conversation. Arming replaces the previous
//! timer; when a timer elapses a [`FallbackFire`] is sent on the channel
//! returned by [`FallbackScheduler::new`].

use chrono::{DateTime, Utc};
use polybot_domain::ConversationId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A timer that elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackFire {
    pub conversation: ConversationId,
    /// Start of the cycle that armed the timer. Any message at or after
    /// this time makes the fire stale.
    pub origin: DateTime<Utc>,
}

struct ArmedTimer {
    generation: u64,
    fire_at: DateTime<Utc>,
    token: CancellationToken,
}

type Timers = Arc<Mutex<HashMap<ConversationId, ArmedTimer>>>;

pub struct FallbackScheduler {
    timers: Timers,
    generation: AtomicU64,
    fire_tx: mpsc::UnboundedSender<FallbackFire>,
}

impl FallbackScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FallbackFire>) {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            timers: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            fire_tx,
        };
        (scheduler, fire_rx)
    }

    /// Arm (or re-arm) the timer of `conversation`. The last call wins.
    pub fn arm(&self, conversation: ConversationId, delay: Duration, origin: DateTime<Utc>) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        let fire_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());

        let previous = match self.timers.lock() {
            Ok(mut timers) => timers.insert(
                conversation,
                ArmedTimer {
                    generation,
                    fire_at,
                    token: token.clone(),
                },
            ),
            Err(_) => {
                warn!("Fallback timer table poisoned; not arming {}", conversation);
                return;
            }
        };
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        debug!("Fallback armed for {} in {:?}", conversation, delay);

        let timers = Arc::clone(&self.timers);
        let fire_tx = self.fire_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let current = match timers.lock() {
                        Ok(mut timers) => match timers.get(&conversation) {
                            Some(armed) if armed.generation == generation => {
                                timers.remove(&conversation).is_some()
                            }
                            _ => false,
                        },
                        Err(_) => false,
                    };
                    if current {
                        let _ = fire_tx.send(FallbackFire { conversation, origin });
                    }
                }
            }
        });
    }

    /// Cancel the timer of `conversation`. Returns `true` when one was armed.
    pub fn cancel(&self, conversation: ConversationId) -> bool {
        let removed = match self.timers.lock() {
            Ok(mut timers) => timers.remove(&conversation),
            Err(_) => None,
        };
        match removed {
            Some(armed) => {
                armed.token.cancel();
                debug!("Fallback canceled for {}", conversation);
                true
            }
            None => false,
        }
    }

    /// When the armed timer of `conversation` will fire.
    pub fn pending(&self, conversation: ConversationId) -> Option<DateTime<Utc>> {
        self.timers
            .lock()
            .ok()
            .and_then(|timers| timers.get(&conversation).map(|armed| armed.fire_at))
    }

    /// Cancel every armed timer.
    pub fn shutdown(&self) {
        if let Ok(mut timers) = self.timers.lock() {
            for (_, armed) in timers.drain() {
                armed.token.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: ConversationId = ConversationId::new(1);
    const TWO: ConversationId = ConversationId::new(2);

    #[tokio::test(start_paused = true)]
    async fn test_armed_timer_fires_once() {
        let (scheduler, mut fires) = FallbackScheduler::new();
        let origin = Utc::now();
        scheduler.arm(ONE, Duration::from_secs(30), origin);
        assert!(scheduler.pending(ONE).is_some());

        let fire = fires.recv().await.unwrap();
        assert_eq!(fire, FallbackFire { conversation: ONE, origin });
        assert!(scheduler.pending(ONE).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_fire() {
        let (scheduler, mut fires) = FallbackScheduler::new();
        scheduler.arm(ONE, Duration::from_secs(30), Utc::now());
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(scheduler.cancel(ONE));
        assert!(!scheduler.cancel(ONE));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(fires.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_timer() {
        let (scheduler, mut fires) = FallbackScheduler::new();
        let first = Utc::now();
        scheduler.arm(ONE, Duration::from_secs(10), first);
        let second = first + chrono::Duration::seconds(1);
        scheduler.arm(ONE, Duration::from_secs(300), second);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(fires.try_recv().is_err());

        let fire = fires.recv().await.unwrap();
        assert_eq!(fire.origin, second);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(fires.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_are_per_conversation() {
        let (scheduler, mut fires) = FallbackScheduler::new();
        scheduler.arm(ONE, Duration::from_secs(30), Utc::now());
        scheduler.arm(TWO, Duration::from_secs(30), Utc::now());
        scheduler.cancel(ONE);

        let fire = fires.recv().await.unwrap();
        assert_eq!(fire.conversation, TWO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_fires_immediately() {
        let (scheduler, mut fires) = FallbackScheduler::new();
        scheduler.arm(ONE, Duration::ZERO, Utc::now());
        assert_eq!(fires.recv().await.unwrap().conversation, ONE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_everything() {
        let (scheduler, mut fires) = FallbackScheduler::new();
        scheduler.arm(ONE, Duration::from_secs(5), Utc::now());
        scheduler.arm(TWO, Duration::from_secs(5), Utc::now());
        scheduler.shutdown();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(fires.try_recv().is_err());
    }
}
