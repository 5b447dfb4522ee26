//! Idle-session timeout.
//!
//! A debounced inactivity watch: user activity resets the deadline, and
//! crossing the deadline signs the session out exactly once. The deadline
//! arithmetic is a pure state machine (`IdleTimeout`); `IdleWatcher` runs
//! it cooperatively on the runtime. Shutting the watcher down guarantees
//! the expiry callback never fires afterwards.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

/// Pure deadline state machine.
#[derive(Debug, Clone, Copy)]
pub struct IdleTimeout {
    timeout: Duration,
    deadline: Instant,
}

impl IdleTimeout {
    #[must_use]
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            deadline: now + timeout,
        }
    }

    /// Record activity: push the deadline out by the full timeout.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = now + self.timeout;
    }

    #[must_use]
    pub fn expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

enum WatchEvent {
    Activity,
    Shutdown,
}

/// Handle to a running idle watch.
///
/// Dropping the handle (or calling `shutdown`) stops the watch; a pending
/// expiry can no longer fire once the shutdown event is observed.
pub struct IdleWatcher {
    events: mpsc::UnboundedSender<WatchEvent>,
}

impl IdleWatcher {
    /// Spawn the watch. `on_expire` runs at most once, on the runtime,
    /// when the deadline passes with no intervening activity.
    pub fn spawn<F>(timeout: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut idle = IdleTimeout::new(timeout, Instant::now());
            let mut on_expire = Some(on_expire);
            loop {
                tokio::select! {
                    event = rx.recv() => match event {
                        Some(WatchEvent::Activity) => idle.touch(Instant::now()),
                        // Closed channel means the handle was dropped.
                        Some(WatchEvent::Shutdown) | None => return,
                    },
                    () = tokio::time::sleep_until(idle.deadline()) => {
                        if let Some(on_expire) = on_expire.take() {
                            on_expire();
                        }
                        return;
                    }
                }
            }
        });
        Self { events: tx }
    }

    /// Record user activity, debouncing the expiry.
    pub fn touch(&self) {
        let _ = self.events.send(WatchEvent::Activity);
    }

    /// Stop the watch without firing the expiry.
    pub fn shutdown(&self) {
        let _ = self.events.send(WatchEvent::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn deadline_moves_with_touch() {
        let start = Instant::now();
        let mut idle = IdleTimeout::new(Duration::from_secs(900), start);
        assert!(!idle.expired(start));
        assert!(idle.expired(start + Duration::from_secs(900)));

        idle.touch(start + Duration::from_secs(600));
        assert!(!idle.expired(start + Duration::from_secs(900)));
        assert!(idle.expired(start + Duration::from_secs(1500)));
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_fires_once_after_timeout() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let _watcher = IdleWatcher::spawn(Duration::from_secs(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_debounces_the_expiry() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let watcher = IdleWatcher::spawn(Duration::from_secs(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..3 {
            tokio::time::sleep(Duration::from_secs(8)).await;
            watcher.touch();
            // Let the watch task observe the event before time advances.
            tokio::task::yield_now().await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_prevents_the_expiry() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let watcher = IdleWatcher::spawn(Duration::from_secs(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        watcher.shutdown();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_watch() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let watcher = IdleWatcher::spawn(Duration::from_secs(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        drop(watcher);
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
