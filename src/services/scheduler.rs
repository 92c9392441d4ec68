use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Joining,
    Night,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

struct ActiveWait {
    generation: u64,
    phase: Phase,
    token: CancellationToken,
    restart: Arc<Notify>,
}

/// A registered wait that has not been awaited yet.
pub struct ArmedWait {
    generation: u64,
    phase: Phase,
    duration: Duration,
    token: CancellationToken,
    restart: Arc<Notify>,
}

/// The single timed wait of a session. Starting a new wait supersedes the
/// previous one.
#[derive(Default)]
pub struct PhaseTimer {
    active: Mutex<Option<ActiveWait>>,
    generation: Mutex<u64>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspends until `duration` elapses or the wait is cancelled. A restart
    /// starts the full duration over.
    pub async fn wait(&self, phase: Phase, duration: Duration) -> WaitOutcome {
        let armed = self.arm(phase, duration).await;
        self.wait_armed(armed).await
    }

    /// Registers a wait without suspending, so commands can cancel or
    /// restart it before anyone awaits it.
    pub async fn arm(&self, phase: Phase, duration: Duration) -> ArmedWait {
        let token = CancellationToken::new();
        let restart = Arc::new(Notify::new());
        let generation = {
            let mut counter = self.generation.lock().await;
            *counter += 1;
            *counter
        };
        let mut active = self.active.lock().await;
        let previous = active.replace(ActiveWait {
            generation,
            phase,
            token: token.clone(),
            restart: restart.clone(),
        });
        if let Some(previous) = previous {
            log::debug!("{:?} wait superseded by {:?}", previous.phase, phase);
            previous.token.cancel();
        }
        ArmedWait {
            generation,
            phase,
            duration,
            token,
            restart,
        }
    }

    pub async fn wait_armed(&self, armed: ArmedWait) -> WaitOutcome {
        let ArmedWait {
            generation,
            phase,
            duration,
            token,
            restart,
        } = armed;
        let outcome = loop {
            tokio::select! {
                _ = token.cancelled() => break WaitOutcome::Cancelled,
                _ = restart.notified() => {
                    log::debug!("{:?} wait restarted", phase);
                    continue;
                }
                _ = tokio::time::sleep(duration) => break WaitOutcome::Elapsed,
            }
        };

        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|a| a.generation == generation) {
            *active = None;
        }
        outcome
    }

    /// Releases the wait for `phase` if it is the active one.
    pub async fn cancel(&self, phase: Phase) -> bool {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(wait) if wait.phase == phase => {
                wait.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Releases whatever wait is active.
    pub async fn cancel_active(&self) -> Option<Phase> {
        let active = self.active.lock().await;
        active.as_ref().map(|wait| {
            wait.token.cancel();
            wait.phase
        })
    }

    pub async fn restart(&self, phase: Phase) -> bool {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(wait) if wait.phase == phase => {
                wait.restart.notify_one();
                true
            }
            _ => false,
        }
    }

    pub async fn active_phase(&self) -> Option<Phase> {
        self.active.lock().await.as_ref().map(|wait| wait.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_wait_elapses() {
        let timer = PhaseTimer::new();
        let started = Instant::now();
        let outcome = timer.wait(Phase::Night, Duration::from_secs(30)).await;
        assert_eq!(outcome, WaitOutcome::Elapsed);
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert_eq!(timer.active_phase().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_releases_immediately() {
        let timer = Arc::new(PhaseTimer::new());
        let waiter = {
            let timer = timer.clone();
            tokio::spawn(async move { timer.wait(Phase::Day, Duration::from_secs(600)).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(timer.active_phase().await, Some(Phase::Day));

        // wrong phase does nothing
        assert!(!timer.cancel(Phase::Night).await);
        assert!(timer.cancel(Phase::Day).await);
        assert_eq!(waiter.await.unwrap(), WaitOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_starts_over() {
        let timer = Arc::new(PhaseTimer::new());
        let started = Instant::now();
        let waiter = {
            let timer = timer.clone();
            tokio::spawn(async move { timer.wait(Phase::Joining, Duration::from_secs(60)).await })
        };
        tokio::task::yield_now().await;
        advance(Duration::from_secs(40)).await;
        assert!(timer.restart(Phase::Joining).await);

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, WaitOutcome::Elapsed);
        assert!(started.elapsed() >= Duration::from_secs(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_wait_supersedes_old() {
        let timer = Arc::new(PhaseTimer::new());
        let first = {
            let timer = timer.clone();
            tokio::spawn(async move { timer.wait(Phase::Joining, Duration::from_secs(60)).await })
        };
        tokio::task::yield_now().await;
        let second = {
            let timer = timer.clone();
            tokio::spawn(async move { timer.wait(Phase::Night, Duration::from_secs(5)).await })
        };
        assert_eq!(first.await.unwrap(), WaitOutcome::Cancelled);
        assert_eq!(second.await.unwrap(), WaitOutcome::Elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_armed_wait_can_be_cancelled_before_it_is_awaited() {
        let timer = PhaseTimer::new();
        let armed = timer.arm(Phase::Joining, Duration::from_secs(60)).await;
        assert_eq!(timer.active_phase().await, Some(Phase::Joining));
        assert_eq!(timer.cancel_active().await, Some(Phase::Joining));

        let started = Instant::now();
        assert_eq!(timer.wait_armed(armed).await, WaitOutcome::Cancelled);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(timer.active_phase().await, None);
    }
}
