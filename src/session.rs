use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::config::ProbeConfig;
use crate::dns_cache::Resolver;
use crate::error::Result;
use crate::probe::{ProbeAttempt, Summary, summarize};
use crate::probe_executor::ProbeExecutor;
use crate::target::Target;

type AttemptLog = Arc<RwLock<Vec<ProbeAttempt>>>;

/// A running (or finished) series of attempts against one target.
///
/// The background task is the only writer of the attempt list; any number of
/// readers may take snapshots while it runs. Dropping the handle stops the task.
pub struct ProbeSession {
    target: Target,
    config: ProbeConfig,
    attempts: AttemptLog,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    updates: Option<mpsc::UnboundedReceiver<ProbeAttempt>>,
}

impl ProbeSession {
    /// Validates the target and configuration, then starts probing on the
    /// current tokio runtime. Names are not resolved here.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start(target: Target, config: ProbeConfig) -> Result<Self> {
        config.validate()?;
        target.check_family(config.family)?;

        let attempts: AttemptLog = Arc::default();
        let (stop_tx, stop_rx) = watch::channel(false);
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        debug!("starting session against {target} with {config:?}");
        let task = tokio::spawn(run_loop(
            target.clone(),
            config.clone(),
            Arc::clone(&attempts),
            updates_tx,
            stop_rx,
        ));

        Ok(Self {
            target,
            config,
            attempts,
            stop_tx,
            task: Some(task),
            updates: Some(updates_rx),
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Live feed of recorded attempts, in sequence order. Can be taken once.
    pub fn take_updates(&mut self) -> Option<mpsc::UnboundedReceiver<ProbeAttempt>> {
        self.updates.take()
    }

    /// Snapshot of the attempts recorded so far.
    pub fn attempts(&self) -> Vec<ProbeAttempt> {
        self.attempts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn summary(&self) -> Summary {
        summarize(&self.attempts.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Signals the loop to stop without waiting for it. Safe to call any number of times.
    pub fn request_stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Stops the loop and waits for it to exit. An in-flight attempt is
    /// abandoned and not recorded. A no-op once the session has finished.
    pub async fn stop(&mut self) {
        self.request_stop();
        self.join().await;
    }

    /// Waits for the session to finish on its own.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("probe task for {} ended abnormally: {e}", self.target);
            }
        }
    }
}

impl Drop for ProbeSession {
    fn drop(&mut self) {
        self.request_stop();
    }
}

async fn run_loop(
    target: Target,
    config: ProbeConfig,
    attempts: AttemptLog,
    updates: mpsc::UnboundedSender<ProbeAttempt>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut resolver = Resolver::new(config.dns_ttl, config.family);
    let limit = config.effective_timeout();
    let mut seq = 0u64;

    loop {
        if *stop_rx.borrow() || config.count.is_some_and(|n| seq >= n) {
            break;
        }

        let started = Instant::now();
        let attempt = tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            attempt = ProbeExecutor::run_attempt(seq + 1, &target, &mut resolver, limit) => attempt,
        };
        seq = attempt.seq;

        attempts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(attempt.clone());
        // The front end may have dropped its receiver; recording continues regardless
        let _ = updates.send(attempt);

        if config.count.is_some_and(|n| seq >= n) {
            break;
        }

        // Start-to-start cadence; a deadline already passed fires immediately.
        // An interval too large to represent as a deadline waits for stop only.
        let next = started.checked_add(config.interval);
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = async {
                match next {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            } => {}
        }
    }

    debug!("session against {target} finished after {seq} attempts");
}
