//! Change-triggered scheduler
//!
//! One session at a time: a periodic tick re-reads the pool snapshot, and when
//! it differs from the last one observed, the optimizer runs on fresh balances
//! and the result is handed to the action as a detached task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::poll_state::{MonitorPhase, PollState};
use super::PoolDataSource;
use crate::domain::allocation::Optimizer;
use crate::domain::execution::AllocationAction;
use crate::shared::errors::MonitorError;
use crate::shared::types::{AllocationResult, PoolSnapshot, RiskProfile};
use crate::shared::utils::format_amount;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub risk_profile: RiskProfile,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            risk_profile: RiskProfile::Stable,
        }
    }
}

/// Counters for one finished session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub ticks: u64,
    pub triggers: u64,
    pub skipped_in_flight: u64,
    pub read_failures: u64,
    pub optimizer_failures: u64,
    pub actions_dispatched: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorStatus {
    pub phase: MonitorPhase,
    pub elapsed: Option<Duration>,
    pub remaining: Option<Duration>,
    pub action_in_flight: bool,
}

/// Handle to a running session
#[derive(Debug)]
pub struct MonitorSession {
    handle: JoinHandle<MonitorStats>,
}

impl MonitorSession {
    /// Wait for the session to reach its deadline or be stopped
    pub async fn wait(self) -> MonitorStats {
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                error!("⚠️ Monitoring task failed: {}", e);
                MonitorStats::default()
            }
        }
    }
}

struct Shared {
    config: MonitorConfig,
    optimizer: Arc<Optimizer>,
    source: Arc<dyn PoolDataSource>,
    action: Arc<dyn AllocationAction>,
    state: Mutex<PollState>,
    action_in_flight: Arc<AtomicBool>,
}

/// Owns the poll state and the tick timer
pub struct Monitor {
    shared: Arc<Shared>,
    cancel: std::sync::Mutex<Option<(CancellationToken, u64)>>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        optimizer: Arc<Optimizer>,
        source: Arc<dyn PoolDataSource>,
        action: Arc<dyn AllocationAction>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                optimizer,
                source,
                action,
                state: Mutex::new(PollState::new()),
                action_in_flight: Arc::new(AtomicBool::new(false)),
            }),
            cancel: std::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    /// Start a session lasting `total_monitoring_seconds`.
    ///
    /// Rejected while another session is running; the running session's
    /// reference snapshot is left untouched.
    pub async fn start(&self, total_monitoring_seconds: u64) -> Result<MonitorSession, MonitorError> {
        if total_monitoring_seconds == 0 {
            return Err(MonitorError::InvalidParameter(
                "monitoring time must be a positive number of seconds".to_string(),
            ));
        }

        let now = Instant::now();
        let deadline = now
            .checked_add(Duration::from_secs(total_monitoring_seconds))
            .ok_or_else(|| {
                MonitorError::InvalidParameter(format!("{} seconds is out of range", total_monitoring_seconds))
            })?;
        let first_tick = now.checked_add(self.shared.config.interval).ok_or_else(|| {
            MonitorError::InvalidParameter("poll interval is out of range".to_string())
        })?;

        let mut state = self.shared.state.lock().await;
        if state.is_running() {
            return Err(MonitorError::AlreadyRunning);
        }

        let initial = match self.shared.source.read_pool_snapshot().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("⚠️ Initial pool snapshot unavailable, first readable state will trigger: {}", e);
                None
            }
        };

        let session = state.begin(initial, now, deadline);
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.cancel.lock() {
            *slot = Some((token.clone(), session));
        }
        drop(state);

        info!(
            duration_secs = total_monitoring_seconds,
            interval_secs = self.shared.config.interval.as_secs_f64(),
            profile = %self.shared.config.risk_profile,
            "🚀 Monitoring started, initial data stored"
        );

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(run_session(shared, session, first_tick, deadline, token));
        Ok(MonitorSession { handle })
    }

    /// Cancel the running session. Returns false when nothing was running.
    /// The monitor is `Stopped` once this returns; actions already
    /// dispatched keep going.
    pub async fn stop(&self) -> bool {
        let slot = self.cancel.lock().ok().and_then(|mut slot| slot.take());
        let (token, session) = match slot {
            Some((token, session)) if !token.is_cancelled() => (token, session),
            _ => return false,
        };

        token.cancel();
        // The session task may have finished the state already.
        self.shared.state.lock().await.finish(session);
        info!("🛑 Monitoring stopped on request");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.shared.state.lock().await.is_running()
    }

    pub async fn last_snapshot(&self) -> Option<PoolSnapshot> {
        self.shared.state.lock().await.last_snapshot().cloned()
    }

    pub async fn status(&self) -> MonitorStatus {
        let state = self.shared.state.lock().await;
        let now = Instant::now();
        MonitorStatus {
            phase: state.phase(),
            elapsed: state.start_time().map(|t| now.saturating_duration_since(t)),
            remaining: state.deadline().map(|d| d.saturating_duration_since(now)),
            action_in_flight: self.shared.action_in_flight.load(Ordering::SeqCst),
        }
    }
}

async fn run_session(
    shared: Arc<Shared>,
    session: u64,
    first_tick: Instant,
    deadline: Instant,
    token: CancellationToken,
) -> MonitorStats {
    let mut interval = time::interval_at(first_tick, shared.config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let expiry = time::sleep_until(deadline);
    tokio::pin!(expiry);
    let mut stats = MonitorStats::default();

    // A tick due exactly at the deadline still runs before the session ends.
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                shared.state.lock().await.finish(session);
                info!(ticks = stats.ticks, triggers = stats.triggers, "🛑 Monitoring cancelled");
                break;
            }
            _ = interval.tick() => {
                let mut state = shared.state.lock().await;
                if token.is_cancelled() || !state.is_active(session) {
                    break;
                }
                tick(&shared, &mut state, &mut stats).await;
                if state.is_expired(Instant::now()) {
                    state.finish(session);
                    token.cancel();
                    info!(ticks = stats.ticks, triggers = stats.triggers, "✅ Monitoring stopped");
                    break;
                }
            }
            _ = &mut expiry => {
                shared.state.lock().await.finish(session);
                token.cancel();
                info!(ticks = stats.ticks, triggers = stats.triggers, "✅ Monitoring stopped");
                break;
            }
        }
    }

    stats
}

async fn tick(shared: &Shared, state: &mut PollState, stats: &mut MonitorStats) {
    stats.ticks += 1;

    let current = match shared.source.read_pool_snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            stats.read_failures += 1;
            warn!(tick = stats.ticks, "⚠️ Pool snapshot read failed, tick skipped: {}", e);
            return;
        }
    };

    if !state.has_changed(&current) {
        debug!(tick = stats.ticks, "Pool state unchanged");
        return;
    }

    if shared.action_in_flight.load(Ordering::SeqCst) {
        stats.skipped_in_flight += 1;
        info!(tick = stats.ticks, "⏳ Pool state changed but a reallocation is still in flight, deferring");
        return;
    }

    stats.triggers += 1;
    info!(tick = stats.ticks, "🔄 Pool state changed, re-optimizing");

    let balances = match shared.source.read_balances().await {
        Ok(balances) => balances,
        Err(e) => {
            stats.read_failures += 1;
            warn!(tick = stats.ticks, "⚠️ Balance read failed, keeping previous snapshot: {}", e);
            return;
        }
    };

    match shared.optimizer.optimize(&balances, shared.config.risk_profile) {
        Ok(result) => {
            log_change(&result);
            dispatch(shared, result);
            stats.actions_dispatched += 1;
        }
        Err(e) => {
            stats.optimizer_failures += 1;
            error!(tick = stats.ticks, "❌ Optimization failed: {}", e);
        }
    }

    state.record(current);
}

fn log_change(result: &AllocationResult) {
    for (pool, delta) in &result.change {
        info!(pool = %pool, delta = %format_amount(*delta), "   change");
    }
    info!(
        total_optimized_yield = result.total_optimized_yield,
        "📊 Optimized allocation ready"
    );
}

/// Clears the in-flight flag when the action task ends, unwinding included
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn dispatch(shared: &Shared, result: AllocationResult) {
    let action = Arc::clone(&shared.action);
    shared.action_in_flight.store(true, Ordering::SeqCst);
    let guard = InFlightGuard(Arc::clone(&shared.action_in_flight));

    tokio::spawn(async move {
        let _guard = guard;
        match action.execute(&result).await {
            Ok(receipt) => info!(
                plan_id = %receipt.plan_id,
                moves = receipt.moves,
                submitted = receipt.submitted,
                reference = ?receipt.reference,
                "✅ Reallocation action completed"
            ),
            Err(e) => error!("❌ Reallocation action failed: {}", e),
        }
    });
}
