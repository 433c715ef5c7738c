//! State owned by one monitoring session

use tokio::time::Instant;

use crate::shared::types::PoolSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Idle,
    Monitoring,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct PollState {
    phase: MonitorPhase,
    last_snapshot: Option<PoolSnapshot>,
    start_time: Option<Instant>,
    deadline: Option<Instant>,
    session: u64,
}

impl Default for PollState {
    fn default() -> Self {
        Self::new()
    }
}

impl PollState {
    pub fn new() -> Self {
        Self {
            phase: MonitorPhase::Idle,
            last_snapshot: None,
            start_time: None,
            deadline: None,
            session: 0,
        }
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == MonitorPhase::Monitoring
    }

    pub fn last_snapshot(&self) -> Option<&PoolSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Enter `Monitoring` with a fresh reference snapshot and return the id
    /// of the new session.
    pub fn begin(&mut self, snapshot: Option<PoolSnapshot>, now: Instant, deadline: Instant) -> u64 {
        self.phase = MonitorPhase::Monitoring;
        self.last_snapshot = snapshot;
        self.start_time = Some(now);
        self.deadline = Some(deadline);
        self.session += 1;
        self.session
    }

    /// True while `session` is the one currently monitoring
    pub fn is_active(&self, session: u64) -> bool {
        self.is_running() && self.session == session
    }

    /// A missing reference snapshot counts as different from anything read.
    pub fn has_changed(&self, current: &PoolSnapshot) -> bool {
        self.last_snapshot.as_ref() != Some(current)
    }

    pub fn record(&mut self, snapshot: PoolSnapshot) {
        self.last_snapshot = Some(snapshot);
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.map_or(false, |deadline| now >= deadline)
    }

    /// Stop `session`. A session that was already replaced is left alone.
    pub fn finish(&mut self, session: u64) -> bool {
        if !self.is_active(session) {
            return false;
        }
        self.phase = MonitorPhase::Stopped;
        self.last_snapshot = None;
        self.deadline = None;
        true
    }
}
