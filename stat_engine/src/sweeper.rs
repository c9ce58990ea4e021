//! TimedModifierSweeper - fixed-interval expiry of temporary modifiers

/// Default sweep interval in seconds. Coarse on purpose: one shared poll
/// bounds the bookkeeping cost regardless of how many temporary modifiers
/// exist, and expiry drift below the interval is gameplay-invisible.
pub const DEFAULT_POLL_INTERVAL: f64 = 0.25;

/// One tracked temporary modifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepEntry {
    /// Owning entity (collection key in the session).
    pub entity: String,
    /// Canonical stat id the modifier landed on.
    pub stat_id: String,
    pub modifier_id: String,
    /// Sweeper clock time at which the modifier expires.
    pub expires_at: f64,
}

/// Cross-collection scheduler for timed modifiers.
///
/// Driven by the same tick loop as everything else - `poll` is called with
/// a frame delta and only performs a sweep once enough time has accumulated.
/// The sweeper never touches collections itself; it reports what expired
/// and the session applies the removals, keeping ownership simple.
///
/// Construct one per session; there is deliberately no global instance, so
/// tests can run isolated sweepers side by side.
#[derive(Debug)]
pub struct TimedModifierSweeper {
    clock: f64,
    poll_interval: f64,
    since_last_poll: f64,
    entries: Vec<SweepEntry>,
}

impl Default for TimedModifierSweeper {
    fn default() -> Self {
        Self::new()
    }
}

impl TimedModifierSweeper {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: f64) -> Self {
        TimedModifierSweeper {
            clock: 0.0,
            poll_interval: poll_interval.max(0.0),
            since_last_poll: 0.0,
            entries: Vec::new(),
        }
    }

    /// Current sweeper clock in seconds.
    pub fn now(&self) -> f64 {
        self.clock
    }

    /// Track a temporary modifier. Idempotent: re-registering the same
    /// (entity, modifier id) pair refreshes the deadline instead of adding a
    /// duplicate. Permanent durations (<= 0) are ignored.
    pub fn register(
        &mut self,
        entity: impl Into<String>,
        stat_id: impl Into<String>,
        modifier_id: impl Into<String>,
        duration: f64,
    ) {
        if duration <= 0.0 {
            return;
        }
        let entity = entity.into();
        let modifier_id = modifier_id.into();
        self.entries
            .retain(|e| !(e.entity == entity && e.modifier_id == modifier_id));
        self.entries.push(SweepEntry {
            entity,
            stat_id: stat_id.into(),
            modifier_id,
            expires_at: self.clock + duration,
        });
    }

    /// Stop tracking one modifier. Safe to call for ids that were never
    /// registered or were already swept.
    pub fn deregister(&mut self, entity: &str, modifier_id: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.entity == entity && e.modifier_id == modifier_id));
        self.entries.len() != before
    }

    /// Bulk-drop every entry for an entity, e.g. when its collection is
    /// destroyed. Returns the number of entries dropped.
    pub fn remove_entity(&mut self, entity: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.entity != entity);
        before - self.entries.len()
    }

    /// Number of currently tracked modifiers.
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[SweepEntry] {
        &self.entries
    }

    /// Advance the clock by `delta` seconds and, at most once per poll
    /// interval, drain and return the entries whose deadline has passed.
    /// Between polls this returns an empty vec without scanning.
    pub fn poll(&mut self, delta: f64) -> Vec<SweepEntry> {
        self.clock += delta;
        self.since_last_poll += delta;
        if self.since_last_poll < self.poll_interval {
            return Vec::new();
        }
        self.since_last_poll = 0.0;

        let clock = self.clock;
        let (expired, live): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|e| e.expires_at <= clock);
        self.entries = live;
        expired
    }
}
