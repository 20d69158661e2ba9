use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GateStatus {
    Idle,
    InFlight,
}

impl Default for GateStatus {
    fn default() -> Self {
        GateStatus::Idle
    }
}

/// Verdict for one refresh attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GateDecision {
    Allowed,
    /// Still inside the startup quiet period.
    QuietPeriod { remaining_ms: u64 },
    InFlight,
    Cooldown { remaining_ms: u64 },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }
}

/// Decides whether an oracle call may start now. Holds the single-flight flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedRefreshGate {
    pub status: GateStatus,
    pub last_call_ms: Option<u64>,
    pub min_interval_ms: u64,
    pub started_at_ms: u64,
    pub initialization_delay_ms: u64,
}

impl RateLimitedRefreshGate {
    pub fn new(started_at_ms: u64, min_interval_ms: u64, initialization_delay_ms: u64) -> Self {
        Self {
            status: GateStatus::Idle,
            last_call_ms: None,
            min_interval_ms,
            started_at_ms,
            initialization_delay_ms,
        }
    }

    /// A forced attempt skips the interval check only.
    pub fn decide(&self, now_ms: u64, forced: bool) -> GateDecision {
        let quiet_until = self.started_at_ms.saturating_add(self.initialization_delay_ms);
        if now_ms < quiet_until {
            return GateDecision::QuietPeriod {
                remaining_ms: quiet_until - now_ms,
            };
        }

        if self.status == GateStatus::InFlight {
            return GateDecision::InFlight;
        }

        if !forced {
            if let Some(last_call_ms) = self.last_call_ms {
                let elapsed = now_ms.saturating_sub(last_call_ms);
                if elapsed < self.min_interval_ms {
                    return GateDecision::Cooldown {
                        remaining_ms: self.min_interval_ms - elapsed,
                    };
                }
            }
        }

        GateDecision::Allowed
    }

    pub fn may_refresh(&self, now_ms: u64) -> bool {
        self.decide(now_ms, false).is_allowed()
    }

    pub fn may_force(&self, now_ms: u64) -> bool {
        self.decide(now_ms, true).is_allowed()
    }

    pub fn begin_call(&mut self, now_ms: u64) {
        self.status = GateStatus::InFlight;
        self.last_call_ms = Some(now_ms);
    }

    /// Back to idle whatever the outcome of the call.
    pub fn end_call(&mut self) {
        self.status = GateStatus::Idle;
    }

    /// `decide` and `begin_call` in one step; the caller holds the lock around it.
    pub fn try_begin(&mut self, now_ms: u64, forced: bool) -> GateDecision {
        let decision = self.decide(now_ms, forced);
        if decision.is_allowed() {
            self.begin_call(now_ms);
        }
        decision
    }

    pub fn is_in_flight(&self) -> bool {
        self.status == GateStatus::InFlight
    }
}
