use std::time::Duration;

pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 1000;

/// Self-imposed throttle applied after every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacingPolicy {
    #[default]
    Disabled,
    FixedDelay(Duration),
}

impl PacingPolicy {
    pub fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            PacingPolicy::Disabled
        } else {
            PacingPolicy::FixedDelay(Duration::from_millis(millis))
        }
    }

    pub fn delay(&self) -> Duration {
        match self {
            PacingPolicy::Disabled => Duration::ZERO,
            PacingPolicy::FixedDelay(delay) => *delay,
        }
    }

    /// Lower bound on the wall time pacing adds to a run of `rows` rows.
    /// Saturates at `Duration::MAX`.
    pub fn total_delay(&self, rows: usize) -> Duration {
        let rows = u32::try_from(rows).unwrap_or(u32::MAX);
        self.delay().saturating_mul(rows)
    }

    pub async fn pause(&self) {
        if let PacingPolicy::FixedDelay(delay) = self {
            tokio::time::sleep(*delay).await;
        }
    }
}
