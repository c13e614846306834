use arena_shared::{
    DEFAULT_ASSIST_THRESHOLD, DEFAULT_BASE_MAX_HEALTH, DEFAULT_PLAYER_MAX_HEALTH,
    DEFAULT_REPLICATION_SMOOTHING, DEFAULT_RESPAWN_DELAY_SECS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Game-rule parameters for one session.
///
/// Every process should run with the same values; the host's copy is the
/// one that decides stats and eliminations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Share of the victim's max health needed for an assist.
    pub assist_threshold: f32,
    pub player_max_health: f32,
    pub base_max_health: f32,
    pub respawn_delay: Duration,
    /// Lerp factor applied to remote ship positions per received sample.
    pub replication_smoothing: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            assist_threshold: DEFAULT_ASSIST_THRESHOLD,
            player_max_health: DEFAULT_PLAYER_MAX_HEALTH,
            base_max_health: DEFAULT_BASE_MAX_HEALTH,
            respawn_delay: Duration::from_secs_f32(DEFAULT_RESPAWN_DELAY_SECS),
            replication_smoothing: DEFAULT_REPLICATION_SMOOTHING,
        }
    }
}

impl SessionConfig {
    /// Clamps values into ranges the rules can work with.
    pub fn sanitized(mut self) -> Self {
        if !self.assist_threshold.is_finite() {
            self.assist_threshold = DEFAULT_ASSIST_THRESHOLD;
        }
        self.assist_threshold = self.assist_threshold.clamp(0.0, 1.0);
        if !self.player_max_health.is_finite() || self.player_max_health <= 0.0 {
            self.player_max_health = DEFAULT_PLAYER_MAX_HEALTH;
        }
        if !self.base_max_health.is_finite() || self.base_max_health <= 0.0 {
            self.base_max_health = DEFAULT_BASE_MAX_HEALTH;
        }
        if !self.replication_smoothing.is_finite() {
            self.replication_smoothing = DEFAULT_REPLICATION_SMOOTHING;
        }
        self.replication_smoothing = self.replication_smoothing.clamp(0.0, 1.0);
        self
    }
}
