// crates/stats/src/config.rs
//! Analytics configuration types.

use serde::Deserialize;

/// Tuning knobs for the analytics engine.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Service time zone as a fixed offset in minutes east of UTC.
    /// Calendar buckets (days, weekdays, streaks) are computed in this
    /// zone; offsets beyond the real-world +/-14h range are clamped.
    pub tz_offset_minutes: i32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            tz_offset_minutes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_to_utc() {
        assert_eq!(StatsConfig::default().tz_offset_minutes, 0);
    }

    #[test]
    fn parses_from_toml() {
        let config: StatsConfig = toml::from_str("tz_offset_minutes = -300").unwrap();
        assert_eq!(config.tz_offset_minutes, -300);
    }
}
