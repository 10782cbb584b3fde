//! Scheduling policy configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Scheduling policy knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Shortest bookable appointment
    #[serde(with = "humantime_serde")]
    pub min_duration: Duration,

    /// Longest bookable appointment
    #[serde(with = "humantime_serde")]
    pub max_duration: Duration,

    /// Suggested ranges start no earlier than now plus this lead time
    #[serde(with = "humantime_serde")]
    pub suggestion_lead: Duration,

    /// How long to wait for a provider's schedule lock
    #[serde(with = "humantime_serde")]
    pub lock_timeout: Duration,

    pub default_reminder_minutes: u32,

    /// Generated meeting links are `{meeting_base_url}/{uuid}`
    pub meeting_base_url: String,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            min_duration: Duration::from_secs(15 * 60),
            max_duration: Duration::from_secs(4 * 60 * 60),
            suggestion_lead: Duration::from_secs(20 * 60),
            lock_timeout: Duration::from_secs(5),
            default_reminder_minutes: 15,
            meeting_base_url: "https://meet.jit.si".to_string(),
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_duration.is_zero() {
            return Err("scheduling.min_duration must be greater than zero".into());
        }
        if self.max_duration < self.min_duration {
            return Err("scheduling.max_duration must not be below min_duration".into());
        }
        if self.lock_timeout.is_zero() {
            return Err("scheduling.lock_timeout must be greater than zero".into());
        }
        if self.meeting_base_url.trim().is_empty() {
            return Err("scheduling.meeting_base_url must not be empty".into());
        }
        Ok(())
    }

    pub(crate) fn meeting_link(&self, id: uuid::Uuid) -> String {
        format!("{}/{id}", self.meeting_base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SchedulingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_reminder_minutes, 15);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let config = SchedulingConfig {
            min_duration: Duration::from_secs(3600),
            max_duration: Duration::from_secs(600),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_humantime_fields() {
        let config: SchedulingConfig = serde_json::from_value(serde_json::json!({
            "min_duration": "30m",
            "lock_timeout": "250ms",
            "meeting_base_url": "https://meet.example/"
        }))
        .unwrap();
        assert_eq!(config.min_duration, Duration::from_secs(1800));
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.max_duration, Duration::from_secs(4 * 3600));

        let id = uuid::Uuid::nil();
        assert_eq!(
            config.meeting_link(id),
            format!("https://meet.example/{id}")
        );
    }
}
