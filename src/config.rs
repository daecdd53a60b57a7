use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Search options for the exact oracles and the heuristics built on top of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Take the first full join as the only child whenever one exists.
    #[serde(default = "default_full_join")]
    pub full_join: bool,
    /// Drop children dominated by a sibling before they are queued.
    #[serde(default)]
    pub dominance: bool,
    /// Wall-clock budget for a single oracle call.
    #[serde(default)]
    pub timeout: Option<Duration>,
    /// Restrict wedge selections to those that keep the generation count minimal.
    #[serde(default)]
    pub strict_mingen: bool,
}

fn default_full_join() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            full_join: true,
            dominance: false,
            timeout: None,
            strict_mingen: false,
        }
    }
}

impl Config {
    pub fn new(full_join: bool, dominance: bool) -> Self {
        Self {
            full_join,
            dominance,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_strict_mingen(mut self, strict_mingen: bool) -> Self {
        self.strict_mingen = strict_mingen;
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_defaults_test() {
        let config = Config::from_json_str("{}").expect("empty config should parse");
        assert_eq!(Config::default(), config);

        let config = Config::from_json_str(
            r#"{"full_join": false, "dominance": true, "timeout": {"secs": 3, "nanos": 0}}"#,
        )
        .expect("config should parse");
        assert_eq!(
            Config::new(false, true).with_timeout(Duration::from_secs(3)),
            config
        );
    }
}
