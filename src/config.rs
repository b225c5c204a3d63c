//! TOML-driven server configuration.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A synthetic ranking row used to pad the top-10 list when fewer than 10
/// real players have a positive win amount.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct FakeRankingRow {
    pub avatar: String,
    pub win_amount: f64,
    pub nickname: String,
}

/// Per-level house fee, charged to the winner only.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct LevelCost {
    pub level: i64,
    pub cost: f64,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct Config {
    /// The closed set of wager levels the server accepts.
    pub levels: Vec<i64>,
    /// Per-level house fee, charged to the round's winner.
    pub level_costs: Vec<LevelCost>,
    /// HTTP bind address, e.g. "0.0.0.0:8080".
    pub http_bind_addr: String,
    /// Seconds a Ready call may block before the session is disposed.
    pub operate_timeout_second: i64,
    /// Baseline seconds a lone human waits before a robot is injected.
    pub match_wait_second: i64,
    /// Uid used for every synthesized robot profile.
    pub robot_uid: i64,
    /// Facebook open id used for every synthesized robot profile.
    pub robot_fb_open_id: String,
    /// Seconds a spawned robot plays before logging out on its own.
    pub robot_lifetime_second: i64,
    /// Any uid above this value is treated as human.
    pub max_robot_uid: i64,
    /// 24 baseline online-number figures, one per hour of day.
    pub base_online_numbers: Vec<i64>,
    /// Round-robin avatar URLs assigned to robot competitors.
    pub robot_avatars: Vec<String>,
    /// Round-robin nicknames assigned to robot competitors.
    pub robot_nicknames: Vec<String>,
    /// Synthetic rows padding the ranking list out to 10 entries.
    pub fake_ranking: Vec<FakeRankingRow>,
    /// MongoDB connection string.
    pub mongo_uri: String,
    /// MongoDB database name.
    pub mongo_db: String,
    /// Outbound AccountService DescribeUser endpoint.
    pub endpoint_describe_user: String,
    /// Outbound AccountService Transfer endpoint.
    pub endpoint_transfer: String,
}

impl Config {
    /// Load and parse a TOML config file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let raw = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// A development fallback with the original four levels and sane
    /// defaults, for running locally or in tests without a TOML file.
    pub fn dev_default() -> Self {
        Self {
            levels: vec![1, 10, 100, 500],
            level_costs: vec![
                LevelCost { level: 1, cost: 0.05 },
                LevelCost { level: 10, cost: 0.5 },
                LevelCost { level: 100, cost: 5.0 },
                LevelCost { level: 500, cost: 25.0 },
            ],
            http_bind_addr: "0.0.0.0:8080".into(),
            operate_timeout_second: 15,
            match_wait_second: 20,
            robot_uid: 1999,
            robot_fb_open_id: "robot".into(),
            robot_lifetime_second: 600,
            max_robot_uid: 2000,
            base_online_numbers: vec![
                120, 100, 90, 80, 75, 80, 110, 180, 260, 320, 360, 400, 420, 430, 440, 420, 400, 430, 480, 520, 500,
                420, 320, 200,
            ],
            robot_avatars: vec!["https://fingerplay.example/avatar/robot1.png".into()],
            robot_nicknames: vec!["Lucky".into(), "Player".into(), "Guest".into()],
            fake_ranking: vec![],
            mongo_uri: "mongodb://127.0.0.1:27017".into(),
            mongo_db: "fingerplay".into(),
            endpoint_describe_user: "http://127.0.0.1:9000/account/describe_user".into(),
            endpoint_transfer: "http://127.0.0.1:9000/account/transfer".into(),
        }
    }

    pub fn cost_for_level(&self, level: i64) -> f64 {
        self.level_costs
            .iter()
            .find(|lc| lc.level == level)
            .map(|lc| lc.cost)
            .unwrap_or(0.0)
    }

    pub fn is_known_level(&self, level: i64) -> bool {
        self.levels.contains(&level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_default_is_internally_consistent() {
        let config = Config::dev_default();
        assert_eq!(config.base_online_numbers.len(), 24);
        for level in &config.levels {
            assert!(config.cost_for_level(*level) > 0.0);
        }
    }

    #[test]
    fn toml_round_trips() {
        let config = Config::dev_default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.levels, config.levels);
        assert_eq!(parsed.http_bind_addr, config.http_bind_addr);
    }
}
