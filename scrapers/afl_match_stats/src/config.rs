use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub api_base: String,
    pub owner: String,
    pub name: String,
    pub branch: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: "hermclane".to_string(),
            name: "AFL".to_string(),
            branch: "main".to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeasonConfig {
    pub year: i32,
    pub current_round: u32,
}

impl SeasonConfig {
    pub fn fixture_path(&self) -> String {
        format!("AFLFixtures{}.csv", self.year)
    }

    pub fn round_path(&self) -> String {
        format!("Round_{}", self.current_round)
    }

    pub fn player_slugs_path(&self) -> String {
        "Players/PlayerUrls.csv".to_string()
    }

    pub fn player_log_path(&self, slug: &str) -> String {
        format!("Players/{}/{}.csv", self.year, slug)
    }
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            year: 2023,
            current_round: 9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimits {
    pub requests_per_second: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapingConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; AflMatchStats/0.1)".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    pub repository: RepositoryConfig,
    pub season: SeasonConfig,
    pub rate_limits: RateLimits,
    pub scraping: ScrapingConfig,
    pub retry: RetryConfig,
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(api_base) = env::var("AFL_REPO_API_BASE") {
            config.repository.api_base = api_base;
        }
        if let Ok(owner) = env::var("AFL_REPO_OWNER") {
            config.repository.owner = owner;
        }
        if let Ok(name) = env::var("AFL_REPO_NAME") {
            config.repository.name = name;
        }
        if let Ok(branch) = env::var("AFL_REPO_BRANCH") {
            config.repository.branch = branch;
        }
        if let Ok(token) = env::var("GITHUB_TOKEN") {
            if !token.trim().is_empty() {
                config.repository.token = Some(token);
            }
        }
        if let Some(year) = parsed_var("AFL_SEASON") {
            config.season.year = year;
        }
        if let Some(round) = parsed_var("AFL_CURRENT_ROUND") {
            config.season.current_round = round;
        }
        if let Some(rps) = parsed_var("RATE_LIMIT_RPS") {
            config.rate_limits.requests_per_second = rps;
        }
        if let Ok(user_agent) = env::var("SCRAPER_USER_AGENT") {
            config.scraping.user_agent = user_agent;
        }
        if let Some(timeout) = parsed_var("SCRAPER_TIMEOUT_SECS") {
            config.scraping.request_timeout_secs = timeout;
        }
        if let Some(attempts) = parsed_var("FETCH_MAX_RETRIES") {
            config.retry.max_attempts = attempts;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "AFL_REPO_API_BASE",
        "AFL_REPO_OWNER",
        "AFL_REPO_NAME",
        "AFL_REPO_BRANCH",
        "GITHUB_TOKEN",
        "AFL_SEASON",
        "AFL_CURRENT_ROUND",
        "RATE_LIMIT_RPS",
        "SCRAPER_USER_AGENT",
        "SCRAPER_TIMEOUT_SECS",
        "FETCH_MAX_RETRIES",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_paths() {
        let season = SeasonConfig::default();
        assert_eq!(season.fixture_path(), "AFLFixtures2023.csv");
        assert_eq!(season.round_path(), "Round_9");
        assert_eq!(season.player_log_path("nick-daicos"), "Players/2023/nick-daicos.csv");
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        assert_eq!(PipelineConfig::from_env(), PipelineConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("AFL_REPO_OWNER", "someone");
        env::set_var("AFL_SEASON", "2024");
        env::set_var("AFL_CURRENT_ROUND", "12");
        env::set_var("GITHUB_TOKEN", "ghp_example");
        env::set_var("RATE_LIMIT_RPS", "not-a-number");

        let config = PipelineConfig::from_env();
        clear_env();

        assert_eq!(config.repository.owner, "someone");
        assert_eq!(config.repository.token.as_deref(), Some("ghp_example"));
        assert_eq!(config.season.year, 2024);
        assert_eq!(config.season.current_round, 12);
        assert_eq!(config.rate_limits.requests_per_second, 5);
    }
}
