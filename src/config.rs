use std::env;

use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const FEEDBACK_ENDPOINT: &str = "/api/feedback";

const API_URL_VARS: [&str; 2] = ["FEEDBACK_API_URL", "VITE_BACKEND_API_URL"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
}

impl Config {
    /// Reads `.env` (if present) and the environment. An explicit URL wins.
    pub fn load(api_url_override: Option<&str>) -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!("loaded environment from {}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => debug!("ignoring unreadable .env: {err}"),
        }

        let api_url = api_url_override
            .map(str::to_string)
            .or_else(|| API_URL_VARS.iter().find_map(|key| var(key)))
            .unwrap_or_else(|| {
                info!("backend URL not set, using default: {DEFAULT_API_URL}");
                DEFAULT_API_URL.to_string()
            });

        Self::with_api_url(&api_url)
    }

    pub fn with_api_url(api_url: &str) -> Self {
        Self {
            api_url: clean_base_url(api_url),
        }
    }

    pub fn feedback_url(&self) -> String {
        format!("{}{}", self.api_url, FEEDBACK_ENDPOINT)
    }

    pub fn feedback_item_url(&self, id: &str) -> String {
        format!("{}/{}", self.feedback_url(), urlencoding::encode(id))
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn clean_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let config = Config::with_api_url("https://feedback.example.com/");
        assert_eq!(config.api_url, "https://feedback.example.com");
        assert_eq!(
            config.feedback_url(),
            "https://feedback.example.com/api/feedback"
        );
    }

    #[test]
    fn item_url_encodes_the_id() {
        let config = Config::with_api_url("http://localhost:5000");
        assert_eq!(
            config.feedback_item_url("a b/c"),
            "http://localhost:5000/api/feedback/a%20b%2Fc"
        );
    }

    #[test]
    fn override_beats_environment() {
        let config = Config::load(Some("http://override:9000//"));
        assert_eq!(config.api_url, "http://override:9000");
    }
}
