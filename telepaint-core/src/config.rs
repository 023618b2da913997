//! Client configuration.
//!
//! The file layout matches the `config.json` every telepaint client reads;
//! a `.toml` file with the same keys is accepted too.

use crate::crypto::{KdfParams, Passphrase, DEFAULT_PBKDF2_ITERATIONS};
use crate::sync::SyncSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "http")]
use crate::store::GitHubStoreConfig;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config missing required field: {0}")]
    Missing(&'static str),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

fn default_poll_seconds() -> u64 {
    15
}

fn default_commit_interval() -> u64 {
    20
}

fn default_iterations() -> u32 {
    DEFAULT_PBKDF2_ITERATIONS
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_commit_message() -> String {
    "update".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelepaintConfig {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub personal_access_token: String,
    #[serde(default)]
    pub pages_base: String,
    /// Path of this client's frame inside the repository
    #[serde(default)]
    pub my_file: String,
    /// Path of the peer's frame inside the repository
    #[serde(default)]
    pub peer_file: String,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub user_id: String,
    /// Empty means plaintext mode
    #[serde(default)]
    pub passphrase: String,
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
    #[serde(default = "default_commit_interval")]
    pub commit_min_interval_sec: u64,
    #[serde(default = "default_iterations")]
    pub pbkdf2_iterations: u32,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

impl Default for TelepaintConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            repo: String::new(),
            branch: String::new(),
            personal_access_token: String::new(),
            pages_base: String::new(),
            my_file: String::new(),
            peer_file: String::new(),
            session: String::new(),
            user_id: String::new(),
            passphrase: String::new(),
            poll_seconds: default_poll_seconds(),
            commit_min_interval_sec: default_commit_interval(),
            pbkdf2_iterations: default_iterations(),
            api_base: default_api_base(),
            commit_message: default_commit_message(),
        }
    }
}

impl std::fmt::Debug for TelepaintConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelepaintConfig")
            .field("user", &self.user)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("pages_base", &self.pages_base)
            .field("my_file", &self.my_file)
            .field("peer_file", &self.peer_file)
            .field("session", &self.session)
            .field("user_id", &self.user_id)
            .field("encrypted", &!self.passphrase.is_empty())
            .field("poll_seconds", &self.poll_seconds)
            .field("commit_min_interval_sec", &self.commit_min_interval_sec)
            .field("pbkdf2_iterations", &self.pbkdf2_iterations)
            .finish_non_exhaustive()
    }
}

impl TelepaintConfig {
    /// Load and validate a config file. `.toml` files are parsed as TOML,
    /// everything else as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let config = if is_toml {
            Self::from_toml(&content)?
        } else {
            Self::from_json(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required: [(&'static str, &str); 5] = [
            ("user", self.user.as_str()),
            ("repo", self.repo.as_str()),
            ("branch", self.branch.as_str()),
            ("personal_access_token", self.personal_access_token.as_str()),
            ("my_file", self.my_file.as_str()),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }

        if self.poll_seconds == 0 {
            return Err(ConfigError::Invalid("poll_seconds must be at least 1".to_string()));
        }
        if self.commit_min_interval_sec == 0 {
            return Err(ConfigError::Invalid(
                "commit_min_interval_sec must be at least 1".to_string(),
            ));
        }
        KdfParams::new(self.pbkdf2_iterations)
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(())
    }

    pub fn passphrase(&self) -> Option<Passphrase> {
        Passphrase::non_empty(self.passphrase.clone())
    }

    /// Settings for the sync loop
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            local_path: self.my_file.clone(),
            peer_path: self.peer_file.clone(),
            passphrase: self.passphrase(),
            iterations: self.pbkdf2_iterations,
            poll_interval: Duration::from_secs(self.poll_seconds),
            commit_min_interval: Duration::from_secs(self.commit_min_interval_sec),
            commit_message: self.commit_message.clone(),
        }
    }

    /// Repository coordinates for the HTTP store
    #[cfg(feature = "http")]
    pub fn store_config(&self) -> GitHubStoreConfig {
        GitHubStoreConfig {
            user: self.user.clone(),
            repo: self.repo.clone(),
            branch: self.branch.clone(),
            token: self.personal_access_token.clone(),
            pages_base: self.pages_base.clone(),
            api_base: self.api_base.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "user": "alice",
        "repo": "frames",
        "branch": "main",
        "personal_access_token": "ghp_x",
        "pages_base": "https://alice.github.io/frames/",
        "my_file": "session/alice.json",
        "peer_file": "session/bob.json",
        "session": "s1",
        "user_id": "alice"
    }"#;

    #[test]
    fn defaults_applied() {
        let cfg = TelepaintConfig::from_json(MINIMAL).unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.poll_seconds, 15);
        assert_eq!(cfg.commit_min_interval_sec, 20);
        assert_eq!(cfg.pbkdf2_iterations, 200_000);
        assert_eq!(cfg.commit_message, "update");
        assert!(cfg.passphrase().is_none());
    }

    #[test]
    fn sync_settings_from_config() {
        let mut cfg = TelepaintConfig::from_json(MINIMAL).unwrap();
        cfg.passphrase = "hunter2".to_string();
        cfg.poll_seconds = 5;

        let settings = cfg.sync_settings();
        assert_eq!(settings.local_path, "session/alice.json");
        assert_eq!(settings.peer_path, "session/bob.json");
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.commit_min_interval, Duration::from_secs(20));
        assert_eq!(settings.passphrase.unwrap().as_bytes(), b"hunter2");
    }

    #[test]
    fn missing_required_field() {
        let mut cfg = TelepaintConfig::from_json(MINIMAL).unwrap();
        cfg.personal_access_token.clear();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Missing("personal_access_token"))
        ));
    }

    #[test]
    fn zero_intervals_rejected() {
        let mut cfg = TelepaintConfig::from_json(MINIMAL).unwrap();
        cfg.poll_seconds = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let mut cfg = TelepaintConfig::from_json(MINIMAL).unwrap();
        cfg.pbkdf2_iterations = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn debug_hides_secrets() {
        let mut cfg = TelepaintConfig::from_json(MINIMAL).unwrap();
        cfg.passphrase = "hunter2".to_string();
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("ghp_x"));
    }

    #[test]
    fn load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let cfg = TelepaintConfig::load(file.path()).unwrap();
        assert_eq!(cfg.user, "alice");
    }

    #[test]
    fn load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
user = "alice"
repo = "frames"
branch = "main"
personal_access_token = "ghp_x"
my_file = "session/alice.json"
peer_file = "session/bob.json"
poll_seconds = 30
"#
        )
        .unwrap();

        let cfg = TelepaintConfig::load(file.path()).unwrap();
        assert_eq!(cfg.poll_seconds, 30);
        assert_eq!(cfg.branch, "main");
    }

    #[test]
    fn load_missing_file() {
        let result = TelepaintConfig::load(Path::new("/nonexistent/telepaint.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn load_rejects_invalid_config() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"user":"alice"}"#).unwrap();
        assert!(matches!(
            TelepaintConfig::load(file.path()),
            Err(ConfigError::Missing("repo"))
        ));
    }
}
