//! GitHub-backed content store: the contents API for authenticated reads
//! and writes, GitHub Pages for the published mirror.

use crate::store::{AuthoritativeRead, ContentStore, Result, RevisionToken, StoreError, StoreResponse};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use std::time::Duration;

/// Default REST endpoint
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const USER_AGENT: &str = "telepaint";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Repository coordinates and credentials.
#[derive(Clone)]
pub struct GitHubStoreConfig {
    pub user: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
    /// Base URL of the Pages site, e.g. `https://alice.github.io/frames/`
    pub pages_base: String,
    pub api_base: String,
}

impl std::fmt::Debug for GitHubStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubStoreConfig")
            .field("user", &self.user)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("token", &"<redacted>")
            .field("pages_base", &self.pages_base)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubStoreConfig {
    /// URL of an object in the contents API, without query string.
    pub fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base.trim_end_matches('/'),
            self.user,
            self.repo,
            path.trim_start_matches('/')
        )
    }

    /// URL of the published copy, optionally with a cache-busting `t`
    /// parameter.
    pub fn published_url(&self, path: &str, bust: Option<i64>) -> String {
        let mut url = format!("{}{}", self.pages_base, path);
        if let Some(stamp) = bust {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&format!("t={}", stamp));
        }
        url
    }
}

#[derive(Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

/// Body of a contents PUT: the payload travels base64-encoded.
fn put_body(message: &str, content: &[u8], revision: Option<&RevisionToken>, branch: &str) -> Result<Vec<u8>> {
    let body = PutContents {
        message,
        content: STANDARD.encode(content),
        sha: revision.map(RevisionToken::as_str),
        branch,
    };
    serde_json::to_vec(&body).map_err(|e| StoreError::Encode(e.to_string()))
}

/// Pull the blob `sha` out of a contents API response.
pub fn extract_revision(body: &[u8]) -> Option<RevisionToken> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("sha")
        .and_then(serde_json::Value::as_str)
        .map(RevisionToken::new)
}

/// Interpret a contents API GET. A 200 must carry the blob `sha`; any
/// other status is passed through without a revision.
fn authoritative_read(status: u16, body: Vec<u8>) -> Result<AuthoritativeRead> {
    let revision = if status == 200 {
        let revision = extract_revision(&body).ok_or_else(|| {
            StoreError::InvalidResponse("contents response without sha".to_string())
        })?;
        Some(revision)
    } else {
        None
    };

    Ok(AuthoritativeRead {
        status,
        body,
        revision,
    })
}

/// Blocking HTTP client for one repository.
pub struct GitHubStore {
    client: reqwest::blocking::Client,
    config: GitHubStoreConfig,
}

impl GitHubStore {
    /// Create a new store client.
    ///
    /// Must be called outside an async context; the blocking client runs
    /// its own runtime.
    pub fn new(config: GitHubStoreConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GitHubStoreConfig {
        &self.config
    }

    fn auth_header(&self) -> String {
        format!("token {}", self.config.token)
    }

    fn finish(resp: reqwest::blocking::Response) -> Result<StoreResponse> {
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(StoreResponse::new(status, body.to_vec()))
    }
}

impl ContentStore for GitHubStore {
    fn read_authoritative(&self, path: &str) -> Result<AuthoritativeRead> {
        let resp = self
            .client
            .get(format!("{}?ref={}", self.config.contents_url(path), self.config.branch))
            .header("Authorization", self.auth_header())
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let StoreResponse { status, body } = Self::finish(resp)?;
        authoritative_read(status, body)
    }

    fn read_published(&self, path: &str, cache_bust: bool) -> Result<StoreResponse> {
        let bust = cache_bust.then(|| chrono::Utc::now().timestamp_millis());
        let resp = self
            .client
            .get(self.config.published_url(path, bust))
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Self::finish(resp)
    }

    fn write(
        &self,
        path: &str,
        message: &str,
        content: &[u8],
        revision: Option<&RevisionToken>,
    ) -> Result<u16> {
        let body = put_body(message, content, revision, &self.config.branch)?;

        let resp = self
            .client
            .put(self.config.contents_url(path))
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(resp.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn config() -> GitHubStoreConfig {
        GitHubStoreConfig {
            user: "alice".to_string(),
            repo: "frames".to_string(),
            branch: "main".to_string(),
            token: "ghp_secret".to_string(),
            pages_base: "https://alice.github.io/frames/".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    #[test]
    fn contents_url_layout() {
        assert_eq!(
            config().contents_url("session/alice.json"),
            "https://api.github.com/repos/alice/frames/contents/session/alice.json"
        );
    }

    #[test]
    fn published_url_cache_bust() {
        let cfg = config();
        assert_eq!(
            cfg.published_url("session/bob.json", None),
            "https://alice.github.io/frames/session/bob.json"
        );
        assert_eq!(
            cfg.published_url("session/bob.json", Some(1700000000123)),
            "https://alice.github.io/frames/session/bob.json?t=1700000000123"
        );
        assert_eq!(
            cfg.published_url("bob.json?v=2", Some(5)),
            "https://alice.github.io/frames/bob.json?v=2&t=5"
        );
    }

    #[test]
    fn put_body_with_and_without_revision() {
        let rev = RevisionToken::new("abc");
        let with: Value = serde_json::from_slice(&put_body("update", b"{}", Some(&rev), "main").unwrap()).unwrap();
        assert_eq!(with["message"], "update");
        assert_eq!(with["content"], "e30=");
        assert_eq!(with["sha"], "abc");
        assert_eq!(with["branch"], "main");

        let without: Value = serde_json::from_slice(&put_body("update", b"{}", None, "main").unwrap()).unwrap();
        assert!(without.get("sha").is_none());
    }

    #[test]
    fn extract_revision_from_contents_response() {
        let body = br#"{"name":"alice.json","path":"session/alice.json","sha":"3d21ec53a331a6f037a91c368710b99387d012c1","size":12}"#;
        assert_eq!(
            extract_revision(body).unwrap().as_str(),
            "3d21ec53a331a6f037a91c368710b99387d012c1"
        );
        assert!(extract_revision(br#"{"message":"Not Found"}"#).is_none());
        assert!(extract_revision(b"garbage").is_none());
    }

    #[test]
    fn authoritative_read_requires_sha_on_200() {
        let read = authoritative_read(200, br#"{"sha":"abc"}"#.to_vec()).unwrap();
        assert_eq!(read.revision, Some(RevisionToken::new("abc")));

        let missing = authoritative_read(404, br#"{"message":"Not Found"}"#.to_vec()).unwrap();
        assert_eq!(missing.status, 404);
        assert!(missing.revision.is_none());

        assert!(matches!(
            authoritative_read(200, b"<html>".to_vec()),
            Err(StoreError::InvalidResponse(_))
        ));
    }

    #[test]
    fn debug_hides_token() {
        let printed = format!("{:?}", config());
        assert!(!printed.contains("ghp_secret"));
    }
}
