use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SETTINGS_FILE: &str = "feed.toml";

/// Which refresh response is allowed to replace the feed when several overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Whichever response completes last wins.
    #[default]
    LastSettledWins,
    /// Responses from superseded refreshes are dropped.
    LatestIssuedWins,
}

impl FromStr for RefreshPolicy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "last_settled_wins" => Ok(Self::LastSettledWins),
            "latest_issued_wins" => Ok(Self::LatestIssuedWins),
            other => Err(anyhow!("unknown refresh policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: Url,
    pub request_timeout: Option<Duration>,
    pub refresh_policy: RefreshPolicy,
}

impl ClientSettings {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            request_timeout: None,
            refresh_policy: RefreshPolicy::default(),
        })
    }

    pub fn with_base_url(mut self, raw: &str) -> Result<Self> {
        self.base_url = normalize_base_url(raw)?;
        Ok(self)
    }

    pub fn posts_url(&self) -> std::result::Result<Url, url::ParseError> {
        self.base_url.join("posts/")
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SettingsFile {
    pub(crate) base_url: Option<String>,
    pub(crate) request_timeout_secs: Option<u64>,
    pub(crate) refresh_policy: Option<RefreshPolicy>,
}

/// Loads `feed.toml` (or `explicit_path`) and applies environment overrides.
///
/// A missing default file is fine; a missing explicit file is an error.
pub fn load_settings(explicit_path: Option<&Path>) -> Result<ClientSettings> {
    let path = explicit_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

    let file = match fs::read_to_string(&path) {
        Ok(raw) => toml::from_str::<SettingsFile>(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound && explicit_path.is_none() => {
            SettingsFile::default()
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    };

    resolve_settings(file, |name| std::env::var(name).ok())
}

pub(crate) fn resolve_settings(
    mut file: SettingsFile,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings> {
    if let Some(v) = env("FEED_BASE_URL") {
        file.base_url = Some(v);
    }
    if let Some(v) = env("APP__BASE_URL") {
        file.base_url = Some(v);
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        let secs = v
            .trim()
            .parse::<u64>()
            .with_context(|| format!("APP__REQUEST_TIMEOUT_SECS is not a number: '{v}'"))?;
        file.request_timeout_secs = Some(secs);
    }
    if let Some(v) = env("APP__REFRESH_POLICY") {
        file.refresh_policy = Some(v.parse()?);
    }

    let base_url = normalize_base_url(file.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
    Ok(ClientSettings {
        base_url,
        request_timeout: file
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs),
        refresh_policy: file.refresh_policy.unwrap_or_default(),
    })
}

/// Parses a base url and makes sure its path ends in `/` so `posts/` joins under it.
pub fn normalize_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let raw = if raw.is_empty() { DEFAULT_BASE_URL } else { raw };

    let mut url = Url::parse(raw).with_context(|| format!("invalid base url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("base url '{raw}' must use http or https");
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
