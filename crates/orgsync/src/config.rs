//! Provider and integration configuration.
//!
//! A [`ProviderConfig`] describes one synchronization target; an
//! [`IntegrationRegistry`] maps target URLs to the upstream instance
//! (base URL + credentials) that serves them. A target without a matching
//! integration is a fatal misconfiguration, never a per-target skip.

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Configuration errors. Always fatal to the pass and never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no GitLab integration matches target {target}; add one to the integration registry")]
    NoIntegration { target: String },

    #[error("base URL {base} is not a path prefix of target {target}")]
    BaseUrlMismatch { base: String, target: String },

    #[error("group URL {url} is missing a group path")]
    EmptyGroupPath { url: String },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ConfigError {
    pub(crate) fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_delimiter() -> String {
    ".".to_string()
}

fn default_group_type() -> String {
    "team".to_string()
}

/// One synchronization target.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// URL of the GitLab group, subgroup, or instance root to sync.
    pub target: String,
    /// Whether to ingest users from this target's instance.
    #[serde(default = "default_true")]
    pub ingest_users: bool,
    /// Whether to ingest the group hierarchy.
    #[serde(default = "default_true")]
    pub ingest_groups: bool,
    /// Delimiter substituted for `/` when flattening group paths into
    /// entity names.
    #[serde(default = "default_delimiter")]
    pub path_delimiter: String,
    /// Kind label stamped on group entities.
    #[serde(default = "default_group_type")]
    pub group_type: String,
}

/// Connection configuration for one GitLab instance.
#[derive(Debug, Clone, Deserialize)]
pub struct IntegrationConfig {
    /// Web base URL, e.g. `https://gitlab.com` or
    /// `https://example.com/gitlab`.
    pub base_url: String,
    /// REST API base URL; defaults to `{base_url}/api/v4`.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Personal access token, sent as `PRIVATE-TOKEN` when present.
    #[serde(default)]
    pub token: Option<String>,
}

impl IntegrationConfig {
    /// The API base URL, with the `/api/v4` default applied.
    #[must_use]
    pub fn api_base(&self) -> String {
        match &self.api_base_url {
            Some(api) => api.trim_end_matches('/').to_string(),
            None => format!("{}/api/v4", self.base_url.trim_end_matches('/')),
        }
    }
}

/// Registry of known upstream instances.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegrationRegistry {
    pub integrations: Vec<IntegrationConfig>,
}

impl IntegrationRegistry {
    pub fn new(integrations: Vec<IntegrationConfig>) -> Self {
        Self { integrations }
    }

    /// Find the integration serving `target`, by host and longest matching
    /// base-path prefix.
    pub fn by_url(&self, target: &str) -> Result<Option<&IntegrationConfig>, ConfigError> {
        let target_url =
            Url::parse(target).map_err(|e| ConfigError::invalid_url(target, e))?;
        let target_components = path_components(&target_url);

        let mut best: Option<(usize, &IntegrationConfig)> = None;
        for integration in &self.integrations {
            let base_url = Url::parse(&integration.base_url)
                .map_err(|e| ConfigError::invalid_url(&integration.base_url, e))?;
            if base_url.host_str() != target_url.host_str() {
                continue;
            }

            let base_components = path_components(&base_url);
            let is_prefix = base_components
                .iter()
                .zip(target_components.iter().chain(std::iter::repeat(&"")))
                .all(|(base, target)| base == target)
                && base_components.len() <= target_components.len();
            if !is_prefix {
                continue;
            }

            if best.map_or(true, |(depth, _)| base_components.len() > depth) {
                best = Some((base_components.len(), integration));
            }
        }

        Ok(best.map(|(_, integration)| integration))
    }
}

fn path_components(url: &Url) -> Vec<&str> {
    url.path()
        .trim_matches('/')
        .split('/')
        .filter(|c| !c.is_empty())
        .collect()
}

/// Group provider configs by the integration that serves their target.
///
/// Fails fast on the first target with no matching integration, aborting
/// the whole pass.
pub fn group_by_integration<'a>(
    registry: &'a IntegrationRegistry,
    configs: &'a [ProviderConfig],
) -> Result<Vec<(&'a IntegrationConfig, Vec<&'a ProviderConfig>)>, ConfigError> {
    let mut grouped: IndexMap<usize, (&IntegrationConfig, Vec<&ProviderConfig>)> =
        IndexMap::new();

    for config in configs {
        let integration =
            registry
                .by_url(&config.target)?
                .ok_or_else(|| ConfigError::NoIntegration {
                    target: config.target.clone(),
                })?;

        // Key by address: registry entries are distinct objects.
        let key = integration as *const IntegrationConfig as usize;
        grouped
            .entry(key)
            .or_insert_with(|| (integration, Vec::new()))
            .1
            .push(config);
    }

    Ok(grouped.into_values().collect())
}
