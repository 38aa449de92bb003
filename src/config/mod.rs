//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroUsize, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::revalidation::{
    DEFAULT_CONCURRENCY, DEFAULT_LISTING_ROOT, DEFAULT_MAX_EXPANDED_PATHS,
    DEFAULT_MAX_TRAVERSAL_DEPTH, RevalidatorSettings,
};

mod cli;

pub use cli::{CliArgs, Command, DispatchArgs, PlanArgs, RuntimeOverrides, TriggerArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "revalidator";
const ENV_PREFIX: &str = "REVALIDATOR";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub http: HttpSettings,
    pub dispatch: DispatchSettings,
    pub sites: Vec<SiteSettings>,
    pub revalidators: Vec<RevalidatorSettings>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub concurrency: NonZeroUsize,
    pub max_expanded_paths: NonZeroUsize,
    pub max_traversal_depth: usize,
    pub listing_root: String,
    pub deadline: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub id: String,
    pub label: String,
    /// Absolute endpoint; relative values are resolved against `base_url` at load.
    pub revalidate_url: Option<Url>,
    pub secret: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_runtime_overrides(cli.command.overrides());
    if let Command::Dispatch(args) = &cli.command {
        raw.apply_dispatch_overrides(args);
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    http: RawHttpSettings,
    dispatch: RawDispatchSettings,
    sites: Vec<RawSiteSettings>,
    revalidators: Vec<RevalidatorSettings>,
}

impl RawSettings {
    fn apply_runtime_overrides(&mut self, overrides: &RuntimeOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(seconds) = overrides.http_timeout_seconds {
            self.http.timeout_seconds = Some(seconds);
        }
        if let Some(count) = overrides.dispatch_concurrency {
            self.dispatch.concurrency = Some(count);
        }
        if let Some(count) = overrides.max_expanded_paths {
            self.dispatch.max_expanded_paths = Some(count);
        }
        if let Some(root) = overrides.listing_root.as_ref() {
            self.dispatch.listing_root = Some(root.clone());
        }
    }

    fn apply_dispatch_overrides(&mut self, args: &DispatchArgs) {
        if let Some(seconds) = args.deadline_seconds {
            self.dispatch.deadline_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            http,
            dispatch,
            sites,
            revalidators,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let http = build_http_settings(http)?;
        let dispatch = build_dispatch_settings(dispatch)?;
        let sites = sites
            .into_iter()
            .map(build_site_settings)
            .collect::<Result<Vec<_>, _>>()?;
        let revalidators = build_revalidators(revalidators)?;

        Ok(Self {
            logging,
            http,
            dispatch,
            sites,
            revalidators,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_http_settings(http: RawHttpSettings) -> Result<HttpSettings, LoadError> {
    let timeout_seconds = http.timeout_seconds.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "http.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let user_agent = http
        .user_agent
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(default_user_agent);

    Ok(HttpSettings {
        timeout: Duration::from_secs(timeout_seconds),
        user_agent,
    })
}

fn build_dispatch_settings(dispatch: RawDispatchSettings) -> Result<DispatchSettings, LoadError> {
    let concurrency = non_zero_usize(
        dispatch.concurrency.unwrap_or(DEFAULT_CONCURRENCY as u64),
        "dispatch.concurrency",
    )?;
    let max_expanded_paths = non_zero_usize(
        dispatch
            .max_expanded_paths
            .unwrap_or(DEFAULT_MAX_EXPANDED_PATHS as u64),
        "dispatch.max_expanded_paths",
    )?;
    let max_traversal_depth = dispatch
        .max_traversal_depth
        .unwrap_or(DEFAULT_MAX_TRAVERSAL_DEPTH as u64)
        .try_into()
        .map_err(|_| {
            LoadError::invalid(
                "dispatch.max_traversal_depth",
                "value exceeds supported range",
            )
        })?;

    let listing_root = dispatch
        .listing_root
        .unwrap_or_else(|| DEFAULT_LISTING_ROOT.to_string());
    if listing_root.trim().trim_matches('/').contains('/') {
        return Err(LoadError::invalid(
            "dispatch.listing_root",
            "must be a single path segment",
        ));
    }

    let deadline = match dispatch.deadline_seconds {
        Some(0) => {
            return Err(LoadError::invalid(
                "dispatch.deadline_seconds",
                "must be greater than zero",
            ));
        }
        Some(seconds) => Some(Duration::from_secs(seconds)),
        None => None,
    };

    Ok(DispatchSettings {
        concurrency,
        max_expanded_paths,
        max_traversal_depth,
        listing_root,
        deadline,
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let id = site.id.trim().to_string();
    if id.is_empty() {
        return Err(LoadError::invalid("sites.id", "must not be empty"));
    }

    let base_url = parse_url(&site.base_url, "sites.base_url")?;
    let revalidate_url = match non_blank(site.revalidate_url) {
        Some(value) => Some(base_url.join(&value).map_err(|err| {
            LoadError::invalid("sites.revalidate_url", format!("`{value}`: {err}"))
        })?),
        None => None,
    };
    let label = non_blank(site.label).unwrap_or_else(|| id.clone());

    Ok(SiteSettings {
        id,
        label,
        revalidate_url,
        secret: non_blank(site.secret),
    })
}

fn build_revalidators(
    revalidators: Vec<RevalidatorSettings>,
) -> Result<Vec<RevalidatorSettings>, LoadError> {
    for revalidator in &revalidators {
        if revalidator.entity_type.trim().is_empty() {
            return Err(LoadError::invalid(
                "revalidators.entity_type",
                "must not be empty",
            ));
        }
        if revalidator.bundle.trim().is_empty() {
            return Err(LoadError::invalid("revalidators.bundle", "must not be empty"));
        }
    }
    Ok(revalidators)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHttpSettings {
    timeout_seconds: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDispatchSettings {
    concurrency: Option<u64>,
    max_expanded_paths: Option<u64>,
    max_traversal_depth: Option<u64>,
    listing_root: Option<String>,
    deadline_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    id: String,
    label: Option<String>,
    base_url: String,
    revalidate_url: Option<String>,
    secret: Option<String>,
}

fn default_user_agent() -> String {
    format!("site-revalidator/{}", env!("CARGO_PKG_VERSION"))
}

fn parse_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    Url::parse(value.trim()).map_err(|err| LoadError::invalid(key, format!("`{value}`: {err}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
