use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::revalidation::RevalidationAction;

/// Command-line arguments for the site-revalidator binary.
#[derive(Debug, Parser)]
#[command(
    name = "site-revalidator",
    version,
    about = "Tell front-end sites which cached paths to refresh after a content change"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "REVALIDATOR_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the normalized paths an action would revalidate.
    Plan(PlanArgs),
    /// Revalidate every path on every configured site.
    Dispatch(DispatchArgs),
}

impl Command {
    pub fn trigger(&self) -> &TriggerArgs {
        match self {
            Self::Plan(args) => &args.trigger,
            Self::Dispatch(args) => &args.trigger,
        }
    }

    pub fn overrides(&self) -> &RuntimeOverrides {
        match self {
            Self::Plan(args) => &args.overrides,
            Self::Dispatch(args) => &args.overrides,
        }
    }
}

/// The record action to revalidate for.
#[derive(Debug, Args, Clone)]
pub struct TriggerArgs {
    /// JSON document holding the record graph.
    #[arg(long = "records", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub records: PathBuf,

    /// Id of the record the action applies to.
    #[arg(long = "record", value_name = "ID")]
    pub record: String,

    /// insert | update | predelete
    #[arg(long = "action", value_name = "ACTION")]
    pub action: RevalidationAction,

    /// Canonical path of the record after the action.
    #[arg(long = "current-path", value_name = "PATH")]
    pub current_path: Option<String>,

    /// Canonical path before the action.
    #[arg(long = "previous-path", value_name = "PATH")]
    pub previous_path: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub trigger: TriggerArgs,

    #[command(flatten)]
    pub overrides: RuntimeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct DispatchArgs {
    #[command(flatten)]
    pub trigger: TriggerArgs,

    #[command(flatten)]
    pub overrides: RuntimeOverrides,

    /// Stop issuing revalidation calls after this many seconds.
    #[arg(long = "deadline-seconds", value_name = "SECONDS")]
    pub deadline_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RuntimeOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the per-request timeout.
    #[arg(long = "http-timeout-seconds", value_name = "SECONDS")]
    pub http_timeout_seconds: Option<u64>,

    /// Override the number of in-flight revalidation calls.
    #[arg(long = "dispatch-concurrency", value_name = "COUNT")]
    pub dispatch_concurrency: Option<u64>,

    /// Override the cap on paths expanded from one template.
    #[arg(long = "max-expanded-paths", value_name = "COUNT")]
    pub max_expanded_paths: Option<u64>,

    /// Override the listing root segment collapsed to `/`.
    #[arg(long = "listing-root", value_name = "SEGMENT")]
    pub listing_root: Option<String>,
}
