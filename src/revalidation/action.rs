//! Record actions that trigger revalidation.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::Record;

use super::site::DestinationSite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevalidationAction {
    Insert,
    Update,
    Predelete,
}

impl RevalidationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Predelete => "predelete",
        }
    }
}

impl fmt::Display for RevalidationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevalidationAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "insert" | "create" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "predelete" | "delete" => Ok(Self::Predelete),
            other => Err(format!("unknown action `{other}`")),
        }
    }
}

/// Everything the dispatcher needs for one record action.
#[derive(Debug, Clone)]
pub struct ActionPayload {
    pub action: RevalidationAction,
    pub record: Arc<dyn Record>,
    pub sites: Vec<Arc<dyn DestinationSite>>,
    /// Canonical path of the record after the action.
    pub current_path: Option<String>,
    /// Canonical path before the action, when it changed.
    pub previous_path: Option<String>,
}

impl ActionPayload {
    pub fn new(action: RevalidationAction, record: Arc<dyn Record>) -> Self {
        Self {
            action,
            record,
            sites: Vec::new(),
            current_path: None,
            previous_path: None,
        }
    }

    pub fn with_sites(mut self, sites: Vec<Arc<dyn DestinationSite>>) -> Self {
        self.sites = sites;
        self
    }

    pub fn with_current_path(mut self, path: impl Into<String>) -> Self {
        self.current_path = Some(path.into());
        self
    }

    pub fn with_previous_path(mut self, path: impl Into<String>) -> Self {
        self.previous_path = Some(path.into());
        self
    }
}
