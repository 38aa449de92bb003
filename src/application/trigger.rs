//! Revalidation service for one record action.
//!
//! Wires configured sites and per-bundle settings to the path revalidator,
//! keeping the binary focused on argument handling and output.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::application::error::AppError;
use crate::config::{Settings, SiteSettings, TriggerArgs};
use crate::domain::{BuiltinProperty, RecordStore};
use crate::revalidation::{
    ActionPayload, CancelSignal, ConfiguredSite, DestinationSite, DispatchOptions,
    DispatchSummary, FieldValueExtractor, PathNormalizer, PathRevalidator, RevalidationAction,
    RevalidationTransport, RevalidatorSettings, TemplateExpander, VariableResolver, settings_for,
};

/// A record action as requested on the command line.
#[derive(Debug, Clone)]
pub struct TriggerRequest {
    pub records: PathBuf,
    pub record_id: String,
    pub action: RevalidationAction,
    pub current_path: Option<String>,
    pub previous_path: Option<String>,
}

impl From<&TriggerArgs> for TriggerRequest {
    fn from(args: &TriggerArgs) -> Self {
        Self {
            records: args.records.clone(),
            record_id: args.record.clone(),
            action: args.action,
            current_path: args.current_path.clone(),
            previous_path: args.previous_path.clone(),
        }
    }
}

/// Service that plans and dispatches revalidation for record actions.
#[derive(Clone)]
pub struct RevalidationService {
    revalidator: Arc<PathRevalidator>,
    sites: Vec<Arc<dyn DestinationSite>>,
    revalidators: Vec<RevalidatorSettings>,
}

impl RevalidationService {
    pub fn new(
        revalidator: Arc<PathRevalidator>,
        sites: Vec<Arc<dyn DestinationSite>>,
        revalidators: Vec<RevalidatorSettings>,
    ) -> Self {
        Self {
            revalidator,
            sites,
            revalidators,
        }
    }

    pub fn from_settings(settings: &Settings, transport: Arc<dyn RevalidationTransport>) -> Self {
        let dispatch = &settings.dispatch;
        let resolver = VariableResolver::new(
            FieldValueExtractor::new(dispatch.max_traversal_depth),
            TemplateExpander::new(dispatch.max_expanded_paths.get()),
        );
        let normalizer = PathNormalizer::new(&dispatch.listing_root);
        let options = DispatchOptions {
            concurrency: dispatch.concurrency.get(),
            deadline: dispatch.deadline,
        };

        Self::new(
            Arc::new(PathRevalidator::new(resolver, normalizer, transport, options)),
            build_sites(&settings.sites),
            settings.revalidators.clone(),
        )
    }

    /// Load the record graph and build the payload for `request`.
    pub async fn payload(&self, request: &TriggerRequest) -> Result<ActionPayload, AppError> {
        let store = RecordStore::load(&request.records).await?;
        let record = store.require(&request.record_id)?;

        let mut payload =
            ActionPayload::new(request.action, Arc::new(record)).with_sites(self.sites.clone());
        if let Some(path) = request.current_path.as_deref() {
            payload = payload.with_current_path(path);
        }
        if let Some(path) = request.previous_path.as_deref() {
            payload = payload.with_previous_path(path);
        }
        Ok(payload)
    }

    /// Normalized paths `payload` would revalidate.
    pub fn plan(&self, payload: &ActionPayload) -> BTreeSet<String> {
        match self.settings_for(payload) {
            Some(settings) => self.revalidator.plan(payload, settings),
            None => BTreeSet::new(),
        }
    }

    pub async fn dispatch(&self, payload: &ActionPayload, cancel: CancelSignal) -> DispatchSummary {
        match self.settings_for(payload) {
            Some(settings) => self.revalidator.dispatch(payload, settings, cancel).await,
            None => DispatchSummary::default(),
        }
    }

    fn settings_for(&self, payload: &ActionPayload) -> Option<&RevalidatorSettings> {
        let record = payload.record.as_ref();
        let found = settings_for(&self.revalidators, record);
        if found.is_none() {
            info!(
                entity_type = record.entity_type(),
                bundle = %record.property(BuiltinProperty::Bundle),
                "No revalidator configured for bundle"
            );
        }
        found
    }
}

/// Destination sites from configuration, in declaration order.
pub fn build_sites(sites: &[SiteSettings]) -> Vec<Arc<dyn DestinationSite>> {
    sites
        .iter()
        .map(|site| {
            let mut configured = ConfiguredSite::new(site.id.clone(), site.label.clone());
            if let Some(url) = site.revalidate_url.clone() {
                configured = configured.with_revalidate_url(url);
            }
            if let Some(secret) = site.secret.clone() {
                configured = configured.with_secret(secret);
            }
            Arc::new(configured) as Arc<dyn DestinationSite>
        })
        .collect()
}
