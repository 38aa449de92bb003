//! Revalidation dispatch.
//!
//! Builds the path set for one record action and fans out one call per
//! `(path, site)` pair. The outcome is a logical OR over every call: a
//! single acknowledged call marks the action as revalidated. Failures are
//! logged and never surface as errors.

use std::collections::BTreeSet;
use std::future::pending;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::domain::BuiltinProperty;

use super::action::{ActionPayload, RevalidationAction};
use super::config::RevalidatorSettings;
use super::hierarchy::ancestors;
use super::normalizer::PathNormalizer;
use super::resolver::VariableResolver;
use super::site::DestinationSite;
use super::transport::RevalidationTransport;

pub const DEFAULT_CONCURRENCY: usize = 4;

const METRIC_CALLS_TOTAL: &str = "revalidator_calls_total";
const METRIC_DISPATCH_MS: &str = "revalidator_dispatch_ms";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Maximum in-flight calls.
    pub concurrency: usize,
    /// Stop issuing calls once this much time has passed.
    pub deadline: Option<Duration>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            deadline: None,
        }
    }
}

/// Receiving half of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

/// Sending half of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl CancelSignal {
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(tx), CancelSignal(rx))
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self::pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    async fn cancelled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                // Sender gone without cancelling.
                pending::<()>().await;
            }
        }
    }
}

/// Counts for one dispatch batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Normalized paths in the batch.
    pub paths: usize,
    /// Calls that reached the transport or were skipped.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Pairs whose site had no revalidation URL.
    pub skipped: usize,
    /// The batch stopped early on cancellation or deadline.
    pub cancelled: bool,
}

impl DispatchSummary {
    /// True when at least one call was acknowledged.
    pub fn revalidated(&self) -> bool {
        self.succeeded > 0
    }

    fn record(&mut self, outcome: CallOutcome) {
        self.attempted += 1;
        match outcome {
            CallOutcome::Success => self.succeeded += 1,
            CallOutcome::Failure => self.failed += 1,
            CallOutcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallOutcome {
    Success,
    Failure,
    Skipped,
}

impl CallOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Skipped => "skipped",
        }
    }
}

/// Computes revalidation paths and notifies destination sites.
pub struct PathRevalidator {
    resolver: VariableResolver,
    normalizer: PathNormalizer,
    transport: Arc<dyn RevalidationTransport>,
    options: DispatchOptions,
}

impl PathRevalidator {
    pub fn new(
        resolver: VariableResolver,
        normalizer: PathNormalizer,
        transport: Arc<dyn RevalidationTransport>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            resolver,
            normalizer,
            transport,
            options,
        }
    }

    /// Final normalized path set for `payload`.
    pub fn plan(
        &self,
        payload: &ActionPayload,
        settings: &RevalidatorSettings,
    ) -> BTreeSet<String> {
        let mut raw: Vec<String> = Vec::new();

        if settings.revalidate_page {
            if let Some(current) = &payload.current_path {
                raw.push(current.clone());
            }
            if let Some(previous) = &payload.previous_path
                && payload.current_path.as_ref() != Some(previous)
            {
                raw.push(previous.clone());
            }
        }

        for template in &settings.additional_paths {
            raw.extend(
                self.resolver
                    .resolve_paths(payload.record.as_ref(), template),
            );
        }

        // A rejected path is dropped together with its ancestors.
        let with_ancestors: Vec<String> = raw
            .iter()
            .filter(|path| self.normalizer.admits(path))
            .flat_map(|path| std::iter::once(path.clone()).chain(ancestors(path)))
            .collect();

        self.normalizer.normalize(with_ancestors)
    }

    /// Run the full batch and return the boolean outcome.
    pub async fn revalidate(&self, payload: &ActionPayload, settings: &RevalidatorSettings) -> bool {
        self.dispatch(payload, settings, CancelSignal::never())
            .await
            .revalidated()
    }

    /// Run the batch, stopping early if `cancel` fires or the deadline passes.
    #[instrument(
        skip_all,
        fields(
            action = %payload.action,
            record_id = %payload.record.property(BuiltinProperty::Id),
            bundle = %payload.record.property(BuiltinProperty::Bundle),
        )
    )]
    pub async fn dispatch(
        &self,
        payload: &ActionPayload,
        settings: &RevalidatorSettings,
        mut cancel: CancelSignal,
    ) -> DispatchSummary {
        let started_at = Instant::now();
        let paths = self.plan(payload, settings);
        let mut summary = DispatchSummary {
            paths: paths.len(),
            ..Default::default()
        };

        if paths.is_empty() || payload.sites.is_empty() {
            info!(
                paths = paths.len(),
                sites = payload.sites.len(),
                "Nothing to revalidate"
            );
            return summary;
        }

        info!(
            paths = ?paths,
            sites = payload.sites.len(),
            "Revalidation starting"
        );

        let action = payload.action;
        let calls: Vec<(String, Arc<dyn DestinationSite>)> = paths
            .iter()
            .flat_map(|path| {
                payload
                    .sites
                    .iter()
                    .map(move |site| (path.clone(), Arc::clone(site)))
            })
            .collect();

        let mut results = stream::iter(calls)
            .map(|(path, site)| self.call(action, path, site))
            .buffer_unordered(self.options.concurrency.max(1));

        let deadline = async {
            match self.options.deadline {
                Some(limit) => tokio::time::sleep(limit).await,
                None => pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(completed = summary.attempted, "Revalidation cancelled");
                    summary.cancelled = true;
                    break;
                }
                _ = &mut deadline => {
                    warn!(completed = summary.attempted, "Revalidation deadline reached");
                    summary.cancelled = true;
                    break;
                }
                next = results.next() => match next {
                    Some(outcome) => {
                        counter!(METRIC_CALLS_TOTAL, "outcome" => outcome.as_str()).increment(1);
                        summary.record(outcome);
                    }
                    None => break,
                },
            }
        }

        histogram!(METRIC_DISPATCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            revalidated = summary.revalidated(),
            "Revalidation complete"
        );

        summary
    }

    async fn call(
        &self,
        action: RevalidationAction,
        path: String,
        site: Arc<dyn DestinationSite>,
    ) -> CallOutcome {
        let Some(url) = site.revalidation_url(&path) else {
            warn!(
                action = %action,
                path = %path,
                site = site.label(),
                "Site has no revalidation URL"
            );
            return CallOutcome::Skipped;
        };

        let shown = redacted(&url);
        match self.transport.get(&url).await {
            Ok(response) if response.is_ok() => {
                info!(
                    action = %action,
                    path = %path,
                    site = site.label(),
                    url = %shown,
                    "Revalidated path"
                );
                CallOutcome::Success
            }
            Ok(response) => {
                error!(
                    action = %action,
                    path = %path,
                    site = site.label(),
                    url = %shown,
                    status = response.status,
                    "Revalidation was not acknowledged"
                );
                CallOutcome::Failure
            }
            Err(err) => {
                error!(
                    action = %action,
                    path = %path,
                    site = site.label(),
                    url = %shown,
                    error = %err,
                    "Revalidation request failed"
                );
                CallOutcome::Failure
            }
        }
    }
}

/// Copy of `url` with the `secret` query value masked for logging.
fn redacted(url: &Url) -> Url {
    if !url.query_pairs().any(|(key, _)| key == "secret") {
        return url.clone();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "secret" {
                "***".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();

    let mut masked = url.clone();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked
}
