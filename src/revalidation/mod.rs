//! Path revalidation
//!
//! Turns a record action (insert, update, predelete) into a set of URL
//! paths and asks every destination site to refresh each of them:
//!
//! - **Resolution**: `{field.path}` placeholders in configured templates are
//!   replaced by values read from the record graph
//! - **Hierarchy**: every path also revalidates its ancestors up to `/`
//! - **Normalization**: schemes are rejected, paths are case-folded and
//!   deduplicated
//! - **Dispatch**: one call per `(path, site)` pair, aggregated with OR
//!
//! ## Configuration
//!
//! ```toml
//! [[sites]]
//! id = "blog"
//! label = "Blog"
//! base_url = "https://blog.example.com"
//! revalidate_url = "https://blog.example.com/api/revalidate"
//! secret = "change-me"
//!
//! [[revalidators]]
//! entity_type = "node"
//! bundle = "article"
//! revalidate_page = true
//! additional_paths = "/blog\n/tags/{field_tags}"
//! ```

mod action;
mod config;
mod dispatcher;
mod error;
mod expander;
mod extractor;
mod field_path;
mod format;
mod hierarchy;
mod normalizer;
mod resolver;
mod site;
mod transport;

pub use action::{ActionPayload, RevalidationAction};
pub use config::{RevalidatorSettings, settings_for, split_paths};
pub use dispatcher::{
    CancelHandle, CancelSignal, DEFAULT_CONCURRENCY, DispatchOptions, DispatchSummary,
    PathRevalidator,
};
pub use error::{ResolveError, TransportError};
pub use expander::{DEFAULT_MAX_EXPANDED_PATHS, TemplateExpander, VariableValues};
pub use extractor::{DEFAULT_MAX_TRAVERSAL_DEPTH, FieldValueExtractor};
pub use field_path::FieldPath;
pub use format::{FORMAT_RULES, FormatRule, format_item};
pub use hierarchy::ancestors;
pub use normalizer::{DEFAULT_LISTING_ROOT, PathNormalizer};
pub use resolver::{VariableResolver, placeholders};
pub use site::{ConfiguredSite, DestinationSite};
pub use transport::{RevalidationTransport, TransportResponse};
