//! Pipeline entry points.
//!
//! - `run_ingest`: crawl one source, gate the records, persist the new ones
//! - `search`: look up persisted records by name

pub mod gate;
pub mod ingest;
pub mod orchestrator;
pub mod search;

pub use gate::{Admission, DedupGate};
pub use ingest::{IngestOutcome, run_ingest};
pub use orchestrator::{Orchestrator, WorkItemOutcome};
pub use search::{SearchQuery, load_catalog, search};
