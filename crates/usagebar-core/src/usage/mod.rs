//! Usage monitoring: fetch the organization usage endpoints and parse them
//! into a flat snapshot.
//!
//! The service owns the only writer of the snapshot channel; every consumer
//! holds a receiver and re-reads the latest value when notified.

pub mod fetcher;
pub mod parser;
pub mod types;

pub use fetcher::{
    endpoints, usage_channel, Endpoints, FetchError, FetchResult, RawResponse, RefreshOutcome,
    Transport, UreqTransport, UsageClient, UsageService, UsageSnapshotReceiver,
    UsageSnapshotSender, DEFAULT_API_ROOT,
};
pub use parser::{parse_overage_body, parse_reset_time, parse_usage_body};
pub use types::{OverageReport, UsageReport, UsageSnapshot, WindowReport};
