//! Batch triage of QA acquisitions: group by date and device, recognise the
//! test each group belongs to, analyse it, record the result and archive the
//! files.

pub mod analyzer;
pub mod app;
pub mod archive;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod model;
pub mod scan;
pub mod source;
pub mod utils;

pub use app::{run_pass, PassSummary};
pub use config::RunConfig;
