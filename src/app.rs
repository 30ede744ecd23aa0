use crate::analyzer::Analyzer;
use crate::archive::Archive;
use crate::classify::classify;
use crate::config::RunConfig;
use crate::dispatch::Dispatcher;
use crate::error::{DispatchError, RunError};
use crate::ledger::Ledger;
use crate::model::loader::load_acquisition;
use crate::model::{build_cohorts, Cohort};
use crate::scan::scan_incoming;
use crate::source::SourceEditor;
use std::sync::atomic::{AtomicBool, Ordering};

/// Counters reported at the end of a pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub files: usize,
    pub unreadable: usize,
    pub cohorts: usize,
    pub dispatched: usize,
    pub unrecognised: usize,
    pub failed: usize,
    pub swept: usize,
    pub interrupted: bool,
}

/// One batch pass over the incoming tree.
///
/// Cohort failures and failed moves are logged and counted; only an
/// unreadable incoming root ends the pass with an error. `shutdown` is
/// checked between cohorts.
pub fn run_pass(
    config: &RunConfig,
    analyzer: &dyn Analyzer,
    editor: &dyn SourceEditor,
    shutdown: &AtomicBool,
) -> Result<PassSummary, RunError> {
    let mut summary = PassSummary::default();

    let files = scan_incoming(&config.data_path, config)?;
    if files.is_empty() {
        log::info!("No files in the analysis folder!");
        return Ok(summary);
    }
    summary.files = files.len();

    let mut records = Vec::with_capacity(files.len());
    for path in files {
        match load_acquisition(path) {
            Ok(record) => records.push(record),
            Err(err) => {
                log::debug!("Unable to open image: {err}");
                summary.unreadable += 1;
            }
        }
    }

    let ledger = Ledger::new(&config.save_path, config.ledger_wait);
    let archive = Archive::new(&config.data_path, &config.processed_path);
    let dispatcher = Dispatcher {
        config,
        analyzer,
        editor,
        ledger: &ledger,
        archive: &archive,
    };

    let cohorts = build_cohorts(records);
    summary.cohorts = cohorts.len();
    for mut cohort in cohorts {
        if shutdown.load(Ordering::SeqCst) {
            log::info!("Shutdown requested, leaving remaining cohorts for the next pass");
            summary.interrupted = true;
            break;
        }

        match process_cohort(&dispatcher, &mut cohort) {
            Ok(true) => summary.dispatched += 1,
            Ok(false) => {
                log::info!(
                    "Test not implemented for patient {}, date {}",
                    cohort.subject,
                    cohort.date
                );
                summary.unrecognised += 1;
            }
            Err(err) => {
                log::debug!(
                    "Cannot analyse from measurement date {} for {} due to error {err}",
                    cohort.date,
                    cohort.subject
                );
                summary.failed += 1;
            }
        }
    }

    if !summary.interrupted {
        summary.swept = archive.sweep_unanalyzed();
        archive.prune_empty_dirs();
    }

    log::info!(
        "Pass finished: {} files, {} cohorts, {} dispatched, {} unrecognised, {} failed, {} swept",
        summary.files,
        summary.cohorts,
        summary.dispatched,
        summary.unrecognised,
        summary.failed,
        summary.swept
    );
    Ok(summary)
}

fn process_cohort(dispatcher: &Dispatcher<'_>, cohort: &mut Cohort) -> Result<bool, DispatchError> {
    let slots = classify(&mut cohort.records, dispatcher.config, dispatcher.editor)?;
    log::debug!(
        "Cohort {} {}: slots {:?}",
        cohort.date,
        cohort.subject,
        slots.filled_names()
    );
    Ok(dispatcher.dispatch(&slots)?.is_some())
}
