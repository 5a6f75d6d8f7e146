//! Process-scoped state shared by every request.
//!
//! Each member is initialized at most once and read thereafter. Nothing
//! here is shared across processes.

use super::audit::ReportDirectory;
use super::credentials::PrincipalCache;
use super::target::WordCounts;
use crate::config::Settings;
use crate::ports::{Clock, IdGenerator};

/// Caches that live as long as the process.
#[derive(Debug)]
pub struct ProcessState {
    /// Principal name to current-store row id.
    pub principals: PrincipalCache,
    /// Title to word count, from the snapshot.
    pub words: WordCounts,
    /// Audit file-sink directory, fixed at start.
    pub report_dir: ReportDirectory,
}

impl ProcessState {
    /// Creates empty caches and fixes the report directory now.
    #[must_use]
    pub fn start(settings: &Settings, clock: &dyn Clock, ids: &dyn IdGenerator) -> Self {
        Self {
            principals: PrincipalCache::new(),
            words: WordCounts::new(),
            report_dir: ReportDirectory::resolve(
                &settings.reports_dir,
                &settings.report_group,
                clock,
                ids,
            ),
        }
    }
}
