//! Shared state behind every admin request.

use crate::matcher::Simulator;
use crate::repository::{RecordingRepository, TreeView};
use crate::status::{ServerStatus, Statistics};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

pub struct AdminState {
    pub repository: Arc<RecordingRepository>,
    pub status: Arc<ServerStatus>,
    pub statistics: Arc<Statistics>,
    pub simulator: Simulator,
    /// Last tree served, used to report whether a refresh changed it.
    pub tree_view: Mutex<TreeView>,
    /// YAML file served by `/configuration`. `None` when started without one.
    pub config_path: Option<PathBuf>,
}

impl AdminState {
    pub fn new(
        repository: Arc<RecordingRepository>,
        status: Arc<ServerStatus>,
        config_path: Option<PathBuf>,
    ) -> Self {
        let statistics = Arc::new(Statistics::new());
        let simulator = Simulator::new(Arc::clone(&repository), Arc::clone(&statistics));
        Self {
            repository,
            status,
            statistics,
            simulator,
            tree_view: Mutex::new(TreeView::new()),
            config_path,
        }
    }
}
