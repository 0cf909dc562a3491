use std::sync::Arc;

use crate::config::MeshConfig;
use crate::counters::MeshCounters;
use crate::diagnostics::WarningLog;
use crate::layout::VertexLayout;

/// Shared, read-mostly state every mesh construction needs. The layout is
/// derived from the config once, here.
#[derive(Debug, Clone)]
pub struct MeshContext {
    pub config: MeshConfig,
    pub layout: VertexLayout,
    pub counters: Arc<MeshCounters>,
    pub warnings: Arc<WarningLog>,
}

impl MeshContext {
    pub fn new(config: MeshConfig) -> Self {
        Self::with_counters(config, Arc::new(MeshCounters::new()))
    }

    pub fn with_counters(config: MeshConfig, counters: Arc<MeshCounters>) -> Self {
        let layout = VertexLayout::from_config(&config);
        Self {
            config,
            layout,
            counters,
            warnings: Arc::new(WarningLog::new()),
        }
    }
}

impl Default for MeshContext {
    fn default() -> Self {
        Self::new(MeshConfig::default())
    }
}
