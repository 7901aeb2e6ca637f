use std::sync::Arc;
use std::time::Duration;

use bento_core::analysis::AnalysisPolicy;

use crate::narrative::NarrativeGenerator;

#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<AnalysisPolicy>,
    /// Built once per process; shared across requests.
    pub narrator: Arc<dyn NarrativeGenerator>,
    pub narrative_timeout: Duration,
}

impl AppState {
    pub fn new(
        policy: AnalysisPolicy,
        narrator: Arc<dyn NarrativeGenerator>,
        narrative_timeout: Duration,
    ) -> Self {
        Self {
            policy: Arc::new(policy),
            narrator,
            narrative_timeout,
        }
    }
}
