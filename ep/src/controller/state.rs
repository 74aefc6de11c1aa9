//! Plan state
//!
//! Everything the view needs: the last accepted plan, its citations, the
//! request history, the current error message and the busy flag.

use serde::Serialize;

use crate::domain::{ErrandPlan, GroundingLink, RequestHistory};

/// Session-level plan state, owned by the controller
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanState {
    /// Most recently accepted plan
    pub plan: Option<ErrandPlan>,

    /// Citations for `plan`; rebuilt alongside it
    pub links: Vec<GroundingLink>,

    pub history: RequestHistory,

    /// User-facing message from the last failed cycle
    pub error: Option<String>,

    /// A generation is in flight
    pub busy: bool,
}

impl PlanState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: RequestHistory::new(history_capacity),
            ..Default::default()
        }
    }

    pub fn has_plan(&self) -> bool {
        self.plan.is_some()
    }

    /// Replace plan and citations wholesale
    pub(crate) fn commit(&mut self, plan: ErrandPlan, links: Vec<GroundingLink>) {
        self.plan = Some(plan);
        self.links = links;
        self.error = None;
    }

    /// Discard plan, citations and error; history survives
    pub fn reset(&mut self) {
        self.plan = None;
        self.links.clear();
        self.error = None;
    }
}
