//! PlanController - runs request cycles against the plan service
//!
//! One cycle: compose prompt, call the service under a timeout, parse, and
//! commit. Every cycle takes a ticket from a generation counter; only the
//! holder of the newest ticket may write to the state, so a superseded
//! response can never overwrite a later one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::state::PlanState;
use crate::config::Config;
use crate::domain::{ErrandPlan, GroundingLink, Location};
use crate::error::PlanError;
use crate::llm::{GenerateRequest, LlmClient, create_client};
use crate::parser;
use crate::prompts::{PlanMode, PromptLoader, RequestComposer};

/// How a cycle ended
#[derive(Debug)]
pub enum CycleOutcome {
    /// New plan is in the state
    Committed,
    /// Initial generation with empty input; nothing happened
    Skipped,
    /// A newer cycle started; this one wrote nothing
    Superseded,
    /// The cycle failed; the error message is in the state
    Failed(PlanError),
}

impl CycleOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Owns the plan state and drives request cycles
pub struct PlanController {
    client: Arc<dyn LlmClient>,
    composer: RequestComposer,
    state: Mutex<PlanState>,
    generation: AtomicU64,
    in_flight: Mutex<Option<AbortHandle>>,
    timeout: Duration,
}

/// Clears `busy` when the cycle that set it ends, however it ends
struct BusyGuard<'a> {
    controller: &'a PlanController,
    ticket: u64,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.controller.lock_state();
        if self.controller.is_current(self.ticket) {
            debug!(ticket = self.ticket, "BusyGuard::drop: clearing busy");
            state.busy = false;
        }
    }
}

impl PlanController {
    pub fn new(client: Arc<dyn LlmClient>, composer: RequestComposer, history_capacity: usize, timeout: Duration) -> Self {
        debug!(client = %client.describe(), history_capacity, ?timeout, "PlanController::new: called");
        Self {
            client,
            composer,
            state: Mutex::new(PlanState::new(history_capacity)),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            timeout,
        }
    }

    /// Build a controller wired to the configured plan service
    ///
    /// Prompt overrides are looked up under `prompt_base`.
    pub fn from_config(config: &Config, prompt_base: impl AsRef<std::path::Path>) -> eyre::Result<Self> {
        debug!("PlanController::from_config: called");
        let client = create_client(&config.llm).map_err(|e| eyre::eyre!("Failed to create plan service client: {}", e))?;
        let composer = RequestComposer::new(PromptLoader::new(prompt_base));
        Ok(Self::new(
            client,
            composer,
            config.history.capacity,
            Duration::from_millis(config.llm.timeout_ms),
        ))
    }

    fn lock_state(&self) -> MutexGuard<'_, PlanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Copy of the current state for rendering
    pub fn snapshot(&self) -> PlanState {
        self.lock_state().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock_state().busy
    }

    /// Request text at `index` in the history, most recent first
    pub fn recall(&self, index: usize) -> Option<String> {
        self.lock_state().history.get(index).map(str::to_string)
    }

    /// Discard the plan on explicit user request
    pub fn reset(&self) {
        debug!("PlanController::reset: called");
        self.lock_state().reset();
    }

    fn should_skip(request: &str, mode: PlanMode) -> bool {
        mode == PlanMode::PlanInit && request.trim().is_empty()
    }

    /// Issue a new ticket, mark busy and clear the previous error
    fn begin(&self) -> u64 {
        let mut state = self.lock_state();
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        state.busy = true;
        state.error = None;
        ticket
    }

    /// Run one cycle to completion on the current task
    pub async fn run_cycle(&self, request: &str, location: &Location, mode: PlanMode) -> CycleOutcome {
        debug!(request_len = request.len(), %mode, "PlanController::run_cycle: called");
        if Self::should_skip(request, mode) {
            debug!("PlanController::run_cycle: empty initial request, skipping");
            return CycleOutcome::Skipped;
        }
        let ticket = self.begin();
        self.run_ticketed(ticket, request, location, mode).await
    }

    /// Start a cycle in the background, cancelling any cycle still running
    pub fn submit(self: &Arc<Self>, request: String, location: Location, mode: PlanMode) -> JoinHandle<CycleOutcome> {
        debug!(request_len = request.len(), %mode, "PlanController::submit: called");
        if Self::should_skip(&request, mode) {
            return tokio::spawn(async { CycleOutcome::Skipped });
        }

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket = self.begin();
        if let Some(previous) = in_flight.take() {
            debug!(ticket, "PlanController::submit: replacing in-flight cycle");
            previous.abort();
        }

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.run_ticketed(ticket, &request, &location, mode).await });
        *in_flight = Some(handle.abort_handle());
        handle
    }

    /// Abort the running cycle, if any, and clear `busy`
    pub fn cancel(&self) {
        debug!("PlanController::cancel: called");
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = in_flight.take() {
            previous.abort();
        }
        let mut state = self.lock_state();
        self.generation.fetch_add(1, Ordering::SeqCst);
        state.busy = false;
    }

    async fn run_ticketed(&self, ticket: u64, request: &str, location: &Location, mode: PlanMode) -> CycleOutcome {
        let _busy = BusyGuard { controller: self, ticket };
        let request_id = Uuid::now_v7();
        let span = info_span!("plan_cycle", %request_id, ticket, %mode);

        info!(parent: &span, client = %self.client.describe(), "Plan cycle started");
        match self.attempt(request, location, mode).instrument(span.clone()).await {
            Ok((plan, links)) => self.commit(ticket, request, mode, plan, links),
            Err(err) => {
                warn!(parent: &span, error = %err, "Plan cycle failed");
                self.fail(ticket, err)
            }
        }
    }

    async fn attempt(
        &self,
        request: &str,
        location: &Location,
        mode: PlanMode,
    ) -> Result<(ErrandPlan, Vec<GroundingLink>), PlanError> {
        let prompt = self
            .composer
            .compose_now(request, location, mode)
            .map_err(|e| PlanError::Prompt(e.to_string()))?;
        debug!(prompt_len = prompt.len(), "attempt: prompt composed");

        let generate = self
            .client
            .generate(GenerateRequest::new(prompt, Some(location.coordinates)));
        let raw = tokio::time::timeout(self.timeout, generate)
            .await
            .map_err(|_| PlanError::Timeout(self.timeout))??;
        debug!(text_len = raw.text.len(), citations = raw.citations.len(), "attempt: response received");

        Ok(parser::ingest(&raw)?)
    }

    fn commit(
        &self,
        ticket: u64,
        request: &str,
        mode: PlanMode,
        plan: ErrandPlan,
        links: Vec<GroundingLink>,
    ) -> CycleOutcome {
        let mut state = self.lock_state();
        if !self.is_current(ticket) {
            debug!(ticket, "commit: superseded, dropping result");
            return CycleOutcome::Superseded;
        }

        info!(ticket, stops = plan.stops.len(), links = links.len(), "Plan committed");
        state.commit(plan, links);
        if !mode.is_reroute() {
            state.history.record(request);
        }
        CycleOutcome::Committed
    }

    fn fail(&self, ticket: u64, err: PlanError) -> CycleOutcome {
        let mut state = self.lock_state();
        if !self.is_current(ticket) {
            debug!(ticket, "fail: superseded, dropping error");
            return CycleOutcome::Superseded;
        }

        state.error = Some(err.user_message());
        CycleOutcome::Failed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::{MockLlmClient, MockReply};
    use crate::llm::{CitationCandidate, LlmError, RawResponse};

    fn plan_json(summary: &str) -> String {
        format!(
            r#"```json
{{"summary":"{}","stops":[{{"id":"1","name":"Market","address":"1 Main St","category":"Grocery","reason":"milk","arrivalEstimate":"10:00 AM","parkingDifficulty":"Easy","crowdLevel":"Low","googleMapsUrl":"https://maps.google.com/?q=1"}}],"totalTime":"20m","efficiencyScore":90,"reasoning":"short"}}
```"#,
            summary
        )
    }

    fn controller(replies: Vec<MockReply>) -> (Arc<PlanController>, Arc<MockLlmClient>) {
        controller_with_timeout(replies, Duration::from_secs(5))
    }

    fn controller_with_timeout(replies: Vec<MockReply>, timeout: Duration) -> (Arc<PlanController>, Arc<MockLlmClient>) {
        let client = Arc::new(MockLlmClient::new(replies));
        let controller = PlanController::new(client.clone(), RequestComposer::default(), 5, timeout);
        (Arc::new(controller), client)
    }

    fn summary(state: &PlanState) -> Option<&str> {
        state.plan.as_ref().map(|p| p.summary.as_str())
    }

    #[tokio::test]
    async fn test_success_commits_plan_links_and_history() {
        let response = RawResponse::text(plan_json("first")).with_citations(vec![
            CitationCandidate::new(Some("Market"), Some("https://maps.google.com/?cid=1")),
            CitationCandidate::new(Some("No link"), None),
        ]);
        let (controller, client) = controller(vec![MockReply::response(response)]);

        let outcome = controller.run_cycle("milk", &Location::fallback(), PlanMode::PlanInit).await;

        assert!(outcome.is_committed());
        let state = controller.snapshot();
        assert_eq!(summary(&state), Some("first"));
        assert_eq!(state.links.len(), 1);
        assert_eq!(state.history.get(0), Some("milk"));
        assert!(!state.busy);
        assert!(state.error.is_none());
        assert!(client.prompts()[0].contains("PLAN_INIT"));
    }

    #[tokio::test]
    async fn test_reroute_does_not_touch_history() {
        let (controller, client) = controller(vec![MockReply::ok(plan_json("first")), MockReply::ok(plan_json("rerouted"))]);
        let location = Location::fallback();

        controller.run_cycle("milk", &location, PlanMode::PlanInit).await;
        let outcome = controller.run_cycle("", &location, PlanMode::Reroute).await;

        assert!(outcome.is_committed());
        let state = controller.snapshot();
        assert_eq!(summary(&state), Some("rerouted"));
        assert_eq!(state.history.len(), 1);
        assert!(client.prompts()[1].contains("REROUTE"));
    }

    #[tokio::test]
    async fn test_no_plan_data_keeps_previous_plan() {
        let first = RawResponse::text(plan_json("first"))
            .with_citations(vec![CitationCandidate::new(Some("Market"), Some("https://maps.google.com/?cid=1"))]);
        let (controller, _) = controller(vec![MockReply::response(first), MockReply::ok("I could not help with that.")]);
        let location = Location::fallback();

        controller.run_cycle("milk", &location, PlanMode::PlanInit).await;
        let outcome = controller.run_cycle("stamps", &location, PlanMode::PlanInit).await;

        assert!(matches!(outcome, CycleOutcome::Failed(PlanError::NoPlanData)));
        let state = controller.snapshot();
        assert_eq!(summary(&state), Some("first"));
        assert_eq!(state.links.len(), 1);
        assert_eq!(state.history.len(), 1);
        assert!(state.error.is_some());
        assert!(!state.busy);
    }

    #[tokio::test]
    async fn test_malformed_keeps_previous_plan() {
        let (controller, _) = controller(vec![
            MockReply::ok(plan_json("first")),
            MockReply::ok(r#"{"summary": "broken", "stops": [}"#),
        ]);
        let location = Location::fallback();

        controller.run_cycle("milk", &location, PlanMode::PlanInit).await;
        let outcome = controller.run_cycle("stamps", &location, PlanMode::PlanInit).await;

        assert!(matches!(outcome, CycleOutcome::Failed(PlanError::MalformedPlan(_))));
        assert_eq!(summary(&controller.snapshot()), Some("first"));
    }

    #[tokio::test]
    async fn test_service_error_sets_message() {
        let (controller, _) = controller(vec![MockReply::err(LlmError::ApiError {
            status: 500,
            message: "boom".to_string(),
        })]);

        let outcome = controller.run_cycle("milk", &Location::fallback(), PlanMode::PlanInit).await;

        assert!(matches!(outcome, CycleOutcome::Failed(PlanError::Service(_))));
        let state = controller.snapshot();
        assert!(state.plan.is_none());
        assert_eq!(state.error.as_deref(), Some("Failed to generate a plan. Please try again."));
        assert!(!state.busy);
    }

    #[tokio::test]
    async fn test_error_cleared_by_next_success() {
        let (controller, _) = controller(vec![MockReply::ok("nothing"), MockReply::ok(plan_json("ok"))]);
        let location = Location::fallback();

        controller.run_cycle("milk", &location, PlanMode::PlanInit).await;
        assert!(controller.snapshot().error.is_some());

        controller.run_cycle("milk", &location, PlanMode::PlanInit).await;
        assert!(controller.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_failure() {
        let (controller, _) = controller_with_timeout(
            vec![MockReply::ok(plan_json("late")).delayed(Duration::from_secs(2))],
            Duration::from_millis(30),
        );

        let outcome = controller.run_cycle("milk", &Location::fallback(), PlanMode::PlanInit).await;

        assert!(matches!(outcome, CycleOutcome::Failed(PlanError::Timeout(_))));
        let state = controller.snapshot();
        assert!(state.plan.is_none());
        assert!(!state.busy);
    }

    #[tokio::test]
    async fn test_empty_initial_request_is_skipped() {
        let (controller, client) = controller(vec![]);

        let outcome = controller.run_cycle("   \n", &Location::fallback(), PlanMode::PlanInit).await;

        assert!(matches!(outcome, CycleOutcome::Skipped));
        assert_eq!(client.call_count(), 0);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_history_capped_after_six_generations() {
        let replies = (0..6).map(|i| MockReply::ok(plan_json(&format!("plan {}", i)))).collect();
        let (controller, _) = controller(replies);
        let location = Location::fallback();

        for i in 0..6 {
            controller
                .run_cycle(&format!("request {}", i), &location, PlanMode::PlanInit)
                .await;
        }

        let state = controller.snapshot();
        let entries: Vec<&str> = state.history.entries().collect();
        assert_eq!(
            entries,
            vec!["request 5", "request 4", "request 3", "request 2", "request 1"]
        );
        assert_eq!(controller.recall(0).as_deref(), Some("request 5"));
        assert_eq!(controller.recall(5), None);
    }

    #[tokio::test]
    async fn test_configured_capacity_above_five_is_capped() {
        let replies = (0..6).map(|i| MockReply::ok(plan_json(&format!("plan {}", i)))).collect();
        let client = Arc::new(MockLlmClient::new(replies));
        let controller = PlanController::new(client, RequestComposer::default(), 8, Duration::from_secs(5));
        let location = Location::fallback();

        for i in 0..6 {
            controller
                .run_cycle(&format!("request {}", i), &location, PlanMode::PlanInit)
                .await;
        }

        let state = controller.snapshot();
        assert_eq!(state.history.len(), 5);
        assert_eq!(state.history.get(4), Some("request 1"));
    }

    #[tokio::test]
    async fn test_superseded_response_does_not_overwrite() {
        let (controller, _) = controller(vec![
            MockReply::ok(plan_json("stale")).delayed(Duration::from_millis(100)),
            MockReply::ok(plan_json("fresh")),
        ]);
        let location = Location::fallback();

        let (slow, fast) = tokio::join!(controller.run_cycle("old", &location, PlanMode::PlanInit), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            controller.run_cycle("new", &location, PlanMode::PlanInit).await
        });

        assert!(matches!(slow, CycleOutcome::Superseded));
        assert!(fast.is_committed());
        let state = controller.snapshot();
        assert_eq!(summary(&state), Some("fresh"));
        assert_eq!(state.history.entries().collect::<Vec<_>>(), vec!["new"]);
        assert!(!state.busy);
    }

    #[tokio::test]
    async fn test_submit_cancels_and_replaces() {
        let (controller, client) = controller(vec![MockReply::ok(plan_json("second"))]);
        let location = Location::fallback();

        let first = controller.submit("first".to_string(), location.clone(), PlanMode::PlanInit);
        let second = controller.submit("second".to_string(), location, PlanMode::PlanInit);

        let first = first.await;
        assert!(first.is_err_and(|e| e.is_cancelled()));
        assert!(second.await.unwrap().is_committed());

        let state = controller.snapshot();
        assert_eq!(summary(&state), Some("second"));
        assert!(!state.busy);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_busy_while_in_flight() {
        let (controller, _) =
            controller(vec![MockReply::ok(plan_json("ok")).delayed(Duration::from_millis(50))]);

        let handle = controller.submit("milk".to_string(), Location::fallback(), PlanMode::PlanInit);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(controller.is_busy());

        assert!(handle.await.unwrap().is_committed());
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_cancel_clears_busy_and_keeps_state() {
        let (controller, _) =
            controller(vec![MockReply::ok(plan_json("never")).delayed(Duration::from_secs(5))]);

        let handle = controller.submit("milk".to_string(), Location::fallback(), PlanMode::PlanInit);
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.cancel();

        assert!(handle.await.is_err_and(|e| e.is_cancelled()));
        let state = controller.snapshot();
        assert!(!state.busy);
        assert!(state.plan.is_none());
        assert!(state.history.is_empty());
    }

    #[tokio::test]
    async fn test_submit_skips_empty_initial_request() {
        let (controller, client) = controller(vec![]);
        let outcome = controller
            .submit(String::new(), Location::fallback(), PlanMode::PlanInit)
            .await
            .unwrap();
        assert!(matches!(outcome, CycleOutcome::Skipped));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reset_discards_plan_keeps_history() {
        let (controller, _) = controller(vec![MockReply::ok(plan_json("ok"))]);
        controller.run_cycle("milk", &Location::fallback(), PlanMode::PlanInit).await;

        controller.reset();

        let state = controller.snapshot();
        assert!(!state.has_plan());
        assert!(state.links.is_empty());
        assert_eq!(state.history.len(), 1);
    }
}
