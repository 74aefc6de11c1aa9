//! End-to-end tests of the plan pipeline against a stub plan service

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use errandplan::controller::{CycleOutcome, PlanController};
use errandplan::domain::{Coordinates, Location};
use errandplan::error::PlanError;
use errandplan::llm::{GeminiClient, GenerateRequest, LlmClient, LlmError, RawResponse};
use errandplan::prompts::{PlanMode, RequestComposer};
use errandplan::render::render_plan;

/// Replays saved `generateContent` bodies and records what it was asked
struct StubService {
    bodies: Mutex<Vec<serde_json::Value>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl StubService {
    fn new(bodies: Vec<serde_json::Value>) -> Arc<Self> {
        Arc::new(Self {
            bodies: Mutex::new(bodies),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for StubService {
    async fn generate(&self, request: GenerateRequest) -> Result<RawResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        let body = {
            let mut bodies = self.bodies.lock().unwrap();
            if bodies.is_empty() {
                return Err(LlmError::InvalidResponse("stub exhausted".to_string()));
            }
            bodies.remove(0)
        };
        GeminiClient::decode_response(&body)
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}

fn service_body(text: &str, chunks: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "groundingMetadata": {"groundingChunks": chunks}
        }]
    })
}

const TWO_STOP_PLAN: &str = r#"Sure! Here's the route:
```json
{
  "summary": "Groceries then the post office",
  "stops": [
    {"id": 1, "name": "Corner Market", "address": "1 Main St", "category": "Grocery",
     "reason": "milk", "arrivalEstimate": "10:00 AM", "parkingDifficulty": "Easy",
     "crowdLevel": "Low", "googleMapsUrl": "https://maps.google.com/?cid=1"},
    {"id": 2, "name": "Post Office", "address": "9 Elm St", "category": "Postal",
     "reason": "stamps", "arrivalEstimate": "10:25 AM", "parkingDifficulty": "Moderate",
     "crowdLevel": "Medium", "googleMapsUrl": "https://maps.google.com/?cid=2",
     "parkingAdvice": "Use the lot behind the building"}
  ],
  "totalTime": "40 minutes",
  "efficiencyScore": 92,
  "alternatives": [{"original": "Post office", "suggested": "Order stamps online", "benefit": "One less stop"}],
  "reasoning": "The market is closest."
}
```
Have a good trip."#;

fn controller(service: Arc<StubService>) -> PlanController {
    PlanController::new(service, RequestComposer::default(), 5, Duration::from_secs(5))
}

#[tokio::test]
async fn test_plan_cycle_end_to_end() {
    let service = StubService::new(vec![service_body(
        TWO_STOP_PLAN,
        serde_json::json!([
            {"maps": {"title": "Corner Market", "uri": "https://maps.google.com/?cid=1"}},
            {"maps": {"title": "No uri here"}},
            {"web": {"uri": "https://example.com/hours"}}
        ]),
    )]);
    let controller = controller(service.clone());
    let home = Location::from_coordinates(Coordinates::new(37.7749, -122.4194));

    let outcome = controller.run_cycle("milk, stamps", &home, PlanMode::PlanInit).await;
    assert!(outcome.is_committed());

    let state = controller.snapshot();
    let plan = state.plan.as_ref().unwrap();
    assert_eq!(plan.stops.len(), 2);
    assert_eq!(plan.stops[0].id, "1");
    assert_eq!(plan.stops[1].id, "2");
    assert_eq!(plan.stops[1].name, "Post Office");
    assert_eq!(plan.efficiency_score, 92.0);

    assert_eq!(state.links.len(), 2);
    assert_eq!(state.links[0].title, "Corner Market");
    assert_eq!(state.links[1].title, "Source");
    assert_eq!(state.history.get(0), Some("milk, stamps"));

    let requests = service.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].location, Some(home.coordinates));
    assert!(requests[0].prompt.contains("milk, stamps"));
    assert!(requests[0].prompt.contains("PLAN_INIT"));
    assert!(requests[0].prompt.contains("37.7749, -122.4194"));

    let text = render_plan(&state, &home.coordinates);
    assert!(text.contains("Use the lot behind the building"));
    assert!(text.contains("Order stamps online"));
    assert!(text.contains("https://www.google.com/maps/dir/37.7749,-122.4194/1%20Main%20St/9%20Elm%20St"));
}

#[tokio::test]
async fn test_reroute_then_bad_reply_keeps_last_good_plan() {
    let rerouted = TWO_STOP_PLAN.replace("Groceries then the post office", "Post office first");
    let service = StubService::new(vec![
        service_body(TWO_STOP_PLAN, serde_json::json!([])),
        service_body(&rerouted, serde_json::json!("not an array")),
        service_body("I'm sorry, I can't plan that.", serde_json::json!([])),
    ]);
    let controller = controller(service.clone());
    let location = Location::fallback();

    assert!(controller.run_cycle("milk, stamps", &location, PlanMode::PlanInit).await.is_committed());
    assert!(controller.run_cycle("traffic on Main", &location, PlanMode::Reroute).await.is_committed());

    let outcome = controller.run_cycle("milk, stamps", &location, PlanMode::PlanInit).await;
    assert!(matches!(outcome, CycleOutcome::Failed(PlanError::NoPlanData)));

    let state = controller.snapshot();
    assert_eq!(state.plan.as_ref().unwrap().summary, "Post office first");
    assert!(state.links.is_empty());
    assert_eq!(state.history.len(), 1);
    assert!(state.error.is_some());
    assert!(!state.busy);

    let requests = service.requests();
    assert!(requests[1].prompt.contains("REROUTE"));
    assert!(requests[1].prompt.contains("traffic on Main"));
}

#[tokio::test]
async fn test_service_failure_reports_user_message() {
    let service = StubService::new(vec![]);
    let controller = controller(service);

    let outcome = controller.run_cycle("milk", &Location::fallback(), PlanMode::PlanInit).await;

    let CycleOutcome::Failed(err) = outcome else {
        panic!("expected failure");
    };
    assert!(matches!(err, PlanError::Service(_)));
    assert_eq!(controller.snapshot().error, Some(err.user_message()));
}
