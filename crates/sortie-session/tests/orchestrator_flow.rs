//! Create-and-wait flows against an in-memory deployment API.
//!
//! Time is paused, so poll intervals and the polling budget are exact.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sortie_core::ErrorKind;
use sortie_core::config::PlacementStrategy;
use sortie_session::api::{
    ApiError, CreateDeploymentRequest, DeploymentApi, DeploymentStatus, PortMap, PublicIpLookup,
};
use sortie_session::orchestrator::{
    DeployError, DeployPhase, DeploymentOrchestrator, OrchestratorConfig,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const REQUEST_ID: &str = "00ab12cd34ef";

// =============================================================================
// Fakes
// =============================================================================

struct FakeApi {
    create_result: Mutex<Option<Result<String, ApiError>>>,
    statuses: Mutex<VecDeque<Result<DeploymentStatus, ApiError>>>,
    creates: Mutex<Vec<CreateDeploymentRequest>>,
    polls: Mutex<Vec<Instant>>,
}

impl FakeApi {
    fn new(statuses: Vec<Result<DeploymentStatus, ApiError>>) -> Self {
        Self {
            create_result: Mutex::new(Some(Ok(REQUEST_ID.to_string()))),
            statuses: Mutex::new(statuses.into()),
            creates: Mutex::new(Vec::new()),
            polls: Mutex::new(Vec::new()),
        }
    }

    fn failing_create(err: ApiError) -> Self {
        let api = Self::new(Vec::new());
        *api.create_result.lock().unwrap() = Some(Err(err));
        api
    }

    fn create_calls(&self) -> usize {
        self.creates.lock().unwrap().len()
    }

    fn poll_times(&self) -> Vec<Instant> {
        self.polls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeploymentApi for FakeApi {
    async fn create_deployment(&self, request: &CreateDeploymentRequest) -> Result<String, ApiError> {
        self.creates.lock().unwrap().push(request.clone());
        self.create_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(REQUEST_ID.to_string()))
    }

    async fn deployment_status(&self, request_id: &str) -> Result<DeploymentStatus, ApiError> {
        assert_eq!(request_id, REQUEST_ID);
        self.polls.lock().unwrap().push(Instant::now());
        // Once the script runs out the deployment stays "deploying".
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(deploying()))
    }
}

struct FakeIp {
    ip: Option<&'static str>,
    calls: AtomicUsize,
}

impl FakeIp {
    const fn new(ip: Option<&'static str>) -> Self {
        Self {
            ip,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PublicIpLookup for FakeIp {
    async fn public_ip(&self) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ip.map(str::to_string)
    }
}

fn deploying() -> DeploymentStatus {
    DeploymentStatus {
        current_status: Some("Status.DEPLOYING".into()),
        ..DeploymentStatus::default()
    }
}

fn ports(json: &str) -> PortMap {
    serde_json::from_str(json).unwrap()
}

fn ready(external: u16) -> DeploymentStatus {
    DeploymentStatus {
        running: true,
        fqdn: Some("b1c2d3.pr.edgegap.net".into()),
        ports: Some(ports(&format!(
            r#"{{"gameport": {{"internal": 7770, "external": {external}, "protocol": "UDP"}}}}"#
        ))),
        current_status: Some("Status.READY".into()),
        ..DeploymentStatus::default()
    }
}

fn errored() -> DeploymentStatus {
    DeploymentStatus {
        error: true,
        current_status: Some("Status.ERROR".into()),
        ..DeploymentStatus::default()
    }
}

fn config() -> OrchestratorConfig {
    let mut config = OrchestratorConfig::new("skyfight", "v3");
    config.poll_interval = Duration::from_secs(1);
    config.max_poll = Duration::from_secs(5);
    config
}

fn orchestrator(
    api: FakeApi,
    ip: FakeIp,
    config: OrchestratorConfig,
) -> DeploymentOrchestrator<FakeApi, FakeIp> {
    DeploymentOrchestrator::new(api, ip, config)
}

fn orch_api(orch: &DeploymentOrchestrator<FakeApi, FakeIp>) -> &FakeApi {
    orch.api()
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test(start_paused = true)]
async fn ready_after_a_few_polls() {
    let api = FakeApi::new(vec![Ok(deploying()), Ok(deploying()), Ok(ready(31337))]);
    let orch = orchestrator(api, FakeIp::new(Some("203.0.113.7")), config());
    let start = Instant::now();

    let result = orch
        .create_and_wait(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.request_id, REQUEST_ID);
    assert_eq!(result.fqdn, "b1c2d3.pr.edgegap.net");
    assert_eq!(result.external_port, 31337);
    assert_eq!(result.join_code.as_str(), "17V1Xry7X3n");
    assert_eq!(result.endpoint().to_string(), "b1c2d3.pr.edgegap.net:31337");
    assert_eq!(orch.phase(), DeployPhase::Ready);

    // Every poll is preceded by one interval.
    let polls = orch_api(&orch).poll_times();
    assert_eq!(polls.len(), 3);
    for (i, at) in polls.iter().enumerate() {
        let expected = Duration::from_secs(u64::try_from(i).unwrap() + 1);
        assert_eq!(at.duration_since(start), expected);
    }
}

#[tokio::test(start_paused = true)]
async fn create_request_carries_placement() {
    let api = FakeApi::new(vec![Ok(ready(7001))]);
    let orch = orchestrator(api, FakeIp::new(Some("203.0.113.7")), config());

    orch.create_and_wait(&CancellationToken::new())
        .await
        .unwrap();

    let creates = orch_api(&orch).creates.lock().unwrap().clone();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].application, "skyfight");
    assert_eq!(creates[0].version, "v3");
    assert_eq!(creates[0].users.len(), 1);
    assert_eq!(creates[0].users[0].user_type, "ip_address");
    assert_eq!(creates[0].users[0].user_data.ip_address, "203.0.113.7");
}

#[tokio::test(start_paused = true)]
async fn ready_wins_over_error_flag() {
    let mut status = ready(7001);
    status.error = true;
    let orch = orchestrator(
        FakeApi::new(vec![Ok(status)]),
        FakeIp::new(Some("203.0.113.7")),
        config(),
    );

    let result = orch
        .create_and_wait(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.external_port, 7001);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test(start_paused = true)]
async fn error_state_stops_polling() {
    let orch = orchestrator(
        FakeApi::new(vec![Ok(deploying()), Ok(errored()), Ok(ready(7001))]),
        FakeIp::new(Some("203.0.113.7")),
        config(),
    );

    let err = orch
        .create_and_wait(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::DeploymentError { ref request_id } if request_id == REQUEST_ID));
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(orch.phase(), DeployPhase::Error);
    assert_eq!(orch_api(&orch).poll_times().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn polling_budget_is_wall_clock() {
    let orch = orchestrator(
        FakeApi::new(Vec::new()),
        FakeIp::new(Some("203.0.113.7")),
        config(),
    );
    let start = Instant::now();

    let err = orch
        .create_and_wait(&CancellationToken::new())
        .await
        .unwrap_err();

    let elapsed = start.elapsed();
    assert!(
        matches!(err, DeployError::PollTimeout { budget, .. } if budget == Duration::from_secs(5))
    );
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(elapsed >= Duration::from_secs(5), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(6), "elapsed {elapsed:?}");
    assert_eq!(orch.phase(), DeployPhase::TimedOut);

    let polls = orch_api(&orch).poll_times().len();
    assert!((4..=5).contains(&polls), "polls {polls}");
}

#[tokio::test(start_paused = true)]
async fn running_without_external_port_fails() {
    let status = DeploymentStatus {
        running: true,
        fqdn: Some("b1c2d3.pr.edgegap.net".into()),
        ports: Some(ports(r#"{"gameport": {"internal": 7770, "protocol": "UDP"}}"#)),
        ..DeploymentStatus::default()
    };
    let orch = orchestrator(
        FakeApi::new(vec![Ok(status)]),
        FakeIp::new(Some("203.0.113.7")),
        config(),
    );

    let err = orch
        .create_and_wait(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::NoExternalPort { .. }));
}

#[tokio::test(start_paused = true)]
async fn rejected_create_is_not_retried() {
    let api = FakeApi::failing_create(ApiError::Status {
        status: 422,
        body: r#"{"message":"unknown version"}"#.into(),
    });
    let orch = orchestrator(api, FakeIp::new(Some("203.0.113.7")), config());

    let err = orch
        .create_and_wait(&CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        DeployError::CreateFailed { status, ref body } => {
            assert_eq!(status, 422);
            assert!(body.contains("unknown version"));
        }
        other => panic!("expected CreateFailed, got {other:?}"),
    }
    assert_eq!(orch_api(&orch).create_calls(), 1);
    assert!(orch_api(&orch).poll_times().is_empty());
    assert_eq!(orch.phase(), DeployPhase::Error);
}

#[tokio::test(start_paused = true)]
async fn status_http_failure_surfaces() {
    let orch = orchestrator(
        FakeApi::new(vec![Err(ApiError::Status {
            status: 503,
            body: "unavailable".into(),
        })]),
        FakeIp::new(Some("203.0.113.7")),
        config(),
    );

    let err = orch
        .create_and_wait(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::StatusFailed { status: 503, .. }));
}

#[tokio::test(start_paused = true)]
async fn missing_public_ip_fails_before_create() {
    let orch = orchestrator(FakeApi::new(Vec::new()), FakeIp::new(None), config());

    let err = orch
        .create_and_wait(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::PublicIpUnavailable));
    assert_eq!(orch_api(&orch).create_calls(), 0);
}

// =============================================================================
// Configuration checks happen before any network call
// =============================================================================

#[tokio::test(start_paused = true)]
async fn no_placement_strategy_makes_no_calls() {
    let mut cfg = config();
    cfg.placement = PlacementStrategy::None;
    let orch = orchestrator(FakeApi::new(Vec::new()), FakeIp::new(Some("203.0.113.7")), cfg);

    let err = orch
        .create_and_wait(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::NoPlacementStrategy));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(orch_api(&orch).create_calls(), 0);
    assert_eq!(orch.ip_lookup().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn blank_app_name_makes_no_calls() {
    let mut cfg = config();
    cfg.app_name = "  ".into();
    let orch = orchestrator(FakeApi::new(Vec::new()), FakeIp::new(Some("203.0.113.7")), cfg);

    let err = orch
        .create_and_wait(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::InvalidConfiguration(_)));
    assert_eq!(orch_api(&orch).create_calls(), 0);
}

// =============================================================================
// Cancellation and progress
// =============================================================================

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_polling() {
    let orch = orchestrator(
        FakeApi::new(Vec::new()),
        FakeIp::new(Some("203.0.113.7")),
        config(),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        trigger.cancel();
    });

    let err = orch.create_and_wait(&cancel).await.unwrap_err();

    assert!(matches!(err, DeployError::Cancelled));
    assert_eq!(orch.phase(), DeployPhase::Cancelled);
    assert_eq!(orch_api(&orch).poll_times().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn phases_are_published() {
    let orch = orchestrator(
        FakeApi::new(vec![Ok(deploying()), Ok(ready(7001))]),
        FakeIp::new(Some("203.0.113.7")),
        config(),
    );
    let mut rx = orch.subscribe();
    assert_eq!(*rx.borrow(), DeployPhase::Idle);

    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let phase = *rx.borrow_and_update();
            seen.push(phase);
            if phase.is_terminal() {
                break;
            }
        }
        seen
    });

    orch.create_and_wait(&CancellationToken::new())
        .await
        .unwrap();
    let seen = watcher.await.unwrap();

    assert_eq!(seen.last(), Some(&DeployPhase::Ready));
    assert!(seen.contains(&DeployPhase::Polling));
}
