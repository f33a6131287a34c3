//! Lifecycle - Drive one remote resource through apply, fetch and delete
//!
//! The remote API is eventually consistent: writes may answer with a handle
//! to a long-running operation, and some deletes cannot be tracked through
//! their operation at all. `Reconciler` hides this behind three calls that
//! return once the resource has reached a terminal state or the deadline
//! has passed.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::provider::{BoxFuture, ProviderError, ProviderResult};

/// Result of a single read
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

/// Handle used to poll a long-running operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub kind: OperationHandleKind,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationHandleKind {
    /// Status document with a `status` field
    AsyncOperation,
    /// Location that answers 202 until the operation is done
    Location,
    /// The resource itself, read until `properties.provisioningState` is terminal
    ProvisioningState,
}

/// How the API answered a write request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The change took effect synchronously
    Completed,
    /// The change is running in the background
    Pending(OperationHandle),
}

/// Status reported by a long-running operation handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed(String),
    Canceled,
}

/// Remote API for one resource type
pub trait RemoteApi: Send + Sync {
    type Id: fmt::Display + Send + Sync;
    type Model: Send;

    fn get<'a>(&'a self, id: &'a Self::Id) -> BoxFuture<'a, ProviderResult<Lookup<Self::Model>>>;

    fn create_or_update<'a>(
        &'a self,
        id: &'a Self::Id,
        model: &'a Self::Model,
    ) -> BoxFuture<'a, ProviderResult<Submission>>;

    fn delete<'a>(&'a self, id: &'a Self::Id) -> BoxFuture<'a, ProviderResult<Submission>>;

    fn operation_status<'a>(
        &'a self,
        handle: &'a OperationHandle,
    ) -> BoxFuture<'a, ProviderResult<OperationStatus>>;
}

/// How `Reconciler::delete` decides that a delete has finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteConfirmation {
    /// Trust the delete operation's own status handle
    OperationStatus,
    /// Re-read the resource until it is gone, ignoring the operation handle
    ExistenceProbe,
}

/// State of the delete confirmation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
    Pending,
    Deleted,
    Failed,
}

impl DeleteState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DeleteState::Pending)
    }
}

impl fmt::Display for DeleteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeleteState::Pending => "Pending",
            DeleteState::Deleted => "Deleted",
            DeleteState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

pub const DEFAULT_OPERATION_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_DELETE_PROBE_INTERVAL: Duration = Duration::from_secs(15);
/// Shortest accepted interval between two operation status polls
pub const MIN_OPERATION_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Point in time a wait must end by; `None` when the timeout is too large to represent
type Deadline = Option<Instant>;

/// Drives a single resource against a `RemoteApi`
pub struct Reconciler<A> {
    api: A,
    clock: Arc<dyn Clock>,
    operation_poll_interval: Duration,
    delete_probe_interval: Duration,
}

impl<A: RemoteApi> Reconciler<A> {
    pub fn new(api: A, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            clock,
            operation_poll_interval: DEFAULT_OPERATION_POLL_INTERVAL,
            delete_probe_interval: DEFAULT_DELETE_PROBE_INTERVAL,
        }
    }

    /// Time between two operation status polls, at least `MIN_OPERATION_POLL_INTERVAL`
    pub fn with_operation_poll_interval(mut self, interval: Duration) -> Self {
        self.operation_poll_interval = interval.max(MIN_OPERATION_POLL_INTERVAL);
        self
    }

    /// Time between two existence probes during delete, at least `DEFAULT_DELETE_PROBE_INTERVAL`
    pub fn with_delete_probe_interval(mut self, interval: Duration) -> Self {
        self.delete_probe_interval = interval.max(DEFAULT_DELETE_PROBE_INTERVAL);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Create or update the resource and wait for the write to finish
    pub async fn apply(&self, id: &A::Id, model: &A::Model, timeout: Duration) -> ProviderResult<()> {
        let deadline = self.deadline(timeout);

        log::info!("Creating/updating {}", id);
        let submission = self
            .api
            .create_or_update(id, model)
            .await
            .map_err(|e| e.context("creating/updating", id))?;

        match submission {
            Submission::Completed => Ok(()),
            Submission::Pending(handle) => self
                .wait_for_operation(&handle, deadline)
                .await
                .map_err(|e| e.context("waiting for creation/update of", id)),
        }
    }

    /// Read the resource once
    pub async fn fetch(&self, id: &A::Id) -> ProviderResult<Lookup<A::Model>> {
        self.api
            .get(id)
            .await
            .map_err(|e| e.context("retrieving", id))
    }

    /// Delete the resource and wait until it is confirmed gone
    pub async fn delete(
        &self,
        id: &A::Id,
        timeout: Duration,
        confirmation: DeleteConfirmation,
    ) -> ProviderResult<()> {
        let deadline = self.deadline(timeout);

        log::info!("Deleting {}", id);
        let submission = self
            .api
            .delete(id)
            .await
            .map_err(|e| e.context("deleting", id))?;

        match (confirmation, submission) {
            (DeleteConfirmation::ExistenceProbe, _) => {
                log::debug!("Waiting for {} to be deleted", id);
                self.wait_until_gone(id, deadline)
                    .await
                    .map_err(|e| e.context("waiting for deletion of", id))
            }
            (DeleteConfirmation::OperationStatus, Submission::Completed) => Ok(()),
            (DeleteConfirmation::OperationStatus, Submission::Pending(handle)) => self
                .wait_for_operation(&handle, deadline)
                .await
                .map_err(|e| e.context("waiting for deletion of", id)),
        }
    }

    /// Poll an operation handle until it reports a terminal status
    async fn wait_for_operation(
        &self,
        handle: &OperationHandle,
        deadline: Deadline,
    ) -> ProviderResult<()> {
        loop {
            match self.api.operation_status(handle).await? {
                OperationStatus::Succeeded => return Ok(()),
                OperationStatus::Failed(message) => {
                    return Err(ProviderError::request(format!("operation failed: {}", message)));
                }
                OperationStatus::Canceled => {
                    return Err(ProviderError::request("operation was cancelled"));
                }
                OperationStatus::InProgress => {
                    log::debug!("Operation {} still in progress", handle.url);
                }
            }

            if !self.tick(self.operation_poll_interval, deadline).await {
                return Err(ProviderError::timeout(
                    "timed out waiting for the operation to complete",
                ));
            }
        }
    }

    /// Probe the resource until a read reports it missing
    async fn wait_until_gone(&self, id: &A::Id, deadline: Deadline) -> ProviderResult<()> {
        let mut state = DeleteState::Pending;
        loop {
            let (next, failure) = match self.api.get(id).await {
                Ok(Lookup::NotFound) => (DeleteState::Deleted, None),
                Ok(Lookup::Found(_)) => (DeleteState::Pending, None),
                Err(e) => (DeleteState::Failed, Some(e)),
            };
            if next != state {
                log::debug!("{}: {} -> {}", id, state, next);
                state = next;
            }

            if let Some(e) = failure {
                return Err(e.context("retrieving", id));
            }
            if state == DeleteState::Deleted {
                return Ok(());
            }

            if !self.tick(self.delete_probe_interval, deadline).await {
                return Err(ProviderError::timeout(format!(
                    "timeout while waiting for state to become 'Deleted' (last state: '{}')",
                    state
                )));
            }
        }
    }

    fn deadline(&self, timeout: Duration) -> Deadline {
        self.clock.now().checked_add(timeout)
    }

    /// Sleep for one tick, clamped to the deadline
    ///
    /// Returns false once the deadline has been reached; no further probe may follow.
    async fn tick(&self, interval: Duration, deadline: Deadline) -> bool {
        let Some(deadline) = deadline else {
            self.clock.sleep(interval).await;
            return true;
        };
        let now = self.clock.now();
        if now >= deadline {
            return false;
        }
        self.clock.sleep(interval.min(deadline - now)).await;
        self.clock.now() < deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::provider::ErrorKind;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted API: each call pops the next canned answer
    #[derive(Default)]
    struct ScriptedApi {
        gets: Mutex<VecDeque<ProviderResult<Lookup<String>>>>,
        /// Answer repeated once `gets` runs out
        steady_get: Option<Lookup<String>>,
        writes: Mutex<VecDeque<ProviderResult<Submission>>>,
        statuses: Mutex<VecDeque<ProviderResult<OperationStatus>>>,
        calls: Mutex<Vec<(&'static str, Duration)>>,
        clock: Option<Arc<ManualClock>>,
    }

    impl ScriptedApi {
        fn with_clock(clock: Arc<ManualClock>) -> Self {
            Self {
                clock: Some(clock),
                ..Default::default()
            }
        }

        fn gets(self, answers: Vec<ProviderResult<Lookup<String>>>) -> Self {
            *self.gets.lock().unwrap() = answers.into();
            self
        }

        fn always(mut self, answer: Lookup<String>) -> Self {
            self.steady_get = Some(answer);
            self
        }

        fn writes(self, answers: Vec<ProviderResult<Submission>>) -> Self {
            *self.writes.lock().unwrap() = answers.into();
            self
        }

        fn statuses(self, answers: Vec<ProviderResult<OperationStatus>>) -> Self {
            *self.statuses.lock().unwrap() = answers.into();
            self
        }

        fn record(&self, call: &'static str) {
            let at = self.clock.as_ref().map(|c| c.elapsed()).unwrap_or_default();
            self.calls.lock().unwrap().push((call, at));
        }

        fn calls(&self, name: &str) -> Vec<Duration> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(call, _)| *call == name)
                .map(|(_, at)| *at)
                .collect()
        }
    }

    impl RemoteApi for ScriptedApi {
        type Id = String;
        type Model = String;

        fn get<'a>(&'a self, _id: &'a String) -> BoxFuture<'a, ProviderResult<Lookup<String>>> {
            self.record("get");
            let next = self.gets.lock().unwrap().pop_front();
            let answer = match next {
                Some(answer) => answer,
                None => Ok(self.steady_get.clone().unwrap_or(Lookup::NotFound)),
            };
            Box::pin(async move { answer })
        }

        fn create_or_update<'a>(
            &'a self,
            _id: &'a String,
            _model: &'a String,
        ) -> BoxFuture<'a, ProviderResult<Submission>> {
            self.record("put");
            let answer = self
                .writes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Submission::Completed));
            Box::pin(async move { answer })
        }

        fn delete<'a>(&'a self, _id: &'a String) -> BoxFuture<'a, ProviderResult<Submission>> {
            self.record("delete");
            let answer = self
                .writes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Submission::Completed));
            Box::pin(async move { answer })
        }

        fn operation_status<'a>(
            &'a self,
            _handle: &'a OperationHandle,
        ) -> BoxFuture<'a, ProviderResult<OperationStatus>> {
            self.record("status");
            let answer = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(OperationStatus::InProgress));
            Box::pin(async move { answer })
        }
    }

    fn found() -> ProviderResult<Lookup<String>> {
        Ok(Lookup::Found("namespace".to_string()))
    }

    fn pending() -> Submission {
        Submission::Pending(OperationHandle {
            kind: OperationHandleKind::AsyncOperation,
            url: "https://management.example/operations/1".to_string(),
        })
    }

    fn reconciler(api: ScriptedApi, clock: Arc<ManualClock>) -> Reconciler<ScriptedApi> {
        Reconciler::new(api, clock)
    }

    fn id() -> String {
        "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Relay/namespaces/example".to_string()
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[tokio::test]
    async fn delete_of_missing_resource_succeeds_on_first_probe() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone());
        let r = reconciler(api, clock.clone());

        for _ in 0..2 {
            r.delete(&id(), secs(60), DeleteConfirmation::ExistenceProbe)
                .await
                .unwrap();
        }

        assert_eq!(r.api().calls("get").len(), 2);
        assert_eq!(r.api().calls("delete").len(), 2);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn delete_probes_once_per_tick_until_not_found() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone())
            .gets(vec![found(), found(), found(), Ok(Lookup::NotFound)]);
        let r = reconciler(api, clock.clone());

        r.delete(&id(), secs(600), DeleteConfirmation::ExistenceProbe)
            .await
            .unwrap();

        let probes = r.api().calls("get");
        assert_eq!(probes.len(), 4);
        for pair in probes.windows(2) {
            assert!(pair[1] - pair[0] >= DEFAULT_DELETE_PROBE_INTERVAL);
        }
        assert_eq!(clock.sleeps(), vec![secs(15); 3]);
    }

    #[tokio::test]
    async fn delete_scenario_found_found_not_found() {
        let clock = Arc::new(ManualClock::new());
        let api =
            ScriptedApi::with_clock(clock.clone()).gets(vec![found(), found(), Ok(Lookup::NotFound)]);
        let r = reconciler(api, clock.clone());

        r.delete(&id(), secs(60), DeleteConfirmation::ExistenceProbe)
            .await
            .unwrap();

        assert_eq!(r.api().calls("get").len(), 3);
        let elapsed = clock.elapsed();
        assert!(elapsed >= secs(30) && elapsed <= secs(45), "{elapsed:?}");
    }

    #[tokio::test]
    async fn delete_times_out_when_resource_never_disappears() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone()).always(Lookup::Found("ns".to_string()));
        let r = reconciler(api, clock.clone());

        let err = r
            .delete(&id(), secs(20), DeleteConfirmation::ExistenceProbe)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.to_string().starts_with("waiting for deletion of /subscriptions/"));
        assert!(r.api().calls("get").len() <= 2);
        assert_eq!(clock.elapsed(), secs(20));
    }

    #[tokio::test]
    async fn delete_timeout_is_bounded_by_deadline() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone()).always(Lookup::Found("ns".to_string()));
        let r = reconciler(api, clock.clone());

        let err = r
            .delete(&id(), secs(3600), DeleteConfirmation::ExistenceProbe)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(clock.elapsed() <= secs(3600) + DEFAULT_DELETE_PROBE_INTERVAL);
        // probes at 0, 15, ..., 3585
        assert_eq!(r.api().calls("get").len(), 240);
    }

    #[tokio::test]
    async fn delete_stops_on_probe_error() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone()).gets(vec![
            found(),
            Err(ProviderError::request("server error").with_status(500)),
            found(),
        ]);
        let r = reconciler(api, clock.clone());

        let err = r
            .delete(&id(), secs(600), DeleteConfirmation::ExistenceProbe)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Request);
        assert_eq!(err.status, Some(500));
        assert!(err.to_string().contains("server error"));
        assert_eq!(r.api().calls("get").len(), 2);
        assert_eq!(clock.sleeps(), vec![secs(15)]);
    }

    #[tokio::test]
    async fn delete_request_error_skips_probing() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone())
            .writes(vec![Err(ProviderError::request("conflict").with_status(409))]);
        let r = reconciler(api, clock.clone());

        let err = r
            .delete(&id(), secs(60), DeleteConfirmation::ExistenceProbe)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), format!("deleting {}: conflict", id()));
        assert!(r.api().calls("get").is_empty());
    }

    #[tokio::test]
    async fn existence_probe_ignores_operation_handle() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone())
            .writes(vec![Ok(pending())])
            .gets(vec![found(), Ok(Lookup::NotFound)]);
        let r = reconciler(api, clock.clone());

        r.delete(&id(), secs(60), DeleteConfirmation::ExistenceProbe)
            .await
            .unwrap();

        assert!(r.api().calls("status").is_empty());
        assert_eq!(r.api().calls("get").len(), 2);
    }

    #[tokio::test]
    async fn delete_with_operation_status_waits_on_handle() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone())
            .writes(vec![Ok(pending())])
            .statuses(vec![
                Ok(OperationStatus::InProgress),
                Ok(OperationStatus::Succeeded),
            ]);
        let r = reconciler(api, clock.clone());

        r.delete(&id(), secs(60), DeleteConfirmation::OperationStatus)
            .await
            .unwrap();

        assert_eq!(r.api().calls("status").len(), 2);
        assert!(r.api().calls("get").is_empty());
        assert_eq!(clock.sleeps(), vec![DEFAULT_OPERATION_POLL_INTERVAL]);
    }

    #[tokio::test]
    async fn apply_returns_after_first_successful_poll() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone())
            .writes(vec![Ok(pending())])
            .statuses(vec![Ok(OperationStatus::Succeeded)]);
        let r = reconciler(api, clock.clone());

        r.apply(&id(), &"desired".to_string(), secs(1800))
            .await
            .unwrap();

        assert_eq!(r.api().calls("put").len(), 1);
        assert_eq!(r.api().calls("status").len(), 1);
        assert!(r.api().calls("get").is_empty());
        assert!(r.api().calls("delete").is_empty());
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn apply_completed_synchronously_does_not_poll() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone());
        let r = reconciler(api, clock);

        r.apply(&id(), &"desired".to_string(), secs(60)).await.unwrap();
        assert!(r.api().calls("status").is_empty());
    }

    #[tokio::test]
    async fn apply_surfaces_failed_operation() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone())
            .writes(vec![Ok(pending())])
            .statuses(vec![
                Ok(OperationStatus::InProgress),
                Ok(OperationStatus::Failed("quota exceeded".to_string())),
            ]);
        let r = reconciler(api, clock);

        let err = r
            .apply(&id(), &"desired".to_string(), secs(60))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Request);
        assert_eq!(
            err.to_string(),
            format!(
                "waiting for creation/update of {}: operation failed: quota exceeded",
                id()
            )
        );
    }

    #[tokio::test]
    async fn apply_surfaces_cancelled_operation() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone())
            .writes(vec![Ok(pending())])
            .statuses(vec![Ok(OperationStatus::Canceled)]);
        let r = reconciler(api, clock);

        let err = r
            .apply(&id(), &"desired".to_string(), secs(60))
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("operation was cancelled"));
    }

    #[tokio::test]
    async fn apply_times_out_distinctly() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone()).writes(vec![Ok(pending())]);
        let r = reconciler(api, clock.clone()).with_operation_poll_interval(secs(5));

        let err = r
            .apply(&id(), &"desired".to_string(), secs(12))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(r.api().calls("status"), vec![secs(0), secs(5), secs(10)]);
        assert_eq!(clock.elapsed(), secs(12));
    }

    #[tokio::test]
    async fn apply_rejection_is_a_request_error() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone())
            .writes(vec![Err(ProviderError::request("invalid sku").with_status(400))]);
        let r = reconciler(api, clock);

        let err = r
            .apply(&id(), &"desired".to_string(), secs(60))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Request);
        assert_eq!(err.status, Some(400));
        assert!(r.api().calls("status").is_empty());
    }

    #[tokio::test]
    async fn fetch_maps_not_found_to_lookup() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone()).gets(vec![
            found(),
            Ok(Lookup::NotFound),
            Err(ProviderError::request("forbidden").with_status(403)),
        ]);
        let r = reconciler(api, clock);

        assert!(r.fetch(&id()).await.unwrap().is_found());
        assert_eq!(r.fetch(&id()).await.unwrap(), Lookup::NotFound);
        let err = r.fetch(&id()).await.unwrap_err();
        assert_eq!(err.to_string(), format!("retrieving {}: forbidden", id()));
    }

    #[tokio::test]
    async fn unrepresentable_timeout_waits_without_deadline() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone())
            .writes(vec![Ok(pending())])
            .gets(vec![found(), found(), Ok(Lookup::NotFound)])
            .statuses(vec![
                Ok(OperationStatus::InProgress),
                Ok(OperationStatus::Succeeded),
            ]);
        let r = reconciler(api, clock.clone());

        r.apply(&id(), &"desired".to_string(), Duration::MAX)
            .await
            .unwrap();
        r.delete(&id(), Duration::MAX, DeleteConfirmation::ExistenceProbe)
            .await
            .unwrap();

        assert_eq!(
            clock.sleeps(),
            vec![DEFAULT_OPERATION_POLL_INTERVAL, secs(15), secs(15)]
        );
    }

    #[tokio::test]
    async fn zero_timeout_makes_a_single_attempt() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone()).always(Lookup::Found("ns".to_string()));
        let r = reconciler(api, clock.clone());

        let err = r
            .delete(&id(), Duration::ZERO, DeleteConfirmation::ExistenceProbe)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(r.api().calls("get").len(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn delete_interval_cannot_go_below_floor() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone()).always(Lookup::Found("ns".to_string()));
        let r = reconciler(api, clock.clone()).with_delete_probe_interval(Duration::ZERO);

        let err = r
            .delete(&id(), secs(20), DeleteConfirmation::ExistenceProbe)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(r.api().calls("get"), vec![secs(0), secs(15)]);
        assert_eq!(clock.sleeps(), vec![secs(15), secs(5)]);
    }

    #[tokio::test]
    async fn zero_poll_interval_is_raised_to_minimum() {
        let clock = Arc::new(ManualClock::new());
        let api = ScriptedApi::with_clock(clock.clone()).writes(vec![Ok(pending())]);
        let r = reconciler(api, clock.clone()).with_operation_poll_interval(Duration::ZERO);

        let err = r
            .apply(&id(), &"desired".to_string(), secs(3))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(r.api().calls("status"), vec![secs(0), secs(1), secs(2)]);
    }

    #[test]
    fn delete_states_are_terminal_except_pending() {
        assert!(!DeleteState::Pending.is_terminal());
        assert!(DeleteState::Deleted.is_terminal());
        assert!(DeleteState::Failed.is_terminal());
    }
}
