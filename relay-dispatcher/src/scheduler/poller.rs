//! Admission-controlled job poller
//!
//! On every tick: get a valid platform session, check how many tasks are
//! running, and only then pull one job, build its worker command, size it
//! and submit it. Ticks never overlap, and a stop request is honoured between
//! ticks only.

use anyhow::{Context, Result};
use relay_core::domain::job::JobInput;
use relay_core::domain::status::QueueStatus;
use relay_core::domain::task::TaskRequest;
use std::sync::Arc;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::repository::{JobQueue, SizeProbe};
use crate::scheduler::command::build_worker_command;
use crate::scheduler::sizing::size_resources;
use crate::session::SessionFactory;

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Running tasks already at the limit; the queue was not touched
    AtCapacity { running: u64 },
    /// The queue had nothing pending
    NoJob,
    /// The job became a task
    Submitted { job_id: String, task_id: String },
    /// The platform is out of memory or quota; the job is left unreported
    Deferred { job_id: String },
    /// Submission failed for good and the job was reported as failed
    Rejected { job_id: String },
}

/// Job poller that feeds queued jobs to the task platform
pub struct JobPoller {
    config: Arc<Config>,
    service_id: String,
    sessions: Arc<SessionFactory>,
    queue: Arc<dyn JobQueue>,
    storage: Arc<dyn SizeProbe>,
}

impl JobPoller {
    pub fn new(
        config: Arc<Config>,
        service_id: String,
        sessions: Arc<SessionFactory>,
        queue: Arc<dyn JobQueue>,
        storage: Arc<dyn SizeProbe>,
    ) -> Self {
        Self {
            config,
            service_id,
            sessions,
            queue,
            storage,
        }
    }

    /// Runs the polling loop until the cancellation token is triggered
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            service_id = %self.service_id,
            target_id = %self.config.target_id,
            task_limit = self.config.task_limit,
            "Starting job poller (interval: {:?})",
            self.config.poll_interval
        );

        let mut interval = time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Job poller shutting down");
                    break;
                }
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(outcome) => debug!(?outcome, "Poll tick finished"),
                        Err(e) => error!("Error during poll tick: {:#}", e),
                    }
                }
            }
        }
    }

    /// Performs a single poll tick
    pub async fn tick(&self) -> Result<TickOutcome> {
        let session = self
            .sessions
            .get_session()
            .await
            .context("Failed to obtain platform session")?;

        let running = session
            .count_running_tasks(&self.config.target_id)
            .await
            .context("Failed to count running tasks")?;

        if running >= self.config.task_limit {
            debug!(running, limit = self.config.task_limit, "At task capacity, skipping tick");
            return Ok(TickOutcome::AtCapacity { running });
        }

        let job = self
            .queue
            .poll_task(&self.service_id)
            .await
            .context("Failed to poll job queue")?;

        if job.is_empty() {
            debug!("No job available");
            return Ok(TickOutcome::NoJob);
        }

        let job_id = job.job_id;
        info!(job_id = %job_id, "Received job");

        let input = JobInput::parse_redacted(&job.content)
            .with_context(|| format!("Malformed content for job {}", job_id))?;

        if self.config.service.log_audit {
            info!(target: "audit", job_id = %job_id, job = %input.to_audit_json(), "Job accepted");
        }

        let command = build_worker_command(
            &self.config.worker_command,
            &self.config.config_path,
            &self.service_id,
            &job_id,
            &input,
        )
        .with_context(|| format!("Cannot build command for job {}", job_id))?;

        let resources =
            size_resources(self.storage.as_ref(), &input.input_urls, &self.config.sizing).await;

        let task = TaskRequest::new(
            command,
            job_id.clone(),
            self.config.target_id.clone(),
            resources,
        );

        match session.create_task(&task).await {
            Ok(task_id) => {
                info!(
                    job_id = %job_id,
                    task_id = %task_id,
                    disk_mb = task.disk_mb,
                    memory_mb = task.memory_mb,
                    "Task submitted"
                );
                Ok(TickOutcome::Submitted { job_id, task_id })
            }
            Err(e) if e.is_memory_limit_error() => {
                warn!(job_id = %job_id, "Platform out of memory, leaving job for retry: {}", e);
                Ok(TickOutcome::Deferred { job_id })
            }
            // The next tick's probe sees the same expiry and rebuilds the session
            Err(e) if e.is_auth_error() => {
                warn!(job_id = %job_id, "Session expired during submission, leaving job for retry: {}", e);
                Ok(TickOutcome::Deferred { job_id })
            }
            Err(e) => {
                error!(job_id = %job_id, "Task submission failed: {}", e);
                self.queue
                    .send_status(&self.service_id, &job_id, QueueStatus::Fail)
                    .await
                    .with_context(|| format!("Failed to report failure of job {}", job_id))?;
                Ok(TickOutcome::Rejected { job_id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SizingConfig;
    use crate::session::{PlatformSession, SessionBuilder};
    use async_trait::async_trait;
    use relay_client::{ClientError, PlatformCredentials, Result as ClientResult};
    use relay_core::config::ServiceConfig;
    use relay_core::domain::job::PolledJob;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeQueue {
        jobs: Mutex<VecDeque<PolledJob>>,
        polls: AtomicUsize,
        statuses: Mutex<Vec<(String, QueueStatus)>>,
    }

    impl FakeQueue {
        fn with_job(content: &str) -> Arc<Self> {
            let queue = Self::default();
            queue.jobs.lock().unwrap().push_back(PolledJob {
                job_id: "J1".to_string(),
                content: content.to_string(),
            });
            Arc::new(queue)
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }

        fn statuses(&self) -> Vec<(String, QueueStatus)> {
            self.statuses.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobQueue for FakeQueue {
        async fn poll_task(&self, service_id: &str) -> ClientResult<PolledJob> {
            assert_eq!(service_id, "svc-1");
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(self.jobs.lock().unwrap().pop_front().unwrap_or(PolledJob {
                job_id: String::new(),
                content: String::new(),
            }))
        }

        async fn send_status(
            &self,
            _service_id: &str,
            job_id: &str,
            status: QueueStatus,
        ) -> ClientResult<()> {
            self.statuses
                .lock()
                .unwrap()
                .push((job_id.to_string(), status));
            Ok(())
        }
    }

    struct FakeSession {
        running: u64,
        submit_error: Mutex<Option<ClientError>>,
        counts: AtomicUsize,
        submitted: Mutex<Vec<TaskRequest>>,
    }

    impl FakeSession {
        fn new(running: u64, submit_error: Option<ClientError>) -> Arc<Self> {
            Arc::new(Self {
                running,
                submit_error: Mutex::new(submit_error),
                counts: AtomicUsize::new(0),
                submitted: Mutex::new(Vec::new()),
            })
        }

        fn submitted(&self) -> Vec<TaskRequest> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlatformSession for FakeSession {
        async fn probe(&self) -> ClientResult<()> {
            Ok(())
        }

        async fn count_running_tasks(&self, target_id: &str) -> ClientResult<u64> {
            assert_eq!(target_id, "app-guid");
            self.counts.fetch_add(1, Ordering::SeqCst);
            Ok(self.running)
        }

        async fn create_task(&self, task: &TaskRequest) -> ClientResult<String> {
            self.submitted.lock().unwrap().push(task.clone());
            match self.submit_error.lock().unwrap().take() {
                Some(e) => Err(e),
                None => Ok("task-1".to_string()),
            }
        }
    }

    struct FixedBuilder(Option<Arc<FakeSession>>);

    #[async_trait]
    impl SessionBuilder for FixedBuilder {
        async fn build(&self) -> ClientResult<Arc<dyn PlatformSession>> {
            match &self.0 {
                Some(session) => Ok(session.clone()),
                None => Err(ClientError::api_error(401, "login rejected")),
            }
        }
    }

    struct FixedProbe(u64);

    #[async_trait]
    impl SizeProbe for FixedProbe {
        async fn size_mb(&self, _url: &str) -> ClientResult<u64> {
            Ok(self.0)
        }
    }

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            config_path: PathBuf::from("/app/config.json"),
            service: ServiceConfig {
                log_audit: true,
                ..Default::default()
            },
            queue_url: "http://queue".to_string(),
            api_key: None,
            service_id: Some("svc-1".to_string()),
            target_id: "app-guid".to_string(),
            task_limit: 3,
            poll_interval: Duration::from_millis(10),
            worker_command: "worker".to_string(),
            platform: PlatformCredentials {
                api_url: "http://cf".to_string(),
                username: "u".to_string(),
                password: "p".to_string(),
            },
            sizing: SizingConfig::default(),
        })
    }

    fn poller(session: Option<Arc<FakeSession>>, queue: Arc<FakeQueue>) -> JobPoller {
        JobPoller::new(
            test_config(),
            "svc-1".to_string(),
            Arc::new(SessionFactory::new(Arc::new(FixedBuilder(session)))),
            queue,
            Arc::new(FixedProbe(128)),
        )
    }

    const JOB: &str = r#"{
        "cmd": "-t 0.5",
        "userID": "analyst",
        "inExtNames": ["n1", "n2"],
        "inExtFiles": ["https://b.s3.amazonaws.com/a.txt", "https://b.s3.amazonaws.com/b.tif"],
        "outGeoJson": ["shore.geojson"],
        "pzAuthKey": "secret"
    }"#;

    #[tokio::test]
    async fn test_at_capacity_makes_no_queue_or_submit_calls() {
        let session = FakeSession::new(3, None);
        let queue = FakeQueue::with_job(JOB);
        let poller = poller(Some(session.clone()), queue.clone());

        let outcome = poller.tick().await.unwrap();

        assert_eq!(outcome, TickOutcome::AtCapacity { running: 3 });
        assert_eq!(queue.polls(), 0);
        assert!(queue.statuses().is_empty());
        assert!(session.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_no_job() {
        let session = FakeSession::new(0, None);
        let queue = Arc::new(FakeQueue::default());
        let poller = poller(Some(session.clone()), queue.clone());

        assert_eq!(poller.tick().await.unwrap(), TickOutcome::NoJob);
        assert_eq!(queue.polls(), 1);
        assert!(session.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_submits_sized_task() {
        let session = FakeSession::new(2, None);
        let queue = FakeQueue::with_job(JOB);
        let poller = poller(Some(session.clone()), queue.clone());

        let outcome = poller.tick().await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Submitted {
                job_id: "J1".to_string(),
                task_id: "task-1".to_string()
            }
        );

        let submitted = session.submitted();
        assert_eq!(submitted.len(), 1);
        let task = &submitted[0];
        assert_eq!(task.name, "J1");
        assert_eq!(task.target_id, "app-guid");
        assert_eq!(task.disk_mb, 2560);
        assert_eq!(task.memory_mb, 4352);
        assert!(task.command.starts_with("worker --cliExtra '-t 0.5'"));
        assert!(task.command.contains("--jobID J1"));
        assert!(task.command.ends_with("-o shore.geojson"));
        assert!(!task.command.contains("secret"));
        assert!(queue.statuses().is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_inputs_abandon_job_unreported() {
        let session = FakeSession::new(0, None);
        let queue = FakeQueue::with_job(r#"{"inExtNames":["n1"],"inExtFiles":[]}"#);
        let poller = poller(Some(session.clone()), queue.clone());

        let err = poller.tick().await.unwrap_err();

        assert!(format!("{:#}", err).contains("did not match"));
        assert!(session.submitted().is_empty());
        assert!(queue.statuses().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_job_ends_tick() {
        let session = FakeSession::new(0, None);
        let queue = FakeQueue::with_job("{not json");
        let poller = poller(Some(session.clone()), queue.clone());

        assert!(poller.tick().await.is_err());
        assert!(session.submitted().is_empty());
        assert!(queue.statuses().is_empty());

        // The loop carries on with the next tick
        assert_eq!(poller.tick().await.unwrap(), TickOutcome::NoJob);
    }

    #[tokio::test]
    async fn test_memory_limit_is_not_reported() {
        let memory_error = ClientError::Platform {
            status: 400,
            code: 100005,
            title: "CF-AppMemoryQuotaExceeded".to_string(),
            detail: "quota".to_string(),
        };
        let session = FakeSession::new(0, Some(memory_error));
        let queue = FakeQueue::with_job(JOB);
        let poller = poller(Some(session), queue.clone());

        let outcome = poller.tick().await.unwrap();

        assert_eq!(outcome, TickOutcome::Deferred { job_id: "J1".to_string() });
        assert!(queue.statuses().is_empty());
    }

    #[tokio::test]
    async fn test_expired_auth_on_submit_is_not_reported() {
        let session = FakeSession::new(0, Some(ClientError::api_error(401, "token expired")));
        let queue = FakeQueue::with_job(JOB);
        let poller = poller(Some(session), queue.clone());

        let outcome = poller.tick().await.unwrap();

        assert_eq!(outcome, TickOutcome::Deferred { job_id: "J1".to_string() });
        assert!(queue.statuses().is_empty());
    }

    #[tokio::test]
    async fn test_other_submit_error_reports_fail_once() {
        let session = FakeSession::new(0, Some(ClientError::api_error(500, "boom")));
        let queue = FakeQueue::with_job(JOB);
        let poller = poller(Some(session), queue.clone());

        let outcome = poller.tick().await.unwrap();

        assert_eq!(outcome, TickOutcome::Rejected { job_id: "J1".to_string() });
        assert_eq!(queue.statuses(), vec![("J1".to_string(), QueueStatus::Fail)]);
    }

    #[tokio::test]
    async fn test_no_session_skips_tick() {
        let queue = FakeQueue::with_job(JOB);
        let poller = poller(None, queue.clone());

        assert!(poller.tick().await.is_err());
        assert_eq!(queue.polls(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let session = FakeSession::new(0, None);
        let queue = Arc::new(FakeQueue::default());
        let poller = Arc::new(poller(Some(session), queue.clone()));
        let cancel = CancellationToken::new();

        let handle = {
            let poller = Arc::clone(&poller);
            let cancel = cancel.clone();
            tokio::spawn(async move { poller.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(queue.polls() >= 1);
    }
}
