//! AMF Control Signals
//!
//! Out-of-band signals sent to the AMF under test over its SBI interface:
//! the testcase enable flag and the deregistration notify.
//!
//! Signals are dispatched as fire-and-forget jobs on a bounded pool of tokio
//! tasks. Jobs carry no ordering guarantee relative to each other or to the
//! connection loop; only the signals inside one job are sent in order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use smc_sbi::{SbiClient, SbiClientConfig, SbiError, SbiRequest, SbiResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::AmfSbiConfig;

/// Deregistration reason sent with every notify
pub const DEREG_REASON: &str = "REREGISTRATION_REQUIRED";
/// Access type sent with every notify
pub const ACCESS_TYPE: &str = "3GPP_ACCESS";

// ============================================================================
// Signals and jobs
// ============================================================================

/// A single control request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSignal {
    /// Toggle the AMF's testcase flag
    TestcaseEnable(bool),
    /// Ask the AMF to deregister the UE
    DeregNotify { supi: String },
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlSignal::TestcaseEnable(enabled) => write!(f, "testcase-enable({enabled})"),
            ControlSignal::DeregNotify { supi } => write!(f, "dereg-notify({supi})"),
        }
    }
}

/// Deregistration notify body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeregistrationData {
    pub dereg_reason: String,
    pub access_type: String,
}

impl Default for DeregistrationData {
    fn default() -> Self {
        Self {
            dereg_reason: DEREG_REASON.to_string(),
            access_type: ACCESS_TYPE.to_string(),
        }
    }
}

/// Signals sent in order after an initial delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlJob {
    pub delay: Duration,
    pub signals: Vec<ControlSignal>,
}

impl ControlJob {
    /// One signal, sent immediately
    pub fn signal(signal: ControlSignal) -> Self {
        Self {
            delay: Duration::ZERO,
            signals: vec![signal],
        }
    }

    /// Follow-up of a finished testcase: deregister the UE after `delay`,
    /// then re-enable the testcase flag if more testcases remain
    pub fn case_finished(supi: impl Into<String>, delay: Duration, remaining: usize) -> Self {
        let mut signals = vec![ControlSignal::DeregNotify { supi: supi.into() }];
        if remaining > 0 {
            signals.push(ControlSignal::TestcaseEnable(true));
        }
        Self { delay, signals }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Transport for control signals
#[async_trait]
pub trait ControlChannel: Send + Sync + 'static {
    async fn send(&self, signal: &ControlSignal) -> SbiResult<()>;
}

/// Control channel over the AMF's h2c SBI interface
pub struct SbiControlChannel {
    client: SbiClient,
    base_path: String,
    enable_path: String,
    dereg_path: String,
}

impl SbiControlChannel {
    pub fn new(config: &AmfSbiConfig) -> Self {
        let client_config = SbiClientConfig::new(config.host.clone(), config.port)
            .with_connect_timeout(Duration::from_millis(config.connect_timeout_ms));
        Self {
            client: SbiClient::new(client_config),
            base_path: config.base_path.trim_end_matches('/').to_string(),
            enable_path: config.enable_path.clone(),
            dereg_path: config.dereg_path.clone(),
        }
    }

    /// Request path for `signal`
    pub fn path(&self, signal: &ControlSignal) -> String {
        let path = match signal {
            ControlSignal::TestcaseEnable(enabled) => {
                self.enable_path.replace("{enabled}", &enabled.to_string())
            }
            ControlSignal::DeregNotify { supi } => self.dereg_path.replace("{supi}", supi),
        };
        format!("{}{}", self.base_path, path)
    }

    fn request(&self, signal: &ControlSignal) -> SbiResult<SbiRequest> {
        let path = self.path(signal);
        let request = match signal {
            ControlSignal::TestcaseEnable(_) => SbiRequest::get(path),
            ControlSignal::DeregNotify { .. } => {
                SbiRequest::post(path).with_json_body(&DeregistrationData::default())?
            }
        };
        Ok(request)
    }
}

#[async_trait]
impl ControlChannel for SbiControlChannel {
    async fn send(&self, signal: &ControlSignal) -> SbiResult<()> {
        let request = self.request(signal)?;
        log::debug!("[AMF] {} {}", request.header.method, request.header.uri);

        let response = self.client.send_request(request).await?;
        if !response.is_success() {
            return Err(SbiError::from_status(
                response.status,
                response.http.content.unwrap_or_default(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Delivery settings for control jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPolicy {
    /// Concurrently running signals
    pub workers: usize,
    /// Tries per signal
    pub max_attempts: u32,
    /// Pause between tries
    pub backoff: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for ControlPolicy {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 3,
            backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Bounded pool running control jobs in the background
pub struct ControlDispatcher {
    channel: Arc<dyn ControlChannel>,
    permits: Arc<Semaphore>,
    policy: ControlPolicy,
    tasks: JoinSet<()>,
}

impl ControlDispatcher {
    pub fn new(channel: Arc<dyn ControlChannel>, policy: ControlPolicy) -> Self {
        Self {
            channel,
            permits: Arc::new(Semaphore::new(policy.workers.max(1))),
            policy,
            tasks: JoinSet::new(),
        }
    }

    /// Start a job; returns immediately
    pub fn dispatch(&mut self, job: ControlJob) {
        self.reap();

        let channel = self.channel.clone();
        let permits = self.permits.clone();
        let policy = self.policy;

        self.tasks.spawn(async move {
            if !job.delay.is_zero() {
                tokio::time::sleep(job.delay).await;
            }
            // Held for the whole job so its signals stay in order
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            for signal in &job.signals {
                deliver(channel.as_ref(), signal, &policy).await;
            }
        });
    }

    /// Jobs not yet reaped
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every outstanding job
    pub async fn drain(&mut self) {
        if !self.tasks.is_empty() {
            log::info!("Waiting for {} control job(s)", self.tasks.len());
        }
        while let Some(res) = self.tasks.join_next().await {
            if let Err(e) = res {
                log::error!("Control job failed: {e}");
            }
        }
    }

    fn reap(&mut self) {
        while let Some(res) = self.tasks.try_join_next() {
            if let Err(e) = res {
                log::error!("Control job failed: {e}");
            }
        }
    }
}

/// Send one signal with timeout and retry; returns true if it was delivered
async fn deliver(channel: &dyn ControlChannel, signal: &ControlSignal, policy: &ControlPolicy) -> bool {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let result = match tokio::time::timeout(policy.request_timeout, channel.send(signal)).await {
            Ok(result) => result,
            Err(_) => Err(SbiError::Timeout),
        };

        match result {
            Ok(()) => {
                log::info!("[AMF] {} sent", signal);
                return true;
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                log::warn!(
                    "[AMF] {} failed (attempt {}/{}): {}",
                    signal,
                    attempt,
                    max_attempts,
                    e
                );
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => {
                log::error!("[AMF] {} failed: {}", signal, e);
                return false;
            }
        }
    }

    false
}
