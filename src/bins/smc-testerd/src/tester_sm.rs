//! Tester Connection State Machine
//!
//! Every accepted connection performs exactly one step of the four-step
//! testcase cycle, then the connection is closed and the UE reconnects for
//! the next step:
//!
//! ```text
//! Supi -> MsgType -> Msg -> Res -> MsgType (next testcase) ...
//! ```
//!
//! The progress marker is a plain [`DriverState`] value owned by the caller.
//! [`TesterSm::dispatch`] takes it by value and hands back the next one, so the
//! one-connection-at-a-time invariant is carried by the driver's `&mut self`
//! instead of shared globals.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use smc_dbi::ResultSink;
use smc_nas::{mutate_message, to_hex, MutationError, MutationLayout};
use smc_testcase::{Testcase, TestcaseConfig, TestcaseResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// ============================================================================
// Wire constants
// ============================================================================

/// Mismatch / acknowledgment byte
pub const WIRE_FALSE: u8 = 0x00;
/// Message type accepted, plaintext testcase
pub const WIRE_PLAIN: u8 = 0x01;
/// Message type accepted, encrypted testcase
pub const WIRE_ENCRYPTED: u8 = 0x02;
/// Maximum message body read in the Msg step
pub const MAX_MSG_LEN: usize = 1024;

// ============================================================================
// State
// ============================================================================

/// Step within the current testcase cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TesterState {
    /// Send the subscriber identity (once, at process start)
    #[default]
    Supi,
    /// Expect the message type probe
    MsgType,
    /// Relay the mutated Security Mode Command
    Msg,
    /// Capture the UE's response type
    Res,
}

impl fmt::Display for TesterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TesterState::Supi => "SUPI",
            TesterState::MsgType => "MSG_TYPE",
            TesterState::Msg => "MSG",
            TesterState::Res => "RES",
        };
        f.write_str(name)
    }
}

/// Driver progress: testcase cursor, step and failed attempts of that step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverState {
    pub current_case: usize,
    pub step: TesterState,
    pub attempts: u32,
}

impl DriverState {
    /// Advance to the next testcase's message type probe
    fn next_case(self) -> Self {
        Self {
            current_case: self.current_case + 1,
            step: TesterState::MsgType,
            attempts: 0,
        }
    }

    /// Move to `step` within the same testcase
    fn goto(self, step: TesterState) -> Self {
        Self {
            step,
            attempts: 0,
            ..self
        }
    }
}

/// Bounded retry of I/O failures in the MsgType, Msg and Res steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts before the testcase is aborted (0 = unbounded)
    pub max_attempts: u32,
    /// Wait per prior failed attempt before servicing a retried step
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl RetryPolicy {
    /// Retry forever without delay
    pub fn unbounded() -> Self {
        Self {
            max_attempts: 0,
            backoff: Duration::ZERO,
        }
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts != 0 && attempts >= self.max_attempts
    }

    pub fn delay(&self, attempts: u32) -> Duration {
        self.backoff.saturating_mul(attempts)
    }
}

// ============================================================================
// Events
// ============================================================================

/// Why a testcase was given up
#[derive(Debug)]
pub enum AbortReason {
    /// The step kept failing until the retry cap was reached
    RetriesExhausted { step: TesterState, attempts: u32 },
    /// The testcase's patches could not be applied to the message
    Mutation(MutationError),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::RetriesExhausted { step, attempts } => {
                write!(f, "{step} failed {attempts} times")
            }
            AbortReason::Mutation(e) => write!(f, "{e}"),
        }
    }
}

/// Outcome of one dispatched step
#[derive(Debug)]
pub enum TesterEvent {
    /// No testcase left; nothing was read or written
    Exhausted,
    /// Subscriber identity sent
    SupiSent,
    /// Probe matched the expected message type
    MsgTypeAccepted { msg_type: u8, plain: bool },
    /// Probe did not match; the UE has to probe again
    MsgTypeMismatch { expected: u8, received: u8 },
    /// Mutated message written back
    MessageRelayed { len: usize },
    /// I/O failed; the step will be serviced again on the next connection
    StepFailed {
        step: TesterState,
        attempts: u32,
        reason: String,
    },
    /// Testcase given up; cursor advanced without a result
    CaseAborted {
        testcase_id: u32,
        reason: AbortReason,
        remaining: usize,
    },
    /// Result recorded; cursor advanced
    CaseCompleted {
        result: TestcaseResult,
        remaining: usize,
    },
}

/// Next driver state plus what happened
#[derive(Debug)]
pub struct Transition {
    pub state: DriverState,
    pub event: TesterEvent,
}

impl Transition {
    fn new(state: DriverState, event: TesterEvent) -> Self {
        Self { state, event }
    }
}

// ============================================================================
// State machine
// ============================================================================

/// Connection state machine
pub struct TesterSm {
    script: Arc<TestcaseConfig>,
    layout: MutationLayout,
    retry: RetryPolicy,
    sink: Arc<dyn ResultSink>,
}

impl TesterSm {
    pub fn new(
        script: Arc<TestcaseConfig>,
        layout: MutationLayout,
        retry: RetryPolicy,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            script,
            layout,
            retry,
            sink,
        }
    }

    pub fn script(&self) -> &TestcaseConfig {
        &self.script
    }

    /// True once the cursor is past the last testcase
    pub fn is_exhausted(&self, state: &DriverState) -> bool {
        state.current_case >= self.script.len()
    }

    fn remaining(&self, state: &DriverState) -> usize {
        self.script.len().saturating_sub(state.current_case)
    }

    /// Service one step over `io`
    pub async fn dispatch<S>(&self, state: DriverState, io: &mut S) -> Transition
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let Some(testcase) = self.script.testcase(state.current_case) else {
            log::debug!("No testcase at index {}", state.current_case);
            return Transition::new(state, TesterEvent::Exhausted);
        };

        if state.attempts > 0 {
            let delay = self.retry.delay(state.attempts);
            if !delay.is_zero() {
                log::debug!("Retry #{} of {}: waiting {:?}", state.attempts, state.step, delay);
                tokio::time::sleep(delay).await;
            }
        }

        log::info!(
            "[{}] testcase {} ({}/{})",
            state.step,
            testcase.id,
            state.current_case + 1,
            self.script.len()
        );

        match state.step {
            TesterState::Supi => self.on_supi(state, io).await,
            TesterState::MsgType => self.on_msg_type(state, testcase, io).await,
            TesterState::Msg => self.on_msg(state, testcase, io).await,
            TesterState::Res => self.on_res(state, testcase, io).await,
        }
    }

    async fn on_supi<S>(&self, state: DriverState, io: &mut S) -> Transition
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if let Err(e) = write_all(io, self.script.supi.as_bytes()).await {
            log::warn!("Failed to send SUPI: {e}");
            return Transition::new(
                state,
                TesterEvent::StepFailed {
                    step: TesterState::Supi,
                    attempts: state.attempts,
                    reason: e.to_string(),
                },
            );
        }

        log::info!("SUPI sent: {}", self.script.supi);
        Transition::new(state.goto(TesterState::MsgType), TesterEvent::SupiSent)
    }

    async fn on_msg_type<S>(&self, state: DriverState, testcase: &Testcase, io: &mut S) -> Transition
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let probe = match read_byte(io).await {
            Ok(b) => b,
            Err(e) => return self.retry_or_abort(state, testcase, format!("read failed: {e}")),
        };

        if probe != testcase.msg_type {
            log::info!(
                "Message type mismatch: expected {}, received {}",
                testcase.msg_type,
                probe
            );
            if let Err(e) = write_all(io, &[WIRE_FALSE]).await {
                log::warn!("Failed to send mismatch: {e}");
            }
            // Probing is the UE's normal path; only I/O failures count as attempts
            return Transition::new(
                state.goto(TesterState::MsgType),
                TesterEvent::MsgTypeMismatch {
                    expected: testcase.msg_type,
                    received: probe,
                },
            );
        }

        let reply = if testcase.plain { WIRE_PLAIN } else { WIRE_ENCRYPTED };
        if let Err(e) = write_all(io, &[reply]).await {
            return self.retry_or_abort(state, testcase, format!("write failed: {e}"));
        }

        log::info!(
            "Message type {} accepted ({})",
            probe,
            if testcase.plain { "plain" } else { "encrypted" }
        );
        Transition::new(
            state.goto(TesterState::Msg),
            TesterEvent::MsgTypeAccepted {
                msg_type: probe,
                plain: testcase.plain,
            },
        )
    }

    async fn on_msg<S>(&self, state: DriverState, testcase: &Testcase, io: &mut S) -> Transition
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; MAX_MSG_LEN];
        let len = match io.read(&mut buf).await {
            Ok(0) => return self.retry_or_abort(state, testcase, "peer closed before sending".to_string()),
            Ok(n) => n,
            Err(e) => return self.retry_or_abort(state, testcase, format!("read failed: {e}")),
        };
        let message = &buf[..len];
        log::debug!("Original message: {}", to_hex(message));

        let mutated = match mutate_message(message, testcase, &self.layout) {
            Ok(m) => m,
            Err(e) => {
                log::error!("Testcase {} cannot be applied: {}", testcase.id, e);
                return self.abort(state, testcase, AbortReason::Mutation(e));
            }
        };
        log::debug!("Mutated message:  {}", to_hex(&mutated));

        if let Err(e) = write_all(io, &mutated).await {
            return self.retry_or_abort(state, testcase, format!("write failed: {e}"));
        }

        log::info!("Mutated message sent ({} bytes)", mutated.len());
        Transition::new(
            state.goto(TesterState::Res),
            TesterEvent::MessageRelayed { len: mutated.len() },
        )
    }

    async fn on_res<S>(&self, state: DriverState, testcase: &Testcase, io: &mut S) -> Transition
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let response_type = match read_byte(io).await {
            Ok(b) => b,
            Err(e) => return self.retry_or_abort(state, testcase, format!("read failed: {e}")),
        };
        log::info!("Testcase {} response type: {}", testcase.id, response_type);

        let result = TestcaseResult::new(response_type, testcase.clone());
        if let Err(e) = self.sink.insert(&result).await {
            log::error!("Failed to store result of testcase {}: {}", testcase.id, e);
        }

        if let Err(e) = write_all(io, &[WIRE_FALSE]).await {
            log::warn!("Failed to acknowledge response: {e}");
        }

        let next = state.next_case();
        let remaining = self.remaining(&next);
        Transition::new(next, TesterEvent::CaseCompleted { result, remaining })
    }

    /// Count a failed attempt; give up on the testcase once the cap is hit
    fn retry_or_abort(&self, state: DriverState, testcase: &Testcase, reason: String) -> Transition {
        let attempts = state.attempts + 1;
        log::warn!("[{}] attempt {} failed: {}", state.step, attempts, reason);

        if self.retry.is_exhausted(attempts) {
            return self.abort(
                state,
                testcase,
                AbortReason::RetriesExhausted {
                    step: state.step,
                    attempts,
                },
            );
        }

        Transition::new(
            DriverState { attempts, ..state },
            TesterEvent::StepFailed {
                step: state.step,
                attempts,
                reason,
            },
        )
    }

    fn abort(&self, state: DriverState, testcase: &Testcase, reason: AbortReason) -> Transition {
        log::error!("Testcase {} aborted: {}", testcase.id, reason);
        let next = state.next_case();
        let remaining = self.remaining(&next);
        Transition::new(
            next,
            TesterEvent::CaseAborted {
                testcase_id: testcase.id,
                reason,
                remaining,
            },
        )
    }
}

async fn read_byte<S: AsyncRead + Unpin>(io: &mut S) -> std::io::Result<u8> {
    let mut buf = [0u8; 1];
    match io.read(&mut buf).await? {
        0 => Err(std::io::ErrorKind::UnexpectedEof.into()),
        _ => Ok(buf[0]),
    }
}

async fn write_all<S: AsyncWrite + Unpin>(io: &mut S, data: &[u8]) -> std::io::Result<()> {
    io.write_all(data).await?;
    io.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use smc_dbi::MemoryResultStore;
    use tokio::io::{duplex, DuplexStream};

    const SUPI: &str = "imsi-001010000000001";

    fn script(testcases: Vec<Testcase>) -> Arc<TestcaseConfig> {
        Arc::new(TestcaseConfig::new(SUPI, testcases))
    }

    fn sm_with(testcases: Vec<Testcase>, retry: RetryPolicy) -> (TesterSm, MemoryResultStore) {
        let store = MemoryResultStore::new();
        let sm = TesterSm::new(
            script(testcases),
            MutationLayout::default(),
            retry,
            Arc::new(store.clone()),
        );
        (sm, store)
    }

    fn at(current_case: usize, step: TesterState) -> DriverState {
        DriverState {
            current_case,
            step,
            attempts: 0,
        }
    }

    /// Run one step: the UE sends `input`, then everything the tester wrote is returned
    async fn step(sm: &TesterSm, state: DriverState, input: &[u8]) -> (Transition, Vec<u8>) {
        let (mut ue, mut tester): (DuplexStream, DuplexStream) = duplex(4096);
        ue.write_all(input).await.unwrap();
        ue.shutdown().await.unwrap();
        let transition = sm.dispatch(state, &mut tester).await;
        drop(tester);

        let mut out = Vec::new();
        ue.read_to_end(&mut out).await.unwrap();
        (transition, out)
    }

    #[tokio::test]
    async fn test_supi_step_sends_identity_verbatim() {
        let (sm, _) = sm_with(vec![Testcase::new(1, 93, true)], RetryPolicy::default());
        let (transition, out) = step(&sm, DriverState::default(), &[]).await;

        assert_eq!(out, SUPI.as_bytes());
        assert!(matches!(transition.event, TesterEvent::SupiSent));
        assert_eq!(transition.state, at(0, TesterState::MsgType));
    }

    #[tokio::test]
    async fn test_msg_type_match_plain() {
        let (sm, _) = sm_with(vec![Testcase::new(1, 93, true)], RetryPolicy::default());
        let (transition, out) = step(&sm, at(0, TesterState::MsgType), &[93]).await;

        assert_eq!(out, [WIRE_PLAIN]);
        assert_eq!(transition.state, at(0, TesterState::Msg));
        assert!(matches!(
            transition.event,
            TesterEvent::MsgTypeAccepted { msg_type: 93, plain: true }
        ));
    }

    #[tokio::test]
    async fn test_msg_type_match_encrypted() {
        let (sm, _) = sm_with(vec![Testcase::new(1, 93, false)], RetryPolicy::default());
        let (transition, out) = step(&sm, at(0, TesterState::MsgType), &[93]).await;

        assert_eq!(out, [WIRE_ENCRYPTED]);
        assert_eq!(transition.state.step, TesterState::Msg);
    }

    #[tokio::test]
    async fn test_msg_type_mismatch_stays() {
        let (sm, _) = sm_with(vec![Testcase::new(1, 93, true)], RetryPolicy::default());
        let (transition, out) = step(&sm, at(0, TesterState::MsgType), &[94]).await;

        assert_eq!(out, [WIRE_FALSE]);
        assert_eq!(transition.state, at(0, TesterState::MsgType));
        assert!(matches!(
            transition.event,
            TesterEvent::MsgTypeMismatch { expected: 93, received: 94 }
        ));
    }

    #[tokio::test]
    async fn test_wrong_probes_never_abort_with_default_config() {
        let retry = RetryConfig::default().policy();
        assert!(retry.max_attempts > 0);
        let (sm, store) = sm_with(
            vec![Testcase::new(1, 93, true), Testcase::new(2, 93, true)],
            retry,
        );

        // Every possible wrong probe, several rounds, with no backoff in between
        let run = async {
            let mut state = at(0, TesterState::MsgType);
            for _ in 0..3 {
                for probe in (0..=u8::MAX).filter(|b| *b != 93) {
                    let (transition, out) = step(&sm, state, &[probe]).await;
                    assert_eq!(out, [WIRE_FALSE]);
                    assert!(matches!(
                        transition.event,
                        TesterEvent::MsgTypeMismatch { expected: 93, .. }
                    ));
                    state = transition.state;
                }
            }
            state
        };
        let state = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("mismatch replies must not be delayed");

        assert_eq!(state, at(0, TesterState::MsgType));
        assert!(store.is_empty().await);

        let (transition, out) = step(&sm, state, &[93]).await;
        assert_eq!(out, [WIRE_PLAIN]);
        assert_eq!(transition.state, at(0, TesterState::Msg));
    }

    #[tokio::test]
    async fn test_msg_type_mismatch_clears_failed_attempts() {
        let (sm, _) = sm_with(vec![Testcase::new(1, 93, true)], RetryPolicy::default());
        let state = DriverState {
            current_case: 0,
            step: TesterState::MsgType,
            attempts: 4,
        };
        let (transition, _) = step(&sm, state, &[1]).await;
        assert_eq!(transition.state, at(0, TesterState::MsgType));
    }

    #[tokio::test]
    async fn test_msg_type_read_failure_cap_aborts_case() {
        let retry = RetryPolicy {
            max_attempts: 2,
            backoff: Duration::ZERO,
        };
        let (sm, store) = sm_with(
            vec![Testcase::new(1, 93, true), Testcase::new(2, 93, true)],
            retry,
        );

        // A wrong probe in between clears the failure count
        let (first, _) = step(&sm, at(0, TesterState::MsgType), &[]).await;
        assert_eq!(first.state.attempts, 1);
        let (probe, _) = step(&sm, first.state, &[1]).await;
        assert_eq!(probe.state, at(0, TesterState::MsgType));
        let (second, _) = step(&sm, probe.state, &[]).await;
        assert_eq!(second.state.attempts, 1);

        let (third, out) = step(&sm, second.state, &[]).await;
        assert!(out.is_empty());
        assert_eq!(third.state, at(1, TesterState::MsgType));
        match third.event {
            TesterEvent::CaseAborted {
                testcase_id,
                reason: AbortReason::RetriesExhausted { step, attempts },
                remaining,
            } => {
                assert_eq!(testcase_id, 1);
                assert_eq!(step, TesterState::MsgType);
                assert_eq!(attempts, 2);
                assert_eq!(remaining, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_msg_type_peer_closed_is_failure() {
        let (sm, _) = sm_with(vec![Testcase::new(1, 93, true)], RetryPolicy::default());
        let (transition, out) = step(&sm, at(0, TesterState::MsgType), &[]).await;

        assert!(out.is_empty());
        assert_eq!(transition.state.step, TesterState::MsgType);
        assert_eq!(transition.state.attempts, 1);
        assert!(matches!(
            transition.event,
            TesterEvent::StepFailed { step: TesterState::MsgType, attempts: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_msg_unpatched_is_relayed_unchanged() {
        let (sm, _) = sm_with(vec![Testcase::new(1, 5, true)], RetryPolicy::default());
        let msg = [0xaa, 0xbb, 0xcc, 0xdd];
        let (transition, out) = step(&sm, at(0, TesterState::Msg), &msg).await;

        assert_eq!(out, msg);
        assert_eq!(transition.state, at(0, TesterState::Res));
        assert!(matches!(transition.event, TesterEvent::MessageRelayed { len: 4 }));
    }

    #[tokio::test]
    async fn test_msg_mac_override() {
        let (sm, _) = sm_with(
            vec![Testcase::new(1, 93, false).with_mac("deadbeef")],
            RetryPolicy::default(),
        );
        let msg = [0x7e, 0x03, 0x11, 0x22, 0x33, 0x44, 0x00, 0x5d];
        let (_, out) = step(&sm, at(0, TesterState::Msg), &msg).await;

        assert_eq!(to_hex(&out), "7e03deadbeef005d");
    }

    #[tokio::test]
    async fn test_msg_out_of_range_patch_aborts_without_writing() {
        let (sm, store) = sm_with(
            vec![Testcase::new(7, 93, false).with_offset(6, "abcd")],
            RetryPolicy::default(),
        );
        let (transition, out) = step(&sm, at(0, TesterState::Msg), &[0x7e, 0x03, 0x00, 0x00]).await;

        assert!(out.is_empty());
        assert_eq!(transition.state, at(1, TesterState::MsgType));
        match transition.event {
            TesterEvent::CaseAborted {
                testcase_id: 7,
                reason: AbortReason::Mutation(e),
                remaining: 0,
            } => assert!(e.is_malformed_testcase()),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_msg_invalid_hex_aborts() {
        let (sm, _) = sm_with(
            vec![Testcase::new(7, 93, false).with_offset(0, "zz")],
            RetryPolicy::default(),
        );
        let (transition, out) = step(&sm, at(0, TesterState::Msg), &[0x7e, 0x03]).await;

        assert!(out.is_empty());
        match transition.event {
            TesterEvent::CaseAborted {
                reason: AbortReason::Mutation(e),
                ..
            } => assert!(e.is_codec_error()),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_msg_reads_at_most_cap() {
        let (sm, _) = sm_with(vec![Testcase::new(1, 93, true)], RetryPolicy::default());
        let (mut ue, mut tester) = duplex(4 * MAX_MSG_LEN);
        ue.write_all(&vec![0x5a; MAX_MSG_LEN + 100]).await.unwrap();

        let transition = sm.dispatch(at(0, TesterState::Msg), &mut tester).await;
        drop(tester);
        let mut out = Vec::new();
        ue.read_to_end(&mut out).await.unwrap();

        assert_eq!(out.len(), MAX_MSG_LEN);
        assert!(matches!(transition.event, TesterEvent::MessageRelayed { len: MAX_MSG_LEN }));
    }

    #[tokio::test]
    async fn test_res_records_result_and_advances() {
        let (sm, store) = sm_with(
            vec![Testcase::new(1, 5, true), Testcase::new(2, 5, false)],
            RetryPolicy::default(),
        );
        let (transition, out) = step(&sm, at(0, TesterState::Res), &[9]).await;

        assert_eq!(out, [WIRE_FALSE]);
        assert_eq!(transition.state, at(1, TesterState::MsgType));
        match transition.event {
            TesterEvent::CaseCompleted { result, remaining } => {
                assert_eq!(result.response_type, 9);
                assert_eq!(result.test_case.id, 1);
                assert_eq!(remaining, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let stored = store.results().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].response_type, 9);
        assert_eq!(stored[0].test_case, Testcase::new(1, 5, true));
    }

    #[tokio::test]
    async fn test_res_read_failure_keeps_step() {
        let (sm, store) = sm_with(vec![Testcase::new(1, 5, true)], RetryPolicy::default());
        let (transition, _) = step(&sm, at(0, TesterState::Res), &[]).await;

        assert_eq!(transition.state.step, TesterState::Res);
        assert_eq!(transition.state.current_case, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_success_resets_attempts() {
        let (sm, _) = sm_with(vec![Testcase::new(1, 93, true)], RetryPolicy::default());
        let state = DriverState {
            current_case: 0,
            step: TesterState::MsgType,
            attempts: 3,
        };
        let (transition, _) = step(&sm, state, &[93]).await;
        assert_eq!(transition.state, at(0, TesterState::Msg));
    }

    #[tokio::test]
    async fn test_exhausted_cursor_touches_nothing() {
        let (sm, store) = sm_with(vec![Testcase::new(1, 5, true)], RetryPolicy::default());
        let state = at(1, TesterState::MsgType);
        assert!(sm.is_exhausted(&state));

        let (transition, out) = step(&sm, state, &[5]).await;
        assert!(out.is_empty());
        assert_eq!(transition.state, state);
        assert!(matches!(transition.event, TesterEvent::Exhausted));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_script_is_exhausted() {
        let (sm, _) = sm_with(Vec::new(), RetryPolicy::default());
        assert!(sm.is_exhausted(&DriverState::default()));
    }

    #[test]
    fn test_retry_policy() {
        let unbounded = RetryPolicy::unbounded();
        assert!(!unbounded.is_exhausted(u32::MAX));

        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(10),
        };
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
        assert_eq!(policy.delay(3), Duration::from_millis(30));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(TesterState::Supi.to_string(), "SUPI");
        assert_eq!(TesterState::MsgType.to_string(), "MSG_TYPE");
        assert_eq!(TesterState::Msg.to_string(), "MSG");
        assert_eq!(TesterState::Res.to_string(), "RES");
    }
}
