//! Tester Driver Loop
//!
//! Accepts one UE connection at a time and hands it to the state machine
//! until every testcase has been completed or aborted.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use crate::control::{ControlDispatcher, ControlJob, ControlSignal};
use crate::tester_sm::{DriverState, TesterEvent, TesterSm};

/// Outcome of a full script run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Testcases with a recorded result
    pub completed: usize,
    /// Testcases given up without a result
    pub aborted: usize,
}

/// Driver loop
pub struct Driver {
    sm: TesterSm,
    state: DriverState,
    control: ControlDispatcher,
    dereg_delay: Duration,
}

impl Driver {
    pub fn new(sm: TesterSm, control: ControlDispatcher, dereg_delay: Duration) -> Self {
        Self {
            sm,
            state: DriverState::default(),
            control,
            dereg_delay,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Run the script to the end. Only an accept failure is an error.
    pub async fn run(mut self, listener: TcpListener) -> std::io::Result<RunSummary> {
        let mut summary = RunSummary::default();

        // Reset the AMF's testcase flag; the two jobs are not ordered
        self.control
            .dispatch(ControlJob::signal(ControlSignal::TestcaseEnable(false)));
        self.control
            .dispatch(ControlJob::signal(ControlSignal::TestcaseEnable(true)));

        log::info!(
            "Waiting for UE on {} ({} testcase(s))",
            listener.local_addr()?,
            self.sm.script().len()
        );

        while !self.sm.is_exhausted(&self.state) {
            let (mut stream, peer) = listener.accept().await?;
            log::debug!("Connection from {peer}");

            let transition = self.sm.dispatch(self.state, &mut stream).await;
            if let Err(e) = stream.shutdown().await {
                log::debug!("Shutdown of {peer} failed: {e}");
            }
            drop(stream);

            self.state = transition.state;
            match transition.event {
                TesterEvent::CaseCompleted { remaining, .. } => {
                    summary.completed += 1;
                    self.case_finished(remaining);
                }
                TesterEvent::CaseAborted { remaining, .. } => {
                    summary.aborted += 1;
                    self.case_finished(remaining);
                }
                _ => {}
            }
        }

        log::info!(
            "All testcases done ({} completed, {} aborted)",
            summary.completed,
            summary.aborted
        );
        self.control.drain().await;

        Ok(summary)
    }

    fn case_finished(&mut self, remaining: usize) {
        let supi = self.sm.script().supi.clone();
        self.control
            .dispatch(ControlJob::case_finished(supi, self.dereg_delay, remaining));
    }
}
