//! Poll-and-forward orchestration.
//!
//! One run reads the stored watermark, fetches every record in the derived
//! time window, forwards each to the sink, flushes, and persists the highest
//! timestamp seen. Any failure aborts the run before the watermark moves.

use std::sync::Arc;

use futures_util::future::try_join_all;
use futures_util::StreamExt;
use tracing::Instrument;
use uuid::Uuid;

use super::{ConnectorError, HighWaterMark, RunState, RunStateMachine};
use crate::sink::LogSink;
use crate::source::{AuditLogSource, Clock, TimeWindow, WindowPolicy};
use crate::watermark::WatermarkStore;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub category: String,
    pub window: TimeWindow,
    /// Records handed to the sink during this run.
    pub forwarded: u64,
    /// Highest timestamp known at the end of the run.
    pub watermark: Option<i64>,
    /// Whether a new watermark was written.
    pub persisted: bool,
    /// Cumulative count the sink reports as delivered.
    pub sink_sent_total: u64,
}

fn parse_watermark(stored: Option<&str>) -> Option<i64> {
    let raw = stored?.trim();
    match raw.parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(value = raw, "Ignoring unparsable stored watermark");
            None
        }
    }
}

/// Forwards one category of audit records per run.
pub struct AuditLogForwarder {
    source: Arc<dyn AuditLogSource>,
    sink: Arc<dyn LogSink>,
    store: Arc<dyn WatermarkStore>,
    clock: Arc<dyn Clock>,
    policy: WindowPolicy,
    category: String,
    state: RunStateMachine,
}

impl AuditLogForwarder {
    #[must_use]
    pub fn new(
        source: Arc<dyn AuditLogSource>,
        sink: Arc<dyn LogSink>,
        store: Arc<dyn WatermarkStore>,
        clock: Arc<dyn Clock>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            source,
            sink,
            store,
            clock,
            policy: WindowPolicy::default(),
            category: category.into(),
            state: RunStateMachine::new(),
        }
    }

    /// Set the window policy (builder pattern).
    #[must_use]
    pub fn with_policy(mut self, policy: WindowPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Phase reached by the most recent run.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state.state()
    }

    /// Phases visited by the most recent run.
    #[must_use]
    pub fn history(&self) -> &[RunState] {
        self.state.history()
    }

    /// Execute one run.
    ///
    /// # Errors
    ///
    /// Returns the first fetch, sink, or store error; the run is then
    /// `Aborted` and the stored watermark is unchanged.
    pub async fn run(&mut self) -> Result<RunReport, ConnectorError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("forward", %run_id, category = %self.category);
        self.run_inner(run_id).instrument(span).await
    }

    fn abort(&mut self, err: impl Into<ConnectorError>) -> ConnectorError {
        let err = err.into();
        tracing::error!(state = ?self.state.state(), error = %err, "Run aborted");
        self.state.transition(RunState::Aborted);
        err
    }

    async fn run_inner(&mut self, run_id: Uuid) -> Result<RunReport, ConnectorError> {
        self.state = RunStateMachine::new();

        let stored = match self.store.get().await {
            Ok(stored) => stored,
            Err(e) => return Err(self.abort(e)),
        };
        let watermark = parse_watermark(stored.as_deref());
        let window = self.policy.compute(watermark, self.clock.now_secs());
        self.state.transition(RunState::WindowComputed);

        if window.from_lookback {
            tracing::info!("No recent watermark, starting from the lookback boundary");
        }
        tracing::info!(start_ms = window.start_ms, end_ms = window.end_ms, "Searching audit logs");

        self.state.transition(RunState::Fetching);
        let mut tracker = HighWaterMark::new(watermark);
        let mut forwarded: u64 = 0;
        let mut records = self.source.fetch(window);

        while let Some(item) = records.next().await {
            let record = match item {
                Ok(record) => record,
                Err(e) => return Err(self.abort(e)),
            };
            self.state.transition(RunState::Forwarding);

            tracker.observe(record.timestamp());
            if let Err(e) = self.sink.send(&record, &self.category).await {
                return Err(self.abort(e));
            }
            forwarded += 1;
        }

        self.state.transition(RunState::Flushing);
        if let Err(e) = self.sink.flush(&self.category).await {
            return Err(self.abort(e));
        }
        tracing::info!(forwarded, "Audit logs have been sent");

        self.state.transition(RunState::Persisting);
        let persisted = match tracker.advanced() {
            Some(ts) => {
                if let Err(e) = self.store.post(ts.to_string()).await {
                    return Err(self.abort(e));
                }
                tracing::info!(watermark = ts, "Last audit timestamp saved");
                true
            }
            None => false,
        };

        self.state.transition(RunState::Done);
        Ok(RunReport {
            run_id,
            category: self.category.clone(),
            window,
            forwarded,
            watermark: tracker.current(),
            persisted,
            sink_sent_total: self.sink.successful_sent_events(),
        })
    }
}

/// Run every forwarder and wait for all of them.
///
/// # Errors
///
/// Returns the first error any forwarder produced.
pub async fn run_all(
    forwarders: &mut [AuditLogForwarder],
) -> Result<Vec<RunReport>, ConnectorError> {
    try_join_all(forwarders.iter_mut().map(|forwarder| forwarder.run())).await
}
