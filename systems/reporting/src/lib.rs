#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Score reporting system that forwards finished sessions to a persistence sink.
//!
//! Delivery is best-effort and fire-and-forget: each session is submitted at
//! most once, failures are logged and never retried, and nothing here can
//! hold back the world's own termination.

use std::io::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use virus_smash_core::{Event, SessionId, SessionSummary};

/// Identifier attached to every submission so a shared leaderboard can tell games apart.
pub const GAME_ID: &str = "virus-smash";

/// Payload handed to a [`ScoreSink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    /// Game the score belongs to.
    pub game: String,
    /// Tallies of the finished session; `final_score` is the reported value.
    pub summary: SessionSummary,
}

impl ScoreSubmission {
    /// Wraps a finished session summary.
    #[must_use]
    pub fn new(summary: SessionSummary) -> Self {
        Self {
            game: GAME_ID.to_owned(),
            summary,
        }
    }

    /// Score being reported.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.summary.final_score
    }
}

/// Failures a sink may report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The submission could not be encoded.
    #[error("failed to encode score submission")]
    Encode(#[from] serde_json::Error),
    /// The destination could not be written.
    #[error("failed to write score submission")]
    Io(#[from] std::io::Error),
    /// The destination refused the submission.
    #[error("score submission rejected: {0}")]
    Rejected(String),
}

/// Destination for finished-session scores.
pub trait ScoreSink {
    /// Persists a single submission.
    fn submit(&mut self, submission: &ScoreSubmission) -> Result<(), ReportError>;
}

impl<S: ScoreSink + ?Sized> ScoreSink for Box<S> {
    fn submit(&mut self, submission: &ScoreSubmission) -> Result<(), ReportError> {
        (**self).submit(submission)
    }
}

/// Sink that keeps submissions in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    submissions: Vec<ScoreSubmission>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Submissions received so far, oldest first.
    #[must_use]
    pub fn submissions(&self) -> &[ScoreSubmission] {
        &self.submissions
    }
}

impl ScoreSink for MemorySink {
    fn submit(&mut self, submission: &ScoreSubmission) -> Result<(), ReportError> {
        self.submissions.push(submission.clone());
        Ok(())
    }
}

/// Sink that appends one JSON document per line to a writer.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wraps the provided writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink, yielding the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ScoreSink for JsonLinesSink<W> {
    fn submit(&mut self, submission: &ScoreSubmission) -> Result<(), ReportError> {
        let mut line = serde_json::to_vec(submission)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Pure system that reports each finished session to its sink exactly once.
#[derive(Debug)]
pub struct Reporting<S> {
    sink: S,
    last_attempted: Option<SessionId>,
    delivered: u32,
    failed: u32,
}

impl<S: ScoreSink> Reporting<S> {
    /// Creates a reporting system that submits to the provided sink.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            last_attempted: None,
            delivered: 0,
            failed: 0,
        }
    }

    /// Consumes world events, submitting every newly finished session.
    pub fn handle(&mut self, events: &[Event]) {
        for event in events {
            if let Event::SessionEnded { summary } = event {
                self.report(*summary);
            }
        }
    }

    fn report(&mut self, summary: SessionSummary) {
        if self
            .last_attempted
            .is_some_and(|last| summary.session <= last)
        {
            return;
        }
        self.last_attempted = Some(summary.session);

        let submission = ScoreSubmission::new(summary);
        match self.sink.submit(&submission) {
            Ok(()) => {
                self.delivered += 1;
                info!(
                    session = summary.session.get(),
                    score = submission.score(),
                    "score reported"
                );
            }
            Err(error) => {
                self.failed += 1;
                warn!(
                    session = summary.session.get(),
                    score = submission.score(),
                    %error,
                    "score report failed"
                );
            }
        }
    }

    /// Number of submissions the sink accepted.
    #[must_use]
    pub fn delivered(&self) -> u32 {
        self.delivered
    }

    /// Number of submissions the sink refused.
    #[must_use]
    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// Provides read-only access to the sink.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use virus_smash_core::EndCause;

    fn summary(session: u32, score: u32) -> SessionSummary {
        SessionSummary {
            session: SessionId::new(session),
            final_score: score,
            survival_secs: 12,
            viruses_smashed: 9,
            bosses_defeated: 0,
            best_combo: 4,
            cause: EndCause::HealthDepleted,
        }
    }

    #[test]
    fn json_lines_sink_writes_one_line_per_submission() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.submit(&ScoreSubmission::new(summary(1, 120)))
            .expect("in-memory writes succeed");
        sink.submit(&ScoreSubmission::new(summary(2, 45)))
            .expect("in-memory writes succeed");

        let written = String::from_utf8(sink.into_inner()).expect("utf-8 output");
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);

        let decoded: ScoreSubmission = serde_json::from_str(lines[1]).expect("valid json");
        assert_eq!(decoded.game, GAME_ID);
        assert_eq!(decoded.score(), 45);
    }

    #[test]
    fn errors_render_their_cause() {
        let error = ReportError::Rejected("leaderboard offline".to_owned());
        assert_eq!(error.to_string(), "score submission rejected: leaderboard offline");
    }
}
