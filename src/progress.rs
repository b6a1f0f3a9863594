//! Paced output for simulated long-running commands (builds, installs,
//! pings). The host drives time: it calls [`ProgressQueue::poll`] with the
//! current clock and prints whatever became due.

use crate::output::{Line, LineKind};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub delay_ms: u32,
    pub line: Line,
}

/// A scripted sequence of delayed lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub label: String,
    pub steps: Vec<Step>,
}

impl Job {
    pub fn new(label: impl Into<String>) -> Self {
        Job {
            label: label.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, delay_ms: u32, kind: LineKind, text: impl Into<String>) -> Self {
        self.steps.push(Step {
            delay_ms,
            line: Line {
                kind,
                text: text.into(),
            },
        });
        self
    }

    pub fn total_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.delay_ms as u64).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Done,
}

#[derive(Debug, Clone)]
pub struct ProgressQueue {
    state: JobState,
    label: String,
    pending: VecDeque<Step>,
    next_due: f64,
}

impl Default for ProgressQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressQueue {
    pub fn new() -> Self {
        ProgressQueue {
            state: JobState::Idle,
            label: String::new(),
            pending: VecDeque::new(),
            next_due: 0.0,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Start a job, replacing whatever was running.
    pub fn start(&mut self, job: Job, now_ms: f64) {
        if self.is_running() {
            tracing::debug!(replaced = %self.label, by = %job.label, "progress job replaced");
        }
        self.label = job.label;
        self.pending = job.steps.into();
        match self.pending.front() {
            Some(first) => {
                self.next_due = now_ms + first.delay_ms as f64;
                self.state = JobState::Running;
            }
            None => self.state = JobState::Done,
        }
    }

    /// Lines that became due by `now_ms`. Pacing is measured from each
    /// step's due time, so a late poll catches up in one go.
    pub fn poll(&mut self, now_ms: f64) -> Vec<Line> {
        let mut out = Vec::new();
        while self.state == JobState::Running && self.next_due <= now_ms {
            let Some(step) = self.pending.pop_front() else {
                self.state = JobState::Done;
                break;
            };
            out.push(step.line);
            match self.pending.front() {
                Some(next) => self.next_due += next.delay_ms as f64,
                None => self.state = JobState::Done,
            }
        }
        out
    }

    /// Stop the running job. Returns whether anything was cancelled.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.is_running();
        self.pending.clear();
        self.state = JobState::Idle;
        was_running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new("build")
            .step(100, LineKind::Info, "one")
            .step(200, LineKind::Info, "two")
            .step(0, LineKind::Success, "done")
    }

    fn texts(lines: &[Line]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn lines_come_due_in_order() {
        let mut q = ProgressQueue::new();
        q.start(job(), 1000.0);
        assert_eq!(q.state(), JobState::Running);
        assert!(q.poll(1050.0).is_empty());
        assert_eq!(texts(&q.poll(1100.0)), vec!["one"]);
        assert!(q.poll(1299.0).is_empty());
        assert_eq!(texts(&q.poll(1300.0)), vec!["two", "done"]);
        assert_eq!(q.state(), JobState::Done);
    }

    #[test]
    fn late_poll_catches_up() {
        let mut q = ProgressQueue::new();
        q.start(job(), 0.0);
        assert_eq!(q.poll(10_000.0).len(), 3);
    }

    #[test]
    fn cancel_returns_to_idle() {
        let mut q = ProgressQueue::new();
        q.start(job(), 0.0);
        assert!(q.cancel());
        assert_eq!(q.state(), JobState::Idle);
        assert!(q.poll(10_000.0).is_empty());
        assert!(!q.cancel());
    }

    #[test]
    fn empty_job_is_done_immediately() {
        let mut q = ProgressQueue::new();
        q.start(Job::new("noop"), 0.0);
        assert_eq!(q.state(), JobState::Done);
    }

    #[test]
    fn total_duration() {
        assert_eq!(job().total_ms(), 300);
    }
}
