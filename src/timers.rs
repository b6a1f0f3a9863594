use crate::path;
use std::collections::BTreeMap;

pub const AUTO_SAVE_DELAY_MS: f64 = 1500.0;
pub const PREVIEW_DEBOUNCE_MS: f64 = 300.0;

/// Coalesces a burst of triggers into one firing after a quiet period.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay_ms: f64,
    deadline: Option<f64>,
}

impl Debounce {
    pub fn new(delay_ms: f64) -> Self {
        Debounce {
            delay_ms,
            deadline: None,
        }
    }

    pub fn trigger(&mut self, now_ms: f64) {
        self.deadline = Some(now_ms + self.delay_ms);
    }

    /// True once per burst, when the quiet period has elapsed.
    pub fn fire(&mut self, now_ms: f64) -> bool {
        match self.deadline {
            Some(at) if at <= now_ms => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Unsaved editor buffers, flushed after a quiet period when enabled.
#[derive(Debug, Clone)]
pub struct AutoSave {
    enabled: bool,
    timer: Debounce,
    pending: BTreeMap<String, String>,
}

impl AutoSave {
    pub fn new(enabled: bool) -> Self {
        AutoSave {
            enabled,
            timer: Debounce::new(AUTO_SAVE_DELAY_MS),
            pending: BTreeMap::new(),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.timer.cancel();
        }
    }

    pub fn is_dirty(&self, path: &str) -> bool {
        self.pending.contains_key(path)
    }

    pub fn pending_paths(&self) -> impl Iterator<Item = &str> {
        self.pending.keys().map(String::as_str)
    }

    pub fn pending_content(&self, path: &str) -> Option<&str> {
        self.pending.get(path).map(String::as_str)
    }

    /// Record an edit; every edit restarts the quiet period.
    pub fn note_edit(&mut self, path: &str, content: &str, now_ms: f64) {
        self.pending.insert(path.into(), content.into());
        if self.enabled {
            self.timer.trigger(now_ms);
        }
    }

    /// Buffers to save now, if the quiet period has elapsed.
    pub fn take_due(&mut self, now_ms: f64) -> Vec<(String, String)> {
        if self.enabled && self.timer.fire(now_ms) {
            self.flush()
        } else {
            Vec::new()
        }
    }

    /// Everything pending, regardless of timing (explicit save).
    pub fn flush(&mut self) -> Vec<(String, String)> {
        self.timer.cancel();
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    pub fn take(&mut self, path: &str) -> Option<String> {
        let content = self.pending.remove(path);
        if self.pending.is_empty() {
            self.timer.cancel();
        }
        content
    }

    pub fn discard(&mut self, path: &str) {
        self.take(path);
    }

    /// Follow a move: buffers at or below `from` now belong under `to`.
    /// The quiet period already running is kept.
    pub fn rekey(&mut self, from: &str, to: &str) {
        let moving: Vec<String> = self
            .pending
            .keys()
            .filter(|p| path::is_within(p, from))
            .cloned()
            .collect();
        for old in moving {
            if let (Some(new), Some(content)) =
                (path::rebase(&old, from, to), self.pending.remove(&old))
            {
                self.pending.insert(new, content);
            }
        }
    }
}
