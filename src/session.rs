use crate::output::Line;
use crate::path;
use crate::progress::ProgressQueue;
use crate::vfs::Registry;
use serde::Serialize;

const SCROLLBACK_LIMIT: usize = 1000;

/// Append-only command history with arrow-key traversal from the end.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
    cursor: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: &str) {
        self.cursor = None;
        if line.is_empty() || self.entries.last().map(String::as_str) == Some(line) {
            return;
        }
        self.entries.push(line.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// Arrow up: step back one entry, sticking at the oldest.
    pub fn previous(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = match self.cursor {
            None => self.entries.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.cursor = Some(idx);
        self.entries.get(idx).map(String::as_str)
    }

    /// Arrow down: step forward; past the newest returns an empty line.
    pub fn next(&mut self) -> Option<&str> {
        match self.cursor {
            None => None,
            Some(i) if i + 1 >= self.entries.len() => {
                self.cursor = None;
                Some("")
            }
            Some(i) => {
                self.cursor = Some(i + 1);
                self.entries.get(i + 1).map(String::as_str)
            }
        }
    }
}

/// One terminal tab. Tabs share the workspace but not cwd or scrollback.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: u32,
    pub display_name: String,
    pub cwd: String,
    pub previous_cwd: Option<String>,
    pub history: History,
    pub scrollback: Vec<Line>,
    pub progress: ProgressQueue,
}

impl Session {
    pub fn new(id: u32, display_name: impl Into<String>) -> Self {
        Session {
            id,
            display_name: display_name.into(),
            cwd: path::ROOT.into(),
            previous_cwd: None,
            history: History::new(),
            scrollback: Vec::new(),
            progress: ProgressQueue::new(),
        }
    }

    pub fn set_cwd(&mut self, dir: String) {
        if dir != self.cwd {
            self.previous_cwd = Some(std::mem::replace(&mut self.cwd, dir));
        }
    }

    /// Keep the working directory valid after the tree changed: follow
    /// moves, then fall back to the closest directory that still exists.
    pub fn relocate(&mut self, moves: &[(String, String)], registry: &Registry) {
        for (from, to) in moves {
            if let Some(cwd) = path::rebase(&self.cwd, from, to) {
                self.cwd = cwd;
            }
            if let Some(prev) = self
                .previous_cwd
                .as_deref()
                .and_then(|p| path::rebase(p, from, to))
            {
                self.previous_cwd = Some(prev);
            }
        }
        if !registry.is_dir(&self.cwd) {
            self.cwd = registry.nearest_dir(&self.cwd);
        }
    }

    pub fn append(&mut self, lines: impl IntoIterator<Item = Line>) {
        self.scrollback.extend(lines);
        if self.scrollback.len() > SCROLLBACK_LIMIT {
            let excess = self.scrollback.len() - SCROLLBACK_LIMIT;
            self.scrollback.drain(..excess);
        }
    }

    pub fn prompt(&self) -> String {
        format!(
            "{}@{}:{}$ ",
            crate::defaults::OWNER,
            crate::defaults::HOSTNAME,
            path::display(&self.cwd)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: u32,
    pub display_name: String,
    pub cwd: String,
    pub active: bool,
}

/// Terminal tabs. There is always at least one.
#[derive(Debug, Clone)]
pub struct SessionManager {
    sessions: Vec<Session>,
    active: u32,
    next_id: u32,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        SessionManager {
            sessions: vec![Session::new(1, "bash")],
            active: 1,
            next_id: 2,
        }
    }

    pub fn create(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.push(Session::new(id, format!("bash ({})", id)));
        self.active = id;
        tracing::debug!(id, "terminal session opened");
        id
    }

    /// Close a tab. Closing the last one opens a fresh tab.
    pub fn close(&mut self, id: u32) -> bool {
        let Some(pos) = self.sessions.iter().position(|s| s.id == id) else {
            return false;
        };
        self.sessions.remove(pos);
        tracing::debug!(id, "terminal session closed");
        if self.sessions.is_empty() {
            self.create();
        } else if self.active == id {
            let idx = pos.min(self.sessions.len() - 1);
            self.active = self.sessions[idx].id;
        }
        true
    }

    pub fn rename(&mut self, id: u32, name: &str) -> bool {
        match self.get_mut(id) {
            Some(s) if !name.trim().is_empty() => {
                s.display_name = name.trim().into();
                true
            }
            _ => false,
        }
    }

    pub fn activate(&mut self, id: u32) -> bool {
        if self.get(id).is_some() {
            self.active = id;
            true
        } else {
            false
        }
    }

    pub fn active_id(&self) -> u32 {
        self.active
    }

    pub fn get(&self, id: u32) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.iter_mut()
    }

    pub fn list(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .map(|s| SessionInfo {
                id: s.id,
                display_name: s.display_name.clone(),
                cwd: path::display(&s.cwd),
                active: s.id == self.active,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::FileRecord;

    #[test]
    fn relocate_follows_moves_and_falls_back() {
        let registry = Registry::from_records(vec![
            FileRecord::new("/site/css/a.css", ""),
            FileRecord::new("/kotlin/Main.kt", ""),
        ]);
        let mut s = Session::new(1, "bash");
        s.cwd = "/web/css".into();
        s.previous_cwd = Some("/web".into());
        s.relocate(&[("/web".into(), "/site".into())], &registry);
        assert_eq!(s.cwd, "/site/css");
        assert_eq!(s.previous_cwd.as_deref(), Some("/site"));

        s.cwd = "/flutter/lib".into();
        s.relocate(&[], &registry);
        assert_eq!(s.cwd, "/");
        s.cwd = "/kotlin/src".into();
        s.relocate(&[], &registry);
        assert_eq!(s.cwd, "/kotlin");
    }

    #[test]
    fn history_traversal() {
        let mut h = History::new();
        h.push("ls");
        h.push("ls");
        h.push("pwd");
        assert_eq!(h.entries().len(), 2);
        assert_eq!(h.previous(), Some("pwd"));
        assert_eq!(h.previous(), Some("ls"));
        assert_eq!(h.previous(), Some("ls"));
        assert_eq!(h.next(), Some("pwd"));
        assert_eq!(h.next(), Some(""));
        assert_eq!(h.next(), None);
    }

    #[test]
    fn sessions_have_independent_cwd() {
        let mut m = SessionManager::new();
        let second = m.create();
        m.get_mut(second).unwrap().set_cwd("/web".into());
        assert_eq!(m.get(1).unwrap().cwd, "/");
        assert_eq!(m.get(second).unwrap().previous_cwd.as_deref(), Some("/"));
    }

    #[test]
    fn closing_last_session_opens_a_new_one() {
        let mut m = SessionManager::new();
        assert!(m.close(1));
        assert_eq!(m.list().len(), 1);
        assert_ne!(m.active_id(), 1);
        assert!(!m.close(99));
    }

    #[test]
    fn closing_active_moves_focus() {
        let mut m = SessionManager::new();
        let a = m.create();
        let b = m.create();
        m.activate(a);
        m.close(a);
        assert_eq!(m.active_id(), b);
    }

    #[test]
    fn prompt_shows_alias_root() {
        let mut s = Session::new(1, "bash");
        assert_eq!(s.prompt(), "dev@portfolio:~$ ");
        s.set_cwd("/web".into());
        assert_eq!(s.prompt(), "dev@portfolio:~/web$ ");
    }
}
