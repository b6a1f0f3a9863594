use crate::{
    archive,
    complete::complete,
    error::FsError,
    output::{Line, Output},
    path,
    preferences::Preferences,
    preview::{self, Preview},
    session::SessionManager,
    shell::Interpreter,
    sink::{EventSink, QueuedSink, ToastKind},
    storage::{KeyValueStore, MemoryStore, PersistenceBridge},
    timers::{AutoSave, Debounce, PREVIEW_DEBOUNCE_MS},
    workspace::Workspace,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "cannot serialize for host");
        "null".into()
    })
}

#[derive(Serialize)]
struct ExecResult<'a> {
    output: &'a Output,
    markup: String,
    prompt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionLines {
    session_id: u32,
    lines: Vec<Line>,
}

/// What changed since the last tick.
#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct TickReport {
    progress: Vec<SessionLines>,
    saved: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<Preview>,
}

/// The browser-facing facade. Every method returns plain values or JSON
/// strings; host notifications queue up until `drain_events`.
#[wasm_bindgen]
pub struct Ide {
    workspace: Workspace,
    interpreter: Interpreter,
    sessions: SessionManager,
    sink: QueuedSink,
    bridge: PersistenceBridge<Box<dyn KeyValueStore>>,
    prefs: Preferences,
    autosave: AutoSave,
    preview_timer: Debounce,
    preview_target: Option<String>,
}

impl Default for Ide {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
fn open_store() -> Box<dyn KeyValueStore> {
    match crate::storage::LocalStorage::open() {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "localStorage unavailable, changes will not persist");
            Box::new(MemoryStore::new())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn open_store() -> Box<dyn KeyValueStore> {
    Box::new(MemoryStore::new())
}

impl Ide {
    pub fn with_store(store: Box<dyn KeyValueStore>) -> Ide {
        let bridge = PersistenceBridge::new(store);
        let workspace = bridge.load();
        let mut prefs = Preferences::load(bridge.store());
        prefs.retain_folders(|d| workspace.registry().is_dir(d));
        Ide {
            autosave: AutoSave::new(prefs.auto_save),
            workspace,
            interpreter: Interpreter::new(),
            sessions: SessionManager::new(),
            sink: QueuedSink::new(),
            bridge,
            prefs,
            preview_timer: Debounce::new(PREVIEW_DEBOUNCE_MS),
            preview_target: None,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Run a line in a session and hand back the structured output.
    pub fn run(&mut self, session_id: u32, line: &str, now_ms: f64) -> Option<Output> {
        let revision = self.workspace.revision();
        let session = self.sessions.get_mut(session_id)?;
        let out = self.interpreter.execute(
            line,
            session,
            &mut self.workspace,
            &mut self.sink,
            now_ms,
        );
        if self.workspace.revision() != revision {
            self.after_change();
        }
        out
    }

    fn after_change(&mut self) {
        let moves = self.workspace.take_moves();
        for (from, to) in &moves {
            self.autosave.rekey(from, to);
            if let Some(target) = self
                .preview_target
                .as_deref()
                .and_then(|t| path::rebase(t, from, to))
            {
                self.preview_target = Some(target);
            }
        }
        for session in self.sessions.iter_mut() {
            session.relocate(&moves, self.workspace.registry());
        }
        let gone: Vec<String> = self
            .autosave
            .pending_paths()
            .filter(|p| !self.workspace.registry().is_file(p))
            .map(String::from)
            .collect();
        for p in gone {
            self.autosave.discard(&p);
        }
        self.prefs
            .retain_folders(|d| self.workspace.registry().is_dir(d));
        self.sink.files_changed();
        self.persist();
    }

    fn persist(&mut self) {
        if let Err(e) = self.bridge.save(&self.workspace) {
            tracing::warn!(error = %e, "saving workspace failed");
            self.sink
                .toast(ToastKind::Warning, "Could not save changes to local storage");
        }
    }

    fn save_prefs(&mut self) {
        if let Err(e) = self.prefs.save(self.bridge.store()) {
            tracing::warn!(error = %e, "saving preferences failed");
        }
    }

    fn report(&mut self, result: Result<(), FsError>, success: &str) -> bool {
        match result {
            Ok(()) => {
                self.after_change();
                if !success.is_empty() {
                    self.sink.toast(ToastKind::Success, success);
                }
                true
            }
            Err(e) => {
                self.sink.toast(ToastKind::Error, &e.to_string());
                false
            }
        }
    }

    /// The document to preview for `target`, with unsaved edits applied.
    pub fn compose_preview(&self, target: &str) -> Option<Preview> {
        let mut pending = self.autosave.pending_paths().peekable();
        if pending.peek().is_none() {
            return preview::compose(&self.workspace, target);
        }
        let mut draft = self.workspace.clone();
        for p in pending {
            if let Some(content) = self.autosave.pending_content(p) {
                if let Err(e) = draft.write(p, content) {
                    tracing::debug!(path = p, error = %e, "draft not applied to preview");
                }
            }
        }
        preview::compose(&draft, target)
    }

    /// Advance every timer to `now_ms`.
    pub fn advance(&mut self, now_ms: f64) -> (Vec<(u32, Vec<Line>)>, Vec<String>, Option<Preview>) {
        let mut progress = Vec::new();
        for session in self.sessions.iter_mut() {
            let lines = session.progress.poll(now_ms);
            if !lines.is_empty() {
                session.append(lines.iter().cloned());
                progress.push((session.id, lines));
            }
        }

        let mut saved = Vec::new();
        let due = self.autosave.take_due(now_ms);
        if !due.is_empty() {
            for (p, content) in due {
                match self.workspace.write(&p, &content) {
                    Ok(()) => saved.push(p),
                    Err(e) => tracing::warn!(path = %p, error = %e, "auto-save skipped"),
                }
            }
            self.after_change();
        }

        let preview = if self.preview_timer.fire(now_ms) {
            self.preview_target
                .clone()
                .and_then(|t| self.compose_preview(&t))
        } else {
            None
        };
        (progress, saved, preview)
    }
}

#[wasm_bindgen]
impl Ide {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Ide {
        crate::logging::init(false);
        Ide::with_store(open_store())
    }

    /// Called once the UI has hydrated; saves are suppressed before this.
    #[wasm_bindgen]
    pub fn mount(&mut self) {
        self.bridge.mount();
        self.persist();
    }

    #[wasm_bindgen]
    pub fn exec(&mut self, session_id: u32, line: &str, now_ms: f64) -> String {
        match self.run(session_id, line, now_ms) {
            Some(output) => {
                let prompt = self.prompt(session_id);
                to_json(&ExecResult {
                    markup: output.render_markup(),
                    output: &output,
                    prompt,
                })
            }
            None => "null".into(),
        }
    }

    #[wasm_bindgen]
    pub fn prompt(&self, session_id: u32) -> String {
        self.sessions
            .get(session_id)
            .map(|s| s.prompt())
            .unwrap_or_default()
    }

    #[wasm_bindgen]
    pub fn complete(&self, session_id: u32, input: &str) -> String {
        let cwd = self
            .sessions
            .get(session_id)
            .map_or(path::ROOT, |s| s.cwd.as_str());
        to_json(&complete(
            input,
            cwd,
            &self.workspace,
            self.interpreter.aliases(),
        ))
    }

    #[wasm_bindgen]
    pub fn history_prev(&mut self, session_id: u32) -> Option<String> {
        self.sessions
            .get_mut(session_id)?
            .history
            .previous()
            .map(String::from)
    }

    #[wasm_bindgen]
    pub fn history_next(&mut self, session_id: u32) -> Option<String> {
        self.sessions
            .get_mut(session_id)?
            .history
            .next()
            .map(String::from)
    }

    #[wasm_bindgen]
    pub fn scrollback(&self, session_id: u32) -> String {
        match self.sessions.get(session_id) {
            Some(s) => to_json(&s.scrollback),
            None => "[]".into(),
        }
    }

    #[wasm_bindgen]
    pub fn sessions(&self) -> String {
        to_json(&self.sessions.list())
    }

    #[wasm_bindgen]
    pub fn new_session(&mut self) -> u32 {
        self.sessions.create()
    }

    #[wasm_bindgen]
    pub fn close_session(&mut self, id: u32) -> bool {
        self.sessions.close(id)
    }

    #[wasm_bindgen]
    pub fn rename_session(&mut self, id: u32, name: &str) -> bool {
        self.sessions.rename(id, name)
    }

    #[wasm_bindgen]
    pub fn activate_session(&mut self, id: u32) -> bool {
        self.sessions.activate(id)
    }

    #[wasm_bindgen]
    pub fn active_session(&self) -> u32 {
        self.sessions.active_id()
    }

    #[wasm_bindgen]
    pub fn tick(&mut self, now_ms: f64) -> String {
        let (progress, saved, preview) = self.advance(now_ms);
        to_json(&TickReport {
            progress: progress
                .into_iter()
                .map(|(session_id, lines)| SessionLines { session_id, lines })
                .collect(),
            saved,
            preview,
        })
    }

    #[wasm_bindgen]
    pub fn drain_events(&mut self) -> String {
        to_json(&self.sink.drain())
    }

    #[wasm_bindgen]
    pub fn list_children(&self, dir: &str) -> String {
        let dir = path::normalize(dir);
        to_json(
            &self
                .workspace
                .registry()
                .list_children(&dir, false)
                .unwrap_or_default(),
        )
    }

    /// Editor content: the unsaved buffer if there is one, else the
    /// effective content.
    #[wasm_bindgen]
    pub fn read_file(&self, path: &str) -> Option<String> {
        let path = path::normalize(path);
        self.autosave
            .pending_content(&path)
            .or_else(|| self.workspace.content(&path))
            .map(String::from)
    }

    #[wasm_bindgen]
    pub fn file_info(&self, path: &str) -> String {
        let path = path::normalize(path);
        to_json(&self.workspace.registry().get(&path))
    }

    #[wasm_bindgen]
    pub fn is_modified(&self, path: &str) -> bool {
        self.workspace.is_modified(&path::normalize(path))
    }

    #[wasm_bindgen]
    pub fn is_dirty(&self, path: &str) -> bool {
        self.autosave.is_dirty(&path::normalize(path))
    }

    /// A keystroke in the editor. Arms auto-save and the preview refresh.
    #[wasm_bindgen]
    pub fn edit_file(&mut self, path: &str, content: &str, now_ms: f64) {
        let path = path::normalize(path);
        if !self.workspace.registry().is_file(&path) {
            return;
        }
        self.autosave.note_edit(&path, content, now_ms);
        if matches!(
            self.workspace.registry().get(&path).map(|r| r.language.as_str()),
            Some("html" | "css" | "javascript")
        ) {
            self.preview_target = Some(path);
            self.preview_timer.trigger(now_ms);
        }
    }

    #[wasm_bindgen]
    pub fn save_file(&mut self, path: &str) -> bool {
        let path = path::normalize(path);
        let Some(content) = self.autosave.take(&path) else {
            return self.workspace.registry().is_file(&path);
        };
        let result = self.workspace.write(&path, &content);
        self.report(result, "")
    }

    #[wasm_bindgen]
    pub fn save_all(&mut self) -> u32 {
        let mut saved = 0;
        for (p, content) in self.autosave.flush() {
            if self.workspace.write(&p, &content).is_ok() {
                saved += 1;
            }
        }
        if saved > 0 {
            self.after_change();
        }
        saved
    }

    #[wasm_bindgen]
    pub fn discard_changes(&mut self, path: &str) {
        self.autosave.discard(&path::normalize(path));
    }

    #[wasm_bindgen]
    pub fn reset_file(&mut self, path: &str) -> bool {
        let path = path::normalize(path);
        self.autosave.discard(&path);
        let result = self.workspace.reset(&path);
        self.report(result, "Restored original content")
    }

    #[wasm_bindgen]
    pub fn create_file(&mut self, path: &str) -> bool {
        let path = path::normalize(path);
        let result = self.workspace.create_file(&path, "");
        let ok = self.report(result, "");
        if ok {
            self.sink.open_file(&path);
        }
        ok
    }

    #[wasm_bindgen]
    pub fn create_folder(&mut self, path: &str) -> bool {
        let path = path::normalize(path);
        let result = self.workspace.create_dir(&path);
        self.report(result, "")
    }

    #[wasm_bindgen]
    pub fn delete_path(&mut self, path: &str) -> bool {
        let path = path::normalize(path);
        let result = if self.workspace.registry().is_dir(&path) {
            self.workspace.remove_dir(&path).map(|removed| {
                for p in removed {
                    self.sink.close_file(&p);
                }
            })
        } else {
            self.workspace.remove_file(&path).map(|()| {
                self.sink.close_file(&path);
            })
        };
        self.report(result, "")
    }

    #[wasm_bindgen]
    pub fn rename_path(&mut self, from: &str, to: &str) -> Option<String> {
        let from = path::normalize(from);
        let to = path::resolve(to, &path::parent(&from));
        match self.workspace.move_path(&from, &to) {
            Ok(dest) => {
                self.sink.close_file(&from);
                self.after_change();
                Some(dest)
            }
            Err(e) => {
                self.sink.toast(ToastKind::Error, &e.to_string());
                None
            }
        }
    }

    /// Drop an uploaded text file into the session's cwd.
    #[wasm_bindgen]
    pub fn import_file(&mut self, session_id: u32, name: &str, text: &str) -> Option<String> {
        let cwd = self
            .sessions
            .get(session_id)
            .map_or_else(|| path::ROOT.to_string(), |s| s.cwd.clone());
        match self.workspace.import(&cwd, name, text) {
            Ok(dest) => {
                self.after_change();
                self.sink
                    .toast(ToastKind::Success, &format!("Imported {}", path::display(&dest)));
                self.sink.open_file(&dest);
                Some(dest)
            }
            Err(e) => {
                self.sink.toast(ToastKind::Error, &e.to_string());
                None
            }
        }
    }

    #[wasm_bindgen]
    pub fn download_file(&mut self, path: &str) -> String {
        match archive::download_file(&self.workspace, &path::normalize(path)) {
            Ok(d) => to_json(&d),
            Err(e) => {
                self.sink.toast(ToastKind::Error, &e.to_string());
                "null".into()
            }
        }
    }

    #[wasm_bindgen]
    pub fn export_project(&mut self) -> String {
        match archive::export_project_download(&self.workspace) {
            Ok(d) => to_json(&d),
            Err(e) => {
                tracing::warn!(error = %e, "project export failed");
                self.sink.toast(ToastKind::Error, &e.to_string());
                "null".into()
            }
        }
    }

    #[wasm_bindgen]
    pub fn export_project_bytes(&mut self) -> Vec<u8> {
        archive::export_project(&self.workspace).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "project export failed");
            Vec::new()
        })
    }

    #[wasm_bindgen]
    pub fn preview(&mut self, path: &str) -> String {
        let path = path::normalize(path);
        self.preview_target = Some(path.clone());
        self.preview_timer.cancel();
        to_json(&self.compose_preview(&path))
    }

    #[wasm_bindgen]
    pub fn preferences(&self) -> String {
        to_json(&self.prefs)
    }

    #[wasm_bindgen]
    pub fn set_preference(&mut self, name: &str, value: &str) -> bool {
        if !self.prefs.set(name, value) {
            return false;
        }
        self.autosave.set_enabled(self.prefs.auto_save);
        self.save_prefs();
        true
    }

    #[wasm_bindgen]
    pub fn toggle_folder(&mut self, dir: &str) -> bool {
        let expanded = self.prefs.toggle_folder(&path::normalize(dir));
        self.save_prefs();
        expanded
    }

    /// Wipe stored files and start over from the default tree.
    #[wasm_bindgen]
    pub fn reset_workspace(&mut self) {
        if let Err(e) = self.bridge.forget() {
            tracing::warn!(error = %e, "clearing storage failed");
        }
        self.workspace = self.bridge.load();
        self.autosave.flush();
        for session in self.sessions.iter_mut() {
            session.relocate(&[], self.workspace.registry());
        }
        self.sink.files_changed();
        self.sink.toast(ToastKind::Info, "Workspace reset to defaults");
        self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::HostEvent;

    fn ide() -> Ide {
        let mut ide = Ide::with_store(Box::new(MemoryStore::new()));
        ide.mount();
        ide
    }

    #[test]
    fn exec_reports_changes_to_host() {
        let mut ide = ide();
        let id = ide.active_session();
        ide.drain_events();
        let out = ide.run(id, "touch /notes/todo.txt", 0.0).unwrap();
        assert!(!out.has_errors());
        assert!(ide.sink.events().contains(&HostEvent::FilesChanged));
        assert!(ide.run(id, "   ", 0.0).is_none());
        assert_eq!(ide.exec(id, "", 0.0), "null");
    }

    #[test]
    fn edits_autosave_after_quiet_period() {
        let mut ide = ide();
        ide.edit_file("/about.md", "# draft", 0.0);
        assert!(ide.is_dirty("/about.md"));
        assert_eq!(ide.read_file("/about.md").as_deref(), Some("# draft"));
        let (_, saved, _) = ide.advance(500.0);
        assert!(saved.is_empty());
        let (_, saved, _) = ide.advance(2000.0);
        assert_eq!(saved, vec!["/about.md"]);
        assert!(ide.is_modified("/about.md"));
        assert!(!ide.is_dirty("/about.md"));
    }

    #[test]
    fn preview_refresh_is_debounced_and_sees_drafts() {
        let mut ide = ide();
        ide.set_preference("autoSave", "false");
        ide.edit_file("/web/style.css", "h1{}", 0.0);
        ide.edit_file("/web/style.css", "h1{color:red}", 100.0);
        let (_, _, preview) = ide.advance(200.0);
        assert!(preview.is_none());
        let (_, saved, preview) = ide.advance(450.0);
        assert!(saved.is_empty());
        let preview = preview.unwrap();
        assert_eq!(preview.source, "/web/index.html");
        assert!(preview.html.contains("h1{color:red}"));
    }

    #[test]
    fn progress_lines_flow_through_tick() {
        let mut ide = ide();
        let id = ide.active_session();
        ide.run(id, "npm install", 0.0);
        let (progress, _, _) = ide.advance(60_000.0);
        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].0, id);
        assert!(!progress[0].1.is_empty());
    }

    #[test]
    fn protected_delete_is_refused() {
        let mut ide = ide();
        assert!(!ide.delete_path("/README.md"));
        assert!(ide.workspace().registry().is_file("/README.md"));
        assert!(ide.delete_path("/web"));
        assert!(!ide.workspace().registry().exists("/web"));
    }

    #[test]
    fn import_lands_in_session_cwd() {
        let mut ide = ide();
        let id = ide.active_session();
        ide.run(id, "cd web", 0.0);
        assert_eq!(
            ide.import_file(id, "style.css", "x").as_deref(),
            Some("/web/style (1).css")
        );
    }

    #[test]
    fn rename_moves_pending_buffer() {
        let mut ide = ide();
        ide.set_preference("autoSave", "false");
        ide.edit_file("/contact.json", "{}", 0.0);
        assert_eq!(ide.rename_path("/contact.json", "me.json").as_deref(), Some("/me.json"));
        assert!(ide.is_dirty("/me.json"));
        assert!(ide.rename_path("/about.md", "bio.md").is_none());
    }

    #[test]
    fn folder_rename_carries_unsaved_buffers() {
        let mut ide = ide();
        ide.set_preference("autoSave", "false");
        ide.edit_file("/web/style.css", "body{}", 0.0);
        assert_eq!(ide.rename_path("/web", "site").as_deref(), Some("/site"));
        assert!(ide.is_dirty("/site/style.css"));
        assert!(!ide.is_dirty("/web/style.css"));
        assert_eq!(ide.read_file("/site/style.css").as_deref(), Some("body{}"));
        assert!(ide.save_file("/site/style.css"));
        assert!(ide.is_modified("/site/style.css"));
    }

    #[test]
    fn terminal_mv_carries_unsaved_buffer() {
        let mut ide = ide();
        let id = ide.active_session();
        ide.set_preference("autoSave", "false");
        ide.edit_file("/contact.json", "{\"a\":1}", 0.0);
        ide.run(id, "mv /contact.json /me.json", 0.0);
        assert!(ide.is_dirty("/me.json"));
        assert_eq!(ide.read_file("/me.json").as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn moved_buffer_keeps_its_quiet_period() {
        let mut ide = ide();
        ide.edit_file("/contact.json", "{}", 1000.0);
        ide.rename_path("/contact.json", "me.json");
        let (_, saved, _) = ide.advance(1200.0);
        assert!(saved.is_empty());
        let (_, saved, _) = ide.advance(2600.0);
        assert_eq!(saved, vec!["/me.json"]);
    }

    #[test]
    fn sessions_follow_moved_and_removed_directories() {
        let mut ide = ide();
        let first = ide.active_session();
        ide.run(first, "cd /web", 0.0);
        let second = ide.new_session();
        ide.run(second, "mv /web /site", 0.0);
        assert_eq!(ide.prompt(first), "dev@portfolio:~/site$ ");
        ide.run(second, "rm -r /site", 0.0);
        assert_eq!(ide.prompt(first), "dev@portfolio:~$ ");
        assert!(!ide.run(first, "ls", 0.0).unwrap().has_errors());
    }

    #[test]
    fn sessions_keep_separate_history_and_cwd() {
        let mut ide = ide();
        let first = ide.active_session();
        ide.run(first, "cd web", 0.0);
        let second = ide.new_session();
        assert_eq!(ide.prompt(second), "dev@portfolio:~$ ");
        assert_eq!(ide.history_prev(second), None);
        assert_eq!(ide.history_prev(first).as_deref(), Some("cd web"));
        assert!(ide.rename_session(second, "build"));
        assert!(ide.activate_session(first));
        assert!(ide.close_session(first));
        assert_eq!(ide.active_session(), second);
        assert!(ide.sessions().contains("\"displayName\":\"build\""));
    }

    #[test]
    fn explicit_save_and_reset() {
        let mut ide = ide();
        ide.set_preference("autoSave", "false");
        ide.edit_file("/README.md", "new", 0.0);
        assert!(ide.save_file("/README.md"));
        assert_eq!(ide.read_file("/README.md").as_deref(), Some("new"));
        assert!(ide.reset_file("/README.md"));
        assert!(!ide.is_modified("/README.md"));
        ide.edit_file("/about.md", "a", 0.0);
        ide.edit_file("/contact.json", "b", 0.0);
        assert_eq!(ide.save_all(), 2);
    }

    #[test]
    fn reset_workspace_restores_defaults() {
        let mut ide = ide();
        let id = ide.active_session();
        ide.run(id, "rm -r /web", 0.0);
        assert!(ide.create_folder("/drafts"));
        ide.reset_workspace();
        assert!(ide.workspace().registry().is_dir("/web"));
        assert!(!ide.workspace().registry().exists("/drafts"));
        assert!(ide.export_project_bytes().starts_with(b"PK"));
    }
}
