use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

/// Notifications pushed to the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostEvent {
    Toast { kind: ToastKind, message: String },
    OpenFile { path: String },
    CloseFile { path: String },
    FilesChanged,
}

/// Callbacks the interpreter and workspace operations report through. The
/// core never holds UI state; the host decides what to do with these.
pub trait EventSink {
    fn toast(&mut self, kind: ToastKind, message: &str);
    fn open_file(&mut self, path: &str);
    fn close_file(&mut self, path: &str);
    fn files_changed(&mut self);
}

/// Buffers events until the host drains them.
#[derive(Debug, Default)]
pub struct QueuedSink {
    events: Vec<HostEvent>,
}

impl QueuedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }
}

impl EventSink for QueuedSink {
    fn toast(&mut self, kind: ToastKind, message: &str) {
        self.events.push(HostEvent::Toast {
            kind,
            message: message.into(),
        });
    }
    fn open_file(&mut self, path: &str) {
        self.events.push(HostEvent::OpenFile { path: path.into() });
    }
    fn close_file(&mut self, path: &str) {
        self.events.push(HostEvent::CloseFile { path: path.into() });
    }
    fn files_changed(&mut self) {
        // consecutive change notifications collapse into one
        if self.events.last() != Some(&HostEvent::FilesChanged) {
            self.events.push(HostEvent::FilesChanged);
        }
    }
}
