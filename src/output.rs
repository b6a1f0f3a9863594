use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Plain,
    Info,
    Success,
    Warning,
    Error,
    Accent,
    Command,
}

impl LineKind {
    fn color(self) -> Option<&'static str> {
        match self {
            LineKind::Plain => None,
            LineKind::Info => Some("cyan"),
            LineKind::Success => Some("green"),
            LineKind::Warning => Some("yellow"),
            LineKind::Error => Some("red"),
            LineKind::Accent => Some("blue"),
            LineKind::Command => Some("magenta"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    pub kind: LineKind,
    pub text: String,
}

/// Something the host should do besides printing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Action {
    Clear,
    OpenFile(String),
    OpenUrl(String),
    CloseTerminal,
    Matrix,
}

/// What a command renders into the terminal pane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Output {
    pub lines: Vec<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(kind: LineKind, text: impl Into<String>) -> Self {
        let mut out = Output::new();
        out.push(kind, text);
        out
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Output::line(LineKind::Plain, text)
    }

    /// Multi-line plain text, one output line per text line.
    pub fn block(text: &str) -> Self {
        let mut out = Output::new();
        out.push_text(LineKind::Plain, text);
        out
    }

    pub fn error(text: impl Into<String>) -> Self {
        Output::line(LineKind::Error, text)
    }

    pub fn action(action: Action) -> Self {
        Output {
            action: Some(action),
            ..Output::default()
        }
    }

    pub fn push(&mut self, kind: LineKind, text: impl Into<String>) {
        self.lines.push(Line {
            kind,
            text: text.into(),
        });
    }

    /// Push multi-line text one line at a time.
    pub fn push_text(&mut self, kind: LineKind, text: &str) {
        for l in text.lines() {
            self.push(kind, l);
        }
    }

    pub fn extend(&mut self, other: Output) {
        self.lines.extend(other.lines);
        if other.action.is_some() {
            self.action = other.action;
        }
        self.suggestions.extend(other.suggestions);
    }

    pub fn has_errors(&self) -> bool {
        self.lines.iter().any(|l| l.kind == LineKind::Error)
    }

    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Inline colour markup understood by the terminal pane.
    pub fn render_markup(&self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(|l| match l.kind.color() {
                Some(c) => format!("\x1b[COLOR:{}]{}\x1b[COLOR:reset]", c, l.text),
                None => l.text.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n");
        match &self.action {
            Some(Action::Clear) => out.insert_str(0, "\x1b[CLEAR]"),
            Some(Action::CloseTerminal) => out.push_str("\x1b[EXIT]"),
            Some(Action::OpenUrl(url)) => out.push_str(&format!("\x1b[OPEN:{}]", url)),
            _ => {}
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_colours_non_plain_lines() {
        let mut out = Output::plain("a");
        out.push(LineKind::Error, "b");
        assert_eq!(out.render_markup(), "a\n\x1b[COLOR:red]b\x1b[COLOR:reset]");
    }

    #[test]
    fn clear_action_prefixes_marker() {
        assert_eq!(Output::action(Action::Clear).render_markup(), "\x1b[CLEAR]");
    }

    #[test]
    fn serializes_for_host() {
        let out = Output::action(Action::OpenFile("/a.md".into()));
        let json = serde_json::to_string(&out).unwrap();
        assert_eq!(json, r#"{"lines":[],"action":{"type":"openFile","value":"/a.md"}}"#);
    }
}
