use crate::builtins;
use crate::info;
use crate::output::{Line, LineKind, Output};
use crate::path;
use crate::session::Session;
use crate::simulate;
use crate::sink::EventSink;
use crate::workspace::Workspace;
use std::collections::BTreeMap;

/// Everything a command handler may touch.
pub struct Ctx<'a> {
    pub session: &'a mut Session,
    pub workspace: &'a mut Workspace,
    pub sink: &'a mut dyn EventSink,
    pub aliases: &'a mut BTreeMap<String, String>,
    pub now_ms: f64,
}

impl Ctx<'_> {
    pub fn resolve(&self, arg: &str) -> String {
        path::resolve(arg, &self.session.cwd)
    }
}

pub type Handler = fn(&mut Ctx<'_>, &[String]) -> Output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Files,
    Shell,
    System,
    Dev,
}

impl Group {
    pub fn title(self) -> &'static str {
        match self {
            Group::Files => "Files",
            Group::Shell => "Shell",
            Group::System => "System",
            Group::Dev => "Development",
        }
    }
}

pub struct Command {
    pub name: &'static str,
    pub group: Group,
    pub usage: &'static str,
    pub summary: &'static str,
    pub run: Handler,
}

macro_rules! cmd {
    ($name:literal, $group:ident, $usage:literal, $summary:literal, $run:path) => {
        Command {
            name: $name,
            group: Group::$group,
            usage: $usage,
            summary: $summary,
            run: $run,
        }
    };
}

pub static COMMANDS: &[Command] = &[
    cmd!("help", Shell, "help", "list available commands", info::help),
    cmd!("ls", Files, "ls [-a] [-l] [path...]", "list directory contents", builtins::ls),
    cmd!("cd", Files, "cd [dir|-]", "change the working directory", builtins::cd),
    cmd!("pwd", Files, "pwd", "print the working directory", builtins::pwd),
    cmd!("cat", Files, "cat <file...>", "print file contents", builtins::cat),
    cmd!("less", Files, "less <file>", "page through a file", builtins::cat),
    cmd!("more", Files, "more <file>", "page through a file", builtins::cat),
    cmd!("touch", Files, "touch <file...>", "create empty files", builtins::touch),
    cmd!("mkdir", Files, "mkdir [-p] <dir...>", "create directories", builtins::mkdir),
    cmd!("rm", Files, "rm [-r] [-f] <path...>", "remove files or directories", builtins::rm),
    cmd!("mv", Files, "mv <source> <dest>", "move or rename", builtins::mv),
    cmd!("cp", Files, "cp [-r] <source> <dest>", "copy files or directories", builtins::cp),
    cmd!("grep", Files, "grep [-i] [-n] [-r] <pattern> [path...]", "search file contents", builtins::grep),
    cmd!("find", Files, "find [path] [-name glob] [-type f|d]", "search for files", builtins::find),
    cmd!("head", Files, "head [-n N] <file>", "print the first lines of a file", builtins::head),
    cmd!("tail", Files, "tail [-n N] <file>", "print the last lines of a file", builtins::tail),
    cmd!("wc", Files, "wc <file...>", "count lines, words and bytes", builtins::wc),
    cmd!("tree", Files, "tree [-L depth] [path]", "show the directory tree", builtins::tree),
    cmd!("nano", Files, "nano <file>", "open a file in the editor", builtins::edit),
    cmd!("code", Files, "code <file>", "open a file in the editor", builtins::edit),
    cmd!("history", Shell, "history [-c]", "show or clear command history", info::history),
    cmd!("clear", Shell, "clear", "clear the terminal", info::clear),
    cmd!("echo", Shell, "echo [text...]", "print text", info::echo),
    cmd!("alias", Shell, "alias [name=value...]", "list or define aliases", info::alias),
    cmd!("unalias", Shell, "unalias <name...>", "remove aliases", info::unalias),
    cmd!("man", Shell, "man <command>", "show the manual for a command", info::man),
    cmd!("which", Shell, "which <command...>", "locate a command", info::which),
    cmd!("exit", Shell, "exit", "close this terminal", info::exit),
    cmd!("whoami", System, "whoami", "about the author", info::whoami),
    cmd!("date", System, "date", "print the current date and time", info::date),
    cmd!("hostname", System, "hostname", "print the host name", info::hostname),
    cmd!("uname", System, "uname [-a]", "print system information", info::uname),
    cmd!("env", System, "env", "print environment variables", info::env),
    cmd!("ps", System, "ps", "list processes", simulate::ps),
    cmd!("kill", System, "kill <pid>", "terminate a process", simulate::kill),
    cmd!("jobs", System, "jobs", "list background jobs", simulate::jobs),
    cmd!("ping", System, "ping [-c N] <host>", "send echo requests", simulate::ping),
    cmd!("matrix", System, "matrix", "follow the white rabbit", simulate::matrix),
    cmd!("git", Dev, "git <status|log|branch|diff|add|commit|push|pull|remote|clone>", "version control", simulate::git),
    cmd!("npm", Dev, "npm <install|run|start|test|-v>", "node package manager", simulate::npm),
    cmd!("flutter", Dev, "flutter <run|build|doctor|pub get|--version>", "flutter toolchain", simulate::flutter),
    cmd!("gradle", Dev, "gradle <build|tasks|test>", "kotlin build tool", simulate::gradle),
    cmd!("adb", Dev, "adb <devices|install|logcat>", "android debug bridge", simulate::adb),
];

pub fn find_command(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.name == name)
}

pub fn default_aliases() -> BTreeMap<String, String> {
    [
        ("ll", "ls -l"),
        ("la", "ls -a"),
        ("..", "cd .."),
        ("gs", "git status"),
        ("cls", "clear"),
        ("vi", "nano"),
        ("vim", "nano"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Split on whitespace, keeping quoted runs together.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;
    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => cur.push(c),
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        out.push(std::mem::take(&mut cur));
                        in_token = false;
                    }
                }
                _ => {
                    cur.push(c);
                    in_token = true;
                }
            },
        }
    }
    if in_token {
        out.push(cur);
    }
    out
}

/// Split arguments into single-letter flags and operands. `-la` yields
/// `l` and `a`; a lone `-` is an operand.
pub fn split_flags(args: &[String]) -> (Vec<char>, Vec<&str>) {
    let mut flags = Vec::new();
    let mut operands = Vec::new();
    for arg in args {
        match arg.strip_prefix('-') {
            Some(rest) if !rest.is_empty() && !rest.starts_with('-') => flags.extend(rest.chars()),
            _ => operands.push(arg.as_str()),
        }
    }
    (flags, operands)
}

/// Command names closest to `input` by edit distance.
pub fn suggest<'a>(input: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter_map(|c| {
            let d = strsim::levenshtein(input, c);
            if d <= 2 || (input.len() >= 2 && c.starts_with(input)) {
                Some((d, c))
            } else {
                None
            }
        })
        .collect();
    scored.sort();
    scored.dedup_by(|a, b| a.1 == b.1);
    scored.into_iter().take(3).map(|(_, c)| c.to_string()).collect()
}

/// Alias table plus the dispatch pipeline.
#[derive(Debug, Clone)]
pub struct Interpreter {
    aliases: BTreeMap<String, String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            aliases: default_aliases(),
        }
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Replace a leading alias with its expansion, keeping the remaining
    /// arguments. Expansion is a single pass.
    pub fn expand_alias(&self, line: &str) -> String {
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim_start()),
            None => (line, ""),
        };
        match self.aliases.get(head) {
            Some(expansion) if rest.is_empty() => expansion.clone(),
            Some(expansion) => format!("{} {}", expansion, rest),
            None => line.to_string(),
        }
    }

    /// Run one typed line. Blank input produces no output.
    pub fn execute(
        &mut self,
        raw: &str,
        session: &mut Session,
        workspace: &mut Workspace,
        sink: &mut dyn EventSink,
        now_ms: f64,
    ) -> Option<Output> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }
        session.history.push(line);
        let prompt_line = Line {
            kind: LineKind::Command,
            text: format!("{}{}", session.prompt(), line),
        };

        let tokens = tokenize(&self.expand_alias(line));
        let (first, args) = tokens.split_first()?;
        let name = first.to_lowercase();
        let moves_before = workspace.moves().len();

        let out = match find_command(&name) {
            Some(cmd) => {
                tracing::debug!(command = cmd.name, args = args.len(), "dispatch");
                let mut ctx = Ctx {
                    session: &mut *session,
                    workspace: &mut *workspace,
                    sink: &mut *sink,
                    aliases: &mut self.aliases,
                    now_ms,
                };
                (cmd.run)(&mut ctx, args)
            }
            None => self.not_found(&name),
        };

        session.relocate(&workspace.moves()[moves_before..], workspace.registry());

        if out.action == Some(crate::output::Action::Clear) {
            session.scrollback.clear();
        } else {
            session.append(std::iter::once(prompt_line).chain(out.lines.iter().cloned()));
        }
        Some(out)
    }

    fn not_found(&self, name: &str) -> Output {
        let mut out = Output::error(format!("{}: command not found", name));
        let candidates = COMMANDS
            .iter()
            .map(|c| c.name)
            .chain(self.aliases.keys().map(String::as_str));
        out.suggestions = suggest(name, candidates);
        if !out.suggestions.is_empty() {
            out.push(
                LineKind::Info,
                format!("Did you mean: {}?", out.suggestions.join(", ")),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_respects_quotes() {
        assert_eq!(tokenize("echo  'a b'  c"), vec!["echo", "a b", "c"]);
        assert_eq!(tokenize(r#"grep "two words" /x"#), vec!["grep", "two words", "/x"]);
        assert_eq!(tokenize("touch ''"), vec!["touch", ""]);
    }

    #[test]
    fn flags_split_from_operands() {
        let args: Vec<String> = ["-la", "/web", "-", "--x"].iter().map(|s| s.to_string()).collect();
        let (flags, ops) = split_flags(&args);
        assert_eq!(flags, vec!['l', 'a']);
        assert_eq!(ops, vec!["/web", "-", "--x"]);
    }

    #[test]
    fn alias_expansion_keeps_arguments() {
        let interp = Interpreter::new();
        assert_eq!(interp.expand_alias("ll /web"), "ls -l /web");
        assert_eq!(interp.expand_alias(".."), "cd ..");
        assert_eq!(interp.expand_alias("lsx"), "lsx");
    }

    #[test]
    fn suggestions_by_distance() {
        let names = COMMANDS.iter().map(|c| c.name);
        let s = suggest("gti", names);
        assert_eq!(s.first().map(String::as_str), Some("git"));
        assert!(suggest("zzzzzz", COMMANDS.iter().map(|c| c.name)).is_empty());
    }

    #[test]
    fn command_names_unique() {
        let mut names: Vec<&str> = COMMANDS.iter().map(|c| c.name).collect();
        names.sort();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }
}
