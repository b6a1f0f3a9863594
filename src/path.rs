//! Path resolution for the virtual workspace.
//!
//! Storage always uses absolute, slash-separated paths rooted at `/`. The
//! prompt shows the root as `~`, and users may type that alias back in, so
//! both spellings resolve to the same place.

pub const ROOT: &str = "/";
pub const ROOT_ALIAS: &str = "~";

/// Collapse repeated slashes, drop `.` segments and trailing slashes, and
/// apply `..` segments. `..` at the root stays at the root.
pub fn normalize(raw: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in raw.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    if parts.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Resolve user input against a working directory into a normalized
/// absolute path.
pub fn resolve(input: &str, cwd: &str) -> String {
    let input = input.trim();
    if input.is_empty() || input == "." {
        return normalize(cwd);
    }
    let raw = if let Some(rest) = strip_root_alias(input) {
        format!("/{}", rest)
    } else if input.starts_with('/') {
        input.to_string()
    } else {
        let base = cwd.trim_end_matches('/');
        format!("{}/{}", base, input)
    };
    normalize(&raw)
}

fn strip_root_alias(input: &str) -> Option<&str> {
    for prefix in ["/~", ROOT_ALIAS] {
        if input == prefix {
            return Some("");
        }
        if let Some(rest) = input.strip_prefix(prefix) {
            if rest.starts_with('/') {
                return Some(rest.trim_start_matches('/'));
            }
        }
    }
    None
}

/// Render a stored path the way the prompt shows it.
pub fn display(path: &str) -> String {
    if path == ROOT {
        ROOT_ALIAS.to_string()
    } else {
        format!("{}{}", ROOT_ALIAS, path)
    }
}

pub fn parent(path: &str) -> String {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) | None => ROOT.to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

pub fn join(dir: &str, name: &str) -> String {
    if dir == ROOT {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

/// True when `path` equals `dir` or lives somewhere below it.
pub fn is_within(path: &str, dir: &str) -> bool {
    if dir == ROOT {
        return true;
    }
    path == dir
        || path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Re-root `path` from under `from` to under `to`, if it lives there.
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if from == ROOT || !is_within(path, from) {
        return None;
    }
    Some(format!("{}{}", to, &path[from.len()..]))
}

/// Split an absolute path into its segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_input_ignores_cwd() {
        assert_eq!(resolve("/web/index.html", "/projects"), "/web/index.html");
    }

    #[test]
    fn root_alias_maps_to_real_root() {
        assert_eq!(resolve("~", "/web"), "/");
        assert_eq!(resolve("/~", "/web"), "/");
        assert_eq!(resolve("~/web", "/projects"), "/web");
        assert_eq!(resolve("/~/web/", "/"), "/web");
        // only a whole segment counts as the alias
        assert_eq!(resolve("~notes", "/"), "/~notes");
    }

    #[test]
    fn dot_and_empty_return_cwd() {
        assert_eq!(resolve(".", "/web"), "/web");
        assert_eq!(resolve("", "/web"), "/web");
        assert_eq!(resolve("  ", "/"), "/");
    }

    #[test]
    fn parent_of_root_is_root() {
        assert_eq!(resolve("..", "/"), "/");
        assert_eq!(resolve("../../..", "/web"), "/");
        assert_eq!(resolve("..", "/web/css"), "/web");
    }

    #[test]
    fn relative_join_has_single_slash() {
        assert_eq!(resolve("index.html", "/"), "/index.html");
        assert_eq!(resolve("index.html", "/web/"), "/web/index.html");
        assert_eq!(resolve("css//main.css", "/web"), "/web/css/main.css");
        assert_eq!(resolve("./a/../b/", "/web"), "/web/b");
    }

    #[test]
    fn display_uses_alias() {
        assert_eq!(display("/"), "~");
        assert_eq!(display("/web"), "~/web");
    }

    #[test]
    fn parent_and_name() {
        assert_eq!(parent("/web/index.html"), "/web");
        assert_eq!(parent("/web"), "/");
        assert_eq!(parent("/"), "/");
        assert_eq!(file_name("/web/index.html"), "index.html");
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/web", "a"), "/web/a");
    }

    #[test]
    fn within_checks_segment_boundary() {
        assert!(is_within("/web/a", "/web"));
        assert!(is_within("/web", "/web"));
        assert!(!is_within("/website/a", "/web"));
        assert!(is_within("/anything", "/"));
    }

    #[test]
    fn rebase_moves_whole_segments_only() {
        assert_eq!(rebase("/web/a.css", "/web", "/site").as_deref(), Some("/site/a.css"));
        assert_eq!(rebase("/web", "/web", "/site").as_deref(), Some("/site"));
        assert_eq!(rebase("/website/a", "/web", "/site"), None);
        assert_eq!(rebase("/web", "/", "/x"), None);
    }
}
