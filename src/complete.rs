use crate::path;
use crate::shell::COMMANDS;
use crate::workspace::Workspace;
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of pressing Tab: the rewritten input line plus every candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub line: String,
    pub matches: Vec<String>,
}

fn common_prefix(items: &[String]) -> String {
    let Some(first) = items.first() else {
        return String::new();
    };
    let mut end = first.len();
    for item in &items[1..] {
        end = first
            .char_indices()
            .zip(item.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map(|((i, c), _)| i + c.len_utf8())
            .unwrap_or(0)
            .min(end);
    }
    first[..end].to_string()
}

/// Complete the first token against commands and aliases, later tokens
/// against the directory listing of the path typed so far.
pub fn complete(
    input: &str,
    cwd: &str,
    workspace: &Workspace,
    aliases: &BTreeMap<String, String>,
) -> Completion {
    let token_start = input
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let (head, token) = input.split_at(token_start);
    let first_token = head.trim().is_empty();

    let (base, mut matches) = if first_token {
        let mut names: Vec<String> = COMMANDS
            .iter()
            .map(|c| c.name)
            .chain(aliases.keys().map(String::as_str))
            .filter(|n| n.starts_with(token))
            .map(String::from)
            .collect();
        names.sort();
        names.dedup();
        (String::new(), names)
    } else {
        let (dir_part, prefix) = match token.rfind('/') {
            Some(i) => token.split_at(i + 1),
            None => ("", token),
        };
        let dir = if dir_part.is_empty() {
            path::normalize(cwd)
        } else {
            path::resolve(dir_part, cwd)
        };
        let names = workspace
            .registry()
            .list_children(&dir, prefix.starts_with('.'))
            .unwrap_or_default()
            .into_iter()
            .filter(|e| e.name.starts_with(prefix))
            .map(|e| {
                if e.is_directory {
                    format!("{}/", e.name)
                } else {
                    e.name
                }
            })
            .collect();
        (dir_part.to_string(), names)
    };

    let line = match matches.as_slice() {
        [] => input.to_string(),
        [only] => {
            // directories keep the cursor inside the path
            let suffix = if only.ends_with('/') { "" } else { " " };
            format!("{}{}{}{}", head, base, only, suffix)
        }
        many => format!("{}{}{}", head, base, common_prefix(many)),
    };
    if matches.len() == 1 {
        matches.clear();
    }
    Completion { line, matches }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::default_registry;
    use crate::shell::default_aliases;
    use crate::workspace::ContentOverrides;

    fn ws() -> Workspace {
        Workspace::new(default_registry(), ContentOverrides::new())
    }

    #[test]
    fn single_command_completes_with_space() {
        let c = complete("tou", "/", &ws(), &default_aliases());
        assert_eq!(c.line, "touch ");
        assert!(c.matches.is_empty());
    }

    #[test]
    fn ambiguous_command_lists_candidates() {
        let c = complete("c", "/", &ws(), &default_aliases());
        assert!(c.matches.contains(&"cat".to_string()));
        assert!(c.matches.contains(&"cd".to_string()));
        assert_eq!(c.line, "c");
    }

    #[test]
    fn completes_paths_relative_to_cwd() {
        let c = complete("cat we", "/", &ws(), &default_aliases());
        assert_eq!(c.line, "cat web/");
        let c = complete("cat web/in", "/", &ws(), &default_aliases());
        assert_eq!(c.line, "cat web/index.html ");
        let c = complete("cat s", "/web", &ws(), &default_aliases());
        assert_eq!(c.matches, vec!["script.js", "style.css"]);
        assert_eq!(c.line, "cat s");
    }

    #[test]
    fn completes_absolute_and_alias_paths() {
        let c = complete("ls /kot", "/web", &ws(), &default_aliases());
        assert_eq!(c.line, "ls /kotlin/");
        let c = complete("ls ~/fl", "/web", &ws(), &default_aliases());
        assert_eq!(c.line, "ls ~/flutter/");
    }

    #[test]
    fn common_prefix_is_applied() {
        let c = complete("cat /flutter/", "/", &ws(), &default_aliases());
        assert_eq!(c.matches, vec!["lib/", "pubspec.yaml"]);
        assert_eq!(common_prefix(&["style.css".into(), "styles.css".into()]), "style");
    }

    #[test]
    fn multibyte_whitespace_splits_tokens() {
        let c = complete("cat\u{a0}we", "/", &ws(), &default_aliases());
        assert_eq!(c.line, "cat\u{a0}web/");
        let c = complete("ls\u{3000}/kot", "/", &ws(), &default_aliases());
        assert_eq!(c.line, "ls\u{3000}/kotlin/");
    }

    #[test]
    fn no_match_leaves_line() {
        let c = complete("cat zzz", "/", &ws(), &default_aliases());
        assert_eq!(c.line, "cat zzz");
        assert!(c.matches.is_empty());
    }
}
