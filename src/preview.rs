use crate::path;
use crate::workspace::Workspace;
use serde::Serialize;

/// A self-contained document for the preview iframe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    /// The html file the document was built from.
    pub source: String,
    pub html: String,
}

fn is_external(url: &str) -> bool {
    let url = url.trim();
    url.is_empty()
        || url.starts_with("//")
        || url.starts_with("data:")
        || url.contains("://")
}

fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let lower = tag.to_ascii_lowercase();
    let needle = format!("{}=", name);
    let mut from = 0;
    while let Some(found) = lower[from..].find(&needle) {
        let at = from + found;
        from = at + needle.len();
        let boundary = lower[..at]
            .chars()
            .next_back()
            .map_or(false, char::is_whitespace);
        if !boundary {
            continue;
        }
        let rest = &tag[from..];
        return match rest.chars().next() {
            Some(q @ ('"' | '\'')) => rest[1..].find(q).map(|end| &rest[1..1 + end]),
            Some(_) => Some(
                rest.split(|c: char| c.is_whitespace() || c == '>')
                    .next()
                    .unwrap_or(""),
            ),
            None => None,
        };
    }
    None
}

/// Replace every `<link href>` stylesheet and `<script src>` that points at a
/// file in the workspace with an inline copy of its content.
pub fn inline_assets(html: &str, dir: &str, workspace: &Workspace) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    while pos < html.len() {
        let next_link = lower[pos..].find("<link").map(|i| pos + i);
        let next_script = lower[pos..].find("<script").map(|i| pos + i);
        let (start, is_script) = match (next_link, next_script) {
            (Some(l), Some(s)) if s < l => (s, true),
            (Some(l), _) => (l, false),
            (None, Some(s)) => (s, true),
            (None, None) => break,
        };
        let Some(tag_end) = lower[start..].find('>').map(|i| start + i + 1) else {
            break;
        };
        let tag = &html[start..tag_end];
        out.push_str(&html[pos..start]);

        if is_script {
            let close = lower[tag_end..]
                .find("</script>")
                .map(|i| tag_end + i + "</script>".len());
            let local = attr(tag, "src")
                .filter(|src| !is_external(src))
                .and_then(|src| workspace.content(&path::resolve(src, dir)));
            match (local, close) {
                (Some(js), Some(close)) => {
                    out.push_str("<script>\n");
                    out.push_str(js);
                    out.push_str("\n</script>");
                    pos = close;
                }
                _ => {
                    out.push_str(tag);
                    pos = tag_end;
                }
            }
        } else {
            let is_stylesheet = attr(tag, "rel")
                .map_or(true, |rel| rel.eq_ignore_ascii_case("stylesheet"));
            let local = attr(tag, "href")
                .filter(|href| is_stylesheet && !is_external(href))
                .and_then(|href| workspace.content(&path::resolve(href, dir)));
            match local {
                Some(css) => {
                    out.push_str("<style>\n");
                    out.push_str(css);
                    out.push_str("\n</style>");
                }
                None => out.push_str(tag),
            }
            pos = tag_end;
        }
    }
    if pos < html.len() {
        out.push_str(&html[pos..]);
    }
    out
}

/// Build the preview for `target`. An html file previews itself; any other
/// file previews the `index.html` next to it, if there is one.
pub fn compose(workspace: &Workspace, target: &str) -> Option<Preview> {
    let source = match workspace.registry().get(target) {
        Some(r) if r.language == "html" => target.to_string(),
        Some(_) => path::join(&path::parent(target), "index.html"),
        None => return None,
    };
    let html = workspace.content(&source)?;
    let dir = path::parent(&source);
    Some(Preview {
        html: inline_assets(html, &dir, workspace),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::default_registry;
    use crate::workspace::ContentOverrides;

    fn ws() -> Workspace {
        let mut ws = Workspace::new(default_registry(), ContentOverrides::new());
        ws.write(
            "/web/index.html",
            "<html><head><link rel=\"stylesheet\" href=\"style.css\">\
             <link rel='icon' href='fav.ico'></head>\
             <body><script src=\"script.js\"></script>\
             <script src=\"https://cdn.example/x.js\"></script></body></html>",
        )
        .unwrap();
        ws.write("/web/style.css", "body{color:red}").unwrap();
        ws.write("/web/script.js", "console.log(1)").unwrap();
        ws
    }

    #[test]
    fn attr_reads_quoted_and_bare_values() {
        assert_eq!(attr("<link rel=stylesheet href='a.css'>", "href"), Some("a.css"));
        assert_eq!(attr("<link rel=stylesheet href='a.css'>", "rel"), Some("stylesheet"));
        assert_eq!(attr("<script data-src=\"x\" src=\"y\">", "src"), Some("y"));
        assert_eq!(attr("<script>", "src"), None);
    }

    #[test]
    fn inlines_local_assets_only() {
        let p = compose(&ws(), "/web/index.html").unwrap();
        assert!(p.html.contains("<style>\nbody{color:red}\n</style>"));
        assert!(p.html.contains("<script>\nconsole.log(1)\n</script>"));
        assert!(p.html.contains("href='fav.ico'"));
        assert!(p.html.contains("https://cdn.example/x.js"));
        assert!(p.html.ends_with("</body></html>"));
    }

    #[test]
    fn css_previews_sibling_index() {
        let p = compose(&ws(), "/web/style.css").unwrap();
        assert_eq!(p.source, "/web/index.html");
        assert!(compose(&ws(), "/kotlin/build.gradle.kts").is_none());
        assert!(compose(&ws(), "/missing.html").is_none());
    }
}
