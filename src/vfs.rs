use crate::error::FsError;
use crate::language::{self, DisplayMode};
use crate::path;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Zero-byte sentinel that keeps an otherwise empty directory visible.
pub const MARKER: &str = ".keep";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub name: String,
    pub path: String,
    pub content: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_mode: Option<DisplayMode>,
}

impl FileRecord {
    pub fn new(path: &str, content: &str) -> Self {
        let name = path::file_name(path).to_string();
        let language = language::detect(&name);
        FileRecord {
            display_mode: language::display_mode(language),
            language: language.into(),
            name,
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn marker(dir: &str) -> Self {
        FileRecord::new(&path::join(dir, MARKER), "")
    }

    pub fn is_marker(&self) -> bool {
        self.name == MARKER
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
}

/// Segment index over the record paths. A directory node only exists while
/// something lives beneath it, so empty directories are pruned on removal.
#[derive(Debug, Clone, Default)]
struct DirNode {
    dirs: BTreeMap<String, DirNode>,
    files: BTreeSet<String>,
}

impl DirNode {
    fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }

    fn insert(&mut self, segs: &[&str]) {
        match segs {
            [] => {}
            [name] => {
                self.files.insert((*name).to_string());
            }
            [head, rest @ ..] => self
                .dirs
                .entry((*head).to_string())
                .or_default()
                .insert(rest),
        }
    }

    fn remove(&mut self, segs: &[&str]) {
        match segs {
            [] => {}
            [name] => {
                self.files.remove(*name);
            }
            [head, rest @ ..] => {
                if let Some(child) = self.dirs.get_mut(*head) {
                    child.remove(rest);
                    if child.is_empty() {
                        self.dirs.remove(*head);
                    }
                }
            }
        }
    }

    fn find(&self, segs: &[&str]) -> Option<&DirNode> {
        let mut node = self;
        for seg in segs {
            node = node.dirs.get(*seg)?;
        }
        Some(node)
    }
}

/// Ordered set of file records. Record paths are the single source of truth
/// for the hierarchy; the segment index is derived from them.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    records: Vec<FileRecord>,
    index: DirNode,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from stored records. Records that would break the
    /// registry invariants (duplicates, file/directory clashes) are dropped.
    pub fn from_records(records: Vec<FileRecord>) -> Self {
        let mut registry = Registry::new();
        for mut record in records {
            record.path = path::normalize(&record.path);
            record.name = path::file_name(&record.path).to_string();
            let dropped = record.path.clone();
            if let Err(e) = registry.insert(record) {
                tracing::warn!(path = %dropped, error = %e, "dropping stored record");
            }
        }
        registry
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut FileRecord> {
        self.records.iter_mut().find(|r| r.path == path)
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn is_dir(&self, path: &str) -> bool {
        let segs: Vec<&str> = path::segments(path).collect();
        segs.is_empty() || self.index.find(&segs).is_some()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    /// `path` itself if it is a directory, else its closest existing ancestor.
    pub fn nearest_dir(&self, path: &str) -> String {
        let mut dir = path.to_string();
        while dir != path::ROOT && !self.is_dir(&dir) {
            dir = path::parent(&dir);
        }
        dir
    }

    /// Whether a new record could be created at `target`.
    pub fn check_insertable(&self, target: &str) -> Result<(), FsError> {
        if target == path::ROOT {
            return Err(FsError::InvalidPath(target.into()));
        }
        if self.is_file(target) {
            return Err(FsError::AlreadyExists(target.into()));
        }
        if self.is_dir(target) {
            return Err(FsError::IsADirectory(target.into()));
        }
        let mut ancestor = path::parent(target);
        while ancestor != path::ROOT {
            if self.is_file(&ancestor) {
                return Err(FsError::NotADirectory(ancestor));
            }
            ancestor = path::parent(&ancestor);
        }
        Ok(())
    }

    /// Append a record. Parent directories come into being implicitly.
    pub fn insert(&mut self, record: FileRecord) -> Result<(), FsError> {
        self.check_insertable(&record.path)?;
        let segs: Vec<&str> = path::segments(&record.path).collect();
        self.index.insert(&segs);
        self.records.push(record);
        Ok(())
    }

    /// Insert ahead of every other record (used to restore anchors).
    pub fn insert_front(&mut self, record: FileRecord) -> Result<(), FsError> {
        self.check_insertable(&record.path)?;
        let segs: Vec<&str> = path::segments(&record.path).collect();
        self.index.insert(&segs);
        self.records.insert(0, record);
        Ok(())
    }

    pub fn remove(&mut self, target: &str) -> Result<FileRecord, FsError> {
        let pos = self
            .records
            .iter()
            .position(|r| r.path == target)
            .ok_or_else(|| FsError::NotFound(target.into()))?;
        let record = self.records.remove(pos);
        let segs: Vec<&str> = path::segments(&record.path).collect();
        self.index.remove(&segs);
        Ok(record)
    }

    /// Remove every record at or below `dir`, in registry order.
    pub fn remove_tree(&mut self, dir: &str) -> Vec<FileRecord> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| path::is_within(&r.path, dir));
        self.records = kept;
        self.reindex();
        removed
    }

    /// Move a single record to a new path, keeping its position.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError> {
        if !self.is_file(from) {
            return Err(FsError::NotFound(from.into()));
        }
        self.check_insertable(to)?;
        if let Some(record) = self.get_mut(from) {
            record.path = to.into();
            record.name = path::file_name(to).into();
            let lang = language::detect(&record.name);
            record.language = lang.into();
            record.display_mode = language::display_mode(lang);
        }
        self.reindex();
        Ok(())
    }

    fn reindex(&mut self) {
        let mut index = DirNode::default();
        for record in &self.records {
            let segs: Vec<&str> = path::segments(&record.path).collect();
            index.insert(&segs);
        }
        self.index = index;
    }

    /// Immediate children of `dir`, directories first then by name.
    /// Returns `None` when `dir` is not a directory.
    pub fn list_children(&self, dir: &str, include_hidden: bool) -> Option<Vec<ListEntry>> {
        let segs: Vec<&str> = path::segments(dir).collect();
        let node = self.index.find(&segs)?;
        let mut out = Vec::with_capacity(node.dirs.len() + node.files.len());
        for name in node.dirs.keys() {
            out.push(ListEntry {
                name: name.clone(),
                path: path::join(dir, name),
                is_directory: true,
            });
        }
        for name in &node.files {
            if name == MARKER && !include_hidden {
                continue;
            }
            out.push(ListEntry {
                name: name.clone(),
                path: path::join(dir, name),
                is_directory: false,
            });
        }
        Some(out)
    }

    /// Every record at or below `dir`, sorted by path.
    pub fn walk(&self, dir: &str) -> Vec<&FileRecord> {
        let mut out: Vec<&FileRecord> = self
            .records
            .iter()
            .filter(|r| path::is_within(&r.path, dir))
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(paths: &[&str]) -> Registry {
        Registry::from_records(paths.iter().map(|p| FileRecord::new(p, "x")).collect())
    }

    fn names(entries: &[ListEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn record_derives_name_and_language() {
        let r = FileRecord::new("/web/index.html", "<p>");
        assert_eq!(r.name, "index.html");
        assert_eq!(r.language, "html");
        assert_eq!(r.display_mode, Some(DisplayMode::Preview));
    }

    #[test]
    fn lists_direct_children_dirs_first() {
        let reg = registry(&["/web/index.html", "/web/style.css", "/web/js/app.js", "/about.md"]);
        let web = reg.list_children("/web", false).unwrap();
        assert_eq!(names(&web), vec!["js", "index.html", "style.css"]);
        assert!(web[0].is_directory);
        let root = reg.list_children("/", false).unwrap();
        assert_eq!(names(&root), vec!["web", "about.md"]);
    }

    #[test]
    fn listing_a_file_or_missing_dir_is_none() {
        let reg = registry(&["/web/index.html"]);
        assert!(reg.list_children("/web/index.html", false).is_none());
        assert!(reg.list_children("/nope", false).is_none());
    }

    #[test]
    fn markers_hidden_unless_requested() {
        let mut reg = Registry::new();
        reg.insert(FileRecord::marker("/notes")).unwrap();
        assert!(reg.is_dir("/notes"));
        assert!(reg.list_children("/notes", false).unwrap().is_empty());
        assert_eq!(names(&reg.list_children("/notes", true).unwrap()), vec![MARKER]);
    }

    #[test]
    fn directory_vanishes_with_last_record() {
        let mut reg = registry(&["/notes/a.txt"]);
        reg.insert(FileRecord::marker("/notes")).unwrap();
        reg.remove("/notes/a.txt").unwrap();
        assert!(reg.is_dir("/notes"));
        reg.remove("/notes/.keep").unwrap();
        assert!(!reg.is_dir("/notes"));
        assert!(reg.list_children("/", false).unwrap().is_empty());
    }

    #[test]
    fn rejects_duplicates_and_clashes() {
        let mut reg = registry(&["/web/index.html"]);
        assert_eq!(
            reg.insert(FileRecord::new("/web/index.html", "")),
            Err(FsError::AlreadyExists("/web/index.html".into()))
        );
        assert_eq!(
            reg.insert(FileRecord::new("/web", "")),
            Err(FsError::IsADirectory("/web".into()))
        );
        assert_eq!(
            reg.insert(FileRecord::new("/web/index.html/x", "")),
            Err(FsError::NotADirectory("/web/index.html".into()))
        );
    }

    #[test]
    fn from_records_drops_duplicates() {
        let reg = registry(&["/a.txt", "/a.txt", "//b.txt"]);
        assert_eq!(reg.len(), 2);
        assert!(reg.is_file("/b.txt"));
    }

    #[test]
    fn rename_keeps_position() {
        let mut reg = registry(&["/a.txt", "/b.txt"]);
        reg.rename("/a.txt", "/docs/a.txt").unwrap();
        assert_eq!(reg.records()[0].path, "/docs/a.txt");
        assert_eq!(reg.records()[0].name, "a.txt");
        assert!(reg.is_dir("/docs"));
    }

    #[test]
    fn remove_tree_respects_segment_boundary() {
        let mut reg = registry(&["/web/a.html", "/web/b/c.css", "/website/x.html"]);
        let removed = reg.remove_tree("/web");
        assert_eq!(removed.len(), 2);
        assert!(!reg.is_dir("/web"));
        assert!(reg.is_file("/website/x.html"));
    }

    #[test]
    fn walk_sorted_by_path() {
        let reg = registry(&["/z.txt", "/web/b.css", "/web/a.html"]);
        let paths: Vec<&str> = reg.walk("/web").iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/web/a.html", "/web/b.css"]);
    }
}
