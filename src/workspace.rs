use crate::defaults;
use crate::error::FsError;
use crate::path;
use crate::vfs::{FileRecord, Registry, MARKER};
use std::collections::BTreeMap;

/// Edited content keyed by path, layered over the registry defaults.
pub type ContentOverrides = BTreeMap<String, String>;

/// The registry plus the editor's content overrides. All mutations go
/// through here so protection rules and override bookkeeping stay in one
/// place.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    registry: Registry,
    overrides: ContentOverrides,
    revision: u64,
    moves: Vec<(String, String)>,
}

impl Workspace {
    pub fn new(registry: Registry, overrides: ContentOverrides) -> Self {
        let mut ws = Workspace {
            registry,
            overrides,
            revision: 0,
            moves: Vec::new(),
        };
        ws.overrides.retain(|path, _| ws.registry.is_file(path));
        ws
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn overrides(&self) -> &ContentOverrides {
        &self.overrides
    }

    /// Bumped on every change; the persistence bridge compares it.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Moves made since the last [`Workspace::take_moves`], as `(from, to)`.
    pub fn moves(&self) -> &[(String, String)] {
        &self.moves
    }

    pub fn take_moves(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.moves)
    }

    fn touch_revision(&mut self) {
        self.revision += 1;
    }

    pub fn is_protected(&self, path: &str) -> bool {
        defaults::is_anchor(path)
    }

    fn protected_within(&self, dir: &str) -> Option<String> {
        defaults::ANCHORS
            .iter()
            .find(|a| path::is_within(a, dir))
            .map(|a| (*a).to_string())
    }

    /// Effective content: the override if one exists, else the record's.
    pub fn content(&self, path: &str) -> Option<&str> {
        let record = self.registry.get(path)?;
        Some(
            self.overrides
                .get(path)
                .map(String::as_str)
                .unwrap_or(&record.content),
        )
    }

    pub fn is_modified(&self, path: &str) -> bool {
        self.overrides.contains_key(path)
    }

    pub fn create_file(&mut self, target: &str, content: &str) -> Result<(), FsError> {
        self.registry.insert(FileRecord::new(target, content))?;
        self.touch_revision();
        tracing::debug!(path = target, "file created");
        Ok(())
    }

    /// Create a directory by dropping a marker into it.
    pub fn create_dir(&mut self, target: &str) -> Result<(), FsError> {
        if self.registry.exists(target) {
            return Err(FsError::AlreadyExists(target.into()));
        }
        self.registry.insert(FileRecord::marker(target))?;
        self.touch_revision();
        tracing::debug!(path = target, "directory created");
        Ok(())
    }

    /// Like [`create_dir`](Self::create_dir) but an existing directory is fine.
    pub fn ensure_dir(&mut self, target: &str) -> Result<(), FsError> {
        if self.registry.is_dir(target) {
            return Ok(());
        }
        self.create_dir(target)
    }

    /// Save editor content. Writing the default content back drops the
    /// override.
    pub fn write(&mut self, target: &str, content: &str) -> Result<(), FsError> {
        let record = self
            .registry
            .get(target)
            .ok_or_else(|| FsError::NotFound(target.into()))?;
        if record.content == content {
            self.overrides.remove(target);
        } else {
            self.overrides.insert(target.into(), content.into());
        }
        self.touch_revision();
        Ok(())
    }

    /// Discard edits and restore the default content.
    pub fn reset(&mut self, target: &str) -> Result<(), FsError> {
        if !self.registry.is_file(target) {
            return Err(FsError::NotFound(target.into()));
        }
        if self.overrides.remove(target).is_some() {
            self.touch_revision();
        }
        Ok(())
    }

    pub fn remove_file(&mut self, target: &str) -> Result<(), FsError> {
        if self.is_protected(target) {
            return Err(FsError::Protected(target.into()));
        }
        if !self.registry.is_file(target) && self.registry.is_dir(target) {
            return Err(FsError::IsADirectory(target.into()));
        }
        self.registry.remove(target)?;
        self.overrides.remove(target);
        self.touch_revision();
        tracing::info!(path = target, "file removed");
        Ok(())
    }

    /// Remove a directory and everything below it. Returns the removed paths.
    pub fn remove_dir(&mut self, target: &str) -> Result<Vec<String>, FsError> {
        if self.registry.is_file(target) {
            return Err(FsError::NotADirectory(target.into()));
        }
        if !self.registry.is_dir(target) {
            return Err(FsError::NotFound(target.into()));
        }
        if let Some(anchor) = self.protected_within(target) {
            return Err(FsError::Protected(anchor));
        }
        if target == path::ROOT {
            return Err(FsError::InvalidPath(target.into()));
        }
        let removed: Vec<String> = self
            .registry
            .remove_tree(target)
            .into_iter()
            .map(|r| r.path)
            .collect();
        for p in &removed {
            self.overrides.remove(p);
        }
        self.touch_revision();
        tracing::info!(path = target, count = removed.len(), "directory removed");
        Ok(removed)
    }

    /// Destination for a move/copy: into `to` when it is a directory.
    fn destination(&self, from: &str, to: &str) -> String {
        if self.registry.is_dir(to) {
            path::join(to, path::file_name(from))
        } else {
            to.to_string()
        }
    }

    /// Move or rename a file or directory. Returns the final path.
    pub fn move_path(&mut self, from: &str, to: &str) -> Result<String, FsError> {
        if !self.registry.exists(from) || from == path::ROOT {
            return Err(FsError::NotFound(from.into()));
        }
        if let Some(anchor) = self.protected_within(from) {
            return Err(FsError::Protected(anchor));
        }
        let dest = self.destination(from, to);
        if dest == from {
            return Ok(dest);
        }
        if self.registry.is_dir(from) {
            if path::is_within(&dest, from) {
                return Err(FsError::IntoItself(from.into()));
            }
            self.registry.check_insertable(&dest)?;
            let moving: Vec<String> = self
                .registry
                .walk(from)
                .into_iter()
                .map(|r| r.path.clone())
                .collect();
            for old in moving {
                let new = format!("{}{}", dest, &old[from.len()..]);
                self.registry.rename(&old, &new)?;
                if let Some(content) = self.overrides.remove(&old) {
                    self.overrides.insert(new, content);
                }
            }
        } else {
            self.registry.rename(from, &dest)?;
            if let Some(content) = self.overrides.remove(from) {
                self.overrides.insert(dest.clone(), content);
            }
        }
        self.moves.push((from.to_string(), dest.clone()));
        self.touch_revision();
        tracing::info!(from, to = %dest, "moved");
        Ok(dest)
    }

    /// Copy a file, or a whole directory when `recursive` is set. Copies
    /// take the effective content. Returns the final path.
    pub fn copy_path(&mut self, from: &str, to: &str, recursive: bool) -> Result<String, FsError> {
        let dest = self.destination(from, to);
        if self.registry.is_file(from) {
            let content = self.content(from).unwrap_or_default().to_string();
            self.registry.insert(FileRecord::new(&dest, &content))?;
        } else if self.registry.is_dir(from) && from != path::ROOT {
            if !recursive {
                return Err(FsError::IsADirectory(from.into()));
            }
            if path::is_within(&dest, from) {
                return Err(FsError::IntoItself(from.into()));
            }
            self.registry.check_insertable(&dest)?;
            let copies: Vec<FileRecord> = self
                .registry
                .walk(from)
                .into_iter()
                .map(|r| {
                    let new = format!("{}{}", dest, &r.path[from.len()..]);
                    let content = self.content(&r.path).unwrap_or_default();
                    FileRecord::new(&new, content)
                })
                .collect();
            for record in copies {
                self.registry.insert(record)?;
            }
        } else {
            return Err(FsError::NotFound(from.into()));
        }
        self.touch_revision();
        tracing::info!(from, to = %dest, "copied");
        Ok(dest)
    }

    /// Add an imported file under `dir`, renaming on collision to
    /// `name (1).ext`, `name (2).ext`, ...
    pub fn import(&mut self, dir: &str, name: &str, text: &str) -> Result<String, FsError> {
        let name = path::file_name(name);
        if name.is_empty() || name == MARKER {
            return Err(FsError::InvalidPath(name.into()));
        }
        let mut target = path::join(dir, name);
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
            _ => (name, String::new()),
        };
        let mut n = 1;
        while self.registry.exists(&target) {
            target = path::join(dir, &format!("{} ({}){}", stem, n, ext));
            n += 1;
        }
        self.create_file(&target, text)?;
        Ok(target)
    }

    /// Put an anchor back at the front if it went missing.
    pub fn restore_anchors(&mut self) {
        for anchor in defaults::anchor_records().into_iter().rev() {
            if self.registry.is_file(&anchor.path) {
                continue;
            }
            let anchor_path = anchor.path.clone();
            match self.registry.insert_front(anchor) {
                Ok(()) => {
                    self.touch_revision();
                    tracing::info!(path = %anchor_path, "restored protected file");
                }
                Err(e) => tracing::warn!(path = %anchor_path, error = %e, "cannot restore protected file"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws() -> Workspace {
        Workspace::new(defaults::default_registry(), ContentOverrides::new())
    }

    #[test]
    fn overrides_layer_over_content() {
        let mut ws = ws();
        ws.write("/web/style.css", "body{}").unwrap();
        assert_eq!(ws.content("/web/style.css"), Some("body{}"));
        assert!(ws.is_modified("/web/style.css"));
        assert_ne!(ws.registry().get("/web/style.css").unwrap().content, "body{}");
        ws.reset("/web/style.css").unwrap();
        assert!(!ws.is_modified("/web/style.css"));
    }

    #[test]
    fn writing_default_content_drops_override() {
        let mut ws = ws();
        let original = ws.content("/about.md").unwrap().to_string();
        ws.write("/about.md", "changed").unwrap();
        ws.write("/about.md", &original).unwrap();
        assert!(ws.overrides().is_empty());
    }

    #[test]
    fn anchors_cannot_be_removed_or_moved() {
        let mut ws = ws();
        let before = ws.registry().len();
        assert_eq!(ws.remove_file("/about.md"), Err(FsError::Protected("/about.md".into())));
        assert_eq!(
            ws.move_path("/README.md", "/old.md"),
            Err(FsError::Protected("/README.md".into()))
        );
        assert_eq!(ws.remove_dir("/"), Err(FsError::Protected("/about.md".into())));
        assert_eq!(ws.registry().len(), before);
    }

    #[test]
    fn move_directory_carries_overrides() {
        let mut ws = ws();
        ws.write("/web/index.html", "<h1>new</h1>").unwrap();
        let dest = ws.move_path("/web", "/site").unwrap();
        assert_eq!(dest, "/site");
        assert!(!ws.registry().is_dir("/web"));
        assert_eq!(ws.content("/site/index.html"), Some("<h1>new</h1>"));
    }

    #[test]
    fn move_into_existing_dir() {
        let mut ws = ws();
        let dest = ws.move_path("/contact.json", "/notes").unwrap();
        assert_eq!(dest, "/notes/contact.json");
    }

    #[test]
    fn move_into_itself_rejected() {
        let mut ws = ws();
        assert_eq!(
            ws.move_path("/web", "/web/inner"),
            Err(FsError::IntoItself("/web".into()))
        );
    }

    #[test]
    fn move_onto_existing_file_rejected() {
        let mut ws = ws();
        assert_eq!(
            ws.move_path("/contact.json", "/package.json"),
            Err(FsError::AlreadyExists("/package.json".into()))
        );
    }

    #[test]
    fn copy_dir_needs_recursive() {
        let mut ws = ws();
        assert_eq!(
            ws.copy_path("/web", "/web2", false),
            Err(FsError::IsADirectory("/web".into()))
        );
        ws.copy_path("/web", "/web2", true).unwrap();
        assert!(ws.registry().is_file("/web2/index.html"));
        assert!(ws.registry().is_file("/web/index.html"));
    }

    #[test]
    fn import_renames_on_collision() {
        let mut ws = ws();
        assert_eq!(ws.import("/web", "index.html", "a").unwrap(), "/web/index (1).html");
        assert_eq!(ws.import("/web", "index.html", "b").unwrap(), "/web/index (2).html");
        assert_eq!(ws.import("/", "notes.txt", "c").unwrap(), "/notes.txt");
    }

    #[test]
    fn restore_puts_anchor_first() {
        let reg = Registry::from_records(vec![FileRecord::new("/x.txt", "")]);
        let mut ws = Workspace::new(reg, ContentOverrides::new());
        ws.restore_anchors();
        let paths: Vec<&str> = ws.registry().records().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/about.md", "/README.md", "/x.txt"]);
    }

    #[test]
    fn stale_overrides_dropped_on_load() {
        let mut overrides = ContentOverrides::new();
        overrides.insert("/gone.txt".into(), "x".into());
        let ws = Workspace::new(defaults::default_registry(), overrides);
        assert!(ws.overrides().is_empty());
    }
}
