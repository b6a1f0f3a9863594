use crate::error::StorageError;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

const PREFIX: &str = "portfolio-ide:";

pub const FONT_SIZE_RANGE: (u32, u32) = (10, 32);
pub const TAB_SIZE_RANGE: (u32, u32) = (1, 8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl FromStr for Theme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err(()),
        }
    }
}

impl Theme {
    fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

/// Editor settings. Each field lives under its own storage key so a bad
/// value only resets that one setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub font_size: u32,
    pub tab_size: u32,
    pub word_wrap: bool,
    pub minimap: bool,
    pub auto_save: bool,
    pub theme: Theme,
    pub expanded_folders: BTreeSet<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            font_size: 14,
            tab_size: 2,
            word_wrap: true,
            minimap: false,
            auto_save: true,
            theme: Theme::Dark,
            expanded_folders: ["/web".to_string()].into_iter().collect(),
        }
    }
}

fn key(name: &str) -> String {
    format!("{}{}", PREFIX, name)
}

fn clamp(value: u32, (lo, hi): (u32, u32)) -> u32 {
    value.clamp(lo, hi)
}

fn read<T: FromStr>(store: &impl KeyValueStore, name: &str) -> Option<T> {
    match store.get(&key(name)) {
        Ok(Some(raw)) => {
            let parsed = raw.trim().parse().ok();
            if parsed.is_none() {
                tracing::warn!(key = name, value = %raw, "ignoring invalid preference");
            }
            parsed
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key = name, error = %e, "preference unreadable");
            None
        }
    }
}

impl Preferences {
    pub fn load(store: &impl KeyValueStore) -> Self {
        let d = Preferences::default();
        let expanded_folders = match store.get(&key("expandedFolders")) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring invalid expanded folders");
                d.expanded_folders.clone()
            }),
            _ => d.expanded_folders.clone(),
        };
        Preferences {
            font_size: read(store, "fontSize").map_or(d.font_size, |v| clamp(v, FONT_SIZE_RANGE)),
            tab_size: read(store, "tabSize").map_or(d.tab_size, |v| clamp(v, TAB_SIZE_RANGE)),
            word_wrap: read(store, "wordWrap").unwrap_or(d.word_wrap),
            minimap: read(store, "minimap").unwrap_or(d.minimap),
            auto_save: read(store, "autoSave").unwrap_or(d.auto_save),
            theme: read(store, "theme").unwrap_or(d.theme),
            expanded_folders,
        }
    }

    pub fn save(&self, store: &impl KeyValueStore) -> Result<(), StorageError> {
        store.set(&key("fontSize"), &self.font_size.to_string())?;
        store.set(&key("tabSize"), &self.tab_size.to_string())?;
        store.set(&key("wordWrap"), &self.word_wrap.to_string())?;
        store.set(&key("minimap"), &self.minimap.to_string())?;
        store.set(&key("autoSave"), &self.auto_save.to_string())?;
        store.set(&key("theme"), self.theme.as_str())?;
        store.set(
            &key("expandedFolders"),
            &serde_json::to_string(&self.expanded_folders)?,
        )?;
        Ok(())
    }

    /// Apply one setting by its storage name. Returns false for unknown
    /// names or unparsable values.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        let value = value.trim();
        match name {
            "fontSize" => value
                .parse::<u32>()
                .map(|v| self.font_size = clamp(v, FONT_SIZE_RANGE))
                .is_ok(),
            "tabSize" => value
                .parse::<u32>()
                .map(|v| self.tab_size = clamp(v, TAB_SIZE_RANGE))
                .is_ok(),
            "wordWrap" => value.parse::<bool>().map(|v| self.word_wrap = v).is_ok(),
            "minimap" => value.parse::<bool>().map(|v| self.minimap = v).is_ok(),
            "autoSave" => value.parse::<bool>().map(|v| self.auto_save = v).is_ok(),
            "theme" => value.parse::<Theme>().map(|v| self.theme = v).is_ok(),
            _ => false,
        }
    }

    /// Flip a folder in the explorer; returns the new expanded state.
    pub fn toggle_folder(&mut self, dir: &str) -> bool {
        if self.expanded_folders.remove(dir) {
            false
        } else {
            self.expanded_folders.insert(dir.to_string());
            true
        }
    }

    /// Forget folders that no longer exist.
    pub fn retain_folders(&mut self, exists: impl Fn(&str) -> bool) {
        self.expanded_folders.retain(|d| exists(d));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn missing_values_use_defaults() {
        assert_eq!(Preferences::load(&MemoryStore::new()), Preferences::default());
    }

    #[test]
    fn values_are_clamped_and_invalid_ones_ignored() {
        let store = MemoryStore::new();
        store.set("portfolio-ide:fontSize", "99").unwrap();
        store.set("portfolio-ide:tabSize", "0").unwrap();
        store.set("portfolio-ide:wordWrap", "maybe").unwrap();
        store.set("portfolio-ide:theme", "light").unwrap();
        let prefs = Preferences::load(&store);
        assert_eq!(prefs.font_size, 32);
        assert_eq!(prefs.tab_size, 1);
        assert!(prefs.word_wrap);
        assert_eq!(prefs.theme, Theme::Light);
    }

    #[test]
    fn save_then_load() {
        let store = MemoryStore::new();
        let mut prefs = Preferences::default();
        assert!(prefs.set("fontSize", "18"));
        assert!(prefs.set("minimap", "true"));
        assert!(!prefs.set("colour", "red"));
        assert!(!prefs.toggle_folder("/web"));
        assert!(prefs.toggle_folder("/kotlin"));
        prefs.save(&store).unwrap();
        assert_eq!(store.get("portfolio-ide:fontSize").unwrap().as_deref(), Some("18"));
        assert_eq!(Preferences::load(&store), prefs);
    }
}
