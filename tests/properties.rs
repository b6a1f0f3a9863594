use portfolio_ide::path;
use portfolio_ide::{FileRecord, Registry};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn arb_segment() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-c]{1,2}",
        1 => Just("..".to_string()),
        1 => Just(".".to_string()),
        1 => Just("~".to_string()),
    ]
}

fn arb_input() -> impl Strategy<Value = String> {
    (any::<bool>(), prop::collection::vec(arb_segment(), 0..6))
        .prop_map(|(absolute, segs)| {
            let joined = segs.join("/");
            if absolute {
                format!("/{}", joined)
            } else {
                joined
            }
        })
}

fn arb_record_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-c]{1,2}", 1..4).prop_map(|segs| format!("/{}", segs.join("/")))
}

proptest! {
    /// Resolution stays normalized and `..` never climbs past the root.
    #[test]
    fn resolve_never_escapes_root(cwd in arb_input(), input in arb_input()) {
        let cwd = path::resolve(&cwd, "/");
        let resolved = path::resolve(&input, &cwd);
        prop_assert!(resolved.starts_with('/'));
        prop_assert!(resolved == "/" || !resolved.ends_with('/'));
        prop_assert!(!resolved.contains("//"));
        prop_assert!(!resolved.split('/').any(|s| s == ".." || s == "."));

        let mut up = resolved.clone();
        for _ in 0..8 {
            up = path::resolve("..", &up);
        }
        prop_assert_eq!(up, "/");
    }

    /// Listings never repeat a name and never show an empty directory.
    #[test]
    fn listings_are_unique_and_backed(paths in prop::collection::vec(arb_record_path(), 0..20)) {
        let registry = Registry::from_records(
            paths.iter().map(|p| FileRecord::new(p, "")).collect(),
        );
        let mut dirs = vec!["/".to_string()];
        while let Some(dir) = dirs.pop() {
            let entries = registry.list_children(&dir, true).unwrap_or_default();
            let names: BTreeSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();
            prop_assert_eq!(names.len(), entries.len());
            for entry in &entries {
                if entry.is_directory {
                    let prefix = format!("{}/", entry.path);
                    prop_assert!(registry.records().iter().any(|r| r.path.starts_with(&prefix)));
                    dirs.push(entry.path.clone());
                } else {
                    prop_assert!(registry.is_file(&entry.path));
                }
            }
        }
    }

    /// Removing every record under a directory makes it disappear.
    #[test]
    fn emptied_directories_vanish(paths in prop::collection::vec(arb_record_path(), 1..12)) {
        let mut registry = Registry::from_records(
            paths.iter().map(|p| FileRecord::new(p, "")).collect(),
        );
        let all: Vec<String> = registry.records().iter().map(|r| r.path.clone()).collect();
        for p in &all {
            registry.remove(p).unwrap();
        }
        prop_assert!(registry.is_empty());
        prop_assert_eq!(registry.list_children("/", true), Some(vec![]));
        for p in &all {
            prop_assert!(!registry.exists(&path::parent(p)) || path::parent(p) == "/");
        }
    }
}
