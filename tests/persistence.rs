use portfolio_ide::defaults::ANCHORS;
use portfolio_ide::storage::{FILES_KEY, OVERRIDES_KEY};
use portfolio_ide::{FileRecord, KeyValueStore, MemoryStore, PersistenceBridge};

#[test]
fn save_then_reload_reproduces_workspace() {
    let store = MemoryStore::new();
    let mut bridge = PersistenceBridge::new(&store);
    let mut ws = bridge.load();
    ws.create_file("/notes/todo.txt", "ship it").unwrap();
    ws.write("/about.md", "# edited").unwrap();
    ws.remove_dir("/kotlin").unwrap();
    bridge.mount();
    assert!(bridge.save(&ws).unwrap());

    let reloaded = PersistenceBridge::new(&store).load();
    let paths = |w: &portfolio_ide::Workspace| -> Vec<String> {
        w.registry().records().iter().map(|r| r.path.clone()).collect()
    };
    assert_eq!(paths(&reloaded), paths(&ws));
    for record in ws.registry().records() {
        assert_eq!(reloaded.content(&record.path), ws.content(&record.path));
    }
    assert!(!reloaded.registry().exists("/kotlin"));
    assert_eq!(reloaded.content("/about.md"), Some("# edited"));
}

#[test]
fn anchors_present_even_when_storage_holds_nothing() {
    let store = MemoryStore::new();
    store.set(FILES_KEY, "[]").unwrap();
    let ws = PersistenceBridge::new(&store).load();
    let paths: Vec<&str> = ws.registry().records().iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, ANCHORS.to_vec());
}

#[test]
fn stale_overrides_are_dropped_on_load() {
    let store = MemoryStore::new();
    let records = vec![FileRecord::new("/a.txt", "a")];
    store.set(FILES_KEY, &serde_json::to_string(&records).unwrap()).unwrap();
    store
        .set(OVERRIDES_KEY, r#"{"/a.txt":"edited","/gone.txt":"x"}"#)
        .unwrap();
    let ws = PersistenceBridge::new(&store).load();
    assert_eq!(ws.content("/a.txt"), Some("edited"));
    assert_eq!(ws.overrides().len(), 1);
}

#[test]
fn stored_json_uses_camel_case() {
    let store = MemoryStore::new();
    let mut bridge = PersistenceBridge::new(&store);
    let ws = bridge.load();
    bridge.mount();
    bridge.save(&ws).unwrap();
    let raw = store.get(FILES_KEY).unwrap().unwrap();
    assert!(raw.contains("\"displayMode\":\"preview\""));
}
