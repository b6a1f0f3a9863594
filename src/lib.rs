pub mod archive;
pub mod builtins;
pub mod complete;
pub mod defaults;
pub mod error;
pub mod ide;
pub mod info;
pub mod language;
pub mod logging;
pub mod output;
pub mod path;
pub mod preferences;
pub mod preview;
pub mod progress;
pub mod session;
pub mod shell;
pub mod simulate;
pub mod sink;
pub mod storage;
pub mod timers;
pub mod vfs;
pub mod workspace;

use wasm_bindgen::prelude::*;

pub use error::{ArchiveError, FsError, StorageError};
pub use ide::Ide;
pub use output::{Action, Line, LineKind, Output};
pub use session::{Session, SessionManager};
pub use shell::Interpreter;
pub use sink::{EventSink, HostEvent, QueuedSink};
pub use storage::{KeyValueStore, MemoryStore, PersistenceBridge};
pub use vfs::{FileRecord, ListEntry, Registry};
pub use workspace::{ContentOverrides, Workspace};

/// Install console logging. Call before `new Ide()` to get debug output;
/// the constructor otherwise installs info-level logging itself.
#[wasm_bindgen]
pub fn init_logging(verbose: bool) {
    logging::init(verbose);
}
