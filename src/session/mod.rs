mod filesystem;
pub mod keys;
mod memory;
pub mod preview;
mod state;
mod storage;

pub use filesystem::FilesystemStateStore;
pub use memory::MemoryStateStore;
pub use state::{
    clear_history, delete_session, derive_title, load_state, new_session_id, normalize_state,
    rename_session, save_state, set_pinned, sort_sessions, update_history, NormalizedState,
    AUTO_TITLE_LENGTH, MAX_CHAT_SESSIONS,
};
pub use storage::StateStore;
