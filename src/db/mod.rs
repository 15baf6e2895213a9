pub mod accounts;
pub mod backend;
pub mod overlay;
pub mod transient;

pub use accounts::{AccountDB, StateDiff};
pub use backend::{Backend, MemoryBackend, Table};
pub use overlay::Overlay;
pub use transient::TransientDB;
