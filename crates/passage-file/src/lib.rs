//! passage-file - File-backed token store.

mod store;

pub use store::FileTokenStore;
