#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Key/value persistence with change notifications.
//!
//! Layout: `store.rs` (the `KeyValueStore` capability trait), `change.rs`
//! (change bus, streams, and `Subscription` handles), `memory.rs` (in-process
//! backend), `file.rs` (JSON document backend with external-change polling),
//! `error.rs` (`StoreError`).

pub mod change;
pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use change::{
    ChangeBus, ChangeId, ChangeListener, ChangeScope, ChangeStream, StoreChange, Subscription,
};
pub use error::{StoreError, StoreResult};
pub use file::{ExternalWatch, FileStore};
pub use memory::MemoryStore;
pub use store::KeyValueStore;
