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

//! Auto-lock interval settings for the wallet.
//!
//! Layout: `defaults.rs` (storage key and bounds), `model.rs` (typed interval
//! and accessor state), `validate.rs` (bounds validator and input parsing),
//! `accessor.rs` (`IntervalAccessor`), `command.rs` (`UpdateCommand`),
//! `form.rs` (settings form state), `idle.rs` (`IdleLock`), `error.rs`.

pub mod accessor;
pub mod command;
pub mod defaults;
pub mod error;
pub mod form;
pub mod idle;
pub mod model;
pub mod validate;

pub use accessor::{IntervalAccessor, load_interval, load_stored_interval};
pub use command::UpdateCommand;
pub use defaults::{AUTO_LOCK_KEY, DEFAULT_MINUTES, MAX_MINUTES, MIN_MINUTES};
pub use error::{IntervalError, IntervalResult, ValidationError};
pub use form::AutoLockForm;
pub use idle::{IdleLock, LockState};
pub use model::{AccessorState, AutoLockInterval};
pub use validate::{parse_input, validate};
