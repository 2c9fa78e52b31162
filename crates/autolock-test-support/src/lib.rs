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

//! Shared test helpers used across the auto-lock crates.
//! Layout: fixtures.rs (temporary store files), mocks.rs (instrumented store doubles).

pub mod fixtures;
pub mod mocks;
