//! Local filesystem adapters.

mod blob;

pub use blob::FsBlobStore;
