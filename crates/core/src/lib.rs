//! Core library: tag value codec, file metadata store, tag-set updates and
//! keyword search.

pub mod codec;
pub mod config;
pub mod error;
pub mod inference;
mod merger;
pub mod models;
pub mod search;
pub mod store;

pub use codec::{TagValue, TypeTag};
pub use error::{Error, Result};
pub use models::{File, FileUpdate, NewFile, Tag};
pub use store::MetadataStore;
