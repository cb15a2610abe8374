//! Path, digest and atomic I/O primitives for depot
//!
//! Leaf crate of the workspace: everything here is backend-agnostic and
//! manager-agnostic. Provides the virtual path currency, content digests,
//! directory-tree manifests and safe local I/O.

pub mod checksum;
pub mod error;
pub mod io;
pub mod manifest;
pub mod path;

pub use checksum::{HashAlgorithm, digest_bytes, digest_file};
pub use error::{Error, Result};
pub use manifest::{TreeDiff, TreeManifest};
pub use path::VirtualPath;
