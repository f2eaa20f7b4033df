//! vfs
//!
//! Branch-scoped, read-only filesystem view.
//!
//! # Architecture
//!
//! A [`BranchFs`] pairs a repository handle with a branch. Reads go
//! through a [`Snapshot`] pinned at one commit, so a caller never sees a
//! half-applied mutation: a mutation becomes visible only when the branch
//! ref moves, and a snapshot never follows the ref.
//!
//! # Example
//!
//! ```ignore
//! let fs = BranchFs::open(handle, BranchName::new("master")?)?;
//! for child in fs.list(&fs.root())? {
//!     println!("{}", fs.path_string(&child)?);
//! }
//! let bytes = fs.read_all(&fs.path("docs/readme.txt")?)?;
//! ```

mod branch;
mod record;
mod snapshot;

pub use branch::BranchFs;
pub(crate) use record::version_record;
pub use snapshot::{EntryStat, Listing, Snapshot};
