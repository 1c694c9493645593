//! Refly domain core: canvas graph model, ID schemes, the remap table and the
//! graph rewriter used by canvas duplication and sharing.
//!
//! Everything here is pure logic; persistence and object storage live in
//! `refly-db` and `refly-storage`.

pub mod canvas;
pub mod error;
pub mod ids;
pub mod keys;
pub mod quota;
pub mod remap;
pub mod rewrite;
pub mod share;
pub mod store;
pub mod tool_calls;
pub mod types;
pub mod workflow;
