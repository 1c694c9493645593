//! Domain row structs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching one
//! database table. IDs are generated application-side, so the same struct is
//! used for inserts.

pub mod action_result;
pub mod canvas;
pub mod code_artifact;
pub mod document;
pub mod drive_file;
pub mod duplicate_record;
pub mod resource;
pub mod share_record;
pub mod storage_usage;
pub mod toolset;
pub mod workflow_app;
