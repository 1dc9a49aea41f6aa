// src/config/mod.rs

//! Task list loading and validation.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{StageConfig, TaskDef, TaskEntry, TaskList};
pub use validate::validate_tasklist;
