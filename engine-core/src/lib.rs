//! Core, I/O-free building blocks of the task engine: the parameter
//! decoder, the template renderer, the object registry, the error
//! taxonomy, duration parsing, and the task-list document types.
//!
//! Everything that talks to a live cluster lives one layer up, in
//! `engine-runtime`.

pub mod decode;
pub mod duration;
pub mod error;
pub mod gvr;
pub mod registry;
pub mod render;
pub mod task_config;

pub use error::{EngineError, Result, TaskError, ValidationError};
pub use gvr::Gvr;
pub use registry::{ObjInfo, Registry};
pub use task_config::{TaskConfig, TaskDescriptor, TaskKind};
