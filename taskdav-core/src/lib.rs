//! Core types for the taskdav ecosystem.
//!
//! This crate provides everything the `taskdav` binary needs apart from the
//! actual store clients:
//! - `Task` and `Todo` snapshot types for the two sides of a sync
//! - `mapper` for bidirectional field translation between them
//! - `ics` for VTODO parsing and generation
//! - `sync` for correlation, classification and the sync engine
//! - `store` for the `LocalStore`/`RemoteStore` collaborator traits

pub mod config;
pub mod error;
pub mod ics;
pub mod mapper;
pub mod store;
pub mod sync;
pub mod task;
pub mod todo;

pub use error::{TaskdavError, TaskdavResult};
pub use task::{Annotation, Task, TaskPriority, TaskStatus};
pub use todo::{Todo, TodoStatus};
