//! VTODO parsing and generation.

pub mod generate;
pub mod parse;

pub use generate::generate_ics;
pub use parse::parse_todo;
