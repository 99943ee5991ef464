//! Configuration sources, added to the builder in precedence order.

pub mod env;
pub mod global_file;
pub mod workspace_file;
