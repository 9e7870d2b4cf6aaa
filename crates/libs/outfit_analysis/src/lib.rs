#![deny(clippy::unwrap_used)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

mod analyzer;
mod error;
mod merger;
mod model;
mod parser;
mod prompts;
mod registry;
mod sink;
mod stages;
mod staging;
mod structs;
mod taxonomy;
mod validator;

pub use analyzer::*;
pub use error::*;
pub use merger::*;
pub use model::*;
pub use parser::*;
pub use prompts::*;
pub use registry::*;
pub use sink::*;
pub use stages::*;
pub use staging::*;
pub use structs::*;
pub use taxonomy::*;
pub use validator::*;
