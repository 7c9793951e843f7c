//! CLI domain: parse, route, output, and presentation only.
//! No completion policy; the route table hands every command to the engine.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_children, format_config, format_generation, format_outcome, format_recovery,
    format_types,
};
pub use route::RunContext;
