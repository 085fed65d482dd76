//! Command parsing, the static registry and dispatch to handlers.

pub mod dispatcher;
pub mod handlers;
pub mod parser;
pub mod registry;
