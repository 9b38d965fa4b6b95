//! Command-line interface

pub mod commands;

pub use commands::{
    cmd_cosigners, cmd_definition, cmd_funded, cmd_init, cmd_paths, cmd_resolve, parse_list,
    AppState, CliResult,
};
