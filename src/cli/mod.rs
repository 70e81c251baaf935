//! CLI module for docstore
//!
//! Admin access to a data directory:
//! - get / list / count: read records
//! - create / update / delete: mutate one record

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, Filter};
pub use commands::{execute, run_cli};
pub use errors::{CliError, CliResult};
pub use io::{parse_conditions, parse_record, write_error, write_response, write_value};
