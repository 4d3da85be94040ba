//! Process exit codes
//!
//! | code | meaning                          |
//! |------|----------------------------------|
//! | 0    | success                          |
//! | 1    | any other failure                |
//! | 2    | invalid input                    |
//! | 3    | template rendering failed        |
//! | 4    | file system error                |
//! | 5    | dialect or database error        |
//! | 6    | migration ledger is locked       |

use rigging::{Error, ErrorClass};
use std::process::ExitCode;

/// Exit code for an error class
#[must_use]
pub const fn code_for(class: ErrorClass) -> u8 {
    match class {
        ErrorClass::Validation => 2,
        ErrorClass::Render => 3,
        ErrorClass::Io => 4,
        ErrorClass::Dialect => 5,
        ErrorClass::Concurrency => 6,
        ErrorClass::Migration => 1,
    }
}

/// Exit code for a command failure, from the first engine error in its chain
#[must_use]
pub fn code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map_or(1, |e| code_for(e.class()))
}

/// Map a command result to the process exit code
#[must_use]
pub fn exit_code(result: &anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(code(err)),
    }
}
