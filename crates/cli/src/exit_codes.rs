//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | CLI usage error (bad args, conflicting flags)        |
//! | 3    | Profile invalid (parse or validation failure)        |
//! | 4    | Workbook could not be opened or read                 |
//! | 5    | Reconciliation failed on a structural error          |
//! | 6    | Output could not be saved                            |
//!
//! A failing run exits before anything is saved.

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Profile TOML failed to parse or validate.
pub const EXIT_PROFILE_INVALID: u8 = 3;

/// Target or reference workbook could not be opened or read.
pub const EXIT_DOCUMENT: u8 = 4;

/// Reconciliation stopped on a structural error (e.g. a record window
/// that does not fit the sheet).
pub const EXIT_RECONCILE: u8 = 5;

/// Marked workbook, copy, JSON or CSV output could not be written.
pub const EXIT_SAVE: u8 = 6;
