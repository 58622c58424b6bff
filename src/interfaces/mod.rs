//! I/O boundary for the CLI: the JSON-lines script format, the replay runner,
//! and the CSV ledger report.

pub mod report;
pub mod runner;
pub mod script;
