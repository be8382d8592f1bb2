pub mod error;
pub mod executor;
pub mod run_log;

pub use error::{ExecError, Result};
pub use executor::{all_matching_ids, execute};
pub use run_log::persist_run;
