pub mod cancel;
pub mod config;
pub mod discovery;
pub mod error;
pub mod history;
pub mod io;
pub mod paths;
pub mod process;
pub mod record;
pub mod revision;
pub mod runner;
pub mod timer;

pub use error::{BenchError, Result};
