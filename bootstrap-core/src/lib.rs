pub mod config;
pub mod console;
pub mod deps;
pub mod elevate;
pub mod locate;
pub mod process;
pub mod venv;
pub mod version;

pub use process::{RunOptions, RunOutcome};
