//! Command handlers for the docqa CLI.

pub mod ask;
pub mod session;
pub mod stats;

pub use ask::AskCommand;
pub use session::SessionCommand;
pub use stats::StatsCommand;
