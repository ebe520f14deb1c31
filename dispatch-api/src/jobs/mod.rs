//! Background jobs for the DISPATCH API server.

pub mod retention;

pub use retention::{RetentionSweeper, RetentionSweeperConfig};
