//! Request handlers.

pub mod dashboard;
pub mod events;
pub mod health;
pub mod transfer;

pub use dashboard::*;
pub use events::*;
pub use health::*;
pub use transfer::*;
