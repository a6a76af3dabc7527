#[cfg(test)]
pub use serial_test;
pub use log;
pub use tokio;
pub use tokio::time::sleep;

pub mod events;
pub mod task;

pub use events::{EventHandler, EventManager};
pub use task::TaskHandler;
