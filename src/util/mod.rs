pub mod panic;
pub mod telemetry;

pub use panic::panic_message;
pub use telemetry::{init_tracing, init_tracing_with};
