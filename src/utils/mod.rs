pub mod log_forward;
pub mod log_throttle;
pub mod logger;

pub use log_forward::{ForwardLayer, LogEvent, ShipperHandle};
pub use logger::{init_logging, LoggingError};
