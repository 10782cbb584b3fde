pub mod error;
pub mod time;

pub use crate::error::{ErrorKind, Result, ServiceError};
pub use crate::time::{Clock, FixedClock, SystemClock, TimeRange, TimeRangeError};
