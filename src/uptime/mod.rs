//! Uptime aggregation and status classification.
//!
//! Both are pure functions over stored history; nothing here touches the
//! store or the clock.

mod aggregate;
mod status;

pub use aggregate::*;
pub use status::*;
