//! 值对象

mod ids;

pub use ids::*;
pub use foodtrace_common::UserId;
