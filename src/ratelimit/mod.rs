//! Rate limiting logic and state management.

mod clock;
mod guard;
mod limiter;
mod profiles;
mod record;
mod set;

pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::{guard, guard_async};
pub use limiter::{LimitStatus, RateLimiter, RateLimiterConfig};
pub use profiles::{Profile, ProfilesConfig};
pub use record::RequestRecord;
pub use set::LimiterSet;
