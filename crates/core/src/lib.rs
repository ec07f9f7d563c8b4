pub mod clock;

pub use clock::{Calendar, Clock, FixedClock, LocaleClock, SystemClock};
