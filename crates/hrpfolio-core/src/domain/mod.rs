mod interval;
mod series;
mod symbol;
mod timestamp;

pub use interval::Interval;
pub use series::{PricePoint, TimeSeries};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
