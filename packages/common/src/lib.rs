pub mod range;
pub mod storage;

pub use range::{ByteRange, RangeOutcome, parse_range};
