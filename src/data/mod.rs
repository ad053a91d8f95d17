pub mod sample;
pub mod value;

pub use sample::{channel, FieldError, Sample, Series};
pub use value::Value;
