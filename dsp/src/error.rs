use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} = {value} is out of range ({reason})")]
    Format {
        field: &'static str,
        value: u32,
        reason: &'static str,
    },

    #[error("loop filter needs 1 to 3 {side} taps, got {len}")]
    TapCount { side: &'static str, len: usize },

    #[error("denominator tap a0 must equal one ({one}), got {a0}")]
    DenominatorNotNormalized { a0: i32, one: i32 },

    #[error("denominator tap a{index} = {value} is not a whole multiple of one ({one})")]
    FractionalFeedback { index: usize, value: i32, one: i32 },

    #[error("coefficient {name} = {value} does not fit {bits} fractional bits")]
    CoefficientRange {
        name: &'static str,
        value: f64,
        bits: u32,
    },

    #[error("loop filter was quantized to {actual} fractional bits, the format declares {expected}")]
    FilterBits { expected: u32, actual: u32 },

    #[error("frequency clamp [{min}, {max}] is empty or exceeds the filter range")]
    FrequencyClamp { min: i32, max: i32 },

    #[error("lock smoothing shift {shift} exceeds {max}")]
    LockShift { shift: u32, max: u32 },

    #[error("sine table has {actual} entries, expected {expected}")]
    TableSize { expected: usize, actual: usize },

    #[error("sine table entry {index} = {value} exceeds the sample range ±{max}")]
    TableAmplitude { index: usize, value: i16, max: i32 },

    #[error("sine table was built for a different numeric format")]
    TableFormatMismatch,

    #[error("CORDIC needs 1 to {max} iterations, got {iterations}")]
    CordicIterations { iterations: u32, max: u32 },

    #[error("invalid loop design: {0}")]
    Design(String),
}
