//! Fixed-point carrier recovery.

pub mod am;
pub mod channel;
pub mod design;
pub mod detector;
pub mod error;
pub mod filter;
pub mod fixed;
pub mod fll;
pub mod fm;
pub mod iq;
pub mod lock;
pub mod math;
pub mod nco;
pub mod pll;
pub mod sine_table;
pub mod wave;

pub use error::{ConfigError, Result};
pub use fixed::NumericFormat;
pub use iq::{FixedIq, IQ};
pub use pll::{Output, Pll, PllConfig, ReferencePll};
pub use sine_table::SineTable;
