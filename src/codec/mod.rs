//! Codec subsystem
//!
//! Converts between entity values and the store's typed wire values.
//! Pure transforms: no I/O, no shared state.

mod encoder;
mod errors;
mod wire;

pub use encoder::{normalize_epoch_millis, ValueEncoder};
pub use errors::{CodecResult, EncodeError};
pub use wire::{Row, WireValue};
