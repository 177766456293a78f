//! Report assembly and wire serialisation.
//!
//! ```text
//! ClassificationResult ─┐
//! amplitude metric ─────┼─▶ ReportBuilder::build ─▶ Report ─▶ to_payload ─▶ JSON bytes
//! temperature (opt) ────┘
//! ```

pub mod builder;
pub mod wire;

pub use builder::{Report, ReportBuilder, ReportError};
pub use wire::{
    f32_to_json, WireMessage, AMPLITUDE_KEY, CAPTURED_AT_KEY, RESERVED_PAYLOAD_KEYS,
    TEMPERATURE_KEY,
};
