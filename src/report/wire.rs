//! JSON wire shape of a published report.
//!
//! ```json
//! {
//!   "app_id": "urbansounds",
//!   "dev_id": "OE-007",
//!   "payload_fields": {
//!     "Alarm": 0.81,
//!     "Talking": 0.4,
//!     "device_temperature": 54.9,
//!     "amplitude_metric": 0.19,
//!     "captured_at": 1718000000
//!   },
//!   "time": 1718000000123
//! }
//! ```
//!
//! Label scores and the three reserved keys share the `payload_fields` map,
//! which is why [`LabelVocabulary`](crate::classify::LabelVocabulary) refuses
//! labels named after a reserved key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

pub const TEMPERATURE_KEY: &str = "device_temperature";
pub const AMPLITUDE_KEY: &str = "amplitude_metric";
pub const CAPTURED_AT_KEY: &str = "captured_at";

/// Keys inside `payload_fields` that are not label scores.
pub const RESERVED_PAYLOAD_KEYS: &[&str] = &[TEMPERATURE_KEY, AMPLITUDE_KEY, CAPTURED_AT_KEY];

/// Top-level message as it travels over the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub app_id: String,
    pub dev_id: String,
    pub payload_fields: Map<String, Value>,
    /// Report assembly time, epoch milliseconds.
    pub time: u64,
}

/// Convert an `f32` to a JSON number using its shortest decimal form, so
/// `0.81_f32` is written as `0.81` rather than `0.8100000023841858`.
///
/// Non-finite values become `null`.
pub fn f32_to_json(value: f32) -> Value {
    if !value.is_finite() {
        return Value::Null;
    }
    let widened = value.to_string().parse::<f64>().unwrap_or(value as f64);
    Number::from_f64(widened).map(Value::Number).unwrap_or(Value::Null)
}
