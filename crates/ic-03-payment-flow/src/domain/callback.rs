//! Provider callback payload.
//!
//! The widget hands back untyped JSON. Field names differ between the
//! provider's native callback and the camel/snake-cased forms some
//! integrations forward, so each field accepts a small set of aliases.

use serde_json::{Map, Value};
use shared_types::{ClientError, ClientResult, OrderId};

const ORDER_ID_KEYS: &[&str] = &["razorpay_order_id", "order_id", "orderId"];
const PAYMENT_ID_KEYS: &[&str] = &["razorpay_payment_id", "payment_id", "paymentId"];
const SIGNATURE_KEYS: &[&str] = &["razorpay_signature", "signature"];

/// A validated provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCallback {
    pub order_id: OrderId,
    pub payment_id: String,
    pub signature: String,
}

impl ProviderCallback {
    /// Validates a callback payload.
    ///
    /// A JSON string holding an object is unwrapped first.
    ///
    /// # Errors
    /// - `VerificationRejected`: not an object, or a field is missing, not a
    ///   string, or blank
    pub fn parse(payload: &Value) -> ClientResult<Self> {
        match payload {
            Value::Object(fields) => Self::from_fields(fields),
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(fields)) => Self::from_fields(&fields),
                _ => Err(rejected("provider payload is not a JSON object")),
            },
            _ => Err(rejected("provider payload is not a JSON object")),
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> ClientResult<Self> {
        Ok(Self {
            order_id: OrderId::new(required(fields, ORDER_ID_KEYS)?),
            payment_id: required(fields, PAYMENT_ID_KEYS)?,
            signature: required(fields, SIGNATURE_KEYS)?,
        })
    }
}

fn required(fields: &Map<String, Value>, keys: &[&str]) -> ClientResult<String> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| rejected(&format!("provider payload is missing {}", keys[0])))
}

fn rejected(reason: &str) -> ClientError {
    ClientError::VerificationRejected(reason.to_string())
}
