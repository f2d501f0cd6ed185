//! Options handed to the payment widget.

use serde::{Deserialize, Serialize};
use shared_types::{OrderId, PaymentOrder, User};

/// Static checkout presentation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Public provider key.
    pub key: String,
    pub merchant_name: String,
    pub description: String,
    pub theme_color: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            merchant_name: "Credit-Based Image Processing".to_string(),
            description: "Purchase Credits".to_string(),
            theme_color: "#6366f1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefill {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub color: String,
}

/// Widget configuration for one opened checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutOptions {
    pub key: String,
    /// Smallest currency unit, copied from the create-order response.
    pub amount: u64,
    pub currency: String,
    pub order_id: OrderId,
    pub name: String,
    pub description: String,
    pub prefill: Prefill,
    pub theme: Theme,
}

impl CheckoutOptions {
    pub fn new(config: &CheckoutConfig, order: &PaymentOrder, user: Option<&User>) -> Self {
        let prefill = user
            .map(|user| Prefill {
                name: user.full_name.clone(),
                email: Some(user.email.clone()),
            })
            .unwrap_or_default();
        Self {
            key: config.key.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
            order_id: order.order_id.clone(),
            name: config.merchant_name.clone(),
            description: config.description.clone(),
            prefill,
            theme: Theme {
                color: config.theme_color.clone(),
            },
        }
    }
}
