use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One broadcast payload: symbol -> quote, rounded to cents
///
/// Serializes as a flat JSON object, e.g. `{"AAPL":123.45,"MSFT":987.1}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct QuoteSnapshot {
    quotes: BTreeMap<String, f64>,
}

impl QuoteSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quote, rounding it to 2 decimal places
    pub fn insert(&mut self, symbol: impl Into<String>, price: f64) {
        self.quotes.insert(symbol.into(), round_cents(price));
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.quotes.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.quotes.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Serialize to the wire format sent to clients
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Round to 2 decimal places
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
