//! Quote sources
//!
//! The broadcaster asks a source for one snapshot per tick. The bundled
//! source draws uniform random prices; anything implementing `QuoteSource`
//! can be plugged in instead.

use rand::Rng;

use crate::config::FeedConfig;
use crate::models::QuoteSnapshot;

/// Produces the payload pushed to streaming clients
pub trait QuoteSource: Send + Sync {
    /// Generate a fresh snapshot
    fn snapshot(&self) -> QuoteSnapshot;

    /// Get the source name (for logging)
    fn source_name(&self) -> &'static str;
}

/// Uniform random quotes within a fixed range
pub struct RandomQuoteSource {
    symbols: Vec<String>,
    min_price: f64,
    max_price: f64,
}

impl RandomQuoteSource {
    pub fn new(symbols: Vec<String>, min_price: f64, max_price: f64) -> Self {
        Self {
            symbols,
            min_price,
            max_price,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.symbols.clone(), config.min_price, config.max_price)
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

impl Default for RandomQuoteSource {
    fn default() -> Self {
        Self::from_config(&FeedConfig::default())
    }
}

impl QuoteSource for RandomQuoteSource {
    fn snapshot(&self) -> QuoteSnapshot {
        let mut rng = rand::thread_rng();
        let mut snapshot = QuoteSnapshot::new();

        for symbol in &self.symbols {
            snapshot.insert(symbol.clone(), rng.gen_range(self.min_price..=self.max_price));
        }

        snapshot
    }

    fn source_name(&self) -> &'static str {
        "random"
    }
}
