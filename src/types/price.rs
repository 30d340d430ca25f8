use std::fmt;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(f64);

impl Price {
    pub fn new(value: f64) -> Self {
        assert!(value.is_finite(), "price must be finite");
        assert!(value >= 0.0, "price must be non-negative");

        Price(value)
    }

    /// Fallible constructor for values decoded from external data.
    pub fn try_new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            bail!("price must be finite, got {value}");
        }
        if value < 0.0 {
            bail!("price must be non-negative, got {value}");
        }

        Ok(Price(value))
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Zero prices are carried through the pipeline but never priced against.
    pub fn is_positive(self) -> bool {
        self.0 > 0.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:.2}", self.0)
    }
}

impl TryFrom<f64> for Price {
    type Error = anyhow::Error;

    fn try_from(value: f64) -> Result<Self> {
        Price::try_new(value)
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> f64 {
        price.0
    }
}
