use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stockable product as seen by the delivery planner.
///
/// Only the physical attributes matter here: a weight or volume of `0.0`
/// means the attribute was never filled in on the product form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub default_code: Option<String>,
    /// Unit weight in kg
    pub weight: f64,
    /// Unit volume in m³
    pub volume: f64,
}

impl Product {
    pub fn new(name: impl Into<String>, weight: f64, volume: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            default_code: None,
            weight,
            volume,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.default_code = Some(code.into());
        self
    }

    pub fn has_weight(&self) -> bool {
        self.weight > 0.0
    }

    pub fn has_volume(&self) -> bool {
        self.volume > 0.0
    }

    /// Display name, prefixed with the internal reference when set
    pub fn display_name(&self) -> String {
        match &self.default_code {
            Some(code) => format!("[{}] {}", code, self.name),
            None => self.name.clone(),
        }
    }
}
