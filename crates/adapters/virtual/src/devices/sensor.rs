//! Virtual analog input.

use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualSensor {
    pub act_id: u32,
    pub name: String,
    pub value: f64,
    pub unit: String,
}

impl VirtualSensor {
    #[must_use]
    pub fn new(act_id: u32, name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            act_id,
            name: name.into(),
            value,
            unit: unit.into(),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "act_id": self.act_id,
            "name": self.name,
            "value": self.value,
            "unit": self.unit,
        })
    }
}
