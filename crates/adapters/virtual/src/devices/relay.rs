//! Virtual relay.

use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualRelay {
    pub act_id: u32,
    pub name: String,
    pub on: bool,
}

impl VirtualRelay {
    #[must_use]
    pub fn new(act_id: u32, name: impl Into<String>, on: bool) -> Self {
        Self {
            act_id,
            name: name.into(),
            on,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "act_id": self.act_id,
            "name": self.name,
            "status": u8::from(self.on),
        })
    }
}
