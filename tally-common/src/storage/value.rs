//! Restricted state-value shapes for per-set restoration blobs
//!
//! Sets may persist arrays of booleans, arrays of numbers, or arrays of
//! such arrays. Nothing else crosses the storage port; the shape check
//! runs on every serialize and deserialize.

use crate::{Error, Result};
use serde_json::Value as Json;

/// A restoration blob in one of the three permitted shapes
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    /// A flat array of booleans
    Booleans(Vec<bool>),
    /// A flat array of numbers
    Numbers(Vec<f64>),
    /// An array of flat arrays (rows may not nest further)
    Rows(Vec<StateValue>),
}

impl StateValue {
    /// Build a row table, rejecting nested rows
    pub fn rows(rows: Vec<StateValue>) -> Result<Self> {
        for row in &rows {
            if matches!(row, StateValue::Rows(_)) {
                return Err(Error::InvalidStateShape {
                    reason: "rows may only contain flat arrays".to_string(),
                });
            }
        }
        Ok(StateValue::Rows(rows))
    }

    /// Validate the shape invariant
    pub fn validate(&self) -> Result<()> {
        if let StateValue::Rows(rows) = self {
            for row in rows {
                if matches!(row, StateValue::Rows(_)) {
                    return Err(Error::InvalidStateShape {
                        reason: "rows may only contain flat arrays".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Serialize to the JSON wire form
    pub fn serialize(&self) -> Result<String> {
        self.validate()?;
        Ok(self.to_json().to_string())
    }

    /// Deserialize from the JSON wire form, enforcing the shape invariant
    pub fn deserialize(raw: &str) -> Result<Self> {
        let json: Json = serde_json::from_str(raw)?;
        Self::from_json(&json)
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> Json {
        match self {
            StateValue::Booleans(items) => Json::Array(items.iter().map(|b| Json::Bool(*b)).collect()),
            StateValue::Numbers(items) => Json::Array(
                items
                    .iter()
                    .map(|n| {
                        serde_json::Number::from_f64(*n)
                            .map(Json::Number)
                            .unwrap_or(Json::Null)
                    })
                    .collect(),
            ),
            StateValue::Rows(rows) => Json::Array(rows.iter().map(|r| r.to_json()).collect()),
        }
    }

    /// Parse a JSON value, rejecting shapes outside the contract
    pub fn from_json(json: &Json) -> Result<Self> {
        let Json::Array(items) = json else {
            return Err(Error::InvalidStateShape {
                reason: format!("expected array, got {json}"),
            });
        };
        if items.is_empty() {
            // Empty arrays restore as an empty number list
            return Ok(StateValue::Numbers(Vec::new()));
        }
        match &items[0] {
            Json::Bool(_) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Json::Bool(b) => out.push(*b),
                        other => {
                            return Err(Error::InvalidStateShape {
                                reason: format!("mixed boolean array: {other}"),
                            })
                        }
                    }
                }
                Ok(StateValue::Booleans(out))
            }
            Json::Number(_) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_f64() {
                        Some(n) => out.push(n),
                        None => {
                            return Err(Error::InvalidStateShape {
                                reason: format!("mixed number array: {item}"),
                            })
                        }
                    }
                }
                Ok(StateValue::Numbers(out))
            }
            Json::Array(_) => {
                let mut rows = Vec::with_capacity(items.len());
                for item in items {
                    let row = Self::from_json(item)?;
                    if matches!(row, StateValue::Rows(_)) {
                        return Err(Error::InvalidStateShape {
                            reason: "rows may only contain flat arrays".to_string(),
                        });
                    }
                    rows.push(row);
                }
                Ok(StateValue::Rows(rows))
            }
            other => Err(Error::InvalidStateShape {
                reason: format!("unsupported element: {other}"),
            }),
        }
    }
}
