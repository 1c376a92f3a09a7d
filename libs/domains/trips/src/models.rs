//! Trip wire model, field coercion and the trip submission DTO.
//!
//! Field names on the wire are Portuguese (`id_corrida`, `motorista.nome`,
//! `valor_corrida`) and are kept verbatim in stored documents.

use crate::error::PayloadError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use validator::Validate;

pub const TRIP_ID_FIELD: &str = "id_corrida";
pub const DRIVER_FIELD: &str = "motorista";
pub const DRIVER_NAME_FIELD: &str = "nome";
pub const FARE_FIELD: &str = "valor_corrida";
pub const PAYMENT_METHOD_FIELD: &str = "forma_pagamento";

/// Counter store key prefix for driver balances
pub const BALANCE_KEY_PREFIX: &str = "balance:";

/// A stored trip document: the event payload as a JSON object
pub type TripDocument = Map<String, Value>;

/// A decoded "trip completed" event.
///
/// Only the fields the pipeline needs are interpreted; everything else is
/// carried verbatim into the stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct TripEvent {
    payload: TripDocument,
}

impl TripEvent {
    /// Decode a message body. Anything but a JSON object is rejected.
    pub fn parse(body: &[u8]) -> Result<Self, PayloadError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| PayloadError::InvalidJson(e.to_string()))?;

        match value {
            Value::Object(payload) => Ok(Self { payload }),
            other => Err(PayloadError::NotAnObject(json_kind(&other))),
        }
    }

    pub fn from_document(payload: TripDocument) -> Self {
        Self { payload }
    }

    /// Trip id usable as an upsert key: a string or a number
    pub fn trip_id(&self) -> Option<&Value> {
        self.payload
            .get(TRIP_ID_FIELD)
            .filter(|id| id.is_string() || id.is_number())
    }

    /// Trip id for log fields
    pub fn trip_id_label(&self) -> String {
        match self.trip_id() {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => "<missing>".to_string(),
        }
    }

    /// `motorista.nome` when it is a non-empty string
    pub fn driver_name(&self) -> Option<&str> {
        self.payload
            .get(DRIVER_FIELD)?
            .get(DRIVER_NAME_FIELD)?
            .as_str()
            .filter(|name| !name.is_empty())
    }

    pub fn driver_key(&self) -> Option<DriverKey> {
        self.driver_name().map(DriverKey::new)
    }

    /// `valor_corrida` coerced to a number, 0.0 when absent or unusable
    pub fn fare(&self) -> f64 {
        self.payload.get(FARE_FIELD).map(coerce_fare).unwrap_or(0.0)
    }

    pub fn payload(&self) -> &TripDocument {
        &self.payload
    }

    pub fn into_payload(self) -> TripDocument {
        self.payload
    }
}

/// Coerce a fare value to a finite float.
///
/// Numbers are used as is, strings are trimmed and parsed, booleans count as
/// 1/0. Everything else, including non-finite results, is 0.0.
pub fn coerce_fare(value: &Value) -> f64 {
    let fare = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };

    fare.filter(|f| f.is_finite()).unwrap_or(0.0)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Case-normalized driver identity used for balance keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DriverKey(String);

impl DriverKey {
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Counter store key, `balance:<driver>`
    pub fn storage_key(&self) -> String {
        format!("{BALANCE_KEY_PREFIX}{}", self.0)
    }
}

impl fmt::Display for DriverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current balance of one driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverBalance {
    #[serde(rename = "motorista")]
    pub driver: String,

    #[serde(rename = "saldo")]
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Passenger {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[serde(rename = "telefone")]
    #[validate(length(min = 1, max = 50))]
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Driver {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[serde(rename = "nota", default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: Option<f64>,
}

/// A completed trip submitted for settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewTrip {
    #[serde(rename = "id_corrida")]
    #[validate(length(min = 1, max = 100))]
    pub trip_id: String,

    #[serde(rename = "passageiro")]
    #[validate(nested)]
    pub passenger: Passenger,

    #[serde(rename = "motorista")]
    #[validate(nested)]
    pub driver: Driver,

    #[serde(rename = "origem")]
    #[validate(length(min = 1, max = 255))]
    pub origin: String,

    #[serde(rename = "destino")]
    #[validate(length(min = 1, max = 255))]
    pub destination: String,

    #[serde(rename = "valor_corrida")]
    #[validate(range(min = 0.0))]
    pub fare: f64,

    #[serde(rename = "forma_pagamento")]
    #[validate(length(min = 1, max = 50))]
    pub payment_method: String,
}
