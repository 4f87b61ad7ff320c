//! The six-field record produced by document extraction.

use serde_json::Value;

/// Placeholder for any field the extraction service did not return.
pub const UNKNOWN: &str = "Unknown";

/// Fields pulled from the identity document and the vehicle registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub name: String,
    pub passport_number: String,
    pub vehicle_id: String,
    pub license_plate: String,
    pub vehicle_make: String,
    pub year: String,
}

impl ExtractedRecord {
    /// Hard-coded record substituted when the extraction service is unavailable.
    pub fn fallback() -> Self {
        Self {
            name: "Константин Константинопольский".to_string(),
            passport_number: "АА111111".to_string(),
            vehicle_id: "A1231A123A123A123".to_string(),
            license_plate: "АА 1111 АА".to_string(),
            vehicle_make: "Audi A6".to_string(),
            year: "2016".to_string(),
        }
    }

    /// Build a record from the two prediction payloads.
    ///
    /// Missing leaves become `"Unknown"`; partial data never fails.
    pub fn from_predictions(identity: &Value, vehicle: &Value) -> Self {
        let id = prediction(identity);
        let veh = prediction(vehicle);
        Self {
            name: leaf(id.and_then(|p| p.get("given_names")).and_then(|v| v.get(0))),
            passport_number: leaf(id.and_then(|p| p.get("id_number"))),
            vehicle_id: leaf(veh.and_then(|p| p.get("id_number"))),
            license_plate: leaf(veh.and_then(|p| p.get("license_plate"))),
            vehicle_make: leaf(veh.and_then(|p| p.get("make"))),
            year: leaf(veh.and_then(|p| p.get("year"))),
        }
    }

    /// `(label, value)` pairs in display order.
    pub fn labelled_fields(&self) -> [(&'static str, &str); 6] {
        [
            ("Ім'я", self.name.as_str()),
            ("Номер паспорта", self.passport_number.as_str()),
            ("VIN авто", self.vehicle_id.as_str()),
            ("Номерний знак", self.license_plate.as_str()),
            ("Марка авто", self.vehicle_make.as_str()),
            ("Рік випуску", self.year.as_str()),
        ]
    }
}

fn prediction(payload: &Value) -> Option<&Value> {
    payload.pointer("/document/inference/prediction")
}

/// Read `<node>.value` as text. Numbers are rendered in decimal.
fn leaf(node: Option<&Value>) -> String {
    match node.and_then(|n| n.get("value")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => UNKNOWN.to_string(),
    }
}
