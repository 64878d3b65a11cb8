// 住所の検証（ジオコーディング）

use super::geocoder::{GeocodeError, GeocodeMatch, Geocoder};
use crate::core::{Record, RecordValidator, ValidationResult, ValidatorError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub const ADDRESS_FIELD: &str = "Address";

/// 信頼度の加点対象となる住所要素
const REQUIRED_COMPONENTS: [&str; 5] = [
    "street_number",
    "route",
    "locality",
    "administrative_area_level_1",
    "postal_code",
];

/// ジオコード結果の信頼度（0〜100）
pub fn confidence(geocoded: &GeocodeMatch) -> u32 {
    let mut score = match geocoded.geometry.location_type.as_str() {
        "ROOFTOP" => 40,
        "RANGE_INTERPOLATED" => 30,
        "GEOMETRIC_CENTER" => 20,
        "APPROXIMATE" => 10,
        _ => 0,
    };

    if !geocoded.partial_match {
        score += 30;
    }

    score += REQUIRED_COMPONENTS
        .iter()
        .filter(|component| geocoded.component(component).is_some())
        .count() as u32
        * 6;

    score.min(100)
}

/// 州コードから担当センターを決定
pub fn center_for_state(state: Option<&str>) -> &'static str {
    match state.map(|s| s.to_ascii_uppercase()).as_deref() {
        Some("CA") => "CA",
        Some("IN") => "IN",
        Some("TX") => "TX",
        Some(_) => "Other",
        None => "Unknown",
    }
}

/// 住所検証器
pub struct AddressValidator<G: Geocoder> {
    geocoder: Arc<G>,
}

impl<G: Geocoder> AddressValidator<G> {
    pub fn new(geocoder: Arc<G>) -> Self {
        Self { geocoder }
    }
}

fn geocoded_result(record_index: usize, original: &str, geocoded: &GeocodeMatch) -> ValidationResult {
    let mut result = ValidationResult::valid(record_index)
        .with_field("original_address", original)
        .with_field("formatted_address", geocoded.formatted_address.clone())
        .with_field("confidence", confidence(geocoded).to_string())
        .with_field("latitude", geocoded.geometry.location.lat.to_string())
        .with_field("longitude", geocoded.geometry.location.lng.to_string());

    let long_names = [
        ("street_number", "street_number"),
        ("route", "street_name"),
        ("locality", "city"),
        ("postal_code", "zip_code"),
    ];
    for (component_type, field) in long_names {
        if let Some(component) = geocoded.component(component_type) {
            result = result.with_field(field, component.long_name.clone());
        }
    }

    let state = geocoded.component("administrative_area_level_1");
    if let Some(state) = state {
        result = result
            .with_field("state", state.short_name.clone())
            .with_field("state_full", state.long_name.clone());
    }
    if let Some(country) = geocoded.component("country") {
        result = result.with_field("country", country.short_name.clone());
    }

    result.with_field(
        "center",
        center_for_state(state.map(|s| s.short_name.as_str())),
    )
}

fn unresolved(record_index: usize, address: &str, message: String) -> ValidationResult {
    ValidationResult::invalid(record_index, message)
        .with_field("original_address", address)
        .with_field("center", "Unknown")
}

#[async_trait]
impl<G: Geocoder> RecordValidator for AddressValidator<G> {
    async fn validate(&self, record: &Record) -> Result<ValidationResult, ValidatorError> {
        let address = record
            .get(ADDRESS_FIELD)
            .ok_or_else(|| ValidatorError::record("Missing address"))?;

        match self.geocoder.geocode(address).await {
            Ok(Some(geocoded)) => Ok(geocoded_result(record.index, address, &geocoded)),
            Ok(None) => Ok(unresolved(record.index, address, "Address not found".to_string())),
            // 個別の失敗はそのレコードだけを無効にする
            Err(GeocodeError::Lookup(message)) => {
                debug!(record_index = record.index, %message, "geocoding failed for record");
                Ok(unresolved(
                    record.index,
                    address,
                    format!("Geocoding error: {message}"),
                ))
            }
            Err(rejected @ GeocodeError::Rejected { .. }) => {
                Err(ValidatorError::service(anyhow::Error::new(rejected)))
            }
        }
    }
}
