// Google Geocoding APIクライアント
// 住所検証では最初の（最も関連度の高い）候補のみを使う

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// APIキー単位で拒否される状態（以降のリクエストも同様に失敗する）
const ACCOUNT_STATUSES: [&str; 3] = ["REQUEST_DENIED", "OVER_QUERY_LIMIT", "OVER_DAILY_LIMIT"];

/// ジオコーディングのエラー
#[derive(Error, Debug)]
pub enum GeocodeError {
    /// APIキーの拒否や利用上限（チャンク全体を失敗させる）
    #[error("ジオコーディングAPIがリクエストを拒否しました: {status} {message}")]
    Rejected { status: String, message: String },

    /// 通信・HTTP・個別住所の失敗（そのレコードだけを無効にする）
    #[error("{0}")]
    Lookup(String),
}

impl GeocodeError {
    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup(message.into())
    }
}

/// 住所要素
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl AddressComponent {
    pub fn has_type(&self, component_type: &str) -> bool {
        self.types.iter().any(|t| t == component_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Geometry {
    pub location: LatLng,
    /// ROOFTOP, RANGE_INTERPOLATED, GEOMETRIC_CENTER, APPROXIMATE のいずれか
    #[serde(default)]
    pub location_type: String,
}

/// ジオコーディング候補
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeocodeMatch {
    pub formatted_address: String,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
    pub geometry: Geometry,
    #[serde(default)]
    pub partial_match: bool,
}

impl GeocodeMatch {
    pub fn component(&self, component_type: &str) -> Option<&AddressComponent> {
        self.address_components
            .iter()
            .find(|component| component.has_type(component_type))
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeMatch>,
    #[serde(default)]
    error_message: Option<String>,
}

impl GeocodeResponse {
    fn into_first_match(self) -> Result<Option<GeocodeMatch>, GeocodeError> {
        let message = self.error_message.unwrap_or_default();
        match self.status.as_str() {
            "OK" => Ok(self.results.into_iter().next()),
            "ZERO_RESULTS" => Ok(None),
            status if ACCOUNT_STATUSES.contains(&status) => Err(GeocodeError::Rejected {
                status: status.to_string(),
                message,
            }),
            status => Err(GeocodeError::lookup(format!(
                "status {status}: {message}"
            ))),
        }
    }
}

/// 住所検索サービス
#[automock]
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// 該当なしの場合は `Ok(None)`
    async fn geocode(&self, address: &str) -> Result<Option<GeocodeMatch>, GeocodeError>;
}

/// Google Geocoding JSON APIを使う実装
pub struct GoogleGeocoder {
    http_client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: impl Into<String>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            endpoint: GEOCODE_URL.to_string(),
        })
    }

    /// 接続先を差し替える（プロキシやローカルのスタブ用）
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodeMatch>, GeocodeError> {
        debug!(address = %address, "Querying geocoding API");

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| GeocodeError::lookup(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::lookup(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let parsed: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::lookup(format!("unreadable response: {e}")))?;
        parsed.into_first_match()
    }
}
