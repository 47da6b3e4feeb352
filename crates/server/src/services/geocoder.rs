//! Forward-geocoding client.
//!
//! Resolves free-form addresses and zipcodes to coordinates through a
//! Nominatim-compatible search endpoint. The resolved document is stored
//! on the bootcamp as its `location` and drives the radius search.

use anyhow::{Context, Result};
use serde::Deserialize;

/// A geocoded location.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl GeoLocation {
    /// The JSON document stored on a bootcamp's `location` column.
    pub fn as_document(&self) -> serde_json::Value {
        serde_json::json!({
            "lat": self.lat,
            "lng": self.lng,
            "formatted_address": self.formatted_address,
            "city": self.city,
            "state": self.state,
            "zipcode": self.zipcode,
            "country": self.country,
        })
    }
}

/// One result row from the provider.
#[derive(Debug, Deserialize)]
struct ProviderResult {
    lat: String,
    lon: String,
    display_name: Option<String>,
    #[serde(default)]
    address: ProviderAddress,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

/// Forward-geocoding client.
#[derive(Clone)]
pub struct Geocoder {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl Geocoder {
    /// Create a geocoder against the configured provider.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("campdir")
            .build()
            .context("failed to build geocoder HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Resolve a free-form query (address or zipcode) to a location.
    pub async fn geocode(&self, query: &str) -> Result<GeoLocation> {
        let url = format!("{}/search", self.base_url);
        let mut request = self.http.get(&url);

        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let results: Vec<ProviderResult> = request
            .query(&[
                ("q", query),
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
            ])
            .send()
            .await
            .context("geocoding request failed")?
            .error_for_status()
            .context("geocoding provider returned an error")?
            .json()
            .await
            .context("failed to parse geocoding response")?;

        let Some(result) = results.into_iter().next() else {
            anyhow::bail!("no geocoding result for '{query}'");
        };

        let lat: f64 = result
            .lat
            .parse()
            .context("geocoding result has invalid latitude")?;
        let lng: f64 = result
            .lon
            .parse()
            .context("geocoding result has invalid longitude")?;

        let address = result.address;
        Ok(GeoLocation {
            lat,
            lng,
            formatted_address: result.display_name,
            city: address.city.or(address.town).or(address.village),
            state: address.state,
            zipcode: address.postcode,
            country: address.country,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn location_document_shape() {
        let location = GeoLocation {
            lat: 42.35,
            lng: -71.06,
            formatted_address: Some("Boston, MA".to_string()),
            city: Some("Boston".to_string()),
            state: Some("MA".to_string()),
            zipcode: Some("02118".to_string()),
            country: None,
        };

        let doc = location.as_document();
        assert_eq!(doc["lat"], 42.35);
        assert_eq!(doc["lng"], -71.06);
        assert_eq!(doc["city"], "Boston");
        assert!(doc["country"].is_null());
    }

    #[test]
    fn provider_result_parses_nominatim_shape() {
        let json = r#"[{
            "lat": "42.3554334",
            "lon": "-71.060511",
            "display_name": "Boston, Suffolk County, Massachusetts, USA",
            "address": {"city": "Boston", "state": "Massachusetts", "postcode": "02118"}
        }]"#;
        let results: Vec<ProviderResult> = serde_json::from_str(json).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].address.city.as_deref(), Some("Boston"));
    }
}
