use std::time::Duration;

use geofill_runtime::{DEFAULT_CITY, DEFAULT_COUNTRY};
use serde::Deserialize;

use super::{with_timeout, HttpTransport, NetError};

pub const GEO_TIMEOUT: Duration = Duration::from_secs(5);
pub const IPAPI_CO_URL: &str = "https://ipapi.co/json/";
pub const IP_API_URL: &str = "http://ip-api.com/json/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoSource {
    IpapiCo,
    IpApi,
    /// Every provider failed; the static default was used.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLookup {
    pub country: String,
    pub city: String,
    pub region: String,
    pub source: GeoSource,
}

impl GeoLookup {
    pub fn fallback() -> Self {
        Self {
            country: DEFAULT_COUNTRY.to_string(),
            city: DEFAULT_CITY.to_string(),
            region: String::new(),
            source: GeoSource::Default,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == GeoSource::Default
    }
}

#[derive(Debug, Deserialize)]
struct IpapiCoBody {
    country_name: Option<String>,
    city: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiBody {
    status: Option<String>,
    country: Option<String>,
    city: Option<String>,
    region_name: Option<String>,
}

/// Resolve the caller's location: ipapi.co, then ip-api.com, then the
/// static default. Each provider gets [`GEO_TIMEOUT`].
pub async fn locate(transport: &dyn HttpTransport) -> GeoLookup {
    match query_ipapi_co(transport).await {
        Ok(Some(found)) => return found,
        Ok(None) => tracing::info!(target: "geofill::geo", provider = "ipapi.co", "geo.no_country"),
        Err(err) => tracing::info!(
            target: "geofill::geo",
            provider = "ipapi.co",
            error = %err,
            "geo.provider_failed"
        ),
    }
    match query_ip_api(transport).await {
        Ok(Some(found)) => return found,
        Ok(None) => tracing::info!(target: "geofill::geo", provider = "ip-api.com", "geo.no_country"),
        Err(err) => tracing::info!(
            target: "geofill::geo",
            provider = "ip-api.com",
            error = %err,
            "geo.provider_failed"
        ),
    }
    tracing::warn!(target: "geofill::geo", "geo.fallback=default");
    GeoLookup::fallback()
}

async fn query_ipapi_co(transport: &dyn HttpTransport) -> Result<Option<GeoLookup>, NetError> {
    let response = with_timeout(GEO_TIMEOUT, transport.get(IPAPI_CO_URL)).await?;
    let body: IpapiCoBody = serde_json::from_str(&response.body)?;
    Ok(body
        .country_name
        .filter(|country| !country.is_empty())
        .map(|country| GeoLookup {
            country,
            city: non_empty_or(body.city, "Unknown"),
            region: body.region.unwrap_or_default(),
            source: GeoSource::IpapiCo,
        }))
}

async fn query_ip_api(transport: &dyn HttpTransport) -> Result<Option<GeoLookup>, NetError> {
    let response = with_timeout(GEO_TIMEOUT, transport.get(IP_API_URL)).await?;
    let body: IpApiBody = serde_json::from_str(&response.body)?;
    if body.status.as_deref() != Some("success") {
        return Ok(None);
    }
    Ok(body.country.map(|country| GeoLookup {
        country,
        city: non_empty_or(body.city, "Unknown"),
        region: body.region_name.unwrap_or_default(),
        source: GeoSource::IpApi,
    }))
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Status line for the detected location, e.g. `📍 Osaka, Japan`.
///
/// City-states and cities equal to the country name show the country only;
/// a fallback location carries the `(默认)` marker.
pub fn location_label(country: &str, city: &str, fallback: bool) -> String {
    if fallback {
        return format!("📍 {country} (默认)");
    }
    if city.is_empty() || city == country || city == "Singapore" || city == "Hong Kong" {
        format!("📍 {country}")
    } else {
        format!("📍 {city}, {country}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::HttpResponse;
    use async_trait::async_trait;
    use serde_json::Value;

    /// ipapi.co never answers; ip-api.com answers immediately.
    struct StalledPrimary;

    #[async_trait]
    impl HttpTransport for StalledPrimary {
        async fn get(&self, url: &str) -> Result<HttpResponse, NetError> {
            if url == IPAPI_CO_URL {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(HttpResponse {
                status: 200,
                content_type: Some("application/json".into()),
                body: r#"{"status":"success","country":"Germany","city":"Berlin","regionName":"Berlin"}"#
                    .into(),
            })
        }

        async fn post_json(
            &self,
            _url: &str,
            _bearer: &str,
            _body: &Value,
        ) -> Result<HttpResponse, NetError> {
            Err(NetError::Unavailable("not used".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_times_out_into_the_next_one() {
        let started = tokio::time::Instant::now();
        let found = locate(&StalledPrimary).await;
        assert_eq!(found.source, GeoSource::IpApi);
        assert_eq!(found.country, "Germany");
        assert_eq!(found.city, "Berlin");
        assert!(started.elapsed() >= GEO_TIMEOUT);
        assert!(started.elapsed() < GEO_TIMEOUT * 2);
    }

    #[test]
    fn labels_follow_lookup_outcome() {
        assert_eq!(location_label("Japan", "Osaka", false), "📍 Osaka, Japan");
        assert_eq!(location_label("Singapore", "Singapore", false), "📍 Singapore");
        assert_eq!(location_label("Hong Kong", "Hong Kong", false), "📍 Hong Kong");
        assert_eq!(
            location_label("United States", "New York", true),
            "📍 United States (默认)"
        );
    }

    #[test]
    fn ip_api_field_names_decode() {
        let body: IpApiBody = serde_json::from_str(
            r#"{"status":"success","country":"Japan","city":"Osaka","regionName":"Osaka"}"#,
        )
        .unwrap();
        assert_eq!(body.region_name.as_deref(), Some("Osaka"));
    }
}
