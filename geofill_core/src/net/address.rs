//! Real-address lookup: Geoapify when a key is configured, then
//! OpenStreetMap Nominatim, then the local generator.

use std::time::Duration;

use serde::Deserialize;

use super::{with_timeout, HttpTransport, NetError};

pub const ADDRESS_TIMEOUT: Duration = Duration::from_secs(5);
const GEOAPIFY_REVERSE_URL: &str = "https://api.geoapify.com/v1/geocode/reverse";
const NOMINATIM_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSource {
    Geoapify,
    OpenStreetMap,
    Local,
}

impl AddressSource {
    pub fn label(self) -> &'static str {
        match self {
            AddressSource::Geoapify => "Geoapify",
            AddressSource::OpenStreetMap => "OSM",
            AddressSource::Local => "本地",
        }
    }
}

/// Street address with optional state and postcode. Each part is applied
/// only when its field is unlocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealAddress {
    pub address: String,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub source: AddressSource,
}

/// Inputs for one lookup. The point is already jittered around the city
/// centre and the local candidate is prepared up front.
#[derive(Debug, Clone)]
pub struct AddressQuery {
    pub lat: f64,
    pub lon: f64,
    pub geoapify_key: String,
    pub local: RealAddress,
}

#[derive(Debug, Deserialize)]
struct GeoapifyBody {
    #[serde(default)]
    results: Vec<GeoapifyResult>,
}

#[derive(Debug, Deserialize)]
struct GeoapifyResult {
    housenumber: Option<String>,
    street: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimBody {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    house_number: Option<String>,
    road: Option<String>,
    state: Option<String>,
    province: Option<String>,
    postcode: Option<String>,
}

pub async fn lookup_address(transport: &dyn HttpTransport, query: AddressQuery) -> RealAddress {
    if !query.geoapify_key.trim().is_empty() {
        match query_geoapify(transport, &query).await {
            Ok(Some(found)) => return found,
            Ok(None) => {
                tracing::debug!(target: "geofill::address", provider = "geoapify", "address.no_street")
            }
            Err(err) => tracing::info!(
                target: "geofill::address",
                provider = "geoapify",
                error = %err,
                "address.provider_failed"
            ),
        }
    }
    match query_nominatim(transport, &query).await {
        Ok(Some(found)) => return found,
        Ok(None) => {
            tracing::debug!(target: "geofill::address", provider = "nominatim", "address.no_street")
        }
        Err(err) => tracing::info!(
            target: "geofill::address",
            provider = "nominatim",
            error = %err,
            "address.provider_failed"
        ),
    }
    query.local
}

async fn query_geoapify(
    transport: &dyn HttpTransport,
    query: &AddressQuery,
) -> Result<Option<RealAddress>, NetError> {
    let url = format!(
        "{GEOAPIFY_REVERSE_URL}?lat={:.6}&lon={:.6}&format=json&apiKey={}",
        query.lat,
        query.lon,
        query.geoapify_key.trim()
    );
    let response = with_timeout(ADDRESS_TIMEOUT, transport.get(&url)).await?;
    if !response.is_success() {
        return Err(NetError::Status(response.status));
    }
    let body: GeoapifyBody = serde_json::from_str(&response.body)?;
    Ok(body.results.into_iter().next().and_then(|result| {
        street_line(result.housenumber, result.street).map(|address| RealAddress {
            address,
            state: result.state,
            zip_code: result.postcode,
            source: AddressSource::Geoapify,
        })
    }))
}

async fn query_nominatim(
    transport: &dyn HttpTransport,
    query: &AddressQuery,
) -> Result<Option<RealAddress>, NetError> {
    let url = format!(
        "{NOMINATIM_REVERSE_URL}?format=json&lat={:.6}&lon={:.6}&zoom=18&addressdetails=1",
        query.lat, query.lon
    );
    let response = with_timeout(ADDRESS_TIMEOUT, transport.get(&url)).await?;
    if !response.is_success() {
        return Err(NetError::Status(response.status));
    }
    let body: NominatimBody = serde_json::from_str(&response.body)?;
    Ok(body.address.and_then(|found| {
        street_line(found.house_number, found.road).map(|address| RealAddress {
            address,
            state: found.state.or(found.province),
            zip_code: found.postcode,
            source: AddressSource::OpenStreetMap,
        })
    }))
}

fn street_line(number: Option<String>, street: Option<String>) -> Option<String> {
    let street = street.filter(|street| !street.trim().is_empty())?;
    Some(match number.filter(|number| !number.trim().is_empty()) {
        Some(number) => format!("{number} {street}"),
        None => street,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn street_lines_need_a_street() {
        assert_eq!(street_line(Some("12".into()), None), None);
        assert_eq!(
            street_line(Some("12".into()), Some("Baker Street".into())),
            Some("12 Baker Street".into())
        );
        assert_eq!(
            street_line(None, Some("Baker Street".into())),
            Some("Baker Street".into())
        );
    }

    #[test]
    fn sources_have_short_labels() {
        assert_eq!(AddressSource::OpenStreetMap.label(), "OSM");
        assert_eq!(AddressSource::Local.label(), "本地");
    }
}
