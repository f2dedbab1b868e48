//! Airport directory: IATA code lookup for validation and geocoding.
//!
//! Normalization rejects any segment whose airport codes do not resolve
//! here, so the directory doubles as the validation gate. The bundled
//! `StaticAirportDirectory` covers major airports for development, tests,
//! and the CLI; deployments with a full dataset implement the trait.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Resolved airport metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportInfo {
    /// City the airport serves
    pub city: String,

    /// ISO country code
    pub country: String,

    pub latitude: f64,
    pub longitude: f64,
}

/// Lookup collaborator for IATA airport codes.
#[async_trait]
pub trait AirportDirectory: Send + Sync {
    /// Resolve a 3-letter IATA code. Case-insensitive; None means the
    /// code is unknown and any segment using it must be dropped.
    async fn lookup(&self, iata: &str) -> Option<AirportInfo>;
}

/// (code, city, country, latitude, longitude)
const AIRPORTS: &[(&str, &str, &str, f64, f64)] = &[
    ("ATL", "Atlanta", "US", 33.6407, -84.4277),
    ("LAX", "Los Angeles", "US", 33.9416, -118.4085),
    ("ORD", "Chicago", "US", 41.9742, -87.9073),
    ("DFW", "Dallas-Fort Worth", "US", 32.8998, -97.0403),
    ("DEN", "Denver", "US", 39.8561, -104.6737),
    ("JFK", "New York", "US", 40.6413, -73.7781),
    ("SFO", "San Francisco", "US", 37.6213, -122.3790),
    ("SEA", "Seattle", "US", 47.4502, -122.3088),
    ("LAS", "Las Vegas", "US", 36.0840, -115.1537),
    ("MCO", "Orlando", "US", 28.4312, -81.3081),
    ("EWR", "Newark", "US", 40.6895, -74.1745),
    ("MIA", "Miami", "US", 25.7959, -80.2870),
    ("PHX", "Phoenix", "US", 33.4373, -112.0078),
    ("IAH", "Houston", "US", 29.9902, -95.3368),
    ("BOS", "Boston", "US", 42.3656, -71.0096),
    ("MSP", "Minneapolis", "US", 44.8848, -93.2223),
    ("DTW", "Detroit", "US", 42.2162, -83.3554),
    ("FLL", "Fort Lauderdale", "US", 26.0742, -80.1506),
    ("PHL", "Philadelphia", "US", 39.8744, -75.2424),
    ("LGA", "New York", "US", 40.7769, -73.8740),
    ("BWI", "Baltimore", "US", 39.1774, -76.6684),
    ("SLC", "Salt Lake City", "US", 40.7899, -111.9791),
    ("SAN", "San Diego", "US", 32.7338, -117.1933),
    ("IAD", "Washington", "US", 38.9531, -77.4565),
    ("DCA", "Washington", "US", 38.8512, -77.0402),
    ("MDW", "Chicago", "US", 41.7868, -87.7522),
    ("TPA", "Tampa", "US", 27.9772, -82.5311),
    ("PDX", "Portland", "US", 45.5898, -122.5951),
    ("HNL", "Honolulu", "US", 21.3245, -157.9251),
    ("AUS", "Austin", "US", 30.1975, -97.6664),
    ("MSY", "New Orleans", "US", 29.9911, -90.2592),
    ("RDU", "Raleigh-Durham", "US", 35.8801, -78.7880),
    ("SJC", "San Jose", "US", 37.3639, -121.9289),
    ("OAK", "Oakland", "US", 37.7126, -122.2197),
    ("SMF", "Sacramento", "US", 38.6951, -121.5908),
    ("STL", "St. Louis", "US", 38.7487, -90.3700),
    ("BNA", "Nashville", "US", 36.1263, -86.6774),
    ("ANC", "Anchorage", "US", 61.1743, -149.9982),
    ("YYZ", "Toronto", "CA", 43.6777, -79.6248),
    ("YVR", "Vancouver", "CA", 49.1967, -123.1815),
    ("MEX", "Mexico City", "MX", 19.4363, -99.0721),
    ("GRU", "Sao Paulo", "BR", -23.4356, -46.4731),
    ("EZE", "Buenos Aires", "AR", -34.8222, -58.5358),
    ("LHR", "London", "GB", 51.4700, -0.4543),
    ("LGW", "London", "GB", 51.1537, -0.1821),
    ("CDG", "Paris", "FR", 49.0097, 2.5479),
    ("AMS", "Amsterdam", "NL", 52.3105, 4.7683),
    ("FRA", "Frankfurt", "DE", 50.0379, 8.5622),
    ("MUC", "Munich", "DE", 48.3538, 11.7861),
    ("MAD", "Madrid", "ES", 40.4983, -3.5676),
    ("BCN", "Barcelona", "ES", 41.2974, 2.0833),
    ("FCO", "Rome", "IT", 41.8003, 12.2389),
    ("ZRH", "Zurich", "CH", 47.4647, 8.5492),
    ("DUB", "Dublin", "IE", 53.4264, -6.2499),
    ("CPH", "Copenhagen", "DK", 55.6180, 12.6508),
    ("OSL", "Oslo", "NO", 60.1976, 11.1004),
    ("ARN", "Stockholm", "SE", 59.6498, 17.9238),
    ("VIE", "Vienna", "AT", 48.1103, 16.5697),
    ("LIS", "Lisbon", "PT", 38.7742, -9.1342),
    ("ATH", "Athens", "GR", 37.9356, 23.9484),
    ("IST", "Istanbul", "TR", 41.2753, 28.7519),
    ("TLV", "Tel Aviv", "IL", 32.0114, 34.8867),
    ("DXB", "Dubai", "AE", 25.2532, 55.3657),
    ("DOH", "Doha", "QA", 25.2731, 51.6081),
    ("JNB", "Johannesburg", "ZA", -26.1367, 28.2411),
    ("CAI", "Cairo", "EG", 30.1219, 31.4056),
    ("NRT", "Tokyo", "JP", 35.7720, 140.3929),
    ("HND", "Tokyo", "JP", 35.5494, 139.7798),
    ("ICN", "Seoul", "KR", 37.4602, 126.4407),
    ("PEK", "Beijing", "CN", 40.0799, 116.6031),
    ("PVG", "Shanghai", "CN", 31.1443, 121.8083),
    ("HKG", "Hong Kong", "HK", 22.3080, 113.9185),
    ("TPE", "Taipei", "TW", 25.0797, 121.2342),
    ("SIN", "Singapore", "SG", 1.3644, 103.9915),
    ("BKK", "Bangkok", "TH", 13.6900, 100.7501),
    ("KUL", "Kuala Lumpur", "MY", 2.7456, 101.7099),
    ("DEL", "Delhi", "IN", 28.5562, 77.1000),
    ("BOM", "Mumbai", "IN", 19.0896, 72.8656),
    ("SYD", "Sydney", "AU", -33.9399, 151.1753),
    ("MEL", "Melbourne", "AU", -37.6690, 144.8410),
    ("AKL", "Auckland", "NZ", -37.0082, 174.7850),
];

/// Embedded directory of major airports.
#[derive(Debug, Clone)]
pub struct StaticAirportDirectory {
    airports: HashMap<&'static str, AirportInfo>,
}

impl StaticAirportDirectory {
    pub fn new() -> Self {
        let airports = AIRPORTS
            .iter()
            .map(|&(code, city, country, latitude, longitude)| {
                (
                    code,
                    AirportInfo {
                        city: city.to_string(),
                        country: country.to_string(),
                        latitude,
                        longitude,
                    },
                )
            })
            .collect();
        Self { airports }
    }

    /// Number of airports in the table.
    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}

impl Default for StaticAirportDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AirportDirectory for StaticAirportDirectory {
    async fn lookup(&self, iata: &str) -> Option<AirportInfo> {
        self.airports.get(iata.to_uppercase().as_str()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let directory = StaticAirportDirectory::new();

        let upper = directory.lookup("SFO").await.unwrap();
        let lower = directory.lookup("sfo").await.unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.city, "San Francisco");
    }

    #[tokio::test]
    async fn test_lookup_unknown_code() {
        let directory = StaticAirportDirectory::new();
        assert!(directory.lookup("XXQ").await.is_none());
    }

    #[tokio::test]
    async fn test_international_entries() {
        let directory = StaticAirportDirectory::new();
        let lhr = directory.lookup("LHR").await.unwrap();
        assert_eq!(lhr.country, "GB");
        assert!(lhr.longitude < 0.0);
    }
}
