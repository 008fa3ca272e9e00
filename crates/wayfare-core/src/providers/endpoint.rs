//! Known provider endpoint labels.

use std::fmt;
use std::str::FromStr;

/// Logical provider calls whose responses are cached.
///
/// The cache itself accepts any label; this enum keeps callers from
/// misspelling the ones the application uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEndpoint {
    Locations,
    Hotels,
    Flights,
    PointsOfInterest,
    Gemini,
    Unsplash,
    GooglePlaces,
}

impl ProviderEndpoint {
    pub const ALL: [ProviderEndpoint; 7] = [
        ProviderEndpoint::Locations,
        ProviderEndpoint::Hotels,
        ProviderEndpoint::Flights,
        ProviderEndpoint::PointsOfInterest,
        ProviderEndpoint::Gemini,
        ProviderEndpoint::Unsplash,
        ProviderEndpoint::GooglePlaces,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEndpoint::Locations => "locations",
            ProviderEndpoint::Hotels => "hotels",
            ProviderEndpoint::Flights => "flights",
            ProviderEndpoint::PointsOfInterest => "poi",
            ProviderEndpoint::Gemini => "gemini",
            ProviderEndpoint::Unsplash => "unsplash",
            ProviderEndpoint::GooglePlaces => "google-places",
        }
    }
}

impl FromStr for ProviderEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderEndpoint::ALL
            .into_iter()
            .find(|e| e.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("unknown provider endpoint: {}", s))
    }
}

impl fmt::Display for ProviderEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
