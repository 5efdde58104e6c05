//! Address suggestions for origin/destination autocomplete

use crate::{GeocodingError, RoutePoint};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default number of suggestions returned for a query
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

/// A ranked autocomplete match
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "use-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddressSuggestion {
    /// Display name ("Parque Berrío, Medellín, Colombia")
    pub name: String,
    pub point: RoutePoint,
}

/// Source of address suggestions for a partial query
pub trait AddressSuggestionProvider {
    /// Ranked matches for `query`; an empty list when nothing matches
    fn suggest(&self, query: &str) -> Result<Vec<AddressSuggestion>, GeocodingError>;
}

#[derive(Deserialize)]
struct GeocodingDocument {
    #[serde(default)]
    features: Vec<GeocodingFeature>,
}

#[derive(Deserialize)]
struct GeocodingFeature {
    place_name: Option<String>,
    text: Option<String>,
    geometry: Option<PointGeometry>,
    center: Option<[f64; 2]>,
}

#[derive(Deserialize)]
struct PointGeometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

/// Parse a geocoding FeatureCollection into suggestions, keeping the provider's order
///
/// Uses `place_name` (falling back to `text`) and the Point geometry (falling back
/// to `center`). Features without a usable name or coordinate are skipped.
pub fn parse_geocoding_response(json: &str) -> Result<Vec<AddressSuggestion>, GeocodingError> {
    let document: GeocodingDocument = serde_json::from_str(json)?;

    let suggestions = document
        .features
        .into_iter()
        .filter_map(|feature| {
            let name = feature.place_name.or(feature.text)?;
            let point = match feature.geometry.as_ref().map(|g| g.coordinates.as_slice()) {
                Some([lon, lat, ..]) => RoutePoint::new(*lon, *lat),
                _ => RoutePoint::from(feature.center?),
            };
            if !point.is_valid() {
                tracing::debug!("Skipping suggestion {:?} with invalid coordinate", name);
                return None;
            }
            Some(AddressSuggestion { name, point })
        })
        .collect();

    Ok(suggestions)
}

/// In-memory gazetteer with case-insensitive substring matching
#[derive(Clone, Debug, Default)]
pub struct StaticSuggestionProvider {
    entries: Vec<AddressSuggestion>,
    limit: usize,
}

impl StaticSuggestionProvider {
    pub fn new(entries: Vec<AddressSuggestion>) -> Self {
        Self {
            entries,
            limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }

    /// Load entries from a geocoding FeatureCollection document
    pub fn from_geojson(json: &str) -> Result<Self, GeocodingError> {
        Ok(Self::new(parse_geocoding_response(json)?))
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AddressSuggestionProvider for StaticSuggestionProvider {
    fn suggest(&self, query: &str) -> Result<Vec<AddressSuggestion>, GeocodingError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        // Prefix matches rank ahead of matches elsewhere in the name
        let mut matches: Vec<(bool, &AddressSuggestion)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let name = entry.name.to_lowercase();
                name.find(&needle).map(|at| (at != 0, entry))
            })
            .collect();
        matches.sort_by_key(|(not_prefix, _)| *not_prefix);

        Ok(matches
            .into_iter()
            .take(self.limit)
            .map(|(_, entry)| entry.clone())
            .collect())
    }
}

/// Debounces bursts of keystrokes so only the last query reaches the provider
///
/// Clones share the same sequence, so one debouncer can be handed to every
/// input field of a form.
#[derive(Clone, Debug)]
pub struct SuggestionDebouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl Default for SuggestionDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

impl SuggestionDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wait out the debounce delay, then query `provider` unless a newer call arrived
    ///
    /// Returns `None` when this query was superseded.
    pub async fn suggest<P>(
        &self,
        provider: &P,
        query: &str,
    ) -> Option<Result<Vec<AddressSuggestion>, GeocodingError>>
    where
        P: AddressSuggestionProvider + ?Sized,
    {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;

        if self.latest.load(Ordering::SeqCst) != ticket {
            tracing::trace!("Query {:?} superseded", query);
            return None;
        }
        Some(provider.suggest(query))
    }
}
