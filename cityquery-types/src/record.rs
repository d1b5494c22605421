use geo::Point;
use serde::{Deserialize, Serialize};

/// Unique, immutable identifier of a geographic record.
pub type RecordId = u64;

/// A city record as handed over by ingestion.
///
/// Only the names and the coordinates are read by the indexes. Everything
/// else travels along untouched and is returned on hydration.
///
/// # Examples
///
/// ```
/// use cityquery_types::record::Record;
///
/// let city = Record::new(4887398, "Chicago", 41.85003, -87.65005)
///     .with_alternate_names(["Chi-town", "Chicago"])
///     .with_population(2_720_546);
///
/// let names: Vec<&str> = city.names().collect();
/// assert_eq!(names, vec!["Chicago", "Chi-town", "Chicago"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Primary display name
    pub name: String,
    /// ASCII transliteration of the primary name, when it differs
    #[serde(default)]
    pub ascii_name: Option<String>,
    #[serde(default)]
    pub alternate_names: Vec<String>,
    /// Latitude in degrees, [-90, 90]
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180]
    pub longitude: f64,
    /// ISO-3166 alpha-2 country code
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub admin1_code: Option<String>,
    #[serde(default)]
    pub population: u64,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Record {
    /// Create a record with only the fields the indexes need.
    pub fn new(id: RecordId, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            name: name.into(),
            ascii_name: None,
            alternate_names: Vec::new(),
            latitude,
            longitude,
            country_code: None,
            admin1_code: None,
            population: 0,
            timezone: None,
        }
    }

    pub fn with_ascii_name(mut self, ascii_name: impl Into<String>) -> Self {
        self.ascii_name = Some(ascii_name.into());
        self
    }

    pub fn with_alternate_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternate_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = Some(code.into());
        self
    }

    pub fn with_admin1_code(mut self, code: impl Into<String>) -> Self {
        self.admin1_code = Some(code.into());
        self
    }

    pub fn with_population(mut self, population: u64) -> Self {
        self.population = population;
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// All names of the record: primary, ASCII, then alternates in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.ascii_name.as_deref())
            .chain(self.alternate_names.iter().map(String::as_str))
    }

    /// The record's location as a `geo` point (x = longitude, y = latitude).
    pub fn location(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_order() {
        let record = Record::new(1, "Beijing", 39.9075, 116.39723)
            .with_ascii_name("Beijing")
            .with_alternate_names(["北京市", "Peking"]);
        let names: Vec<&str> = record.names().collect();
        assert_eq!(names, vec!["Beijing", "Beijing", "北京市", "Peking"]);
    }

    #[test]
    fn test_location_axis_order() {
        let record = Record::new(1, "Quito", -0.22985, -78.52495);
        let location = record.location();
        assert_eq!(location.x(), -78.52495);
        assert_eq!(location.y(), -0.22985);
    }
}
