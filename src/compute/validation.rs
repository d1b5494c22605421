//! Validation for geographic coordinates and records.

use crate::error::{CityQueryError, Result};
use cityquery_types::record::Record;

/// Validates a latitude/longitude pair in degrees.
///
/// Latitude: [-90.0, 90.0], Longitude: [-180.0, 180.0]
///
/// # Examples
///
/// ```
/// use cityquery::compute::validation::validate_coordinates;
///
/// assert!(validate_coordinates(40.7128, -74.0060).is_ok());
/// assert!(validate_coordinates(95.0, -74.0).is_err());
/// assert!(validate_coordinates(40.0, 200.0).is_err());
/// assert!(validate_coordinates(f64::NAN, 0.0).is_err());
/// ```
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() {
        return Err(CityQueryError::InvalidInput(format!(
            "Latitude must be finite, got: {}",
            latitude
        )));
    }

    if !longitude.is_finite() {
        return Err(CityQueryError::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            longitude
        )));
    }

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(CityQueryError::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            latitude
        )));
    }

    if !(-180.0..=180.0).contains(&longitude) {
        return Err(CityQueryError::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            longitude
        )));
    }

    Ok(())
}

/// Validates a record before it is accepted into the indexes.
pub fn validate_record(record: &Record) -> Result<()> {
    validate_coordinates(record.latitude, record.longitude)
        .map_err(|e| CityQueryError::InvalidInput(format!("Record {}: {}", record.id, e)))
}

/// Validates a neighbour count. Zero is never a meaningful request.
pub fn validate_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(CityQueryError::InvalidInput(
            "Number of neighbours must be at least 1".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_coordinates_accepted() {
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(validate_coordinates(-90.0, -180.0).is_ok());
        assert!(validate_coordinates(0.0, 0.0).is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(validate_coordinates(90.0001, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.0001).is_err());
        assert!(validate_coordinates(f64::INFINITY, 0.0).is_err());
        assert!(validate_coordinates(0.0, f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_record_error_names_identifier() {
        let record = Record::new(42, "Nowhere", 120.0, 0.0);
        let err = validate_record(&record).unwrap_err();
        assert!(err.to_string().contains("Record 42"));
    }

    #[test]
    fn test_validate_k() {
        assert!(validate_k(0).is_err());
        assert!(validate_k(1).is_ok());
    }
}
