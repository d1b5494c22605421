//! Builder for the query facade
//!
//! Reads one snapshot of the record store, validates it and builds the
//! lexical and spatial indexes. This is the only place indexes are written.

use crate::compute::lexical::InvertedIndex;
use crate::compute::spatial::{GroupTag, RTree, SpatialIndex};
use crate::compute::transform::CoordinateTransform;
use crate::compute::validation::validate_record;
use crate::config::Config;
use crate::error::{CityQueryError, Result};
use crate::query::CityQuery;
use crate::store::RecordStore;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
#[cfg(feature = "snapshot")]
use std::path::PathBuf;

/// Builder for [`CityQuery`] with optional config and a preloaded lexical index.
#[derive(Debug, Default)]
pub struct CityQueryBuilder {
    config: Config,
    lexicon: Option<InvertedIndex>,
    #[cfg(feature = "snapshot")]
    snapshot_path: Option<PathBuf>,
}

impl CityQueryBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the index configuration (node capacities, sphere radius, hydration mode).
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use an already built lexical index instead of tokenizing the store.
    ///
    /// The spatial index is still built from the store.
    pub fn inverted_index(mut self, lexicon: InvertedIndex) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    /// Load the lexical index from a snapshot file written by
    /// [`write_snapshot_file`](crate::persistence::write_snapshot_file).
    #[cfg(feature = "snapshot")]
    pub fn snapshot_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Build with the default [`RTree`] spatial index.
    pub fn build<S: RecordStore + ?Sized>(self, store: &S) -> Result<CityQuery<'_, S>> {
        self.build_with_index::<S, RTree>(store)
    }

    /// Build with any [`SpatialIndex`] implementation.
    pub fn build_with_index<S, I>(self, store: &S) -> Result<CityQuery<'_, S, I>>
    where
        S: RecordStore + ?Sized,
        I: SpatialIndex,
    {
        self.config.validate()?;
        let records = store.all()?;

        let mut seen = FxHashSet::default();
        for record in &records {
            validate_record(record)?;
            if !seen.insert(record.id) {
                return Err(CityQueryError::DuplicateRecord(record.id));
            }
        }

        let lexicon = match self.lexicon {
            Some(lexicon) => lexicon,
            None => self.load_or_build_lexicon(&records)?,
        };

        let transform = CoordinateTransform::new(self.config.sphere_radius_km);
        let mut spatial = I::with_config(&self.config)?;
        let mut countries = FxHashMap::default();
        for record in &records {
            let group = match &record.country_code {
                Some(code) => Some(intern_country(&mut countries, code)?),
                None => None,
            };
            let point = transform.to_cartesian(record.latitude, record.longitude);
            spatial.insert_grouped(record.id, point, group);
        }

        debug!(
            "Built indexes for {} records ({} distinct tokens, {} countries)",
            records.len(),
            lexicon.len(),
            countries.len()
        );

        Ok(CityQuery::from_parts(store, lexicon, spatial, countries, self.config))
    }

    #[cfg(feature = "snapshot")]
    fn load_or_build_lexicon(&self, records: &[cityquery_types::record::Record]) -> Result<InvertedIndex> {
        match &self.snapshot_path {
            Some(path) => crate::persistence::read_snapshot_file(path),
            None => Ok(InvertedIndex::build(records)),
        }
    }

    #[cfg(not(feature = "snapshot"))]
    fn load_or_build_lexicon(&self, records: &[cityquery_types::record::Record]) -> Result<InvertedIndex> {
        Ok(InvertedIndex::build(records))
    }
}

/// Tag for an upper-cased country code, assigning the next free one on first
/// sight.
fn intern_country(tags: &mut FxHashMap<Box<str>, GroupTag>, code: &str) -> Result<GroupTag> {
    let code = code.to_ascii_uppercase();
    if let Some(&tag) = tags.get(code.as_str()) {
        return Ok(tag);
    }

    let tag = GroupTag::try_from(tags.len()).map_err(|_| {
        CityQueryError::InvalidInput(format!(
            "Too many distinct country codes, at most {} are supported",
            usize::from(GroupTag::MAX) + 1
        ))
    })?;
    tags.insert(code.into_boxed_str(), tag);
    Ok(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::spatial::RStarIndex;
    use crate::store::MemoryRecordStore;
    use cityquery_types::record::Record;

    #[test]
    fn test_builder_default() {
        let builder = CityQueryBuilder::new();
        assert_eq!(builder.config, Config::default());
        assert!(builder.lexicon.is_none());
    }

    #[test]
    fn test_build_empty_store() {
        let store = MemoryRecordStore::new();
        let query = CityQueryBuilder::new().build(&store).unwrap();
        assert!(query.is_empty());
        assert!(query.nearest_query(0.0, 0.0, 3).unwrap().is_empty());
        assert!(query.lexical_query("anything").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_record_rejected() {
        let store: MemoryRecordStore = [
            Record::new(1, "Fine", 10.0, 10.0),
            Record::new(2, "Broken", 10.0, 181.0),
        ]
        .into_iter()
        .collect();
        let err = CityQueryBuilder::new().build(&store).err().unwrap();
        assert!(matches!(err, CityQueryError::InvalidInput(_)));
        assert!(err.to_string().contains("Record 2"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let store = MemoryRecordStore::new();
        let config = Config::default().with_sphere_radius_km(-1.0);
        let err = CityQueryBuilder::new().config(config).build(&store).err().unwrap();
        assert!(matches!(err, CityQueryError::InvalidInput(_)));
    }

    #[test]
    fn test_build_with_rstar_index() {
        let store = MemoryRecordStore::from_records([
            Record::new(1, "Oslo", 59.91273, 10.74609),
            Record::new(2, "Bergen", 60.39299, 5.32415),
        ])
        .unwrap();
        let query = CityQueryBuilder::new()
            .build_with_index::<_, RStarIndex>(&store)
            .unwrap();
        assert_eq!(query.len(), 2);
        let nearest = query.nearest_query(60.0, 6.0, 1).unwrap();
        assert_eq!(nearest[0].id, 2);
    }

    #[test]
    fn test_custom_capacity_reaches_tree() {
        let store: MemoryRecordStore = (0..100u64)
            .map(|i| Record::new(i, format!("City {i}"), (i as f64) - 50.0, (i as f64) * 3.0 - 150.0))
            .collect();
        let config = Config::default().with_node_capacity(2, 4);
        let query = CityQueryBuilder::new().config(config).build(&store).unwrap();
        assert!(query.spatial_index().height() >= 4);
    }

    #[test]
    fn test_invalid_capacity_rejected_before_indexing() {
        let store = MemoryRecordStore::from_records([Record::new(1, "Solo", 0.0, 0.0)]).unwrap();
        let config = Config {
            min_node_entries: 1,
            ..Config::default()
        };
        let err = CityQueryBuilder::new().config(config).build(&store).err().unwrap();
        assert!(matches!(err, CityQueryError::InvalidInput(_)));
    }

    #[test]
    fn test_country_codes_interned_case_insensitively() {
        let mut tags = FxHashMap::default();
        assert_eq!(intern_country(&mut tags, "us").unwrap(), 0);
        assert_eq!(intern_country(&mut tags, "FR").unwrap(), 1);
        assert_eq!(intern_country(&mut tags, "Us").unwrap(), 0);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get("US"), Some(&0));
    }

    #[test]
    fn test_country_tag_space_exhausted() {
        let mut tags: FxHashMap<Box<str>, GroupTag> = (0..=GroupTag::MAX)
            .map(|tag| (format!("C{tag}").into_boxed_str(), tag))
            .collect();
        assert_eq!(intern_country(&mut tags, "c7").unwrap(), 7);
        let err = intern_country(&mut tags, "NEW").unwrap_err();
        assert!(matches!(err, CityQueryError::InvalidInput(_)));
    }
}
