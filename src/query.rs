//! Query facade combining the indexes with record hydration.

use crate::compute::lexical::InvertedIndex;
use crate::compute::spatial::{GroupTag, Neighbor, RTree, SpatialIndex};
use crate::compute::transform::CoordinateTransform;
use crate::compute::validation::validate_coordinates;
use crate::config::Config;
use crate::error::{CityQueryError, Result};
use crate::store::RecordStore;
use cityquery_types::point::Point3d;
use cityquery_types::record::{Record, RecordId};
use log::warn;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;

/// Read-only query surface over a record store.
///
/// Built by [`CityQueryBuilder`](crate::CityQueryBuilder). Borrows the store
/// and owns both indexes; every method takes `&self`, so a single instance
/// can serve concurrent readers.
///
/// Identifiers returned by an index but missing from the store are skipped
/// with a warning, or reported as [`CityQueryError::Inconsistent`] when
/// [`Config::strict_hydration`] is set.
pub struct CityQuery<'s, S: RecordStore + ?Sized, I: SpatialIndex = RTree> {
    store: &'s S,
    lexicon: InvertedIndex,
    spatial: I,
    countries: FxHashMap<Box<str>, GroupTag>,
    transform: CoordinateTransform,
    config: Config,
}

impl<'s, S: RecordStore + ?Sized, I: SpatialIndex> CityQuery<'s, S, I> {
    pub(crate) fn from_parts(
        store: &'s S,
        lexicon: InvertedIndex,
        spatial: I,
        countries: FxHashMap<Box<str>, GroupTag>,
        config: Config,
    ) -> Self {
        Self {
            store,
            lexicon,
            spatial,
            countries,
            transform: CoordinateTransform::new(config.sphere_radius_km),
            config,
        }
    }

    /// Records with a name containing `word` as a whole token,
    /// case-insensitively.
    ///
    /// Ordered by population (largest first), then identifier. An unknown word
    /// gives an empty result.
    pub fn lexical_query(&self, word: &str) -> Result<Vec<Record>> {
        let ids = self.lexicon.query(word);
        self.hydrate_by_population(ids.iter().copied())
    }

    /// Records whose names contain every word of `phrase`, ordered like
    /// [`lexical_query`](Self::lexical_query).
    pub fn lexical_query_all(&self, phrase: &str) -> Result<Vec<Record>> {
        let ids = self.lexicon.query_all(phrase);
        self.hydrate_by_population(ids)
    }

    /// Up to `k` records closest to `(latitude, longitude)` by great-circle
    /// distance, nearest first. Equal distances are ordered by identifier.
    ///
    /// `k == 0` returns an empty list.
    pub fn nearest_query(&self, latitude: f64, longitude: f64, k: usize) -> Result<Vec<Record>> {
        let neighbors = self.search(latitude, longitude, k, |point| self.spatial.k_nearest(point, k))?;
        Ok(self.hydrate(neighbors)?.into_iter().map(|(record, _)| record).collect())
    }

    /// Like [`nearest_query`](Self::nearest_query), paired with the
    /// great-circle distance in kilometres.
    pub fn nearest_with_distance(
        &self,
        latitude: f64,
        longitude: f64,
        k: usize,
    ) -> Result<Vec<(Record, f64)>> {
        let neighbors = self.search(latitude, longitude, k, |point| self.spatial.k_nearest(point, k))?;
        self.hydrate(neighbors)
    }

    /// Up to `k` records nearest to the record `id`, excluding the record
    /// itself.
    pub fn neighbors_of(&self, id: RecordId, k: usize) -> Result<Vec<(Record, f64)>> {
        let record = self
            .store
            .get(id)?
            .ok_or(CityQueryError::RecordNotFound(id))?;
        let neighbors = self.search(record.latitude, record.longitude, k, |point| {
            self.spatial.k_nearest_where(point, k, &|other| other != id)
        })?;
        self.hydrate(neighbors)
    }

    /// Up to `k` records of `country_code` nearest to `(latitude, longitude)`.
    ///
    /// Country codes compare case-insensitively. Records without a country
    /// code never match. Parts of the index holding no record of the country
    /// are not searched.
    pub fn nearest_in_country(
        &self,
        latitude: f64,
        longitude: f64,
        k: usize,
        country_code: &str,
    ) -> Result<Vec<(Record, f64)>> {
        let tag = self.countries.get(country_code.to_ascii_uppercase().as_str()).copied();
        let neighbors = self.search(latitude, longitude, k, |point| match tag {
            Some(tag) => self.spatial.k_nearest_in_group(point, k, tag),
            None => Ok(Vec::new()),
        })?;
        self.hydrate(neighbors)
    }

    /// Number of records in the indexes.
    pub fn len(&self) -> usize {
        self.spatial.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spatial.is_empty()
    }

    pub fn inverted_index(&self) -> &InvertedIndex {
        &self.lexicon
    }

    pub fn spatial_index(&self) -> &I {
        &self.spatial
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// Validates the input, hands the projected point to `run` and converts
    /// chord lengths to arc lengths. `run` is skipped when `k == 0`.
    fn search<F>(&self, latitude: f64, longitude: f64, k: usize, run: F) -> Result<Vec<(RecordId, f64)>>
    where
        F: FnOnce(&Point3d) -> Result<Vec<Neighbor>>,
    {
        validate_coordinates(latitude, longitude)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let point = self.transform.to_cartesian(latitude, longitude);
        let neighbors = run(&point)?;
        Ok(neighbors
            .into_iter()
            .map(|Neighbor { id, distance }| (id, self.transform.chord_to_arc(distance)))
            .collect())
    }

    fn hydrate_by_population<T>(&self, ids: T) -> Result<Vec<Record>>
    where
        T: IntoIterator<Item = RecordId>,
    {
        let mut records: Vec<Record> = self
            .hydrate(ids.into_iter().map(|id| (id, ())))?
            .into_iter()
            .map(|(record, ())| record)
            .collect();
        records.sort_by_key(|r| (Reverse(r.population), r.id));
        Ok(records)
    }

    /// Look every hit up in the store, keeping the input order.
    fn hydrate<T>(&self, hits: impl IntoIterator<Item = (RecordId, T)>) -> Result<Vec<(Record, T)>> {
        let hits = hits.into_iter();
        let mut records = Vec::with_capacity(hits.size_hint().0);
        let mut missing = Vec::new();

        for (id, extra) in hits {
            match self.store.get(id)? {
                Some(record) => records.push((record, extra)),
                None => missing.push(id),
            }
        }

        if !missing.is_empty() {
            if self.config.strict_hydration {
                return Err(CityQueryError::Inconsistent { missing });
            }
            warn!(
                "Skipping {} indexed record(s) missing from the store: {:?}",
                missing.len(),
                missing
            );
        }
        Ok(records)
    }
}
