//! Sampled properties of the projection and the nearest-neighbor search.

use cityquery::prelude::*;
use cityquery::{CoordinateTransform, great_circle_distance_km};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_coordinate(rng: &mut StdRng) -> (f64, f64) {
    (rng.gen_range(-90.0..=90.0), rng.gen_range(-180.0..=180.0))
}

fn random_store(n: u64, seed: u64) -> MemoryRecordStore {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|id| {
            let (lat, lon) = random_coordinate(&mut rng);
            Record::new(id, format!("Place {id}"), lat, lon)
        })
        .collect()
}

#[test]
fn test_euclidean_order_matches_great_circle_order() {
    let transform = CoordinateTransform::default();
    let mut rng = StdRng::seed_from_u64(2024);

    for _ in 0..5_000 {
        let a = random_coordinate(&mut rng);
        let b = random_coordinate(&mut rng);
        let c = random_coordinate(&mut rng);

        let pa = transform.to_cartesian(a.0, a.1);
        let chord_ab = pa.distance_3d(&transform.to_cartesian(b.0, b.1));
        let chord_ac = pa.distance_3d(&transform.to_cartesian(c.0, c.1));
        let arc_ab = great_circle_distance_km(a.0, a.1, b.0, b.1);
        let arc_ac = great_circle_distance_km(a.0, a.1, c.0, c.1);

        // Skip near-ties where rounding decides.
        if (arc_ab - arc_ac).abs() < 1e-6 {
            continue;
        }
        assert_eq!(chord_ab < chord_ac, arc_ab < arc_ac, "{a:?} {b:?} {c:?}");
    }
}

#[test]
fn test_every_record_is_its_own_nearest() {
    let store = random_store(1_000, 1);
    let query = CityQueryBuilder::new().build(&store).unwrap();

    for record in store.iter().step_by(7) {
        let found = query.nearest_with_distance(record.latitude, record.longitude, 1).unwrap();
        assert_eq!(found[0].0.id, record.id);
        assert!(found[0].1 < 1e-6);
    }
}

#[test]
fn test_nearest_matches_exhaustive_scan() {
    let store = random_store(3_000, 2);
    let query = CityQueryBuilder::new().build(&store).unwrap();
    let transform = *query.transform();
    let mut rng = StdRng::seed_from_u64(3);

    for _ in 0..40 {
        let (lat, lon) = random_coordinate(&mut rng);
        let k = rng.gen_range(1..=50);
        let target = transform.to_cartesian(lat, lon);

        let mut expected: Vec<(f64, RecordId)> = store
            .iter()
            .map(|r| (transform.to_cartesian(r.latitude, r.longitude).distance_squared(&target), r.id))
            .collect();
        expected.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
        let expected: Vec<RecordId> = expected.into_iter().take(k).map(|(_, id)| id).collect();

        let found: Vec<RecordId> = query.nearest_query(lat, lon, k).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(found, expected);
    }
}

#[test]
fn test_result_length_and_order() {
    let store = random_store(200, 4);
    let query = CityQueryBuilder::new().build(&store).unwrap();

    for k in [1, 10, 199, 200, 201, 10_000] {
        let found = query.nearest_with_distance(10.0, 20.0, k).unwrap();
        assert_eq!(found.len(), k.min(200));
        assert!(found.windows(2).all(|w| w[0].1 <= w[1].1));
    }
}

#[test]
fn test_rebuild_is_query_equivalent() {
    let store = random_store(2_000, 5);
    let first = CityQueryBuilder::new().build(&store).unwrap();
    let second = CityQueryBuilder::new().build(&store).unwrap();

    assert_eq!(first.spatial_index().stats(), second.spatial_index().stats());
    assert_eq!(first.inverted_index(), second.inverted_index());

    let mut rng = StdRng::seed_from_u64(6);
    for _ in 0..25 {
        let (lat, lon) = random_coordinate(&mut rng);
        assert_eq!(
            first.nearest_query(lat, lon, 15).unwrap(),
            second.nearest_query(lat, lon, 15).unwrap()
        );
    }
}

#[test]
fn test_country_filter_matches_filtered_scan() {
    let mut rng = StdRng::seed_from_u64(8);
    let codes = ["US", "FR", "JP"];
    let store: MemoryRecordStore = (0..1_500u64)
        .map(|id| {
            let (lat, lon) = random_coordinate(&mut rng);
            Record::new(id, format!("Place {id}"), lat, lon).with_country_code(codes[(id % 3) as usize])
        })
        .collect();
    let query = CityQueryBuilder::new().build(&store).unwrap();

    let found = query.nearest_in_country(35.0, 139.0, 10, "jp").unwrap();
    assert_eq!(found.len(), 10);
    assert!(found.iter().all(|(r, _)| r.country_code.as_deref() == Some("JP")));

    let unfiltered = query.nearest_with_distance(35.0, 139.0, 1_500).unwrap();
    let expected: Vec<RecordId> = unfiltered
        .iter()
        .filter(|(r, _)| r.id % 3 == 2)
        .take(10)
        .map(|(r, _)| r.id)
        .collect();
    let found: Vec<RecordId> = found.iter().map(|(r, _)| r.id).collect();
    assert_eq!(found, expected);
}
