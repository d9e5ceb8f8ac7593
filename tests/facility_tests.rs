//! Facility selection tests

mod fixtures;

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use fixtures::*;
use zone_assigner::facility::{select_facility, FacilityIndex, FacilityOptions, Neighbors, SampleColumn};

fn neighbors(pairs: &[(&str, &[&str])]) -> Neighbors {
    pairs
        .iter()
        .map(|(zone, adjacent)| (fixtures::zone(zone), zones(adjacent)))
        .collect()
}

#[test]
fn test_neighbor_zone_fallback() {
    let index = FacilityIndex::new(vec![
        facility("home_a", "A", &["home"], None),
        facility("office_b", "B", &["work"], Some(200.0)),
        facility("office_c", "C", &["work"], Some(200.0)),
    ]);
    let adjacency = neighbors(&[("A", &["B"]), ("B", &["A", "C"])]);
    let mut rng = StdRng::seed_from_u64(0);

    for _ in 0..20 {
        let choice = select_facility(
            "work",
            Some(&zone("A")),
            &index,
            &FacilityOptions::default(),
            Some(&adjacency),
            &mut rng,
        )
        .unwrap();
        assert_eq!(choice.id, "office_b");
    }
}

#[test]
fn test_destination_zone_preferred_over_neighbors() {
    let index = FacilityIndex::new(vec![
        facility("near", "A", &["shop"], None),
        facility("neighbor", "B", &["shop"], None),
    ]);
    let adjacency = neighbors(&[("A", &["B"])]);
    let mut rng = StdRng::seed_from_u64(1);

    for _ in 0..20 {
        let choice = select_facility(
            "shop",
            Some(&zone("A")),
            &index,
            &FacilityOptions::default(),
            Some(&adjacency),
            &mut rng,
        )
        .unwrap();
        assert_eq!(choice.id, "near");
    }
}

#[test]
fn test_neighbors_tried_before_fallback_type() {
    let index = FacilityIndex::new(vec![
        facility("school_a", "A", &["education"], None),
        facility("uni_b", "B", &["education_university"], None),
    ]);
    let adjacency = neighbors(&[("A", &["B"])]);
    let options = FacilityOptions {
        fallback_type: Some("education".to_string()),
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(2);

    let with_neighbors = select_facility(
        "education_university",
        Some(&zone("A")),
        &index,
        &options,
        Some(&adjacency),
        &mut rng,
    )
    .unwrap();
    assert_eq!(with_neighbors.id, "uni_b");

    let without_neighbors =
        select_facility("education_university", Some(&zone("A")), &index, &options, None, &mut rng).unwrap();
    assert_eq!(without_neighbors.id, "school_a");
}

#[test]
fn test_no_match_without_fallbacks_is_none() {
    let index = FacilityIndex::new(vec![facility("pub", "A", &["leisure"], None)]);
    let mut rng = StdRng::seed_from_u64(3);
    let choice = select_facility(
        "shop",
        Some(&zone("A")),
        &index,
        &FacilityOptions::default(),
        Some(&Neighbors::new()),
        &mut rng,
    );
    assert!(choice.is_none());
}

#[test]
fn test_floor_area_sampling_distribution() {
    let index = FacilityIndex::new(vec![
        facility("small", "A", &["work"], Some(25.0)),
        facility("large", "A", &["work"], Some(75.0)),
    ]);
    let options = FacilityOptions {
        sample_col: Some(SampleColumn::FloorArea),
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(4);

    let trials = 10_000;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..trials {
        let choice = select_facility("work", Some(&zone("A")), &index, &options, None, &mut rng).unwrap();
        *counts.entry(choice.id).or_default() += 1;
    }
    let large = counts["large"] as f64 / trials as f64;
    assert!((large - 0.75).abs() < 0.03, "large share {large}");
}

#[test]
fn test_missing_floor_area_samples_uniformly() {
    let index = FacilityIndex::new(vec![
        facility("a", "A", &["work"], None),
        facility("b", "A", &["work"], None),
    ]);
    let options = FacilityOptions {
        sample_col: Some(SampleColumn::FloorArea),
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(5);

    let mut seen_a = false;
    let mut seen_b = false;
    for _ in 0..200 {
        let choice = select_facility("work", Some(&zone("A")), &index, &options, None, &mut rng).unwrap();
        seen_a |= choice.id == "a";
        seen_b |= choice.id == "b";
    }
    assert!(seen_a && seen_b);
}
