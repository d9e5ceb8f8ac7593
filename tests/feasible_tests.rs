//! Feasible zone search tests
//!
//! Tolerance band, relaxation to the closest time, per-mode and per-period
//! partitioning, and supply filtering.

mod fixtures;

use fixtures::*;
use zone_assigner::estimate::EstimatedTimeModel;
use zone_assigner::feasible::{find_feasible_zones, FeasibleOptions};
use zone_assigner::model::{ActivityColumn, ActivityId, Mode};
use zone_assigner::supply::ZoneSupply;
use zone_assigner::traits::TravelTimeMatrixProvider;
use zone_assigner::travel_time::{TravelTimeKey, TravelTimes};
use zone_assigner::Error;

fn options(tolerance: f64) -> FeasibleOptions {
    FeasibleOptions {
        time_tolerance: tolerance,
        ..Default::default()
    }
}

// ============================================================================
// Tolerance and relaxation
// ============================================================================

#[test]
fn test_non_empty_whenever_an_origin_edge_exists() {
    let times = car_times("O", &[("A", 3.0), ("B", 90.0)]);
    let activities: Vec<_> = [1.0, 20.0, 45.0, 300.0]
        .iter()
        .enumerate()
        .map(|(i, minutes)| TestActivity::new(i as u64).duration(*minutes).build())
        .collect();

    let result = find_feasible_zones(&activities, &times, &ZoneSupply::default(), &options(0.0)).unwrap();

    assert_eq!(result.len(), activities.len());
    for candidates in result.values() {
        assert_eq!(candidates[&zone("O")].len(), 1, "relaxation keeps exactly one zone");
    }
    assert_eq!(result[&ActivityId(0)][&zone("O")], zones(&["A"]));
    assert_eq!(result[&ActivityId(3)][&zone("O")], zones(&["B"]));
}

#[test]
fn test_widening_tolerance_never_shrinks_candidates() {
    let times = car_times(
        "O",
        &[("A", 10.0), ("B", 14.0), ("C", 18.0), ("D", 20.0), ("E", 25.0), ("F", 31.0)],
    );
    let activity = TestActivity::new(1).duration(20.0).build();

    let mut previous: Vec<_> = Vec::new();
    for tolerance in [0.0, 0.1, 0.2, 0.3, 0.5, 0.9] {
        let result = find_feasible_zones(
            std::slice::from_ref(&activity),
            &times,
            &ZoneSupply::default(),
            &options(tolerance),
        )
        .unwrap();
        let current = result[&ActivityId(1)][&zone("O")].clone();
        assert!(
            previous.iter().all(|z| current.contains(z)),
            "tolerance {tolerance} dropped a zone: {previous:?} -> {current:?}"
        );
        previous = current;
    }
    assert_eq!(previous, zones(&["A", "B", "C", "D", "E", "F"]));
}

#[test]
fn test_unreachable_origin_yields_empty_list() {
    let times = car_times("O", &[("A", 10.0)]);
    let activity = TestActivity::new(1).from_zone("nowhere").build();
    let result = find_feasible_zones(&[activity], &times, &ZoneSupply::default(), &options(0.2)).unwrap();
    assert!(result[&ActivityId(1)][&zone("nowhere")].is_empty());
}

#[test]
fn test_rejects_tolerance_outside_unit_interval() {
    let times = car_times("O", &[("A", 10.0)]);
    let activity = TestActivity::new(1).build();
    for tolerance in [-0.1, 1.0, 2.0] {
        let err = find_feasible_zones(
            std::slice::from_ref(&activity),
            &times,
            &ZoneSupply::default(),
            &options(tolerance),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTolerance(_)));
    }
}

// ============================================================================
// Partitioning by mode and period
// ============================================================================

#[test]
fn test_modes_only_see_their_own_edges() {
    let times = TravelTimes::new(vec![
        edge("O", "CAR_ZONE", "car", 20.0),
        edge("O", "WALK_ZONE", "walk", 20.0),
        edge("O", "CYCLE_ZONE", "cycle", 20.0),
    ]);
    let activities = vec![
        TestActivity::new(1).mode("car").build(),
        TestActivity::new(2).mode("walk").build(),
        TestActivity::new(3).mode("cycle").build(),
        TestActivity::new(4).mode("taxi").build(),
    ];

    let result = find_feasible_zones(&activities, &times, &ZoneSupply::default(), &options(0.2)).unwrap();

    assert_eq!(result[&ActivityId(1)][&zone("O")], zones(&["CAR_ZONE"]));
    assert_eq!(result[&ActivityId(2)][&zone("O")], zones(&["WALK_ZONE"]));
    assert_eq!(result[&ActivityId(3)][&zone("O")], zones(&["CYCLE_ZONE"]));
    assert!(result[&ActivityId(4)][&zone("O")].is_empty());
}

#[test]
fn test_public_transport_uses_time_of_day_and_day_type() {
    let times = TravelTimes::new(vec![
        edge("O", "MORNING", "pt_wkday_morning", 30.0),
        edge("O", "EVENING", "pt_wkday_evening", 30.0),
        edge("O", "WEEKEND", "pt_wkend_morning", 30.0),
    ]);
    let activities = vec![
        TestActivity::new(1).mode("pt").duration(30.0).starts_at(8.0 * 60.0, 2).build(),
        TestActivity::new(2).mode("pt").duration(30.0).starts_at(19.0 * 60.0, 4).build(),
        TestActivity::new(3).mode("pt").duration(30.0).starts_at(9.0 * 60.0, 6).build(),
    ];

    let result = find_feasible_zones(&activities, &times, &ZoneSupply::default(), &options(0.2)).unwrap();

    assert_eq!(result[&ActivityId(1)][&zone("O")], zones(&["MORNING"]));
    assert_eq!(result[&ActivityId(2)][&zone("O")], zones(&["EVENING"]));
    assert_eq!(result[&ActivityId(3)][&zone("O")], zones(&["WEEKEND"]));
}

#[test]
fn test_partitioning_matches_single_lookup() {
    // the same activities give the same zones whether searched together or one by one
    let model = EstimatedTimeModel::default();
    let centroids = centroids();
    let mut times = TravelTimes::default();
    for mode in [Mode::Car, Mode::Walk, Mode::Pt] {
        times.extend(model.travel_times(&centroids, &TravelTimeKey::mode(mode)).unwrap());
    }
    let origin = CITY_CENTRE[0].code;
    let activities = vec![
        TestActivity::new(1).mode("car").duration(6.0).from_zone(origin).build(),
        TestActivity::new(2).mode("walk").duration(24.0).from_zone(origin).build(),
        TestActivity::new(3).mode("pt").duration(8.0).from_zone(origin).build(),
        TestActivity::new(4).mode("car").duration(30.0).from_zone(origin).build(),
    ];

    let together = find_feasible_zones(&activities, &times, &ZoneSupply::default(), &options(0.2)).unwrap();
    for activity in &activities {
        let alone = find_feasible_zones(
            std::slice::from_ref(activity),
            &times,
            &ZoneSupply::default(),
            &options(0.2),
        )
        .unwrap();
        assert_eq!(together[&activity.id], alone[&activity.id]);
    }

    // 2 km by car at 20 km/h is 6 minutes: both direct neighbours, not the diagonal
    assert_eq!(
        together[&ActivityId(1)][&zone(origin)],
        zones(&[CITY_CENTRE[1].code, CITY_CENTRE[2].code])
    );
}

// ============================================================================
// Supply filtering
// ============================================================================

#[test]
fn test_filter_by_activity_restricts_to_supplying_zones() {
    let times = car_times("O", &[("A", 20.0), ("B", 20.0), ("C", 60.0)]);
    let supply = supply(vec![
        supply_row("B", "education_school", 1, 100.0),
        supply_row("C", "education_school", 1, 100.0),
    ]);
    let activity = TestActivity::new(1)
        .purpose("education")
        .category("education_school")
        .build();

    let filtered = FeasibleOptions {
        filter_by_activity: true,
        ..options(0.2)
    };
    let result = find_feasible_zones(std::slice::from_ref(&activity), &times, &supply, &filtered).unwrap();
    assert_eq!(result[&ActivityId(1)][&zone("O")], zones(&["B"]));

    // matching on purpose finds no supply rows, so nothing is reachable
    let by_purpose = FeasibleOptions {
        activity_col: ActivityColumn::Purpose,
        ..filtered
    };
    let result = find_feasible_zones(&[activity], &times, &supply, &by_purpose).unwrap();
    assert!(result[&ActivityId(1)][&zone("O")].is_empty());
}
