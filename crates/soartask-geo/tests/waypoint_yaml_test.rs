use soartask_geo::{
    GeoPoint, Waypoint, WaypointDatabase, WaypointFlags, WaypointList, destination, distance,
};

const WAYPOINTS: &str = r#"
- { name: Innsbruck, code: LOWI, latitude: 47.2603, longitude: 11.3439, altitude: 578, flags: 9 }
- { name: Zugspitze, latitude: 47.4211, longitude: 10.9853 }
- { name: Reutte Hoefen, latitude: 47.4697, longitude: 10.6917, flags: 1 }
"#;

fn database() -> WaypointList {
    let waypoints: Vec<Waypoint> = serde_yaml::from_str(WAYPOINTS).expect("parse waypoints");
    WaypointList::new(waypoints)
}

#[test]
fn yaml_waypoints_keep_flags_and_defaults() {
    let list = database();
    assert_eq!(list.len(), 3);

    let innsbruck = list.get(0).expect("innsbruck");
    assert_eq!(innsbruck.code, "LOWI");
    assert!(innsbruck.flags.contains(WaypointFlags::HOME));
    assert!(innsbruck.flags.is_landable());

    let zugspitze = list.get(1).expect("zugspitze");
    assert_eq!(zugspitze.altitude, 0.0);
    assert!(!zugspitze.flags.is_landable());
}

#[test]
fn lookup_by_name_and_identity() {
    let list = database();
    assert_eq!(list.position_by_name("zugspitze"), Some(1));

    let moved = Waypoint::new("Zugspitze", 47.43, 10.9853);
    assert_eq!(list.find_matching(&moved), None);
    assert_eq!(list.find_or_add(moved), 3);
    assert_eq!(list.len(), 4);
}

#[test]
fn nearest_landable_uses_great_circle_distance() {
    let list = database();
    let near_reutte = destination(GeoPoint::new(47.4697, 10.6917), 90.0, 2_000.0);
    assert_eq!(list.nearest_landable(near_reutte), Some(2));

    let reutte = list.location(2).expect("reutte");
    assert!((distance(reutte, near_reutte) - 2_000.0).abs() < 0.01);
}
