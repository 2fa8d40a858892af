/*
[INPUT]:  Compass bearings in degrees
[OUTPUT]: Normalised bearings, bisectors and clockwise range tests
[POS]:    Geometry layer - angle utilities shared by zone and target code
[UPDATE]: When zone construction needs new angular helpers
*/

/// Normalise an angle to `[0, 360)`.
pub fn angle_limit_360(theta: f64) -> f64 {
    let limited = theta.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if limited >= 360.0 { 0.0 } else { limited }
}

/// Normalise an angle to `(-180, 180]`.
pub fn angle_limit_180(theta: f64) -> f64 {
    let limited = angle_limit_360(theta);
    if limited > 180.0 { limited - 360.0 } else { limited }
}

pub fn reciprocal(bearing: f64) -> f64 {
    angle_limit_360(bearing + 180.0)
}

/// Bearing that splits the angle between an inbound and an outbound leg,
/// pointing to the outside of the turn.
///
/// For a straight leg the result is perpendicular to the track.
pub fn bisector(inbound: f64, outbound: f64) -> f64 {
    let back = reciprocal(inbound);
    let outbound = angle_limit_360(outbound);

    if (back - outbound).abs() < f64::EPSILON {
        return reciprocal(back);
    }

    let mid = (back + outbound) / 2.0;
    if (back - outbound).abs() < 180.0 {
        reciprocal(mid)
    } else {
        angle_limit_360(mid)
    }
}

/// Bearing halfway along the clockwise arc from `start` to `finish`.
pub fn half_angle(start: f64, finish: f64) -> f64 {
    let start = angle_limit_360(start);
    let finish = angle_limit_360(finish);
    if finish >= start {
        (start + finish) / 2.0
    } else {
        angle_limit_360((start + finish + 360.0) / 2.0)
    }
}

/// True when `x` lies on the clockwise arc from `start` to `finish`
/// (both ends inclusive).
///
/// A raw span of 360 degrees or more covers the full circle, so the default
/// `0..360` radial range of a fresh turnpoint accepts every bearing.
pub fn angle_in_range(start: f64, finish: f64, x: f64) -> bool {
    if (finish - start).abs() >= 360.0 {
        return true;
    }

    let start = angle_limit_360(start);
    let finish = angle_limit_360(finish);
    let x = angle_limit_360(x);

    if finish < start {
        x >= start || x <= finish
    } else {
        x >= start && x <= finish
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(360.0, 0.0)]
    #[case(-90.0, 270.0)]
    #[case(725.0, 5.0)]
    #[case(-1e-15, 0.0)]
    fn limit_360_wraps(#[case] input: f64, #[case] expected: f64) {
        assert!(close(angle_limit_360(input), expected));
    }

    #[rstest]
    #[case(190.0, -170.0)]
    #[case(180.0, 180.0)]
    #[case(-45.0, -45.0)]
    fn limit_180_wraps(#[case] input: f64, #[case] expected: f64) {
        assert!(close(angle_limit_180(input), expected));
    }

    #[test]
    fn bisector_of_straight_leg_is_perpendicular() {
        assert!(close(bisector(0.0, 0.0), 90.0));
        assert!(close(bisector(90.0, 90.0), 180.0));
    }

    #[test]
    fn bisector_points_outside_turn() {
        // flying east then turning north: outside corner is south-east
        assert!(close(bisector(90.0, 0.0), 135.0));
        // flying north then turning east: outside corner is north-west
        assert!(close(bisector(0.0, 90.0), 315.0));
    }

    #[test]
    fn bisector_of_reversal_points_back_along_inbound() {
        assert!(close(bisector(0.0, 180.0), 0.0));
    }

    #[test]
    fn half_angle_spans_north() {
        assert!(close(half_angle(300.0, 60.0), 0.0));
        assert!(close(half_angle(10.0, 50.0), 30.0));
    }

    #[rstest]
    #[case(300.0, 60.0, 0.0, true)]
    #[case(300.0, 60.0, 350.0, true)]
    #[case(300.0, 60.0, 90.0, false)]
    #[case(10.0, 50.0, 50.0, true)]
    #[case(10.0, 50.0, 51.0, false)]
    #[case(0.0, 360.0, 181.0, true)]
    fn range_is_clockwise(
        #[case] start: f64,
        #[case] finish: f64,
        #[case] x: f64,
        #[case] inside: bool,
    ) {
        assert_eq!(angle_in_range(start, finish, x), inside);
    }
}
