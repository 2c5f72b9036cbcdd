//! Planar geometry helpers shared by every layer of the stack.
//!
//! All angles are integer degrees in the world frame: 0° points along +X and
//! angles grow counter-clockwise.  Positions and distances are integer
//! millimetres.

/// Normalise any angle into `[0, 360)`.
pub fn normalize_angle(angle: i32) -> i32 {
    angle.rem_euclid(360)
}

/// Euclidean distance between two points, truncated toward zero.
///
/// Truncation (not rounding) keeps the value consistent with the `<` / `<=`
/// threshold comparisons made downstream.
pub fn distance(x1: i32, y1: i32, x2: i32, y2: i32) -> i32 {
    let dx = f64::from(x2) - f64::from(x1);
    let dy = f64::from(y2) - f64::from(y1);
    (dx * dx + dy * dy).sqrt() as i32
}

/// Signed turn in `(-180, 180]` that rotates `current` onto `target`.
///
/// Positive values are counter-clockwise (left) turns.  A turn of exactly
/// 180° is always reported as `+180`, i.e. a left turn.
pub fn shortest_turn(current: i32, target: i32) -> i32 {
    let diff = normalize_angle(target - current);
    if diff > 180 { diff - 360 } else { diff }
}

/// World bearing from `(from_x, from_y)` to `(to_x, to_y)`, rounded to the
/// nearest whole degree and normalised to `[0, 360)`.
///
/// Coincident points have bearing 0.
pub fn bearing(from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> i32 {
    let dx = f64::from(to_x) - f64::from(from_x);
    let dy = f64::from(to_y) - f64::from(from_y);
    if dx == 0.0 && dy == 0.0 {
        return 0;
    }
    normalize_angle(dy.atan2(dx).to_degrees().round() as i32)
}

/// Point reached by travelling `distance` mm from `(x, y)` along `bearing`.
///
/// Each component offset is truncated toward zero.
pub fn project(x: i32, y: i32, bearing: i32, distance: i32) -> (i32, i32) {
    let rad = f64::from(bearing).to_radians();
    let d = f64::from(distance);
    (x + (d * rad.cos()) as i32, y + (d * rad.sin()) as i32)
}
