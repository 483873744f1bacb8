use std::fmt;

/// 2D point with componentwise arithmetic and lexicographic ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Point2 { x, y }
    }
}

/// 3D point. A 2D message stores one with `z == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Point3 { x, y, z }
    }

    pub fn xy(self) -> Point2 {
        Point2 { x: self.x, y: self.y }
    }
}

impl From<Point2> for Point3 {
    fn from(p: Point2) -> Self {
        Point3 { x: p.x, y: p.y, z: 0.0 }
    }
}

macro_rules! impl_point_ops {
    ($ty:ident, $($field:ident),+) => {
        impl std::ops::Add for $ty {
            type Output = $ty;
            fn add(self, rhs: $ty) -> $ty {
                $ty { $($field: self.$field + rhs.$field),+ }
            }
        }
        impl std::ops::Sub for $ty {
            type Output = $ty;
            fn sub(self, rhs: $ty) -> $ty {
                $ty { $($field: self.$field - rhs.$field),+ }
            }
        }
        impl std::ops::Mul<f32> for $ty {
            type Output = $ty;
            fn mul(self, factor: f32) -> $ty {
                $ty { $($field: self.$field * factor),+ }
            }
        }
        impl std::ops::Div<f32> for $ty {
            type Output = $ty;
            fn div(self, factor: f32) -> $ty {
                $ty { $($field: self.$field / factor),+ }
            }
        }
        impl std::ops::AddAssign for $ty {
            fn add_assign(&mut self, rhs: $ty) {
                $(self.$field += rhs.$field;)+
            }
        }
        impl std::ops::SubAssign for $ty {
            fn sub_assign(&mut self, rhs: $ty) {
                $(self.$field -= rhs.$field;)+
            }
        }
    };
}

impl_point_ops!(Point2, x, y);
impl_point_ops!(Point3, x, y, z);

impl fmt::Display for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// Velocity vector; `z` stays zero for 2D messages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Velocity {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Velocity { x, y, z }
    }

    pub fn has_velocity(&self) -> bool {
        self.x != 0.0 || self.y != 0.0 || self.z != 0.0
    }

    pub fn overall(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl fmt::Display for Velocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.z == 0.0 {
            write!(f, "({}, {})", self.x, self.y)
        } else {
            write!(f, "({}, {}, {})", self.x, self.y, self.z)
        }
    }
}

/// Orientation angles in radians; 2D messages use yaw only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Angle3 {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Angle3 {
    pub fn yaw_only(yaw: f32) -> Self {
        Angle3 { yaw, pitch: 0.0, roll: 0.0 }
    }
}

impl fmt::Display for Angle3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pitch == 0.0 && self.roll == 0.0 {
            write!(f, "|<[{}]", self.yaw)
        } else {
            write!(f, "|<[{}, {}, {}]", self.yaw, self.pitch, self.roll)
        }
    }
}

/// Rotation velocities (radians per second) around the three axes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RotationVelocity {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl fmt::Display for RotationVelocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pitch == 0.0 && self.roll == 0.0 {
            write!(f, "|<({})", self.yaw)
        } else {
            write!(f, "|<({}, {}, {})", self.yaw, self.pitch, self.roll)
        }
    }
}

/// Clamp the value into `[minimum, maximum]` and map it onto `[-1, 1]`.
pub fn normalize(value: f32, minimum: f32, maximum: f32) -> f32 {
    let v = value.clamp(minimum, maximum);
    -1.0 + 2.0 * (v - minimum) / (maximum - minimum)
}

/// Strip whole periods, preserving orientation; result is in `(-2π, 2π)`.
pub fn strip_angle_period(value: f32) -> f32 {
    value % (2.0 * std::f32::consts::PI)
}

/// Rotate the point around the center in the xy plane.
pub fn rotate_around_center_yaw(point: &mut Point3, center: Point3, yaw: f32) {
    let (sin, cos) = yaw.sin_cos();
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    point.x = center.x + dx * cos - dy * sin;
    point.y = center.y + dx * sin + dy * cos;
}

/// Rotate the point around the center in the yz plane.
pub fn rotate_around_center_pitch(point: &mut Point3, center: Point3, pitch: f32) {
    let (sin, cos) = pitch.sin_cos();
    let dy = point.y - center.y;
    let dz = point.z - center.z;
    point.y = center.y + dy * cos - dz * sin;
    point.z = center.z + dy * sin + dz * cos;
}

/// Rotate the point around the center in the xz plane.
pub fn rotate_around_center_roll(point: &mut Point3, center: Point3, roll: f32) {
    let (sin, cos) = roll.sin_cos();
    let dx = point.x - center.x;
    let dz = point.z - center.z;
    point.x = center.x + dx * cos - dz * sin;
    point.z = center.z + dx * sin + dz * cos;
}

/// Convert spherical coordinates (azimuth in the xy plane, altitude towards
/// z, radial distance) into a Cartesian offset.
pub fn spherical_to_cartesian(azimuth: f32, altitude: f32, distance: f32) -> Point3 {
    Point3 {
        x: distance * altitude.cos() * azimuth.cos(),
        y: distance * altitude.cos() * azimuth.sin(),
        z: distance * altitude.sin(),
    }
}

/// Inverse of [`spherical_to_cartesian`]; the origin maps to all zeros.
pub fn cartesian_to_spherical(point: Point3) -> (f32, f32, f32) {
    let distance = (point.x * point.x + point.y * point.y + point.z * point.z).sqrt();
    if distance == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let azimuth = point.y.atan2(point.x);
    let altitude = (point.z / distance).asin();
    (azimuth, altitude, distance)
}

/// Rescale an acceleration magnitude after per-axis velocity scaling.
///
/// The acceleration is decomposed along the velocity direction, each
/// component is scaled by the matching axis factor, and the magnitude is
/// recomposed. With zero velocity or zero acceleration the magnitude is
/// returned unchanged.
pub fn scale_acceleration(velocity: Velocity, factors: (f32, f32, f32), accel: f32) -> f32 {
    if accel == 0.0 {
        return 0.0;
    }
    let v2 = (velocity.x as f64).powi(2) + (velocity.y as f64).powi(2) + (velocity.z as f64).powi(2);
    if v2 == 0.0 {
        return accel;
    }
    let a2 = (accel as f64).powi(2);
    let ax2 = a2 * (velocity.x as f64).powi(2) / v2;
    let ay2 = a2 * (velocity.y as f64).powi(2) / v2;
    let az2 = a2 * (velocity.z as f64).powi(2) / v2;
    let scaled = ax2 * (factors.0 as f64).powi(2)
        + ay2 * (factors.1 as f64).powi(2)
        + az2 * (factors.2 as f64).powi(2);
    scaled.sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_point_arithmetic() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(0.5, 0.5, 0.5);
        assert_eq!(a + b, Point3::new(1.5, 2.5, 3.5));
        assert_eq!(a - b, Point3::new(0.5, 1.5, 2.5));
        assert_eq!(a * 2.0, Point3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn test_point_ordering() {
        assert!(Point2::new(1.0, 5.0) < Point2::new(2.0, 0.0));
        assert!(Point2::new(1.0, 1.0) < Point2::new(1.0, 2.0));
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let mut p = Point3::new(1.0, 0.0, 0.0);
        rotate_around_center_yaw(&mut p, Point3::default(), std::f32::consts::FRAC_PI_2);
        assert!(close(p.x, 0.0) && close(p.y, 1.0));
    }

    #[test]
    fn test_rotation_around_offset_center() {
        let mut p = Point3::new(2.0, 1.0, 0.0);
        rotate_around_center_yaw(&mut p, Point3::new(1.0, 1.0, 0.0), std::f32::consts::PI);
        assert!(close(p.x, 0.0) && close(p.y, 1.0));
    }

    #[test]
    fn test_spherical_round_trip() {
        let p = Point3::new(3.0, 4.0, 5.0);
        let (azi, alt, dist) = cartesian_to_spherical(p);
        let q = spherical_to_cartesian(azi, alt, dist);
        assert!(close(p.x, q.x) && close(p.y, q.y) && close(p.z, q.z));
    }

    #[test]
    fn test_spherical_zero() {
        assert_eq!(cartesian_to_spherical(Point3::default()), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_velocity_overall() {
        let v = Velocity::new(3.0, 4.0, 0.0);
        assert!(v.has_velocity());
        assert!(close(v.overall(), 5.0));
        assert!(!Velocity::default().has_velocity());
    }

    #[test]
    fn test_scale_acceleration_identity() {
        let v = Velocity::new(1.0, 2.0, 0.0);
        assert!(close(scale_acceleration(v, (1.0, 1.0, 1.0), 4.0), 4.0));
    }

    #[test]
    fn test_scale_acceleration_single_axis() {
        // velocity entirely along x: scaling x by 2 doubles the magnitude
        let v = Velocity::new(5.0, 0.0, 0.0);
        assert!(close(scale_acceleration(v, (2.0, 1.0, 1.0), 3.0), 6.0));
    }

    #[test]
    fn test_scale_acceleration_zero_velocity() {
        assert!(close(
            scale_acceleration(Velocity::default(), (2.0, 2.0, 2.0), 3.0),
            3.0
        ));
    }
}
