use rosc::{OscMessage, OscType};

use super::OutputMode;
use crate::error::Error;
use crate::geometry::{Angle3, Point3, RotationVelocity, Velocity};
use crate::types::SessionId;

/// BND message: an untagged bounded region.
///
/// Dual-path: `/tuio2/bnd` carries center, yaw, extents and covered area;
/// `/tuio2/b3d` the full 3D variant with volume.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bounds {
    pub session_id: SessionId,
    pub point: Point3,
    pub angle: Angle3,
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub area: f32,
    pub volume: f32,
    pub velocity: Velocity,
    pub rotation_velocity: RotationVelocity,
    pub acceleration: f32,
    pub rotation_acceleration: f32,
    pub output_mode: OutputMode,
}

impl Bounds {
    pub const PATH_2D: &'static str = "/tuio2/bnd";
    pub const PATH_3D: &'static str = "/tuio2/b3d";

    #[allow(clippy::too_many_arguments)]
    pub fn new_2d(
        session_id: SessionId,
        x: f32,
        y: f32,
        yaw: f32,
        width: f32,
        height: f32,
        area: f32,
    ) -> Self {
        Bounds {
            session_id,
            point: Point3::new(x, y, 0.0),
            angle: Angle3::yaw_only(yaw),
            width,
            height,
            area,
            output_mode: OutputMode::TwoD,
            ..Default::default()
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_3d(
        session_id: SessionId,
        point: Point3,
        angle: Angle3,
        width: f32,
        height: f32,
        depth: f32,
        volume: f32,
    ) -> Self {
        Bounds {
            session_id,
            point,
            angle,
            width,
            height,
            depth,
            volume,
            output_mode: OutputMode::ThreeD,
            ..Default::default()
        }
    }

    pub fn is_extended(&self) -> bool {
        self.velocity.has_velocity()
            || self.acceleration != 0.0
            || self.rotation_acceleration != 0.0
            || self.rotation_velocity.yaw != 0.0
            || (self.output_mode.has_3d()
                && (self.rotation_velocity.pitch != 0.0 || self.rotation_velocity.roll != 0.0))
    }

    pub fn paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        if self.output_mode.has_2d() {
            paths.push(Self::PATH_2D);
        }
        if self.output_mode.has_3d() {
            paths.push(Self::PATH_3D);
        }
        paths
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        if self.output_mode.has_2d() {
            let mut args = vec![
                OscType::Int(self.session_id as i32),
                OscType::Float(self.point.x),
                OscType::Float(self.point.y),
                OscType::Float(self.angle.yaw),
                OscType::Float(self.width),
                OscType::Float(self.height),
                OscType::Float(self.area),
            ];
            if self.is_extended() {
                args.push(OscType::Float(self.velocity.x));
                args.push(OscType::Float(self.velocity.y));
                args.push(OscType::Float(self.rotation_velocity.yaw));
                args.push(OscType::Float(self.acceleration));
                args.push(OscType::Float(self.rotation_acceleration));
            }
            out.push(OscMessage { addr: Self::PATH_2D.to_string(), args });
        }

        if self.output_mode.has_3d() {
            let mut args = vec![
                OscType::Int(self.session_id as i32),
                OscType::Float(self.point.x),
                OscType::Float(self.point.y),
                OscType::Float(self.point.z),
                OscType::Float(self.angle.yaw),
                OscType::Float(self.angle.pitch),
                OscType::Float(self.angle.roll),
                OscType::Float(self.width),
                OscType::Float(self.height),
                OscType::Float(self.depth),
                OscType::Float(self.volume),
            ];
            if self.is_extended() {
                args.push(OscType::Float(self.velocity.x));
                args.push(OscType::Float(self.velocity.y));
                args.push(OscType::Float(self.velocity.z));
                args.push(OscType::Float(self.rotation_velocity.yaw));
                args.push(OscType::Float(self.rotation_velocity.pitch));
                args.push(OscType::Float(self.rotation_velocity.roll));
                args.push(OscType::Float(self.acceleration));
                args.push(OscType::Float(self.rotation_acceleration));
            }
            out.push(OscMessage { addr: Self::PATH_3D.to_string(), args });
        }
    }

    pub fn parse_2d(args: &[OscType]) -> Result<Bounds, Error> {
        let (required, ext) = match args.len() {
            7 => (args, None),
            12 => (&args[..7], Some(&args[7..])),
            _ => return Err(Error::malformed(Self::PATH_2D, "expected 7 or 12 arguments")),
        };
        let mut msg = match required {
            [OscType::Int(sid), OscType::Float(x), OscType::Float(y), OscType::Float(yaw), OscType::Float(w), OscType::Float(h), OscType::Float(area)] =>
            {
                Bounds::new_2d(*sid as u32, *x, *y, *yaw, *w, *h, *area)
            }
            _ => return Err(Error::malformed(Self::PATH_2D, "type tags diverge from 'iffffff'")),
        };
        if let Some(ext) = ext {
            match ext {
                [OscType::Float(vx), OscType::Float(vy), OscType::Float(rvel), OscType::Float(accel), OscType::Float(raccel)] =>
                {
                    msg.velocity = Velocity::new(*vx, *vy, 0.0);
                    msg.rotation_velocity.yaw = *rvel;
                    msg.acceleration = *accel;
                    msg.rotation_acceleration = *raccel;
                }
                _ => return Err(Error::malformed(Self::PATH_2D, "extended tail diverges from 'fffff'")),
            }
        }
        Ok(msg)
    }

    pub fn parse_3d(args: &[OscType]) -> Result<Bounds, Error> {
        let (required, ext) = match args.len() {
            11 => (args, None),
            19 => (&args[..11], Some(&args[11..])),
            _ => return Err(Error::malformed(Self::PATH_3D, "expected 11 or 19 arguments")),
        };
        let mut msg = match required {
            [OscType::Int(sid), OscType::Float(x), OscType::Float(y), OscType::Float(z), OscType::Float(yaw), OscType::Float(pitch), OscType::Float(roll), OscType::Float(w), OscType::Float(h), OscType::Float(d), OscType::Float(volume)] =>
            {
                Bounds::new_3d(
                    *sid as u32,
                    Point3::new(*x, *y, *z),
                    Angle3 { yaw: *yaw, pitch: *pitch, roll: *roll },
                    *w,
                    *h,
                    *d,
                    *volume,
                )
            }
            _ => return Err(Error::malformed(Self::PATH_3D, "type tags diverge from 'iffffffffff'")),
        };
        if let Some(ext) = ext {
            match ext {
                [OscType::Float(vx), OscType::Float(vy), OscType::Float(vz), OscType::Float(ryaw), OscType::Float(rpitch), OscType::Float(rroll), OscType::Float(accel), OscType::Float(raccel)] =>
                {
                    msg.velocity = Velocity::new(*vx, *vy, *vz);
                    msg.rotation_velocity = RotationVelocity {
                        yaw: *ryaw,
                        pitch: *rpitch,
                        roll: *rroll,
                    };
                    msg.acceleration = *accel;
                    msg.rotation_acceleration = *raccel;
                }
                _ => return Err(Error::malformed(Self::PATH_3D, "extended tail diverges from 'ffffffff'")),
            }
        }
        Ok(msg)
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.output_mode.has_2d() {
            write!(
                f,
                "{} {} {} |<[{}] {}x{} {}",
                Self::PATH_2D,
                self.session_id,
                self.point.xy(),
                self.angle.yaw,
                self.width,
                self.height,
                self.area
            )?;
            if self.is_extended() {
                write!(
                    f,
                    " ({}, {}) |<({}) {} {}",
                    self.velocity.x,
                    self.velocity.y,
                    self.rotation_velocity.yaw,
                    self.acceleration,
                    self.rotation_acceleration
                )?;
            }
        }
        if self.output_mode.has_3d() {
            write!(
                f,
                "{} {} {} |<[{}, {}, {}] {}x{}x{} {}",
                Self::PATH_3D,
                self.session_id,
                self.point,
                self.angle.yaw,
                self.angle.pitch,
                self.angle.roll,
                self.width,
                self.height,
                self.depth,
                self.volume
            )?;
            if self.is_extended() {
                write!(
                    f,
                    " ({}, {}, {}) |<({}, {}, {}) {} {}",
                    self.velocity.x,
                    self.velocity.y,
                    self.velocity.z,
                    self.rotation_velocity.yaw,
                    self.rotation_velocity.pitch,
                    self.rotation_velocity.roll,
                    self.acceleration,
                    self.rotation_acceleration
                )?;
            }
        }
        Ok(())
    }
}
