use rosc::{OscMessage, OscType};

use super::OutputMode;
use crate::error::Error;
use crate::geometry::{Point3, Velocity};
use crate::types::{compile_tuid, decompile_tuid, ComponentId, SessionId, TypeId, UserId};

/// PTR message: a pointing contact (finger, stylus, cursor).
///
/// Dual-path: `/tuio2/ptr` for the 2D form, `/tuio2/p3d` for 3D. The
/// extended tail (velocities + acceleration) is emitted only when any of
/// those fields is nonzero and must be complete on parse.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pointer {
    pub session_id: SessionId,
    pub type_id: TypeId,
    pub user_id: UserId,
    pub component_id: ComponentId,
    pub point: Point3,
    pub width: f32,
    pub pressure: f32,
    pub velocity: Velocity,
    pub acceleration: f32,
    pub output_mode: OutputMode,
}

impl Pointer {
    pub const PATH_2D: &'static str = "/tuio2/ptr";
    pub const PATH_3D: &'static str = "/tuio2/p3d";

    #[allow(clippy::too_many_arguments)]
    pub fn new_2d(
        session_id: SessionId,
        type_id: TypeId,
        user_id: UserId,
        component_id: ComponentId,
        x: f32,
        y: f32,
        width: f32,
        pressure: f32,
    ) -> Self {
        Pointer {
            session_id,
            type_id,
            user_id,
            component_id,
            point: Point3::new(x, y, 0.0),
            width,
            pressure,
            output_mode: OutputMode::TwoD,
            ..Default::default()
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_3d(
        session_id: SessionId,
        type_id: TypeId,
        user_id: UserId,
        component_id: ComponentId,
        x: f32,
        y: f32,
        z: f32,
        width: f32,
        pressure: f32,
    ) -> Self {
        Pointer {
            session_id,
            type_id,
            user_id,
            component_id,
            point: Point3::new(x, y, z),
            width,
            pressure,
            output_mode: OutputMode::ThreeD,
            ..Default::default()
        }
    }

    pub fn is_extended(&self) -> bool {
        self.velocity.x != 0.0
            || self.velocity.y != 0.0
            || self.acceleration != 0.0
            || (self.output_mode.has_3d() && self.velocity.z != 0.0)
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
        let tu_id = compile_tuid(self.type_id, self.user_id);

        if self.output_mode.has_2d() {
            let mut args = vec![
                OscType::Int(self.session_id as i32),
                OscType::Int(tu_id as i32),
                OscType::Int(self.component_id as i32),
                OscType::Float(self.point.x),
                OscType::Float(self.point.y),
                OscType::Float(self.width),
                OscType::Float(self.pressure),
            ];
            if self.is_extended() {
                args.push(OscType::Float(self.velocity.x));
                args.push(OscType::Float(self.velocity.y));
                args.push(OscType::Float(self.acceleration));
            }
            out.push(OscMessage { addr: Self::PATH_2D.to_string(), args });
        }

        if self.output_mode.has_3d() {
            let mut args = vec![
                OscType::Int(self.session_id as i32),
                OscType::Int(tu_id as i32),
                OscType::Int(self.component_id as i32),
                OscType::Float(self.point.x),
                OscType::Float(self.point.y),
                OscType::Float(self.point.z),
                OscType::Float(self.width),
                OscType::Float(self.pressure),
            ];
            if self.is_extended() {
                args.push(OscType::Float(self.velocity.x));
                args.push(OscType::Float(self.velocity.y));
                args.push(OscType::Float(self.velocity.z));
                args.push(OscType::Float(self.acceleration));
            }
            out.push(OscMessage { addr: Self::PATH_3D.to_string(), args });
        }
    }

    pub fn parse_2d(args: &[OscType]) -> Result<Pointer, Error> {
        let (required, ext) = match args.len() {
            7 => (args, None),
            10 => (&args[..7], Some(&args[7..])),
            _ => return Err(Error::malformed(Self::PATH_2D, "expected 7 or 10 arguments")),
        };
        let mut msg = match required {
            [OscType::Int(sid), OscType::Int(tu), OscType::Int(cid), OscType::Float(x), OscType::Float(y), OscType::Float(width), OscType::Float(pressure)] =>
            {
                let (type_id, user_id) = decompile_tuid(*tu as u32);
                Pointer::new_2d(
                    *sid as u32,
                    type_id,
                    user_id,
                    *cid as u32,
                    *x,
                    *y,
                    *width,
                    *pressure,
                )
            }
            _ => return Err(Error::malformed(Self::PATH_2D, "type tags diverge from 'iiiffff'")),
        };
        if let Some(ext) = ext {
            match ext {
                [OscType::Float(vx), OscType::Float(vy), OscType::Float(accel)] => {
                    msg.velocity = Velocity::new(*vx, *vy, 0.0);
                    msg.acceleration = *accel;
                }
                _ => return Err(Error::malformed(Self::PATH_2D, "extended tail diverges from 'fff'")),
            }
        }
        Ok(msg)
    }

    pub fn parse_3d(args: &[OscType]) -> Result<Pointer, Error> {
        let (required, ext) = match args.len() {
            8 => (args, None),
            12 => (&args[..8], Some(&args[8..])),
            _ => return Err(Error::malformed(Self::PATH_3D, "expected 8 or 12 arguments")),
        };
        let mut msg = match required {
            [OscType::Int(sid), OscType::Int(tu), OscType::Int(cid), OscType::Float(x), OscType::Float(y), OscType::Float(z), OscType::Float(width), OscType::Float(pressure)] =>
            {
                let (type_id, user_id) = decompile_tuid(*tu as u32);
                Pointer::new_3d(
                    *sid as u32,
                    type_id,
                    user_id,
                    *cid as u32,
                    *x,
                    *y,
                    *z,
                    *width,
                    *pressure,
                )
            }
            _ => return Err(Error::malformed(Self::PATH_3D, "type tags diverge from 'iiifffff'")),
        };
        if let Some(ext) = ext {
            match ext {
                [OscType::Float(vx), OscType::Float(vy), OscType::Float(vz), OscType::Float(accel)] => {
                    msg.velocity = Velocity::new(*vx, *vy, *vz);
                    msg.acceleration = *accel;
                }
                _ => return Err(Error::malformed(Self::PATH_3D, "extended tail diverges from 'ffff'")),
            }
        }
        Ok(msg)
    }
}

impl std::fmt::Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.output_mode.has_2d() {
            write!(
                f,
                "{} {} {}/{} {} {} {} {}",
                Self::PATH_2D,
                self.session_id,
                self.user_id,
                self.type_id,
                self.component_id,
                self.point.xy(),
                self.width,
                self.pressure
            )?;
            if self.is_extended() {
                write!(
                    f,
                    " ({}, {}) {}",
                    self.velocity.x, self.velocity.y, self.acceleration
                )?;
            }
        }
        if self.output_mode.has_3d() {
            write!(
                f,
                "{} {} {}/{} {} {} {} {} {} {}",
                Self::PATH_3D,
                self.session_id,
                self.user_id,
                self.type_id,
                self.component_id,
                self.point.x,
                self.point.y,
                self.point.z,
                self.width,
                self.pressure
            )?;
            if self.is_extended() {
                write!(
                    f,
                    " {} {} {} {}",
                    self.velocity.x, self.velocity.y, self.velocity.z, self.acceleration
                )?;
            }
        }
        Ok(())
    }
}
