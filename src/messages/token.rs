use rosc::{OscMessage, OscType};

use super::OutputMode;
use crate::error::Error;
use crate::geometry::{Angle3, Point3, RotationVelocity, Velocity};
use crate::types::{compile_tuid, decompile_tuid, ComponentId, SessionId, TypeId, UserId};

/// TOK message: a tagged tangible object (fiducial marker).
///
/// Dual-path: `/tuio2/tok` (2D, yaw only) and `/tuio2/t3d` (full
/// orientation).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Token {
    pub session_id: SessionId,
    pub type_id: TypeId,
    pub user_id: UserId,
    pub component_id: ComponentId,
    pub point: Point3,
    pub angle: Angle3,
    pub velocity: Velocity,
    pub rotation_velocity: RotationVelocity,
    pub acceleration: f32,
    pub rotation_acceleration: f32,
    pub output_mode: OutputMode,
}

impl Token {
    pub const PATH_2D: &'static str = "/tuio2/tok";
    pub const PATH_3D: &'static str = "/tuio2/t3d";

    #[allow(clippy::too_many_arguments)]
    pub fn new_2d(
        session_id: SessionId,
        type_id: TypeId,
        user_id: UserId,
        component_id: ComponentId,
        x: f32,
        y: f32,
        yaw: f32,
    ) -> Self {
        Token {
            session_id,
            type_id,
            user_id,
            component_id,
            point: Point3::new(x, y, 0.0),
            angle: Angle3::yaw_only(yaw),
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
        point: Point3,
        angle: Angle3,
    ) -> Self {
        Token {
            session_id,
            type_id,
            user_id,
            component_id,
            point,
            angle,
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
        let tu_id = compile_tuid(self.type_id, self.user_id);

        if self.output_mode.has_2d() {
            let mut args = vec![
                OscType::Int(self.session_id as i32),
                OscType::Int(tu_id as i32),
                OscType::Int(self.component_id as i32),
                OscType::Float(self.point.x),
                OscType::Float(self.point.y),
                OscType::Float(self.angle.yaw),
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
                OscType::Int(tu_id as i32),
                OscType::Int(self.component_id as i32),
                OscType::Float(self.point.x),
                OscType::Float(self.point.y),
                OscType::Float(self.point.z),
                OscType::Float(self.angle.yaw),
                OscType::Float(self.angle.pitch),
                OscType::Float(self.angle.roll),
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

    pub fn parse_2d(args: &[OscType]) -> Result<Token, Error> {
        let (required, ext) = match args.len() {
            6 => (args, None),
            11 => (&args[..6], Some(&args[6..])),
            _ => return Err(Error::malformed(Self::PATH_2D, "expected 6 or 11 arguments")),
        };
        let mut msg = match required {
            [OscType::Int(sid), OscType::Int(tu), OscType::Int(cid), OscType::Float(x), OscType::Float(y), OscType::Float(yaw)] =>
            {
                let (type_id, user_id) = decompile_tuid(*tu as u32);
                Token::new_2d(*sid as u32, type_id, user_id, *cid as u32, *x, *y, *yaw)
            }
            _ => return Err(Error::malformed(Self::PATH_2D, "type tags diverge from 'iiifff'")),
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

    pub fn parse_3d(args: &[OscType]) -> Result<Token, Error> {
        let (required, ext) = match args.len() {
            9 => (args, None),
            17 => (&args[..9], Some(&args[9..])),
            _ => return Err(Error::malformed(Self::PATH_3D, "expected 9 or 17 arguments")),
        };
        let mut msg = match required {
            [OscType::Int(sid), OscType::Int(tu), OscType::Int(cid), OscType::Float(x), OscType::Float(y), OscType::Float(z), OscType::Float(yaw), OscType::Float(pitch), OscType::Float(roll)] =>
            {
                let (type_id, user_id) = decompile_tuid(*tu as u32);
                Token::new_3d(
                    *sid as u32,
                    type_id,
                    user_id,
                    *cid as u32,
                    Point3::new(*x, *y, *z),
                    Angle3 { yaw: *yaw, pitch: *pitch, roll: *roll },
                )
            }
            _ => return Err(Error::malformed(Self::PATH_3D, "type tags diverge from 'iiiffffff'")),
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

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.output_mode.has_2d() {
            write!(
                f,
                "{} {} {}/{} {} {} |<[{}]",
                Self::PATH_2D,
                self.session_id,
                self.user_id,
                self.type_id,
                self.component_id,
                self.point.xy(),
                self.angle.yaw
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
                "{} {} {}/{} {} {} |<[{}, {}, {}]",
                Self::PATH_3D,
                self.session_id,
                self.user_id,
                self.type_id,
                self.component_id,
                self.point,
                self.angle.yaw,
                self.angle.pitch,
                self.angle.roll
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_2d_round_trip() {
        let mut tok = Token::new_2d(42, 1, 0, 0, 0.5, 0.5, 1.57);
        tok.velocity = Velocity::new(0.1, 0.2, 0.0);
        tok.rotation_velocity.yaw = 0.3;
        tok.acceleration = 0.4;
        tok.rotation_acceleration = 0.5;
        let mut out = Vec::new();
        tok.imprint(&mut out);
        assert_eq!(out[0].addr, Token::PATH_2D);
        assert_eq!(out[0].args.len(), 11);
        assert_eq!(Token::parse_2d(&out[0].args).unwrap(), tok);
    }

    #[test]
    fn test_token_3d_round_trip() {
        let mut tok = Token::new_3d(
            9,
            2,
            1,
            0,
            Point3::new(0.1, 0.2, 0.3),
            Angle3 { yaw: 0.5, pitch: 0.6, roll: 0.7 },
        );
        tok.velocity = Velocity::new(1.0, 2.0, 3.0);
        tok.rotation_velocity = RotationVelocity { yaw: 0.1, pitch: 0.2, roll: 0.3 };
        tok.acceleration = 4.0;
        tok.rotation_acceleration = 5.0;
        let mut out = Vec::new();
        tok.imprint(&mut out);
        assert_eq!(out[0].args.len(), 17);
        assert_eq!(Token::parse_3d(&out[0].args).unwrap(), tok);
    }

    #[test]
    fn test_token_short_round_trip() {
        let tok = Token::new_2d(1, 1, 0, 0, 0.5, 0.5, 0.0);
        let mut out = Vec::new();
        tok.imprint(&mut out);
        assert_eq!(out[0].args.len(), 6);
        // user occupies the upper 16 bits, type the lower
        assert_eq!(out[0].args[1], OscType::Int(1));
        assert_eq!(Token::parse_2d(&out[0].args).unwrap(), tok);
    }

    #[test]
    fn test_token_truncated_tail_rejected() {
        let mut tok = Token::new_2d(1, 0, 0, 0, 0.5, 0.5, 0.0);
        tok.velocity = Velocity::new(1.0, 0.0, 0.0);
        let mut out = Vec::new();
        tok.imprint(&mut out);
        let mut args = out[0].args.clone();
        args.pop();
        assert!(Token::parse_2d(&args).is_err());
    }
}
