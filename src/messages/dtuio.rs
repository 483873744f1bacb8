//! dTUIO extension messages: sensor identity, viewports, topology and
//! gesture recognition results. Uuids travel as 16-byte OSC blobs; the
//! all-zero uuid is the empty/wildcard value.

use rosc::{OscMessage, OscType};
use uuid::Uuid;

use crate::error::Error;
use crate::geometry::{Angle3, Point3};
use crate::types::{SessionSet, UserId};

fn uuid_arg(uuid: Uuid) -> OscType {
    OscType::Blob(uuid.as_bytes().to_vec())
}

fn parse_uuid(path: &str, arg: &OscType) -> Result<Uuid, Error> {
    match arg {
        OscType::Blob(bytes) if bytes.len() == 16 => {
            let mut raw = [0u8; 16];
            raw.copy_from_slice(bytes);
            Ok(Uuid::from_bytes(raw))
        }
        _ => Err(Error::malformed(path, "uuid must be a 16-byte blob")),
    }
}

/// How the autoconfigurator may move a sensor's coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateTranslationMode {
    /// Never moved; acts as a configured anchor at the origin.
    Intact,
    /// Placed once, then left alone.
    TranslateOnce,
    /// Re-placed on every topology change.
    #[default]
    TranslateContinuous,
}

impl CoordinateTranslationMode {
    fn to_wire(self) -> i32 {
        match self {
            CoordinateTranslationMode::Intact => 0,
            CoordinateTranslationMode::TranslateOnce => 1,
            CoordinateTranslationMode::TranslateContinuous => 2,
        }
    }

    fn from_wire(path: &str, raw: i32) -> Result<Self, Error> {
        match raw {
            0 => Ok(CoordinateTranslationMode::Intact),
            1 => Ok(CoordinateTranslationMode::TranslateOnce),
            2 => Ok(CoordinateTranslationMode::TranslateContinuous),
            _ => Err(Error::malformed(path, "unknown coordinate translation mode")),
        }
    }
}

/// Sensor identity and coordinate-setup announcement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorProperties {
    pub uuid: Uuid,
    pub mode: CoordinateTranslationMode,
    pub purpose: u32,
}

impl SensorProperties {
    pub const PATH: &'static str = "/dtuio/snr";

    pub fn new(uuid: Uuid, mode: CoordinateTranslationMode, purpose: u32) -> Self {
        SensorProperties { uuid, mode, purpose }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let args = vec![
            uuid_arg(self.uuid),
            OscType::Int(self.mode.to_wire()),
            OscType::Int(self.purpose as i32),
        ];
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<SensorProperties, Error> {
        match args {
            [uuid, OscType::Int(mode), OscType::Int(purpose)] => Ok(SensorProperties {
                uuid: parse_uuid(Self::PATH, uuid)?,
                mode: CoordinateTranslationMode::from_wire(Self::PATH, *mode)?,
                purpose: *purpose as u32,
            }),
            _ => Err(Error::malformed(Self::PATH, "expected 'bii'")),
        }
    }
}

impl std::fmt::Display for SensorProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {:?} {}",
            Self::PATH,
            self.uuid,
            self.mode,
            self.purpose
        )
    }
}

/// Axis-aligned 3D region with orientation, used for clipping and remap.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Viewport {
    pub uuid: Uuid,
    pub center: Point3,
    pub angle: Angle3,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Viewport {
    pub const PATH: &'static str = "/dtuio/vpt";

    pub fn new(
        uuid: Uuid,
        center: Point3,
        angle: Angle3,
        width: u32,
        height: u32,
        depth: u32,
    ) -> Self {
        Viewport { uuid, center, angle, width, height, depth }
    }

    /// Translate the viewport center; used to project child viewports into
    /// their group's frame.
    pub fn translate(&mut self, offset: Point3) {
        self.center += offset;
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let args = vec![
            uuid_arg(self.uuid),
            OscType::Float(self.center.x),
            OscType::Float(self.center.y),
            OscType::Float(self.center.z),
            OscType::Float(self.angle.yaw),
            OscType::Float(self.angle.pitch),
            OscType::Float(self.angle.roll),
            OscType::Int(self.width as i32),
            OscType::Int(self.height as i32),
            OscType::Int(self.depth as i32),
        ];
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<Viewport, Error> {
        match args {
            [uuid, OscType::Float(x), OscType::Float(y), OscType::Float(z), OscType::Float(yaw), OscType::Float(pitch), OscType::Float(roll), OscType::Int(width), OscType::Int(height), OscType::Int(depth)] =>
            {
                Ok(Viewport {
                    uuid: parse_uuid(Self::PATH, uuid)?,
                    center: Point3::new(*x, *y, *z),
                    angle: Angle3 { yaw: *yaw, pitch: *pitch, roll: *roll },
                    width: *width as u32,
                    height: *height as u32,
                    depth: *depth as u32,
                })
            }
            _ => Err(Error::malformed(Self::PATH, "expected 'bffffffiii'")),
        }
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {} {}x{}x{}",
            Self::PATH,
            self.uuid,
            self.center,
            self.angle,
            self.width,
            self.height,
            self.depth
        )
    }
}

/// Membership of a sensor in a sensor group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupMember {
    pub group_uuid: Uuid,
    pub uuid: Uuid,
}

impl GroupMember {
    pub const PATH: &'static str = "/dtuio/grp";

    pub fn new(group_uuid: Uuid, uuid: Uuid) -> Self {
        GroupMember { group_uuid, uuid }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let args = vec![uuid_arg(self.group_uuid), uuid_arg(self.uuid)];
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<GroupMember, Error> {
        match args {
            [group, member] => Ok(GroupMember {
                group_uuid: parse_uuid(Self::PATH, group)?,
                uuid: parse_uuid(Self::PATH, member)?,
            }),
            _ => Err(Error::malformed(Self::PATH, "expected 'bb'")),
        }
    }
}

impl std::fmt::Display for GroupMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} <- {}", Self::PATH, self.group_uuid, self.uuid)
    }
}

/// Directed neighbour descriptor: where `neighbour_uuid` sits relative to
/// `uuid`, in spherical terms.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Neighbour {
    pub uuid: Uuid,
    pub neighbour_uuid: Uuid,
    pub azimuth: f32,
    pub altitude: f32,
    pub distance: f32,
}

impl Neighbour {
    pub const PATH: &'static str = "/dtuio/nbr";

    pub fn new(uuid: Uuid, neighbour_uuid: Uuid, azimuth: f32, altitude: f32, distance: f32) -> Self {
        Neighbour { uuid, neighbour_uuid, azimuth, altitude, distance }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let args = vec![
            uuid_arg(self.uuid),
            uuid_arg(self.neighbour_uuid),
            OscType::Float(self.azimuth),
            OscType::Float(self.altitude),
            OscType::Float(self.distance),
        ];
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<Neighbour, Error> {
        match args {
            [from, to, OscType::Float(azimuth), OscType::Float(altitude), OscType::Float(distance)] => {
                Ok(Neighbour {
                    uuid: parse_uuid(Self::PATH, from)?,
                    neighbour_uuid: parse_uuid(Self::PATH, to)?,
                    azimuth: *azimuth,
                    altitude: *altitude,
                    distance: *distance,
                })
            }
            _ => Err(Error::malformed(Self::PATH, "expected 'bbfff'")),
        }
    }
}

impl std::fmt::Display for Neighbour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} -> {} @({}, {}, {})",
            Self::PATH,
            self.uuid,
            self.neighbour_uuid,
            self.azimuth,
            self.altitude,
            self.distance
        )
    }
}

/// Recognition result: scores per template, highest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GestureIdentification {
    pub recognizer: String,
    pub user_id: UserId,
    pub sessions: SessionSet,
    pub scores: Vec<(f32, String)>,
}

impl GestureIdentification {
    pub const PATH: &'static str = "/dtuio/gid";

    pub fn new(
        recognizer: impl Into<String>,
        user_id: UserId,
        sessions: SessionSet,
        scores: Vec<(f32, String)>,
    ) -> Self {
        GestureIdentification {
            recognizer: recognizer.into(),
            user_id,
            sessions,
            scores,
        }
    }

    /// The best-scoring template, if any score was produced.
    pub fn best(&self) -> Option<&(f32, String)> {
        self.scores.first()
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let mut args = vec![
            OscType::String(self.recognizer.clone()),
            OscType::Int(self.user_id as i32),
            OscType::Int(self.sessions.len() as i32),
        ];
        args.extend(self.sessions.iter().map(|sid| OscType::Int(*sid as i32)));
        for (score, name) in &self.scores {
            args.push(OscType::Float(*score));
            args.push(OscType::String(name.clone()));
        }
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<GestureIdentification, Error> {
        let (recognizer, user_id, count, rest) = match args {
            [OscType::String(recognizer), OscType::Int(user), OscType::Int(count), rest @ ..] => {
                (recognizer.clone(), *user as UserId, *count as usize, rest)
            }
            _ => return Err(Error::malformed(Self::PATH, "expected 'sii' prefix")),
        };
        if rest.len() < count {
            return Err(Error::malformed(Self::PATH, "session list shorter than declared"));
        }
        let mut sessions = SessionSet::new();
        for arg in &rest[..count] {
            match arg {
                OscType::Int(sid) => {
                    sessions.insert(*sid as u32);
                }
                _ => return Err(Error::malformed(Self::PATH, "session ids must be int32")),
            }
        }
        let score_args = &rest[count..];
        if score_args.len() % 2 != 0 {
            return Err(Error::malformed(Self::PATH, "dangling score field"));
        }
        let mut scores = Vec::with_capacity(score_args.len() / 2);
        for pair in score_args.chunks(2) {
            match pair {
                [OscType::Float(score), OscType::String(name)] => {
                    scores.push((*score, name.clone()))
                }
                _ => return Err(Error::malformed(Self::PATH, "scores must be float/string pairs")),
            }
        }
        Ok(GestureIdentification { recognizer, user_id, sessions, scores })
    }
}

impl std::fmt::Display for GestureIdentification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} user {}", Self::PATH, self.recognizer, self.user_id)?;
        for sid in &self.sessions {
            write!(f, " {sid}")?;
        }
        for (score, name) in &self.scores {
            write!(f, " {name}={score}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_properties_round_trip() {
        let snr = SensorProperties::new(Uuid::new_v4(), CoordinateTranslationMode::TranslateOnce, 1);
        let mut out = Vec::new();
        snr.imprint(&mut out);
        assert_eq!(out[0].addr, SensorProperties::PATH);
        assert_eq!(SensorProperties::parse(&out[0].args).unwrap(), snr);
    }

    #[test]
    fn test_sensor_properties_rejects_short_uuid() {
        let args = vec![OscType::Blob(vec![0; 8]), OscType::Int(0), OscType::Int(0)];
        assert!(SensorProperties::parse(&args).is_err());
    }

    #[test]
    fn test_viewport_round_trip() {
        let vpt = Viewport::new(
            Uuid::new_v4(),
            Point3::new(10.0, 20.0, 0.0),
            Angle3::yaw_only(0.5),
            1920,
            1080,
            20,
        );
        let mut out = Vec::new();
        vpt.imprint(&mut out);
        assert_eq!(Viewport::parse(&out[0].args).unwrap(), vpt);
    }

    #[test]
    fn test_group_member_round_trip() {
        let grp = GroupMember::new(Uuid::new_v4(), Uuid::new_v4());
        let mut out = Vec::new();
        grp.imprint(&mut out);
        assert_eq!(GroupMember::parse(&out[0].args).unwrap(), grp);
    }

    #[test]
    fn test_neighbour_round_trip() {
        let nbr = Neighbour::new(Uuid::new_v4(), Uuid::new_v4(), 0.0, 0.0, 2000.0);
        let mut out = Vec::new();
        nbr.imprint(&mut out);
        assert_eq!(Neighbour::parse(&out[0].args).unwrap(), nbr);
    }

    #[test]
    fn test_gesture_identification_round_trip() {
        let gid = GestureIdentification::new(
            "unistroke",
            2,
            [11, 12].into_iter().collect(),
            vec![(0.95, "circle".into()), (0.40, "rect".into())],
        );
        let mut out = Vec::new();
        gid.imprint(&mut out);
        assert_eq!(GestureIdentification::parse(&out[0].args).unwrap(), gid);
        assert_eq!(gid.best().unwrap().1, "circle");
    }
}
