use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use rosc::OscTime;

pub type SessionId = u32;
pub type UserId = u16;
pub type TypeId = u16;
pub type ComponentId = u32;
pub type FrameId = u32;
pub type InstanceId = u32;
pub type Dimension = u16;
pub type LinkPort = u16;

/// Ordered set of session ids, as carried by `alv`/`ala` messages.
pub type SessionSet = BTreeSet<SessionId>;

pub const TYPEID_UNKNOWN: TypeId = 0;
pub const UID_NOUSER: UserId = 0;

/// Compile individual type and user ids into the packed type/user attribute
/// (user id in the two upper bytes, type id in the two lower).
pub fn compile_tuid(type_id: TypeId, user_id: UserId) -> u32 {
    ((user_id as u32) << 16) | (type_id as u32)
}

pub fn decompile_tuid(tu_id: u32) -> (TypeId, UserId) {
    ((tu_id & 0xffff) as TypeId, (tu_id >> 16) as UserId)
}

/// Compile the frame's dimensions attribute: width upper, height lower.
pub fn compile_dimensions(width: Dimension, height: Dimension) -> u32 {
    ((width as u32) << 16) | (height as u32)
}

pub fn decompile_dimensions(dim: u32) -> (Dimension, Dimension) {
    ((dim >> 16) as Dimension, (dim & 0xffff) as Dimension)
}

/// Compile the link ports attribute: input port upper, output port lower.
pub fn compile_link_ports(input: LinkPort, output: LinkPort) -> u32 {
    ((input as u32) << 16) | (output as u32)
}

pub fn decompile_link_ports(ports: u32) -> (LinkPort, LinkPort) {
    ((ports >> 16) as LinkPort, (ports & 0xffff) as LinkPort)
}

pub fn ipv4_to_u32(addr: Ipv4Addr) -> u32 {
    u32::from(addr)
}

pub fn u32_to_ipv4(raw: u32) -> Ipv4Addr {
    Ipv4Addr::from(raw)
}

/// Seconds between the NTP era (1900) and the Unix epoch (1970).
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// OSC timetag: NTP seconds plus a 32-bit binary fraction of a second.
///
/// Ordered lexicographically; `IMMEDIATE` carries the special meaning "now".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timetag {
    pub seconds: u32,
    pub fraction: u32,
}

impl Timetag {
    pub const IMMEDIATE: Timetag = Timetag { seconds: 0, fraction: 1 };

    pub fn new(seconds: u32, fraction: u32) -> Self {
        Timetag { seconds, fraction }
    }

    /// Current wall-clock time as an NTP timetag.
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        let secs = now.timestamp().max(0) as u64 + NTP_UNIX_OFFSET;
        let nanos = now.timestamp_subsec_nanos() as u64;
        Timetag {
            seconds: secs as u32,
            fraction: ((nanos << 32) / 1_000_000_000) as u32,
        }
    }

    fn as_fixed(self) -> u64 {
        ((self.seconds as u64) << 32) | self.fraction as u64
    }

    fn from_fixed(raw: u64) -> Self {
        Timetag {
            seconds: (raw >> 32) as u32,
            fraction: (raw & 0xffff_ffff) as u32,
        }
    }

    /// Wrapping sum of two timetags.
    pub fn add(self, other: Timetag) -> Timetag {
        Timetag::from_fixed(self.as_fixed().wrapping_add(other.as_fixed()))
    }

    /// Wrapping difference `self - other`.
    pub fn sub(self, other: Timetag) -> Timetag {
        Timetag::from_fixed(self.as_fixed().wrapping_sub(other.as_fixed()))
    }

    /// Absolute difference between two timetags.
    pub fn diff_abs(self, other: Timetag) -> Timetag {
        if self < other {
            other.sub(self)
        } else {
            self.sub(other)
        }
    }

    pub fn as_secs_f64(self) -> f64 {
        self.seconds as f64 + self.fraction as f64 / (u64::from(u32::MAX) + 1) as f64
    }
}

impl From<OscTime> for Timetag {
    fn from(t: OscTime) -> Self {
        Timetag {
            seconds: t.seconds,
            fraction: t.fractional,
        }
    }
}

impl From<Timetag> for OscTime {
    fn from(t: Timetag) -> Self {
        OscTime {
            seconds: t.seconds,
            fractional: t.fraction,
        }
    }
}

impl std::fmt::Display for Timetag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:010}", self.seconds, self.fraction)
    }
}

/// Session ids that are no longer present on the sensor.
pub fn extract_removed_ids(present: &SessionSet, update: &SessionSet) -> SessionSet {
    present.difference(update).copied().collect()
}

/// Session ids that were not previously present on the sensor.
pub fn extract_new_ids(present: &SessionSet, update: &SessionSet) -> SessionSet {
    update.difference(present).copied().collect()
}
