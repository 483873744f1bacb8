//! Typed model of every TUIO 2.0 message the toolkit understands.
//!
//! Each message lives in its own struct with constructors, value equality,
//! a canonical `Display` printer and an OSC imprint; [`Message`] is the
//! tagged union the pipeline moves around. The helper traits of the protocol
//! (contact session, position, velocity, output mode, movability…) surface
//! as accessor methods on `Message` so adaptors can stay variant-agnostic.

pub mod associations;
pub mod bounds;
pub mod contours;
pub mod control;
pub mod dtuio;
pub mod envelope;
pub mod pointer;
pub mod skeleton;
pub mod symbol;
pub mod token;

pub use associations::{
    AliveAssociations, ContainerAssociation, LinkAssociation, LinkEntry, LinkType,
    LinkedListAssociation, LinkedTreeAssociation,
};
pub use bounds::Bounds;
pub use contours::{Area, AreaSpan, ConvexHull, InnerContour, OuterContour, Raw};
pub use control::{Control, Data, DataPayload, Signal};
pub use dtuio::{
    CoordinateTranslationMode, GestureIdentification, GroupMember, Neighbour, SensorProperties,
    Viewport,
};
pub use envelope::{Alive, Frame};
pub use pointer::Pointer;
pub use skeleton::{Skeleton, SkeletonVolume};
pub use symbol::{Symbol, SymbolData};
pub use token::Token;

use rosc::{OscMessage, OscType};

use crate::geometry::{
    rotate_around_center_pitch, rotate_around_center_roll, rotate_around_center_yaw,
    scale_acceleration, Point3, Velocity,
};
use crate::types::SessionId;

/// Which OSC path(s) a dual-path message serializes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    TwoD,
    ThreeD,
    #[default]
    Both,
}

impl OutputMode {
    pub fn has_2d(self) -> bool {
        matches!(self, OutputMode::TwoD | OutputMode::Both)
    }

    pub fn has_3d(self) -> bool {
        matches!(self, OutputMode::ThreeD | OutputMode::Both)
    }
}

/// Linked-tree wire compatibility (see the LTA ambiguity note in the codec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeCompat {
    /// Reject linked-tree messages on parse, emit the draft form.
    Strict,
    /// Prefix every descend pair with a `True` marker on emit and require
    /// it on parse, making the stream unambiguous.
    #[default]
    Lenient,
}

/// An OSC message preserved verbatim in accept-unknown mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Opaque {
    pub path: String,
    pub args: Vec<OscType>,
}

impl std::fmt::Display for Opaque {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} args)", self.path, self.args.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Frame(Frame),
    Alive(Alive),
    Pointer(Pointer),
    Token(Token),
    Bounds(Bounds),
    Symbol(Symbol),
    Control(Control),
    Data(Data),
    Signal(Signal),
    ConvexHull(ConvexHull),
    OuterContour(OuterContour),
    InnerContour(InnerContour),
    Skeleton(Skeleton),
    SkeletonVolume(SkeletonVolume),
    Area(Area),
    Raw(Raw),
    AliveAssociations(AliveAssociations),
    ContainerAssociation(ContainerAssociation),
    LinkAssociation(LinkAssociation),
    LinkedListAssociation(LinkedListAssociation),
    LinkedTreeAssociation(LinkedTreeAssociation),
    SensorProperties(SensorProperties),
    Viewport(Viewport),
    GroupMember(GroupMember),
    Neighbour(Neighbour),
    GestureIdentification(GestureIdentification),
    Opaque(Opaque),
}

/// Extraction of a concrete payload out of the tagged union, so containers
/// can offer typed lookups without downcasting.
pub trait Payload: Sized {
    fn from_message(msg: &Message) -> Option<&Self>;
    fn from_message_mut(msg: &mut Message) -> Option<&mut Self>;
    fn into_message(self) -> Message;
}

macro_rules! impl_payload {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl Payload for $ty {
                fn from_message(msg: &Message) -> Option<&Self> {
                    match msg {
                        Message::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
                fn from_message_mut(msg: &mut Message) -> Option<&mut Self> {
                    match msg {
                        Message::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
                fn into_message(self) -> Message {
                    Message::$variant(self)
                }
            }
            impl From<$ty> for Message {
                fn from(inner: $ty) -> Message {
                    Message::$variant(inner)
                }
            }
        )+
    };
}

impl_payload! {
    Frame => Frame,
    Alive => Alive,
    Pointer => Pointer,
    Token => Token,
    Bounds => Bounds,
    Symbol => Symbol,
    Control => Control,
    Data => Data,
    Signal => Signal,
    ConvexHull => ConvexHull,
    OuterContour => OuterContour,
    InnerContour => InnerContour,
    Skeleton => Skeleton,
    SkeletonVolume => SkeletonVolume,
    Area => Area,
    Raw => Raw,
    AliveAssociations => AliveAssociations,
    ContainerAssociation => ContainerAssociation,
    LinkAssociation => LinkAssociation,
    LinkedListAssociation => LinkedListAssociation,
    LinkedTreeAssociation => LinkedTreeAssociation,
    SensorProperties => SensorProperties,
    Viewport => Viewport,
    GroupMember => GroupMember,
    Neighbour => Neighbour,
    GestureIdentification => GestureIdentification,
    Opaque => Opaque,
}

impl Message {
    /// Session id carried directly by the message, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Message::Pointer(m) => Some(m.session_id),
            Message::Token(m) => Some(m.session_id),
            Message::Bounds(m) => Some(m.session_id),
            Message::Symbol(m) => Some(m.session_id),
            Message::Control(m) => Some(m.session_id),
            Message::Data(m) => Some(m.session_id),
            Message::Signal(m) => Some(m.session_id),
            Message::ConvexHull(m) => Some(m.session_id),
            Message::OuterContour(m) => Some(m.session_id),
            Message::InnerContour(m) => Some(m.session_id),
            Message::Skeleton(m) => Some(m.session_id),
            Message::SkeletonVolume(m) => Some(m.session_id),
            Message::Area(m) => Some(m.session_id),
            Message::Raw(m) => Some(m.session_id),
            Message::ContainerAssociation(m) => Some(m.session_id),
            Message::LinkAssociation(m) => Some(m.session_id),
            Message::LinkedListAssociation(m) => Some(m.session_id()),
            Message::LinkedTreeAssociation(m) => Some(m.session_id()),
            _ => None,
        }
    }

    pub fn set_session_id(&mut self, sid: SessionId) {
        match self {
            Message::Pointer(m) => m.session_id = sid,
            Message::Token(m) => m.session_id = sid,
            Message::Bounds(m) => m.session_id = sid,
            Message::Symbol(m) => m.session_id = sid,
            Message::Control(m) => m.session_id = sid,
            Message::Data(m) => m.session_id = sid,
            Message::Signal(m) => m.session_id = sid,
            Message::ConvexHull(m) => m.session_id = sid,
            Message::OuterContour(m) => m.session_id = sid,
            Message::InnerContour(m) => m.session_id = sid,
            Message::Skeleton(m) => m.session_id = sid,
            Message::SkeletonVolume(m) => m.session_id = sid,
            Message::Area(m) => m.session_id = sid,
            Message::Raw(m) => m.session_id = sid,
            Message::ContainerAssociation(m) => m.session_id = sid,
            Message::LinkAssociation(m) => m.set_session_id(sid),
            Message::LinkedListAssociation(m) => m.set_session_id(sid),
            Message::LinkedTreeAssociation(m) => m.set_session_id(sid),
            _ => {}
        }
    }

    /// Single carried position for contact-like messages.
    pub fn point(&self) -> Option<Point3> {
        match self {
            Message::Pointer(m) => Some(m.point),
            Message::Token(m) => Some(m.point),
            Message::Bounds(m) => Some(m.point),
            Message::Viewport(m) => Some(m.center),
            _ => None,
        }
    }

    pub fn set_point(&mut self, point: Point3) {
        match self {
            Message::Pointer(m) => m.point = point,
            Message::Token(m) => m.point = point,
            Message::Bounds(m) => m.point = point,
            Message::Viewport(m) => m.center = point,
            _ => {}
        }
    }

    pub fn velocity(&self) -> Option<Velocity> {
        match self {
            Message::Pointer(m) => Some(m.velocity),
            Message::Token(m) => Some(m.velocity),
            Message::Bounds(m) => Some(m.velocity),
            _ => None,
        }
    }

    pub fn set_velocity(&mut self, velocity: Velocity) {
        match self {
            Message::Pointer(m) => m.velocity = velocity,
            Message::Token(m) => m.velocity = velocity,
            Message::Bounds(m) => m.velocity = velocity,
            _ => {}
        }
    }

    /// Translate a single-point message; returns false for everything else.
    pub fn move_by(&mut self, delta: Point3) -> bool {
        match self.point() {
            Some(point) => {
                self.set_point(point + delta);
                true
            }
            None => false,
        }
    }

    /// Rotate the carried position around the center in the yaw plane and
    /// update the stored orientation where the message has one.
    pub fn rotate_yaw(&mut self, angle: f32, center: Point3) {
        if let Some(mut point) = self.point() {
            rotate_around_center_yaw(&mut point, center, angle);
            self.set_point(point);
        }
        match self {
            Message::Token(m) => m.angle.yaw += angle,
            Message::Bounds(m) => m.angle.yaw += angle,
            _ => {}
        }
    }

    pub fn rotate_pitch(&mut self, angle: f32, center: Point3) {
        if let Some(mut point) = self.point() {
            rotate_around_center_pitch(&mut point, center, angle);
            self.set_point(point);
        }
        match self {
            Message::Token(m) => m.angle.pitch += angle,
            Message::Bounds(m) => m.angle.pitch += angle,
            _ => {}
        }
    }

    pub fn rotate_roll(&mut self, angle: f32, center: Point3) {
        if let Some(mut point) = self.point() {
            rotate_around_center_roll(&mut point, center, angle);
            self.set_point(point);
        }
        match self {
            Message::Token(m) => m.angle.roll += angle,
            Message::Bounds(m) => m.angle.roll += angle,
            _ => {}
        }
    }

    /// Update stored orientation without touching positions; returns true
    /// when the message carries an orientation.
    pub fn rotate_independent(&mut self, yaw: f32, pitch: f32, roll: f32) -> bool {
        match self {
            Message::Token(m) => {
                m.angle.yaw += yaw;
                m.angle.pitch += pitch;
                m.angle.roll += roll;
                true
            }
            Message::Bounds(m) => {
                m.angle.yaw += yaw;
                m.angle.pitch += pitch;
                m.angle.roll += roll;
                true
            }
            _ => false,
        }
    }

    /// Scale the velocity componentwise; when `rescale_accel` is set, the
    /// movement acceleration is recomposed through the old velocity.
    pub fn scale_velocity(&mut self, factors: (f32, f32, f32), rescale_accel: bool) {
        let velocity = match self.velocity() {
            Some(v) => v,
            None => return,
        };
        if rescale_accel {
            let accel = match self {
                Message::Pointer(m) => &mut m.acceleration,
                Message::Token(m) => &mut m.acceleration,
                Message::Bounds(m) => &mut m.acceleration,
                _ => unreachable!(),
            };
            *accel = scale_acceleration(velocity, factors, *accel);
        }
        self.set_velocity(Velocity::new(
            velocity.x * factors.0,
            velocity.y * factors.1,
            velocity.z * factors.2,
        ));
    }

    /// Scale all points of multi-point geometry around the origin; returns
    /// true if the message carries such geometry.
    pub fn scale_points(&mut self, factors: (f32, f32, f32)) -> bool {
        let scale2 = |p: &mut crate::geometry::Point2| {
            p.x *= factors.0;
            p.y *= factors.1;
        };
        match self {
            Message::ConvexHull(m) => {
                m.points.iter_mut().for_each(scale2);
                true
            }
            Message::OuterContour(m) => {
                m.points.iter_mut().for_each(scale2);
                true
            }
            Message::InnerContour(m) => {
                m.contours.iter_mut().flatten().for_each(scale2);
                true
            }
            Message::Area(m) => {
                for span in m.spans.iter_mut() {
                    scale2(&mut span.origin);
                    span.width *= factors.0;
                }
                true
            }
            Message::Skeleton(m) => {
                m.scale_joints(factors);
                true
            }
            _ => false,
        }
    }

    /// OSC path(s) this message would be imprinted under.
    pub fn osc_paths(&self) -> Vec<&str> {
        match self {
            Message::Frame(_) => vec![Frame::PATH],
            Message::Alive(_) => vec![Alive::PATH],
            Message::Pointer(m) => m.paths(),
            Message::Token(m) => m.paths(),
            Message::Bounds(m) => m.paths(),
            Message::Symbol(_) => vec![Symbol::PATH],
            Message::Control(_) => vec![Control::PATH],
            Message::Data(_) => vec![Data::PATH],
            Message::Signal(_) => vec![Signal::PATH],
            Message::ConvexHull(_) => vec![ConvexHull::PATH],
            Message::OuterContour(_) => vec![OuterContour::PATH],
            Message::InnerContour(_) => vec![InnerContour::PATH],
            Message::Skeleton(m) => m.paths(),
            Message::SkeletonVolume(_) => vec![SkeletonVolume::PATH],
            Message::Area(_) => vec![Area::PATH],
            Message::Raw(_) => vec![Raw::PATH],
            Message::AliveAssociations(_) => vec![AliveAssociations::PATH],
            Message::ContainerAssociation(_) => vec![ContainerAssociation::PATH],
            Message::LinkAssociation(_) => vec![LinkAssociation::PATH],
            Message::LinkedListAssociation(_) => vec![LinkedListAssociation::PATH],
            Message::LinkedTreeAssociation(_) => vec![LinkedTreeAssociation::PATH],
            Message::SensorProperties(_) => vec![SensorProperties::PATH],
            Message::Viewport(_) => vec![Viewport::PATH],
            Message::GroupMember(_) => vec![GroupMember::PATH],
            Message::Neighbour(_) => vec![Neighbour::PATH],
            Message::GestureIdentification(_) => vec![GestureIdentification::PATH],
            Message::Opaque(m) => vec![m.path.as_str()],
        }
    }

    /// Append the message's wire form (one or two OSC messages for
    /// dual-path variants) to the target list.
    pub fn imprint(&self, out: &mut Vec<OscMessage>, compat: TreeCompat) {
        match self {
            Message::Frame(m) => m.imprint(out),
            Message::Alive(m) => m.imprint(out),
            Message::Pointer(m) => m.imprint(out),
            Message::Token(m) => m.imprint(out),
            Message::Bounds(m) => m.imprint(out),
            Message::Symbol(m) => m.imprint(out),
            Message::Control(m) => m.imprint(out),
            Message::Data(m) => m.imprint(out),
            Message::Signal(m) => m.imprint(out),
            Message::ConvexHull(m) => m.imprint(out),
            Message::OuterContour(m) => m.imprint(out),
            Message::InnerContour(m) => m.imprint(out),
            Message::Skeleton(m) => m.imprint(out),
            Message::SkeletonVolume(m) => m.imprint(out),
            Message::Area(m) => m.imprint(out),
            Message::Raw(m) => m.imprint(out),
            Message::AliveAssociations(m) => m.imprint(out),
            Message::ContainerAssociation(m) => m.imprint(out),
            Message::LinkAssociation(m) => m.imprint(out),
            Message::LinkedListAssociation(m) => m.imprint(out),
            Message::LinkedTreeAssociation(m) => m.imprint(out, compat),
            Message::SensorProperties(m) => m.imprint(out),
            Message::Viewport(m) => m.imprint(out),
            Message::GroupMember(m) => m.imprint(out),
            Message::Neighbour(m) => m.imprint(out),
            Message::GestureIdentification(m) => m.imprint(out),
            Message::Opaque(m) => out.push(OscMessage {
                addr: m.path.clone(),
                args: m.args.clone(),
            }),
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Frame(m) => m.fmt(f),
            Message::Alive(m) => m.fmt(f),
            Message::Pointer(m) => m.fmt(f),
            Message::Token(m) => m.fmt(f),
            Message::Bounds(m) => m.fmt(f),
            Message::Symbol(m) => m.fmt(f),
            Message::Control(m) => m.fmt(f),
            Message::Data(m) => m.fmt(f),
            Message::Signal(m) => m.fmt(f),
            Message::ConvexHull(m) => m.fmt(f),
            Message::OuterContour(m) => m.fmt(f),
            Message::InnerContour(m) => m.fmt(f),
            Message::Skeleton(m) => m.fmt(f),
            Message::SkeletonVolume(m) => m.fmt(f),
            Message::Area(m) => m.fmt(f),
            Message::Raw(m) => m.fmt(f),
            Message::AliveAssociations(m) => m.fmt(f),
            Message::ContainerAssociation(m) => m.fmt(f),
            Message::LinkAssociation(m) => m.fmt(f),
            Message::LinkedListAssociation(m) => m.fmt(f),
            Message::LinkedTreeAssociation(m) => m.fmt(f),
            Message::SensorProperties(m) => m.fmt(f),
            Message::Viewport(m) => m.fmt(f),
            Message::GroupMember(m) => m.fmt(f),
            Message::Neighbour(m) => m.fmt(f),
            Message::GestureIdentification(m) => m.fmt(f),
            Message::Opaque(m) => m.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_dispatch() {
        let mut msg = Message::Pointer(Pointer::new_2d(7, 1, 0, 0, 0.5, 0.5, 0.1, 1.0));
        assert_eq!(msg.session_id(), Some(7));
        msg.set_session_id(42);
        assert_eq!(msg.session_id(), Some(42));
        assert_eq!(Message::Alive(Alive::default()).session_id(), None);
    }

    #[test]
    fn test_move_by_only_touches_positional_messages() {
        let mut ptr = Message::Pointer(Pointer::new_2d(1, 0, 0, 0, 1.0, 2.0, 0.0, 1.0));
        assert!(ptr.move_by(Point3::new(1.0, 1.0, 0.0)));
        assert_eq!(ptr.point().unwrap(), Point3::new(2.0, 3.0, 0.0));

        let mut alv = Message::Alive(Alive::default());
        assert!(!alv.move_by(Point3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_rotate_updates_token_angle() {
        let mut tok = Message::Token(Token::new_2d(1, 0, 0, 0, 1.0, 0.0, 0.0));
        tok.rotate_yaw(std::f32::consts::FRAC_PI_2, Point3::default());
        let token = match &tok {
            Message::Token(t) => t,
            _ => unreachable!(),
        };
        assert!((token.angle.yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!(token.point.x.abs() < 1e-6 && (token.point.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_scale_velocity_recomposes_acceleration() {
        let mut ptr = Pointer::new_2d(1, 0, 0, 0, 0.0, 0.0, 0.0, 1.0);
        ptr.velocity = Velocity::new(3.0, 0.0, 0.0);
        ptr.acceleration = 2.0;
        let mut msg = Message::Pointer(ptr);
        msg.scale_velocity((2.0, 1.0, 1.0), true);
        match msg {
            Message::Pointer(p) => {
                assert_eq!(p.velocity.x, 6.0);
                assert!((p.acceleration - 4.0).abs() < 1e-4);
            }
            _ => unreachable!(),
        }
    }
}
