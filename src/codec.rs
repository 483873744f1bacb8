//! OSC wire codec: a registry of per-path convertors for decoding, and
//! bundle-level encode with the frame/alive envelope preserved.
//!
//! A convertor turns one OSC message into zero or more typed messages.
//! Unregistered paths are dropped unless the codec runs in accept-unknown
//! mode, in which case a generic opaque convertor preserves them verbatim.

use std::collections::HashMap;

use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};

use crate::bundle::BundleHandle;
use crate::error::Error;
use crate::messages::{
    Alive, AliveAssociations, Area, Bounds, ContainerAssociation, Control, ConvexHull, Data,
    Frame, GestureIdentification, GroupMember, InnerContour, LinkAssociation,
    LinkedListAssociation, LinkedTreeAssociation, Message, Neighbour, Opaque, OuterContour,
    Pointer, Raw, SensorProperties, Signal, Skeleton, SkeletonVolume, Symbol, Token, TreeCompat,
    Viewport,
};

/// Callback turning `(path, arguments)` into typed messages.
pub type Convertor = fn(&str, &[OscType], TreeCompat) -> Result<Vec<Message>, Error>;

macro_rules! convertor {
    ($parse:expr => $variant:ident) => {{
        fn conv(_path: &str, args: &[OscType], _compat: TreeCompat) -> Result<Vec<Message>, Error> {
            Ok(vec![Message::$variant($parse(args)?)])
        }
        conv as Convertor
    }};
}

fn convert_lta(_path: &str, args: &[OscType], compat: TreeCompat) -> Result<Vec<Message>, Error> {
    Ok(vec![Message::LinkedTreeAssociation(
        LinkedTreeAssociation::parse(args, compat)?,
    )])
}

/// The default path/convertor table covering the full TUIO 2.0 + dTUIO set.
pub fn standard_convertors() -> Vec<(&'static str, Convertor)> {
    vec![
        (Frame::PATH, convertor!(Frame::parse => Frame)),
        (Alive::PATH, convertor!(Alive::parse => Alive)),
        (Pointer::PATH_2D, convertor!(Pointer::parse_2d => Pointer)),
        (Pointer::PATH_3D, convertor!(Pointer::parse_3d => Pointer)),
        (Token::PATH_2D, convertor!(Token::parse_2d => Token)),
        (Token::PATH_3D, convertor!(Token::parse_3d => Token)),
        (Bounds::PATH_2D, convertor!(Bounds::parse_2d => Bounds)),
        (Bounds::PATH_3D, convertor!(Bounds::parse_3d => Bounds)),
        (Symbol::PATH, convertor!(Symbol::parse => Symbol)),
        (Control::PATH, convertor!(Control::parse => Control)),
        (Data::PATH, convertor!(Data::parse => Data)),
        (Signal::PATH, convertor!(Signal::parse => Signal)),
        (ConvexHull::PATH, convertor!(ConvexHull::parse => ConvexHull)),
        (OuterContour::PATH, convertor!(OuterContour::parse => OuterContour)),
        (InnerContour::PATH, convertor!(InnerContour::parse => InnerContour)),
        (Skeleton::PATH_2D, convertor!(Skeleton::parse_2d => Skeleton)),
        (Skeleton::PATH_3D, convertor!(Skeleton::parse_3d => Skeleton)),
        (SkeletonVolume::PATH, convertor!(SkeletonVolume::parse => SkeletonVolume)),
        (Area::PATH, convertor!(Area::parse => Area)),
        (Raw::PATH, convertor!(Raw::parse => Raw)),
        (AliveAssociations::PATH, convertor!(AliveAssociations::parse => AliveAssociations)),
        (
            ContainerAssociation::PATH,
            convertor!(ContainerAssociation::parse => ContainerAssociation),
        ),
        (LinkAssociation::PATH, convertor!(LinkAssociation::parse => LinkAssociation)),
        (
            LinkedListAssociation::PATH,
            convertor!(LinkedListAssociation::parse => LinkedListAssociation),
        ),
        (LinkedTreeAssociation::PATH, convert_lta as Convertor),
        (SensorProperties::PATH, convertor!(SensorProperties::parse => SensorProperties)),
        (Viewport::PATH, convertor!(Viewport::parse => Viewport)),
        (GroupMember::PATH, convertor!(GroupMember::parse => GroupMember)),
        (Neighbour::PATH, convertor!(Neighbour::parse => Neighbour)),
        (
            GestureIdentification::PATH,
            convertor!(GestureIdentification::parse => GestureIdentification),
        ),
    ]
}

/// Path-keyed convertor registry plus encode support.
#[derive(Clone)]
pub struct Codec {
    convertors: HashMap<String, Convertor>,
    accept_unknown: bool,
    tree_compat: TreeCompat,
}

impl Default for Codec {
    fn default() -> Self {
        Codec::new(false, TreeCompat::default())
    }
}

impl Codec {
    pub fn new(accept_unknown: bool, tree_compat: TreeCompat) -> Self {
        let mut codec = Codec {
            convertors: HashMap::new(),
            accept_unknown,
            tree_compat,
        };
        for (path, convertor) in standard_convertors() {
            codec.enable_convertor(path, convertor);
        }
        codec
    }

    pub fn tree_compat(&self) -> TreeCompat {
        self.tree_compat
    }

    pub fn set_accept_unknown(&mut self, accept: bool) -> bool {
        std::mem::replace(&mut self.accept_unknown, accept)
    }

    /// Register a convertor for a path; an existing registration wins.
    pub fn enable_convertor(&mut self, path: &str, convertor: Convertor) {
        self.convertors.entry(path.to_string()).or_insert(convertor);
    }

    pub fn disable_convertor(&mut self, path: &str) -> bool {
        self.convertors.remove(path).is_some()
    }

    /// Convert one OSC message. `Ok(None)` means "unknown path, dropped".
    pub fn convert(&self, msg: &OscMessage) -> Result<Option<Vec<Message>>, Error> {
        match self.convertors.get(&msg.addr) {
            Some(convertor) => convertor(&msg.addr, &msg.args, self.tree_compat).map(Some),
            None if self.accept_unknown => Ok(Some(vec![Message::Opaque(Opaque {
                path: msg.addr.clone(),
                args: msg.args.clone(),
            })])),
            None => Ok(None),
        }
    }

    /// Flatten a packet into its OSC messages in positional order.
    fn flatten<'a>(packet: &'a OscPacket, out: &mut Vec<&'a OscMessage>) {
        match packet {
            OscPacket::Message(msg) => out.push(msg),
            OscPacket::Bundle(bundle) => {
                for inner in &bundle.content {
                    Self::flatten(inner, out);
                }
            }
        }
    }

    /// Decode a datagram into typed messages, flattening nested bundles.
    ///
    /// Per-message parse failures are reported through `on_error` and the
    /// offending message is skipped; the rest of the packet survives.
    pub fn decode(
        &self,
        data: &[u8],
        mut on_error: impl FnMut(&Error),
    ) -> Result<Vec<Message>, Error> {
        let (_rest, packet) = rosc::decoder::decode_udp(data)?;
        let mut raw = Vec::new();
        Self::flatten(&packet, &mut raw);

        let mut messages = Vec::new();
        for osc in raw {
            match self.convert(osc) {
                Ok(Some(converted)) => messages.extend(converted),
                Ok(None) => {}
                Err(err) => on_error(&err),
            }
        }
        Ok(messages)
    }

    /// Encode a bundle handle into one OSC bundle datagram.
    pub fn encode(&self, handle: &BundleHandle) -> Result<Vec<u8>, Error> {
        let mut content = Vec::new();
        for message in handle.iter() {
            let mut imprinted = Vec::new();
            message.imprint(&mut imprinted, self.tree_compat);
            content.extend(imprinted.into_iter().map(OscPacket::Message));
        }
        let bundle = OscBundle {
            timetag: OscTime { seconds: 0, fractional: 1 },
            content,
        };
        Ok(rosc::encoder::encode(&OscPacket::Bundle(bundle))?)
    }
}

/// Incremental assembler turning a message stream into bundle handles.
///
/// A `frm` clears any partial bundle and opens a new one; an `alv` completes
/// it; messages outside an open bundle are dropped.
#[derive(Debug, Default)]
pub struct BundleAssembler {
    current: BundleHandle,
    open: bool,
}

impl BundleAssembler {
    pub fn new() -> Self {
        BundleAssembler::default()
    }

    /// Feed one message; returns a completed handle when the alive arrives.
    pub fn push(&mut self, message: Message) -> Option<BundleHandle> {
        match &message {
            Message::Frame(_) => {
                self.current.clear();
                self.current.push(message);
                self.open = true;
                None
            }
            Message::Alive(_) if self.open => {
                self.current.push(message);
                self.open = false;
                Some(std::mem::take(&mut self.current))
            }
            _ if self.open => {
                self.current.push(message);
                None
            }
            // out-of-bundle message; an incomplete bundle leaves a mess
            _ => None,
        }
    }
}
