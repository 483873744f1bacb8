use rosc::{OscMessage, OscType};

use super::OutputMode;
use crate::error::Error;
use crate::geometry::Point3;
use crate::graph::Graph;
use crate::types::SessionId;

/// SKG message: skeleton of a contact region as a trunk tree of joints.
///
/// The wire form is a serialized trunk-tree walk: each float group is a
/// joint descending from the current one, each int32 is a rollback count.
/// Joint coordinates are pairs on `/tuio2/skg` and triples on `/tuio2/s3d`;
/// rollbacks stay unambiguous because of the type tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub session_id: SessionId,
    pub joints: Graph<Point3, ()>,
    pub output_mode: OutputMode,
}

impl Default for Skeleton {
    fn default() -> Self {
        Skeleton {
            session_id: 0,
            joints: Graph::new(),
            output_mode: OutputMode::TwoD,
        }
    }
}

impl Skeleton {
    pub const PATH_2D: &'static str = "/tuio2/skg";
    pub const PATH_3D: &'static str = "/tuio2/s3d";

    pub fn new(session_id: SessionId, output_mode: OutputMode) -> Self {
        Skeleton { session_id, joints: Graph::new(), output_mode }
    }

    /// Replace the joint tree; the graph must be a trunk tree.
    pub fn set_joints(&mut self, joints: Graph<Point3, ()>) -> Result<(), Error> {
        if !joints.is_empty() && !joints.is_trunk_tree() {
            return Err(Error::InvalidGraphTopology(
                "skeleton joints must form a trunk tree".into(),
            ));
        }
        self.joints = joints;
        Ok(())
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

    pub(crate) fn scale_joints(&mut self, factors: (f32, f32, f32)) {
        let handles: Vec<_> = self.joints.nodes().collect();
        for handle in handles {
            if let Some(point) = self.joints.node_value_mut(handle) {
                point.x *= factors.0;
                point.y *= factors.1;
                point.z *= factors.2;
            }
        }
    }

    fn imprint_walk(&self, args: &mut Vec<OscType>, three_d: bool) {
        for event in self.joints.trunk_tree_events().unwrap_or_default() {
            match event {
                crate::graph::WalkEvent::Node(node) => {
                    let point = self.joints.node_value(node).copied().unwrap_or_default();
                    args.push(OscType::Float(point.x));
                    args.push(OscType::Float(point.y));
                    if three_d {
                        args.push(OscType::Float(point.z));
                    }
                }
                crate::graph::WalkEvent::Rollback(count) => {
                    args.push(OscType::Int(count as i32));
                }
                crate::graph::WalkEvent::Edge(_) => {}
            }
        }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        if self.output_mode.has_2d() {
            let mut args = vec![OscType::Int(self.session_id as i32)];
            self.imprint_walk(&mut args, false);
            out.push(OscMessage { addr: Self::PATH_2D.to_string(), args });
        }
        if self.output_mode.has_3d() {
            let mut args = vec![OscType::Int(self.session_id as i32)];
            self.imprint_walk(&mut args, true);
            out.push(OscMessage { addr: Self::PATH_3D.to_string(), args });
        }
    }

    fn parse_walk(
        path: &'static str,
        sid: SessionId,
        mut rest: &[OscType],
        three_d: bool,
        mode: OutputMode,
    ) -> Result<Skeleton, Error> {
        let mut msg = Skeleton::new(sid, mode);
        let mut joints: Graph<Point3, ()> = Graph::new();
        let mut stack = Vec::new();
        let mut current = None;

        fn take_point<'a>(rest: &mut &'a [OscType], three_d: bool) -> Option<Point3> {
            let arity = if three_d { 3 } else { 2 };
            if rest.len() < arity {
                return None;
            }
            let mut coords = [0.0f32; 3];
            for (slot, arg) in coords.iter_mut().zip(rest.iter()).take(arity) {
                match arg {
                    OscType::Float(value) => *slot = *value,
                    _ => return None,
                }
            }
            *rest = &rest[arity..];
            Some(Point3::new(coords[0], coords[1], coords[2]))
        }

        while !rest.is_empty() {
            if let [OscType::Int(rollbacks), tail @ ..] = rest {
                let rollbacks = *rollbacks as usize;
                if rollbacks >= stack.len() {
                    return Err(Error::InvalidGraphTopology(
                        "skeleton rollback past the root".into(),
                    ));
                }
                for _ in 0..rollbacks {
                    stack.pop();
                }
                current = stack.last().copied();
                rest = tail;
                continue;
            }
            let mut cursor = rest;
            match take_point(&mut cursor, three_d) {
                Some(point) => {
                    rest = cursor;
                    let node = joints.create_node(point);
                    if let Some(parent) = current {
                        joints.create_edge(parent, node, ());
                    }
                    current = Some(node);
                    stack.push(node);
                }
                None => return Err(Error::malformed(path, "expected joint coordinates or rollback")),
            }
        }

        if !joints.is_empty() && !joints.is_trunk_tree() {
            return Err(Error::InvalidGraphTopology("skeleton is not a trunk tree".into()));
        }
        msg.joints = joints;
        Ok(msg)
    }

    pub fn parse_2d(args: &[OscType]) -> Result<Skeleton, Error> {
        match args.split_first() {
            Some((OscType::Int(sid), rest)) => {
                Self::parse_walk(Self::PATH_2D, *sid as u32, rest, false, OutputMode::TwoD)
            }
            _ => Err(Error::malformed(Self::PATH_2D, "expected leading session id")),
        }
    }

    pub fn parse_3d(args: &[OscType]) -> Result<Skeleton, Error> {
        match args.split_first() {
            Some((OscType::Int(sid), rest)) => {
                Self::parse_walk(Self::PATH_3D, *sid as u32, rest, true, OutputMode::ThreeD)
            }
            _ => Err(Error::malformed(Self::PATH_3D, "expected leading session id")),
        }
    }
}

impl std::fmt::Display for Skeleton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.output_mode.has_2d() { Self::PATH_2D } else { Self::PATH_3D };
        write!(f, "{} {}", path, self.session_id)?;
        for event in self.joints.trunk_tree_events().unwrap_or_default() {
            match event {
                crate::graph::WalkEvent::Node(node) => {
                    if let Some(point) = self.joints.node_value(node) {
                        write!(f, " {point}")?;
                    }
                }
                crate::graph::WalkEvent::Rollback(count) => write!(f, " {count}")?,
                crate::graph::WalkEvent::Edge(_) => {}
            }
        }
        Ok(())
    }
}

/// SVG message: per-joint radii complementing a skeleton.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkeletonVolume {
    pub session_id: SessionId,
    pub radii: Vec<f32>,
}

impl SkeletonVolume {
    pub const PATH: &'static str = "/tuio2/svg";

    pub fn new(session_id: SessionId, radii: Vec<f32>) -> Self {
        SkeletonVolume { session_id, radii }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let mut args = vec![OscType::Int(self.session_id as i32)];
        args.extend(self.radii.iter().map(|r| OscType::Float(*r)));
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<SkeletonVolume, Error> {
        let (sid, rest) = match args.split_first() {
            Some((OscType::Int(sid), rest)) => (*sid as u32, rest),
            _ => return Err(Error::malformed(Self::PATH, "expected leading session id")),
        };
        let mut radii = Vec::with_capacity(rest.len());
        for arg in rest {
            match arg {
                OscType::Float(radius) => radii.push(*radius),
                _ => return Err(Error::malformed(Self::PATH, "radii must be floats")),
            }
        }
        Ok(SkeletonVolume::new(sid, radii))
    }
}

impl std::fmt::Display for SkeletonVolume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", Self::PATH, self.session_id)?;
        for radius in &self.radii {
            write!(f, " ({radius})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forked_skeleton() -> Skeleton {
        // root -> a -> b, root -> c
        let mut msg = Skeleton::new(5, OutputMode::TwoD);
        let mut joints = Graph::new();
        let root = joints.create_node(Point3::new(0.5, 0.5, 0.0));
        let a = joints.create_node(Point3::new(0.4, 0.4, 0.0));
        let b = joints.create_node(Point3::new(0.3, 0.3, 0.0));
        let c = joints.create_node(Point3::new(0.6, 0.4, 0.0));
        joints.create_edge(root, a, ());
        joints.create_edge(a, b, ());
        joints.create_edge(root, c, ());
        msg.set_joints(joints).unwrap();
        msg
    }

    #[test]
    fn test_skeleton_2d_round_trip() {
        let skg = forked_skeleton();
        let mut out = Vec::new();
        skg.imprint(&mut out);
        assert_eq!(out[0].addr, Skeleton::PATH_2D);
        // sid + 4 joints * 2 floats + 1 rollback
        assert_eq!(out[0].args.len(), 1 + 8 + 1);
        let parsed = Skeleton::parse_2d(&out[0].args).unwrap();
        assert_eq!(parsed, skg);
    }

    #[test]
    fn test_skeleton_3d_round_trip() {
        let mut skg = forked_skeleton();
        skg.output_mode = OutputMode::ThreeD;
        let mut out = Vec::new();
        skg.imprint(&mut out);
        assert_eq!(out[0].addr, Skeleton::PATH_3D);
        let parsed = Skeleton::parse_3d(&out[0].args).unwrap();
        assert_eq!(parsed.joints, skg.joints);
    }

    #[test]
    fn test_skeleton_rollback_past_root_rejected() {
        let args = vec![
            OscType::Int(1),
            OscType::Float(0.1),
            OscType::Float(0.1),
            OscType::Int(5),
        ];
        assert!(Skeleton::parse_2d(&args).is_err());
    }

    #[test]
    fn test_skeleton_volume_round_trip() {
        let svg = SkeletonVolume::new(5, vec![0.1, 0.2, 0.3]);
        let mut out = Vec::new();
        svg.imprint(&mut out);
        assert_eq!(SkeletonVolume::parse(&out[0].args).unwrap(), svg);
    }
}
