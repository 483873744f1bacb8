use rosc::{OscMessage, OscType};

use super::TreeCompat;
use crate::error::Error;
use crate::graph::Graph;
use crate::types::{
    compile_link_ports, decompile_link_ports, LinkPort, SessionId, SessionSet,
};

/// Whether an association describes a physical connection or a logical one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkType {
    #[default]
    Physical,
    Logical,
}

/// Input/output ports of one link edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkEntry {
    pub input_port: LinkPort,
    pub output_port: LinkPort,
}

/// The link graphs carried by LIA/LLA/LTA: session ids on nodes, ports on
/// edges.
pub type LinkGraph = Graph<SessionId, LinkEntry>;

/// ALA message: ids of the currently associated sessions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AliveAssociations {
    pub associations: SessionSet,
}

impl AliveAssociations {
    pub const PATH: &'static str = "/tuio2/ala";

    pub fn new(associations: SessionSet) -> Self {
        AliveAssociations { associations }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let args = self
            .associations
            .iter()
            .map(|sid| OscType::Int(*sid as i32))
            .collect();
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<AliveAssociations, Error> {
        let mut associations = SessionSet::new();
        for arg in args {
            match arg {
                OscType::Int(sid) => {
                    associations.insert(*sid as u32);
                }
                _ => return Err(Error::malformed(Self::PATH, "expected int32 session ids")),
            }
        }
        Ok(AliveAssociations { associations })
    }
}

impl std::fmt::Display for AliveAssociations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Self::PATH)?;
        for sid in &self.associations {
            write!(f, " {sid}")?;
        }
        Ok(())
    }
}

/// COA message: sessions contained in a slot of a container session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContainerAssociation {
    pub session_id: SessionId,
    pub slot: u32,
    pub associations: SessionSet,
}

impl ContainerAssociation {
    pub const PATH: &'static str = "/tuio2/coa";

    pub fn new(session_id: SessionId, slot: u32, associations: SessionSet) -> Self {
        ContainerAssociation { session_id, slot, associations }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let mut args = vec![
            OscType::Int(self.session_id as i32),
            OscType::Int(self.slot as i32),
        ];
        args.extend(self.associations.iter().map(|sid| OscType::Int(*sid as i32)));
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<ContainerAssociation, Error> {
        let (sid, slot, rest) = match args {
            [OscType::Int(sid), OscType::Int(slot), rest @ ..] => {
                (*sid as u32, *slot as u32, rest)
            }
            _ => return Err(Error::malformed(Self::PATH, "expected 'ii' prefix")),
        };
        let mut associations = SessionSet::new();
        for arg in rest {
            match arg {
                OscType::Int(member) => {
                    associations.insert(*member as u32);
                }
                _ => return Err(Error::malformed(Self::PATH, "members must be int32")),
            }
        }
        Ok(ContainerAssociation::new(sid, slot, associations))
    }
}

impl std::fmt::Display for ContainerAssociation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} #{}", Self::PATH, self.session_id, self.slot)?;
        for sid in &self.associations {
            write!(f, " {sid}")?;
        }
        Ok(())
    }
}

fn link_type_arg(link_type: LinkType) -> OscType {
    OscType::Bool(link_type == LinkType::Physical)
}

fn parse_link_type(path: &str, arg: Option<&OscType>) -> Result<LinkType, Error> {
    match arg {
        Some(OscType::Bool(true)) => Ok(LinkType::Physical),
        Some(OscType::Bool(false)) => Ok(LinkType::Logical),
        _ => Err(Error::malformed(path, "expected physical/logical flag")),
    }
}

/// Remap every node value of a link graph and return the rebuilt graph.
fn remap_graph(graph: &LinkGraph, mut map: impl FnMut(SessionId) -> SessionId) -> LinkGraph {
    let mut rebuilt = LinkGraph::new();
    let handles: Vec<_> = graph.nodes().collect();
    let mut translated = std::collections::HashMap::new();
    for handle in &handles {
        let value = map(*graph.node_value(*handle).unwrap());
        translated.insert(*handle, rebuilt.create_node(value));
    }
    for edge in graph.edges() {
        let (from, to) = graph.edge_endpoints(edge).unwrap();
        rebuilt.create_edge(
            translated[&from],
            translated[&to],
            *graph.edge_value(edge).unwrap(),
        );
    }
    rebuilt
}

/// LIA message: direct links from one session to a set of targets.
///
/// Internally held as a graph so id remapping can treat all association
/// messages uniformly; the wire form carries the origin's outgoing links.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkAssociation {
    pub session_id: SessionId,
    pub link_type: LinkType,
    graph: LinkGraph,
}

impl Default for LinkAssociation {
    fn default() -> Self {
        LinkAssociation::new(0, LinkType::Physical)
    }
}

impl LinkAssociation {
    pub const PATH: &'static str = "/tuio2/lia";

    pub fn new(session_id: SessionId, link_type: LinkType) -> Self {
        let mut graph = LinkGraph::new();
        graph.create_node(session_id);
        LinkAssociation { session_id, link_type, graph }
    }

    pub fn add_link(&mut self, target: SessionId, entry: LinkEntry) {
        let origin = self.graph.origin_leaf().expect("origin maintained by construction");
        let node = self.graph.create_node(target);
        self.graph.create_edge(origin, node, entry);
    }

    pub fn link_graph(&self) -> &LinkGraph {
        &self.graph
    }

    /// Replace the link graph; it must stay a DAG with a unique origin.
    pub fn set_link_graph(&mut self, graph: LinkGraph) -> Result<(), Error> {
        if graph.is_empty() {
            self.graph = LinkGraph::new();
            self.graph.create_node(self.session_id);
            return Ok(());
        }
        if graph.contains_oriented_cycle() {
            return Err(Error::InvalidGraphTopology(
                "link association must stay acyclic".into(),
            ));
        }
        let origin = graph.origin_leaf()?;
        self.session_id = *graph.node_value(origin).unwrap();
        self.graph = graph;
        Ok(())
    }

    pub fn set_session_id(&mut self, sid: SessionId) {
        self.session_id = sid;
        if let Ok(origin) = self.graph.origin_leaf() {
            if let Some(value) = self.graph.node_value_mut(origin) {
                *value = sid;
            }
        }
    }

    /// Rewrite every embedded session id through the mapping.
    pub fn remap_session_ids(&mut self, map: impl FnMut(SessionId) -> SessionId) {
        self.graph = remap_graph(&self.graph, map);
        if let Ok(origin) = self.graph.origin_leaf() {
            self.session_id = *self.graph.node_value(origin).unwrap();
        }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let mut args = vec![
            OscType::Int(self.session_id as i32),
            link_type_arg(self.link_type),
        ];
        if let Ok(origin) = self.graph.origin_leaf() {
            for edge in self.graph.edges_from(origin) {
                let (_, target) = self.graph.edge_endpoints(edge).unwrap();
                let entry = self.graph.edge_value(edge).unwrap();
                args.push(OscType::Int(*self.graph.node_value(target).unwrap() as i32));
                args.push(OscType::Int(
                    compile_link_ports(entry.input_port, entry.output_port) as i32,
                ));
            }
        }
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<LinkAssociation, Error> {
        let (sid, rest) = match args.split_first() {
            Some((OscType::Int(sid), rest)) => (*sid as u32, rest),
            _ => return Err(Error::malformed(Self::PATH, "expected leading session id")),
        };
        let link_type = parse_link_type(Self::PATH, rest.first())?;
        let rest = &rest[1..];
        if rest.len() % 2 != 0 {
            return Err(Error::malformed(Self::PATH, "dangling link field"));
        }
        let mut msg = LinkAssociation::new(sid, link_type);
        for pair in rest.chunks(2) {
            match pair {
                [OscType::Int(target), OscType::Int(ports)] => {
                    let (input_port, output_port) = decompile_link_ports(*ports as u32);
                    msg.add_link(*target as u32, LinkEntry { input_port, output_port });
                }
                _ => return Err(Error::malformed(Self::PATH, "links must be int32 pairs")),
            }
        }
        Ok(msg)
    }
}

impl std::fmt::Display for LinkAssociation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            Self::PATH,
            self.session_id,
            self.link_type == LinkType::Physical
        )?;
        if let Ok(origin) = self.graph.origin_leaf() {
            for edge in self.graph.edges_from(origin) {
                let (_, target) = self.graph.edge_endpoints(edge).unwrap();
                let entry = self.graph.edge_value(edge).unwrap();
                write!(
                    f,
                    " {}:{}:{}",
                    self.graph.node_value(target).unwrap(),
                    entry.output_port,
                    entry.input_port
                )?;
            }
        }
        Ok(())
    }
}

/// LLA message: an oriented chain of linked sessions.
///
/// The session id and the origin leaf's value are kept in sync: setting the
/// graph refreshes the id from the origin, setting the id rewrites the
/// origin's value.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedListAssociation {
    session_id: SessionId,
    pub link_type: LinkType,
    graph: LinkGraph,
}

impl Default for LinkedListAssociation {
    fn default() -> Self {
        LinkedListAssociation::new(0, LinkType::Physical)
    }
}

impl LinkedListAssociation {
    pub const PATH: &'static str = "/tuio2/lla";

    pub fn new(session_id: SessionId, link_type: LinkType) -> Self {
        let mut graph = LinkGraph::new();
        graph.create_node(session_id);
        LinkedListAssociation { session_id, link_type, graph }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn link_graph(&self) -> &LinkGraph {
        &self.graph
    }

    /// Replace the link graph; a non-empty graph must be linear oriented.
    pub fn set_link_graph(&mut self, graph: LinkGraph) -> Result<(), Error> {
        if graph.is_empty() {
            self.graph = LinkGraph::new();
            self.graph.create_node(self.session_id);
            return Ok(());
        }
        if !graph.is_linear_oriented() {
            return Err(Error::InvalidGraphTopology(
                "linear oriented topology expected".into(),
            ));
        }
        let origin = graph.origin_leaf()?;
        self.session_id = *graph.node_value(origin).unwrap();
        self.graph = graph;
        Ok(())
    }

    pub fn set_session_id(&mut self, sid: SessionId) {
        self.session_id = sid;
        if let Ok(origin) = self.graph.origin_leaf() {
            if let Some(value) = self.graph.node_value_mut(origin) {
                *value = sid;
            }
        }
    }

    pub fn remap_session_ids(&mut self, map: impl FnMut(SessionId) -> SessionId) {
        self.graph = remap_graph(&self.graph, map);
        if let Ok(origin) = self.graph.origin_leaf() {
            self.session_id = *self.graph.node_value(origin).unwrap();
        }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let mut args = vec![
            OscType::Int(self.session_id as i32),
            link_type_arg(self.link_type),
        ];
        let mut pending_entry = LinkEntry::default();
        let mut first = true;
        for event in self.graph.linear_events().unwrap_or_default() {
            match event {
                crate::graph::WalkEvent::Edge(edge) => {
                    pending_entry = *self.graph.edge_value(edge).unwrap();
                }
                crate::graph::WalkEvent::Node(node) if !first => {
                    args.push(OscType::Int(*self.graph.node_value(node).unwrap() as i32));
                    args.push(OscType::Int(compile_link_ports(
                        pending_entry.input_port,
                        pending_entry.output_port,
                    ) as i32));
                }
                _ => first = false,
            }
        }
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<LinkedListAssociation, Error> {
        let (sid, rest) = match args.split_first() {
            Some((OscType::Int(sid), rest)) => (*sid as u32, rest),
            _ => return Err(Error::malformed(Self::PATH, "expected leading session id")),
        };
        let link_type = parse_link_type(Self::PATH, rest.first())?;
        let rest = &rest[1..];
        if rest.len() % 2 != 0 {
            return Err(Error::malformed(Self::PATH, "dangling link field"));
        }

        let mut graph = LinkGraph::new();
        let mut current = graph.create_node(sid);
        for pair in rest.chunks(2) {
            match pair {
                [OscType::Int(target), OscType::Int(ports)] => {
                    let (input_port, output_port) = decompile_link_ports(*ports as u32);
                    let next = graph.create_node(*target as u32);
                    graph.create_edge(current, next, LinkEntry { input_port, output_port });
                    current = next;
                }
                _ => return Err(Error::malformed(Self::PATH, "links must be int32 pairs")),
            }
        }

        let mut msg = LinkedListAssociation::new(sid, link_type);
        msg.set_link_graph(graph)?;
        Ok(msg)
    }
}

impl std::fmt::Display for LinkedListAssociation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            Self::PATH,
            self.session_id,
            self.link_type == LinkType::Physical
        )?;
        let mut pending_entry = LinkEntry::default();
        let mut first = true;
        for event in self.graph.linear_events().unwrap_or_default() {
            match event {
                crate::graph::WalkEvent::Edge(edge) => {
                    pending_entry = *self.graph.edge_value(edge).unwrap();
                }
                crate::graph::WalkEvent::Node(node) if !first => {
                    write!(
                        f,
                        " {}:{}:{}",
                        self.graph.node_value(node).unwrap(),
                        pending_entry.output_port,
                        pending_entry.input_port
                    )?;
                }
                _ => first = false,
            }
        }
        Ok(())
    }
}

/// LTA message: a trunk tree of linked sessions.
///
/// The draft serialization cannot distinguish a descend from a rollback; in
/// lenient mode each descend pair is prefixed with a `True` marker, in
/// strict mode parsing rejects the message outright.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedTreeAssociation {
    session_id: SessionId,
    pub link_type: LinkType,
    graph: LinkGraph,
}

impl Default for LinkedTreeAssociation {
    fn default() -> Self {
        LinkedTreeAssociation::new(0, LinkType::Physical)
    }
}

impl LinkedTreeAssociation {
    pub const PATH: &'static str = "/tuio2/lta";

    pub fn new(session_id: SessionId, link_type: LinkType) -> Self {
        let mut graph = LinkGraph::new();
        graph.create_node(session_id);
        LinkedTreeAssociation { session_id, link_type, graph }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn link_graph(&self) -> &LinkGraph {
        &self.graph
    }

    /// Replace the link graph; a non-empty graph must be a trunk tree.
    pub fn set_link_graph(&mut self, graph: LinkGraph) -> Result<(), Error> {
        if graph.is_empty() {
            self.graph = LinkGraph::new();
            self.graph.create_node(self.session_id);
            return Ok(());
        }
        if !graph.is_trunk_tree() {
            return Err(Error::InvalidGraphTopology("trunk tree topology expected".into()));
        }
        let origin = graph.origin_leaf()?;
        self.session_id = *graph.node_value(origin).unwrap();
        self.graph = graph;
        Ok(())
    }

    pub fn set_session_id(&mut self, sid: SessionId) {
        self.session_id = sid;
        if let Ok(origin) = self.graph.origin_leaf() {
            if let Some(value) = self.graph.node_value_mut(origin) {
                *value = sid;
            }
        }
    }

    pub fn remap_session_ids(&mut self, map: impl FnMut(SessionId) -> SessionId) {
        self.graph = remap_graph(&self.graph, map);
        if let Ok(origin) = self.graph.origin_leaf() {
            self.session_id = *self.graph.node_value(origin).unwrap();
        }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>, compat: TreeCompat) {
        let mut args = vec![
            OscType::Int(self.session_id as i32),
            link_type_arg(self.link_type),
        ];
        let mut pending_entry = LinkEntry::default();
        let mut first = true;
        for event in self.graph.trunk_tree_events().unwrap_or_default() {
            match event {
                crate::graph::WalkEvent::Edge(edge) => {
                    pending_entry = *self.graph.edge_value(edge).unwrap();
                }
                crate::graph::WalkEvent::Node(node) if !first => {
                    if compat == TreeCompat::Lenient {
                        args.push(OscType::Bool(true));
                    }
                    args.push(OscType::Int(*self.graph.node_value(node).unwrap() as i32));
                    args.push(OscType::Int(compile_link_ports(
                        pending_entry.input_port,
                        pending_entry.output_port,
                    ) as i32));
                }
                crate::graph::WalkEvent::Rollback(count) => {
                    args.push(OscType::Int(count as i32));
                }
                _ => first = false,
            }
        }
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType], compat: TreeCompat) -> Result<LinkedTreeAssociation, Error> {
        if compat == TreeCompat::Strict {
            return Err(Error::LtaUnsupported);
        }
        let (sid, rest) = match args.split_first() {
            Some((OscType::Int(sid), rest)) => (*sid as u32, rest),
            _ => return Err(Error::malformed(Self::PATH, "expected leading session id")),
        };
        let link_type = parse_link_type(Self::PATH, rest.first())?;
        let mut rest = &rest[1..];

        let mut graph = LinkGraph::new();
        let root = graph.create_node(sid);
        let mut stack = vec![root];
        let mut current = root;

        while !rest.is_empty() {
            match rest {
                [OscType::Bool(true), OscType::Int(target), OscType::Int(ports), tail @ ..] => {
                    let (input_port, output_port) = decompile_link_ports(*ports as u32);
                    let next = graph.create_node(*target as u32);
                    graph.create_edge(current, next, LinkEntry { input_port, output_port });
                    current = next;
                    stack.push(next);
                    rest = tail;
                }
                [OscType::Int(rollbacks), tail @ ..] => {
                    let rollbacks = *rollbacks as usize;
                    if rollbacks >= stack.len() {
                        return Err(Error::InvalidGraphTopology(
                            "tree rollback past the root".into(),
                        ));
                    }
                    for _ in 0..rollbacks {
                        stack.pop();
                    }
                    current = *stack.last().unwrap();
                    rest = tail;
                }
                _ => {
                    return Err(Error::malformed(
                        Self::PATH,
                        "expected marked descend pair or rollback count",
                    ))
                }
            }
        }

        let mut msg = LinkedTreeAssociation::new(sid, link_type);
        msg.set_link_graph(graph)?;
        Ok(msg)
    }
}

impl std::fmt::Display for LinkedTreeAssociation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            Self::PATH,
            self.session_id,
            self.link_type == LinkType::Physical
        )?;
        let mut pending_entry = LinkEntry::default();
        let mut first = true;
        for event in self.graph.trunk_tree_events().unwrap_or_default() {
            match event {
                crate::graph::WalkEvent::Edge(edge) => {
                    pending_entry = *self.graph.edge_value(edge).unwrap();
                }
                crate::graph::WalkEvent::Node(node) if !first => {
                    write!(
                        f,
                        " {}:{}:{}",
                        self.graph.node_value(node).unwrap(),
                        pending_entry.output_port,
                        pending_entry.input_port
                    )?;
                }
                crate::graph::WalkEvent::Rollback(count) => {
                    write!(f, " {count}")?;
                }
                _ => first = false,
            }
        }
        Ok(())
    }
}
