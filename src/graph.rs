//! Directed graph with stable node/edge handles.
//!
//! Nodes and edges live in generational arenas: a handle is an index plus a
//! generation, stays valid across unrelated mutations, and turns stale (and
//! detectable as such) when its slot is reused.

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug, Clone)]
struct NodeData<N> {
    value: N,
}

#[derive(Debug, Clone)]
struct EdgeData<E> {
    from: NodeHandle,
    to: NodeHandle,
    value: E,
}

#[derive(Debug, Clone)]
pub struct Graph<N, E> {
    nodes: Vec<Slot<NodeData<N>>>,
    edges: Vec<Slot<EdgeData<E>>>,
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Graph { nodes: Vec::new(), edges: Vec::new() }
    }
}

impl<N, E> Graph<N, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|s| s.value.is_some()).count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|s| s.value.is_some()).count()
    }

    pub fn create_node(&mut self, value: N) -> NodeHandle {
        if let Some(index) = self.nodes.iter().position(|s| s.value.is_none()) {
            let slot = &mut self.nodes[index];
            slot.generation += 1;
            slot.value = Some(NodeData { value });
            NodeHandle { index: index as u32, generation: slot.generation }
        } else {
            self.nodes.push(Slot { generation: 0, value: Some(NodeData { value }) });
            NodeHandle { index: (self.nodes.len() - 1) as u32, generation: 0 }
        }
    }

    /// Removes the node and every edge incident to it.
    pub fn remove_node(&mut self, node: NodeHandle) {
        if !self.contains_node(node) {
            return;
        }
        for slot in self.edges.iter_mut() {
            if let Some(edge) = &slot.value {
                if edge.from == node || edge.to == node {
                    slot.value = None;
                }
            }
        }
        self.nodes[node.index as usize].value = None;
    }

    pub fn create_edge(&mut self, from: NodeHandle, to: NodeHandle, value: E) -> EdgeHandle {
        debug_assert!(self.contains_node(from) && self.contains_node(to));
        if let Some(index) = self.edges.iter().position(|s| s.value.is_none()) {
            let slot = &mut self.edges[index];
            slot.generation += 1;
            slot.value = Some(EdgeData { from, to, value });
            EdgeHandle { index: index as u32, generation: slot.generation }
        } else {
            self.edges.push(Slot { generation: 0, value: Some(EdgeData { from, to, value }) });
            EdgeHandle { index: (self.edges.len() - 1) as u32, generation: 0 }
        }
    }

    pub fn remove_edge(&mut self, edge: EdgeHandle) {
        if self.contains_edge(edge) {
            self.edges[edge.index as usize].value = None;
        }
    }

    pub fn contains_node(&self, node: NodeHandle) -> bool {
        self.nodes
            .get(node.index as usize)
            .map(|s| s.generation == node.generation && s.value.is_some())
            .unwrap_or(false)
    }

    pub fn contains_edge(&self, edge: EdgeHandle) -> bool {
        self.edges
            .get(edge.index as usize)
            .map(|s| s.generation == edge.generation && s.value.is_some())
            .unwrap_or(false)
    }

    pub fn node_value(&self, node: NodeHandle) -> Option<&N> {
        if !self.contains_node(node) {
            return None;
        }
        self.nodes[node.index as usize].value.as_ref().map(|d| &d.value)
    }

    pub fn node_value_mut(&mut self, node: NodeHandle) -> Option<&mut N> {
        if !self.contains_node(node) {
            return None;
        }
        self.nodes[node.index as usize].value.as_mut().map(|d| &mut d.value)
    }

    pub fn edge_value(&self, edge: EdgeHandle) -> Option<&E> {
        if !self.contains_edge(edge) {
            return None;
        }
        self.edges[edge.index as usize].value.as_ref().map(|d| &d.value)
    }

    pub fn edge_endpoints(&self, edge: EdgeHandle) -> Option<(NodeHandle, NodeHandle)> {
        if !self.contains_edge(edge) {
            return None;
        }
        self.edges[edge.index as usize].value.as_ref().map(|d| (d.from, d.to))
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.nodes.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|_| NodeHandle {
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeHandle> + '_ {
        self.edges.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|_| EdgeHandle {
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    /// Edges leaving the node.
    pub fn edges_from(&self, node: NodeHandle) -> impl Iterator<Item = EdgeHandle> + '_ {
        self.edges().filter(move |e| self.edge_endpoints(*e).map(|(f, _)| f) == Some(node))
    }

    /// Edges entering the node.
    pub fn edges_to(&self, node: NodeHandle) -> impl Iterator<Item = EdgeHandle> + '_ {
        self.edges().filter(move |e| self.edge_endpoints(*e).map(|(_, t)| t) == Some(node))
    }

    pub fn out_degree(&self, node: NodeHandle) -> usize {
        self.edges_from(node).count()
    }

    pub fn in_degree(&self, node: NodeHandle) -> usize {
        self.edges_to(node).count()
    }

    /// DFS with a recursion stack.
    pub fn contains_oriented_cycle(&self) -> bool {
        use std::collections::HashSet;
        let mut finished: HashSet<NodeHandle> = HashSet::new();

        for start in self.nodes() {
            if finished.contains(&start) {
                continue;
            }
            let mut on_stack: HashSet<NodeHandle> = HashSet::new();
            // (node, successor iterator position)
            let mut stack: Vec<(NodeHandle, Vec<NodeHandle>)> = Vec::new();
            let successors = |n: NodeHandle| -> Vec<NodeHandle> {
                self.edges_from(n)
                    .filter_map(|e| self.edge_endpoints(e).map(|(_, t)| t))
                    .collect()
            };
            on_stack.insert(start);
            stack.push((start, successors(start)));
            while let Some((node, succ)) = stack.last_mut() {
                if let Some(next) = succ.pop() {
                    if on_stack.contains(&next) {
                        return true;
                    }
                    if !finished.contains(&next) {
                        on_stack.insert(next);
                        let s = successors(next);
                        stack.push((next, s));
                    }
                } else {
                    on_stack.remove(node);
                    finished.insert(*node);
                    stack.pop();
                }
            }
        }
        false
    }

    /// Union-find over the edge set, ignoring orientation.
    pub fn contains_unoriented_cycle(&self) -> bool {
        use std::collections::HashMap;
        let mut parent: HashMap<NodeHandle, NodeHandle> = HashMap::new();
        fn find(parent: &mut HashMap<NodeHandle, NodeHandle>, n: NodeHandle) -> NodeHandle {
            let p = *parent.entry(n).or_insert(n);
            if p == n {
                n
            } else {
                let root = find(parent, p);
                parent.insert(n, root);
                root
            }
        }
        for edge in self.edges() {
            let (from, to) = self.edge_endpoints(edge).unwrap();
            let rf = find(&mut parent, from);
            let rt = find(&mut parent, to);
            if rf == rt {
                return true;
            }
            parent.insert(rf, rt);
        }
        false
    }

    fn is_connected_unoriented(&self) -> bool {
        use std::collections::HashSet;
        let mut nodes = self.nodes();
        let start = match nodes.next() {
            Some(n) => n,
            None => return true,
        };
        let mut seen: HashSet<NodeHandle> = HashSet::new();
        let mut queue = vec![start];
        seen.insert(start);
        while let Some(node) = queue.pop() {
            for edge in self.edges() {
                let (from, to) = self.edge_endpoints(edge).unwrap();
                let other = if from == node {
                    to
                } else if to == node {
                    from
                } else {
                    continue;
                };
                if seen.insert(other) {
                    queue.push(other);
                }
            }
        }
        seen.len() == self.node_count()
    }

    /// Every node has in- and out-degree at most one, exactly one node has
    /// in-degree zero and one has out-degree zero, and the graph is connected.
    pub fn is_linear_oriented(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut origins = 0;
        let mut terminals = 0;
        for node in self.nodes() {
            let ind = self.in_degree(node);
            let outd = self.out_degree(node);
            if ind > 1 || outd > 1 {
                return false;
            }
            if ind == 0 {
                origins += 1;
            }
            if outd == 0 {
                terminals += 1;
            }
        }
        origins == 1 && terminals == 1 && self.is_connected_unoriented()
    }

    /// Rooted out-tree: exactly one origin node, no unoriented cycles,
    /// every other node with in-degree one, connected.
    pub fn is_trunk_tree(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        if self.contains_unoriented_cycle() {
            return false;
        }
        let mut origins = 0;
        for node in self.nodes() {
            match self.in_degree(node) {
                0 => origins += 1,
                1 => {}
                _ => return false,
            }
        }
        origins == 1 && self.is_connected_unoriented()
    }

    /// The unique node with in-degree zero.
    pub fn origin_leaf(&self) -> Result<NodeHandle, Error> {
        let mut origin = None;
        for node in self.nodes() {
            if self.in_degree(node) == 0 {
                if origin.is_some() {
                    return Err(Error::BadOriginLeaf);
                }
                origin = Some(node);
            }
        }
        origin.ok_or(Error::BadOriginLeaf)
    }

    /// Ordered event stream of a linear walk: the origin node, then each
    /// edge followed by the node it leads into.
    pub fn linear_events(&self) -> Result<Vec<WalkEvent>, Error> {
        let mut events = Vec::new();
        if self.is_empty() {
            return Ok(events);
        }
        let mut current = self.origin_leaf()?;
        events.push(WalkEvent::Node(current));
        while let Some(edge) = self.edges_from(current).next() {
            events.push(WalkEvent::Edge(edge));
            current = self.edge_endpoints(edge).unwrap().1;
            events.push(WalkEvent::Node(current));
        }
        Ok(events)
    }

    /// Ordered event stream of a trunk-tree DFS. A `Rollback(n)` event
    /// precedes a descend whenever the traversal backtracked `n` steps
    /// since the previous descend. Children are visited in edge creation
    /// order, so a graph rebuilt from a serialized walk replays the
    /// identical stream.
    pub fn trunk_tree_events(&self) -> Result<Vec<WalkEvent>, Error> {
        let mut events = Vec::new();
        if self.is_empty() {
            return Ok(events);
        }
        let root = self.origin_leaf()?;
        // path of nodes from root to the node being visited
        let mut path: Vec<NodeHandle> = vec![root];
        events.push(WalkEvent::Node(root));
        // per-path-entry list of untaken child edges, in creation order
        let mut pending: Vec<Vec<EdgeHandle>> = vec![{
            let mut v: Vec<EdgeHandle> = self.edges_from(root).collect();
            v.reverse();
            v
        }];
        let mut depth_at_last_descend = 0usize;
        while let Some(children) = pending.last_mut() {
            match children.pop() {
                Some(edge) => {
                    let rollbacks = depth_at_last_descend.saturating_sub(path.len() - 1);
                    if rollbacks > 0 {
                        events.push(WalkEvent::Rollback(rollbacks));
                    }
                    events.push(WalkEvent::Edge(edge));
                    let (_, to) = self.edge_endpoints(edge).unwrap();
                    events.push(WalkEvent::Node(to));
                    path.push(to);
                    depth_at_last_descend = path.len() - 1;
                    let mut v: Vec<EdgeHandle> = self.edges_from(to).collect();
                    v.reverse();
                    pending.push(v);
                }
                None => {
                    pending.pop();
                    path.pop();
                }
            }
        }
        Ok(events)
    }

    /// Visits the nodes of a linear-oriented graph head to tail. The edge
    /// visitor runs before the node it leads into.
    pub fn linear_walk(
        &self,
        mut visit_node: impl FnMut(NodeHandle),
        mut visit_edge: impl FnMut(EdgeHandle),
    ) -> Result<(), Error> {
        for event in self.linear_events()? {
            match event {
                WalkEvent::Node(node) => visit_node(node),
                WalkEvent::Edge(edge) => visit_edge(edge),
                WalkEvent::Rollback(_) => unreachable!(),
            }
        }
        Ok(())
    }

    /// DFS over a trunk tree. The rollback visitor receives the number of
    /// steps the traversal backtracks before descending into a new subtree.
    pub fn trunk_tree_walk(
        &self,
        mut visit_node: impl FnMut(NodeHandle),
        mut visit_edge: impl FnMut(EdgeHandle),
        mut rollback: impl FnMut(usize),
    ) -> Result<(), Error> {
        for event in self.trunk_tree_events()? {
            match event {
                WalkEvent::Node(node) => visit_node(node),
                WalkEvent::Edge(edge) => visit_edge(edge),
                WalkEvent::Rollback(count) => rollback(count),
            }
        }
        Ok(())
    }
}

/// One step of a graph walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEvent {
    Node(NodeHandle),
    Edge(EdgeHandle),
    Rollback(usize),
}

impl<N: PartialEq, E: PartialEq> PartialEq for Graph<N, E> {
    /// Structural equality over live slots in iteration order; graphs built
    /// by replaying the same creation sequence compare equal.
    fn eq(&self, other: &Self) -> bool {
        let nodes_a: Vec<&N> = self.nodes().filter_map(|n| self.node_value(n)).collect();
        let nodes_b: Vec<&N> = other.nodes().filter_map(|n| other.node_value(n)).collect();
        if nodes_a != nodes_b {
            return false;
        }
        let edge_key = |g: &Self, e: EdgeHandle| -> Option<(u32, u32)> {
            g.edge_endpoints(e).map(|(f, t)| (f.index, t.index))
        };
        let edges_a: Vec<(Option<(u32, u32)>, &E)> = self
            .edges()
            .filter_map(|e| self.edge_value(e).map(|v| (edge_key(self, e), v)))
            .collect();
        let edges_b: Vec<(Option<(u32, u32)>, &E)> = other
            .edges()
            .filter_map(|e| other.edge_value(e).map(|v| (edge_key(other, e), v)))
            .collect();
        edges_a == edges_b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(values: &[i32]) -> (Graph<i32, i32>, Vec<NodeHandle>) {
        let mut graph = Graph::new();
        let nodes: Vec<NodeHandle> = values.iter().map(|v| graph.create_node(*v)).collect();
        for pair in nodes.windows(2) {
            graph.create_edge(pair[0], pair[1], 0);
        }
        (graph, nodes)
    }

    #[test]
    fn test_handles_survive_unrelated_mutations() {
        let mut graph: Graph<i32, i32> = Graph::new();
        let a = graph.create_node(1);
        let b = graph.create_node(2);
        let c = graph.create_node(3);
        graph.remove_node(b);
        assert!(graph.contains_node(a) && graph.contains_node(c));
        assert_eq!(graph.node_value(a), Some(&1));
        // the freed slot is reused with a bumped generation
        let d = graph.create_node(4);
        assert!(!graph.contains_node(b));
        assert_eq!(graph.node_value(d), Some(&4));
    }

    #[test]
    fn test_remove_node_drops_incident_edges() {
        let mut graph: Graph<i32, i32> = Graph::new();
        let a = graph.create_node(1);
        let b = graph.create_node(2);
        let e = graph.create_edge(a, b, 21);
        graph.remove_node(b);
        assert!(!graph.contains_edge(e));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_oriented_cycle_detection() {
        let (mut graph, nodes) = chain(&[1, 2, 3]);
        assert!(!graph.contains_oriented_cycle());
        graph.create_edge(nodes[2], nodes[0], 0);
        assert!(graph.contains_oriented_cycle());
    }

    #[test]
    fn test_unoriented_cycle_detection() {
        let (mut graph, nodes) = chain(&[1, 2, 3]);
        assert!(!graph.contains_unoriented_cycle());
        // a diamond closes an unoriented cycle without an oriented one
        graph.create_edge(nodes[0], nodes[2], 0);
        assert!(graph.contains_unoriented_cycle());
        assert!(!graph.contains_oriented_cycle());
    }

    #[test]
    fn test_linear_oriented() {
        let (graph, _) = chain(&[1, 2, 3, 4]);
        assert!(graph.is_linear_oriented());
    }

    #[test]
    fn test_linear_oriented_rejects_fork() {
        let (mut graph, nodes) = chain(&[1, 2]);
        let c = graph.create_node(3);
        graph.create_edge(nodes[0], c, 0);
        assert!(!graph.is_linear_oriented());
        assert!(graph.is_trunk_tree());
    }

    #[test]
    fn test_origin_leaf() {
        let (graph, nodes) = chain(&[1, 2, 3]);
        assert_eq!(graph.origin_leaf().unwrap(), nodes[0]);
    }

    #[test]
    fn test_origin_leaf_not_unique() {
        let mut graph: Graph<i32, i32> = Graph::new();
        graph.create_node(1);
        graph.create_node(2);
        assert!(matches!(graph.origin_leaf(), Err(Error::BadOriginLeaf)));
    }

    #[test]
    fn test_linear_walk_order() {
        let (graph, _) = chain(&[10, 20, 30]);
        let mut seen = Vec::new();
        graph
            .linear_walk(
                |n| seen.push(*graph.node_value(n).unwrap()),
                |_| {},
            )
            .unwrap();
        assert_eq!(seen, vec![10, 20, 30]);
    }

    #[test]
    fn test_trunk_tree_walk_rollbacks() {
        // root -> a -> b, root -> c; one rollback of depth 2 before c
        let mut graph: Graph<i32, i32> = Graph::new();
        let root = graph.create_node(0);
        let a = graph.create_node(1);
        let b = graph.create_node(2);
        let c = graph.create_node(3);
        graph.create_edge(root, a, 0);
        graph.create_edge(a, b, 0);
        graph.create_edge(root, c, 0);

        let mut order = Vec::new();
        let mut rollbacks = Vec::new();
        graph
            .trunk_tree_walk(
                |n| order.push(*graph.node_value(n).unwrap()),
                |_| {},
                |count| rollbacks.push(count),
            )
            .unwrap();
        assert_eq!(order, vec![0, 1, 2, 3]);
        assert_eq!(rollbacks, vec![2]);
    }

    #[test]
    fn test_structural_equality() {
        let (a, _) = chain(&[1, 2, 3]);
        let (b, _) = chain(&[1, 2, 3]);
        let (c, _) = chain(&[1, 2, 4]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
