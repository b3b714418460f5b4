//! Flow-graph capability and the concrete read DAG.
//! Graph construction itself happens upstream; the model builder only needs
//! the queries in [FlowGraph](FlowGraph). [MethylGraph](MethylGraph) is the
//! petgraph-backed implementation the rest of the pipeline hands over.
use crate::lp::{Col, LpEngine};
use definitions::MethylRead;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef; // for EdgeReference.id()
use petgraph::Direction;

/// What the model builder asks of a read DAG.
///
/// `source`/`target` return `None` when an arc's endpoint cannot be resolved;
/// the builder treats that as a fatal graph-invariant violation.
pub trait FlowGraph {
    /// The designated global sink.
    fn sink(&self) -> NodeIndex;
    /// In-arcs of the sink.
    fn sink_arcs(&self) -> Vec<EdgeIndex>;
    /// Every node, sink included.
    fn nodes(&self) -> Vec<NodeIndex>;
    fn out_arcs(&self, v: NodeIndex) -> Vec<EdgeIndex>;
    fn source(&self, arc: EdgeIndex) -> Option<NodeIndex>;
    fn target(&self, arc: EdgeIndex) -> Option<NodeIndex>;
    /// Structural nodes carry no read semantics and emit no interior rows.
    fn is_structural(&self, v: NodeIndex) -> bool;
    /// Childless nodes have no informative out-arcs.
    fn is_childless(&self, v: NodeIndex) -> bool;
    fn read(&self, v: NodeIndex) -> Option<&MethylRead>;
    /// The node's potential-variable column, once assigned.
    fn potential(&self, v: NodeIndex) -> Option<Col>;
    /// Length weight of the arc.
    fn arc_length(&self, arc: EdgeIndex) -> f64;
}

/// Node attributes of the read DAG.
#[derive(Debug, Clone, Default)]
pub struct MethylNode {
    pub structural: bool,
    pub childless: bool,
    pub read: Option<MethylRead>,
    pub potential: Option<Col>,
}

/// Arc attributes. Sink arcs carry the precomputed length weight used by the
/// lambda rows.
#[derive(Debug, Clone, Copy)]
pub struct MethylArc {
    pub length: f64,
}

/// The concrete read DAG. Created with its sink already in place; the sink is
/// structural and never owns a read or a potential column.
#[derive(Debug, Clone)]
pub struct MethylGraph {
    graph: DiGraph<MethylNode, MethylArc>,
    sink: NodeIndex,
}

impl MethylGraph {
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let sink = graph.add_node(MethylNode {
            structural: true,
            ..Default::default()
        });
        Self { graph, sink }
    }
    /// Add a node owning the given read.
    pub fn add_read_node(&mut self, read: MethylRead) -> NodeIndex {
        self.graph.add_node(MethylNode {
            read: Some(read),
            ..Default::default()
        })
    }
    /// Add a non-structural node with no attached read.
    pub fn add_empty_node(&mut self) -> NodeIndex {
        self.graph.add_node(MethylNode::default())
    }
    pub fn add_structural_node(&mut self) -> NodeIndex {
        self.graph.add_node(MethylNode {
            structural: true,
            ..Default::default()
        })
    }
    pub fn mark_childless(&mut self, v: NodeIndex) {
        self.graph[v].childless = true;
    }
    pub fn add_arc(&mut self, v: NodeIndex, u: NodeIndex, length: f64) -> EdgeIndex {
        self.graph.add_edge(v, u, MethylArc { length })
    }
    pub fn set_potential(&mut self, v: NodeIndex, col: Col) {
        self.graph[v].potential = Some(col);
    }
    /// Create one unbounded potential column per non-sink node.
    pub fn assign_potentials<E: LpEngine>(&mut self, lp: &mut E) {
        let sink = self.sink;
        let nodes: Vec<_> = self.graph.node_indices().collect();
        for v in nodes {
            if v == sink {
                continue;
            }
            let col = lp.add_col();
            lp.set_col_bounds(col, f64::NEG_INFINITY, f64::INFINITY);
            self.graph[v].potential = Some(col);
        }
    }
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
    pub fn arc_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for MethylGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowGraph for MethylGraph {
    fn sink(&self) -> NodeIndex {
        self.sink
    }
    fn sink_arcs(&self) -> Vec<EdgeIndex> {
        self.graph
            .edges_directed(self.sink, Direction::Incoming)
            .map(|e| e.id())
            .collect()
    }
    fn nodes(&self) -> Vec<NodeIndex> {
        self.graph.node_indices().collect()
    }
    fn out_arcs(&self, v: NodeIndex) -> Vec<EdgeIndex> {
        self.graph
            .edges_directed(v, Direction::Outgoing)
            .map(|e| e.id())
            .collect()
    }
    fn source(&self, arc: EdgeIndex) -> Option<NodeIndex> {
        self.graph.edge_endpoints(arc).map(|(s, _)| s)
    }
    fn target(&self, arc: EdgeIndex) -> Option<NodeIndex> {
        self.graph.edge_endpoints(arc).map(|(_, t)| t)
    }
    fn is_structural(&self, v: NodeIndex) -> bool {
        self.graph[v].structural
    }
    fn is_childless(&self, v: NodeIndex) -> bool {
        self.graph[v].childless
    }
    fn read(&self, v: NodeIndex) -> Option<&MethylRead> {
        self.graph[v].read.as_ref()
    }
    fn potential(&self, v: NodeIndex) -> Option<Col> {
        self.graph[v].potential
    }
    fn arc_length(&self, arc: EdgeIndex) -> f64 {
        self.graph[arc].length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockLp;
    use definitions::CpgOffset;

    #[test]
    fn sink_and_flags() {
        let mut graph = MethylGraph::new();
        let sink = graph.sink();
        assert!(graph.is_structural(sink));
        let read = MethylRead::new(10, vec![CpgOffset::new(1, false)]);
        let v = graph.add_read_node(read);
        let w = graph.add_empty_node();
        assert!(!graph.is_structural(v));
        assert!(graph.read(v).is_some());
        assert!(graph.read(w).is_none());
        graph.mark_childless(w);
        assert!(graph.is_childless(w));
        assert!(!graph.is_childless(v));
    }

    #[test]
    fn sink_arcs_are_in_arcs_of_sink() {
        let mut graph = MethylGraph::new();
        let sink = graph.sink();
        let v = graph.add_empty_node();
        let w = graph.add_empty_node();
        let a = graph.add_arc(v, sink, 1.0);
        let b = graph.add_arc(w, sink, 2.0);
        let inner = graph.add_arc(v, w, 3.0);
        let mut arcs = graph.sink_arcs();
        arcs.sort();
        assert_eq!(arcs, vec![a, b]);
        assert_eq!(graph.source(a), Some(v));
        assert_eq!(graph.target(inner), Some(w));
        assert_eq!(graph.arc_length(b), 2.0);
    }

    #[test]
    fn potentials_cover_every_non_sink_node() {
        let mut graph = MethylGraph::new();
        let v = graph.add_empty_node();
        let w = graph.add_empty_node();
        let mut lp = MockLp::new();
        graph.assign_potentials(&mut lp);
        assert_eq!(lp.ncols(), 2);
        assert!(graph.potential(v).is_some());
        assert!(graph.potential(w).is_some());
        assert!(graph.potential(graph.sink()).is_none());
        let (lower, upper) = lp.col_bounds(graph.potential(v).unwrap());
        assert!(lower.is_infinite() && lower < 0.0);
        assert!(upper.is_infinite() && upper > 0.0);
    }
}
