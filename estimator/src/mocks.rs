//! Mock engine and small graph fixtures shared by the module tests.
use crate::graph::{FlowGraph, MethylGraph};
use crate::lp::{Col, Constraint, LinExpr, LpEngine, Row, SolveError};
use definitions::{CpgEntry, CpgOffset, CpgStats, MethylRead};
use petgraph::graph::{EdgeIndex, NodeIndex};

/// Recording LP engine. Columns, bounds, rows, and the objective are stored
/// verbatim; primal/dual solutions are whatever the caller sets them to be.
#[derive(Debug, Clone, Default)]
pub struct MockLp {
    bounds: Vec<(f64, f64)>,
    rows: Vec<Constraint>,
    objective: LinExpr,
    primal: Vec<f64>,
    dual: Vec<f64>,
    objective_value: f64,
    failure: Option<SolveError>,
    solved: bool,
}

impl MockLp {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn ncols(&self) -> usize {
        self.bounds.len()
    }
    pub fn nrows(&self) -> usize {
        self.rows.len()
    }
    pub fn col_bounds(&self, Col(idx): Col) -> (f64, f64) {
        self.bounds[idx]
    }
    pub fn row(&self, Row(idx): Row) -> &Constraint {
        &self.rows[idx]
    }
    pub fn objective(&self) -> &LinExpr {
        &self.objective
    }
    pub fn is_solved(&self) -> bool {
        self.solved
    }
    pub fn set_primal(&mut self, Col(idx): Col, value: f64) {
        self.primal[idx] = value;
    }
    pub fn set_dual(&mut self, Row(idx): Row, value: f64) {
        self.dual[idx] = value;
    }
    pub fn set_objective_value(&mut self, value: f64) {
        self.objective_value = value;
    }
    /// Make the next `solve` fail with the given status.
    pub fn set_failure(&mut self, err: SolveError) {
        self.failure = Some(err);
    }
}

impl LpEngine for MockLp {
    fn add_col(&mut self) -> Col {
        let col = Col(self.bounds.len());
        self.bounds.push((f64::NEG_INFINITY, f64::INFINITY));
        self.primal.push(0f64);
        col
    }
    fn set_col_bounds(&mut self, Col(idx): Col, lower: f64, upper: f64) {
        self.bounds[idx] = (lower, upper);
    }
    fn add_row(&mut self, constraint: Constraint) -> Row {
        let row = Row(self.rows.len());
        self.rows.push(constraint);
        self.dual.push(0f64);
        row
    }
    fn set_row(&mut self, Row(idx): Row, constraint: Constraint) {
        self.rows[idx] = constraint;
    }
    fn set_objective(&mut self, objective: LinExpr) {
        self.objective = objective;
    }
    fn solve(&mut self) -> Result<(), SolveError> {
        if let Some(err) = self.failure {
            return Err(err);
        }
        self.solved = true;
        Ok(())
    }
    fn objective_value(&self) -> f64 {
        self.objective_value
    }
    fn primal(&self, Col(idx): Col) -> f64 {
        self.primal[idx]
    }
    fn dual(&self, Row(idx): Row) -> f64 {
        self.dual[idx]
    }
}

/// Delegating graph whose marked arc has an unresolvable target.
#[derive(Debug)]
pub struct BrokenArc<'a> {
    inner: &'a MethylGraph,
    broken: EdgeIndex,
}

impl<'a> BrokenArc<'a> {
    pub fn new(inner: &'a MethylGraph, broken: EdgeIndex) -> Self {
        Self { inner, broken }
    }
}

impl<'a> FlowGraph for BrokenArc<'a> {
    fn sink(&self) -> NodeIndex {
        self.inner.sink()
    }
    fn sink_arcs(&self) -> Vec<EdgeIndex> {
        self.inner.sink_arcs()
    }
    fn nodes(&self) -> Vec<NodeIndex> {
        self.inner.nodes()
    }
    fn out_arcs(&self, v: NodeIndex) -> Vec<EdgeIndex> {
        self.inner.out_arcs(v)
    }
    fn source(&self, arc: EdgeIndex) -> Option<NodeIndex> {
        self.inner.source(arc)
    }
    fn target(&self, arc: EdgeIndex) -> Option<NodeIndex> {
        if arc == self.broken {
            None
        } else {
            self.inner.target(arc)
        }
    }
    fn is_structural(&self, v: NodeIndex) -> bool {
        self.inner.is_structural(v)
    }
    fn is_childless(&self, v: NodeIndex) -> bool {
        self.inner.is_childless(v)
    }
    fn read(&self, v: NodeIndex) -> Option<&MethylRead> {
        self.inner.read(v)
    }
    fn potential(&self, v: NodeIndex) -> Option<Col> {
        self.inner.potential(v)
    }
    fn arc_length(&self, arc: EdgeIndex) -> f64 {
        self.inner.arc_length(arc)
    }
}

/// One read-bearing node wired straight to the sink.
/// The read covers a single unmethylated CpG at position 100 (coverage 2,
/// methylated count 0); the sink arc carries length weight 1.5.
pub fn mock_single_read_graph() -> (MethylGraph, CpgStats, NodeIndex) {
    let mut graph = MethylGraph::new();
    let sink = graph.sink();
    let read = MethylRead::new(100, vec![CpgOffset::new(1, false)]);
    let v = graph.add_read_node(read);
    // The only out-arc goes to the sink.
    graph.mark_childless(v);
    graph.add_arc(v, sink, 1.5);
    let mut stats = CpgStats::new();
    stats.insert(100, CpgEntry::new(2.0, 0.0));
    (graph, stats, v)
}

/// Two read nodes chained into the sink. The first read touches a methylated
/// CpG at 100 and an unmethylated one at 102; the second touches 102 only.
pub fn mock_chain_graph() -> (MethylGraph, CpgStats, NodeIndex, NodeIndex) {
    let mut graph = MethylGraph::new();
    let sink = graph.sink();
    let first = MethylRead::new(
        100,
        vec![CpgOffset::new(1, true), CpgOffset::new(3, false)],
    );
    let second = MethylRead::new(102, vec![CpgOffset::new(1, false)]);
    let v1 = graph.add_read_node(first);
    let v2 = graph.add_read_node(second);
    graph.add_arc(v1, v2, 2.0);
    graph.mark_childless(v2);
    graph.add_arc(v2, sink, 1.0);
    let mut stats = CpgStats::new();
    stats.insert(100, CpgEntry::new(2.0, 1.0));
    stats.insert(102, CpgEntry::new(3.0, 1.0));
    (graph, stats, v1, v2)
}
