//! Consistency-model construction.
//! One session owns the column and row tables it created; the tables are
//! mutated in place across lambda trials and discarded with the session.
use crate::graph::FlowGraph;
use crate::lp::{Col, LinExpr, LpEngine, Row, SolveError};
use crate::CONSISTENCY_MARGIN;
use definitions::{CpgStats, Position};
use petgraph::graph::{EdgeIndex, NodeIndex};
use std::collections::BTreeMap;

/// The four unit-bounded deviation columns at one position: the negative and
/// positive parts of the L1 penalty on coverage and methylation mismatch.
#[derive(Debug, Clone, Copy)]
pub struct DeviationCols {
    pub alpha_cov: Col,
    pub beta_cov: Col,
    pub alpha_meth: Col,
    pub beta_meth: Col,
}

/// The lambda-slack pair of a sink-adjacent node.
#[derive(Debug, Clone, Copy)]
pub struct LambdaCols {
    pub alpha: Col,
    pub beta: Col,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    ColumnsAdded,
    ConstraintsAdded,
}

/// Fatal conditions of a model-building session. There is no rollback of
/// partially built state; a failed session must be discarded, not retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// An arc's endpoint could not be resolved while building rows.
    UnresolvedArc(EdgeIndex),
    /// A node reached row construction without a potential column assigned.
    MissingPotential(NodeIndex),
    /// A read touches a position absent from the normalized table.
    UnknownPosition(Position),
    /// Engine status surfaced from a solve call.
    Engine(SolveError),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ModelError::UnresolvedArc(arc) => {
                write!(f, "could not resolve the endpoint of arc {}", arc.index())
            }
            ModelError::MissingPotential(v) => {
                write!(f, "node {} has no potential column", v.index())
            }
            ModelError::UnknownPosition(pos) => {
                write!(f, "position {} is absent from the statistics table", pos)
            }
            ModelError::Engine(err) => write!(f, "engine failure: {}", err),
        }
    }
}

impl std::error::Error for ModelError {}

impl From<SolveError> for ModelError {
    fn from(err: SolveError) -> Self {
        ModelError::Engine(err)
    }
}

/// One solve session: per-position deviation columns, per-sink-node lambda
/// columns, and the arc -> row table kept so sink rows can be rewritten later.
#[derive(Debug, Clone)]
pub struct ConsistencyModel {
    margin: f64,
    deviation: BTreeMap<Position, DeviationCols>,
    lambda: BTreeMap<NodeIndex, LambdaCols>,
    rows: BTreeMap<EdgeIndex, Row>,
    state: State,
}

impl Default for ConsistencyModel {
    fn default() -> Self {
        Self::new(CONSISTENCY_MARGIN)
    }
}

impl ConsistencyModel {
    pub fn new(margin: f64) -> Self {
        assert!(0f64 < margin, "the consistency margin must be positive");
        Self {
            margin,
            deviation: BTreeMap::new(),
            lambda: BTreeMap::new(),
            rows: BTreeMap::new(),
            state: State::Created,
        }
    }
    pub fn margin(&self) -> f64 {
        self.margin
    }
    pub fn deviation_cols(&self, pos: Position) -> Option<&DeviationCols> {
        self.deviation.get(&pos)
    }
    pub fn lambda_cols(&self, v: NodeIndex) -> Option<LambdaCols> {
        self.lambda.get(&v).copied()
    }
    pub fn row(&self, arc: EdgeIndex) -> Option<Row> {
        self.rows.get(&arc).copied()
    }
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
    pub(crate) fn is_ready(&self) -> bool {
        self.state == State::ConstraintsAdded
    }

    /// Create the four [0,1] deviation columns per position and the two [0,1]
    /// lambda-slack columns per node adjacent to the sink.
    pub fn add_columns<G: FlowGraph, E: LpEngine>(
        &mut self,
        stats: &CpgStats,
        graph: &G,
        lp: &mut E,
    ) {
        assert_eq!(
            self.state,
            State::Created,
            "add_columns must run exactly once per session"
        );
        for (pos, _) in stats.iter() {
            let cols = DeviationCols {
                alpha_cov: unit_col(lp),
                beta_cov: unit_col(lp),
                alpha_meth: unit_col(lp),
                beta_meth: unit_col(lp),
            };
            self.deviation.insert(pos, cols);
        }
        for arc in graph.sink_arcs() {
            let v = graph.source(arc).expect("sink arc with no source");
            let cols = LambdaCols {
                alpha: unit_col(lp),
                beta: unit_col(lp),
            };
            self.lambda.insert(v, cols);
        }
        debug!(
            "MODEL\tCOLS\t{}\t{}",
            4 * self.deviation.len(),
            2 * self.lambda.len()
        );
        self.state = State::ColumnsAdded;
    }

    /// Accumulate the data-fit term into `obj`:
    /// `coverage*(beta_cov - alpha_cov) + methylated*(beta_meth - alpha_meth)`
    /// over every position. Only one member of each pair is active at the
    /// optimum, so the pair's sum equals the absolute deviation.
    pub fn deviance_objective(&self, stats: &CpgStats, obj: &mut LinExpr) {
        assert_ne!(self.state, State::Created, "columns are not added yet");
        for (pos, entry) in stats.iter() {
            let dev = &self.deviation[&pos];
            *obj += entry.coverage * (dev.beta_cov - dev.alpha_cov);
            *obj += entry.methylated * (dev.beta_meth - dev.alpha_meth);
        }
    }

    /// Accumulate the regularization term into `obj`:
    /// `lambda*(beta_lambda - alpha_lambda)` over every sink-adjacent node.
    pub fn lambda_objective<G: FlowGraph>(&self, graph: &G, lambda: f64, obj: &mut LinExpr) {
        assert_ne!(self.state, State::Created, "columns are not added yet");
        for arc in graph.sink_arcs() {
            let v = graph.source(arc).expect("sink arc with no source");
            let lam = &self.lambda[&v];
            *obj += lambda * (lam.beta - lam.alpha);
        }
    }

    /// Build both row families.
    ///
    /// Sink rows, per sink arc from v:
    /// `length*beta_lambda - length*alpha_lambda - nu[v] <= -margin`.
    /// Interior rows, per out-arc (v -> u) of a non-structural, non-childless
    /// node with a read: the read's signed deviation terms plus
    /// `nu[u] - nu[v] <= -margin`. Read-less nodes are transparent; an
    /// unresolvable arc endpoint aborts the pass.
    pub fn add_constraints<G: FlowGraph, E: LpEngine>(
        &mut self,
        graph: &G,
        lp: &mut E,
    ) -> Result<(), ModelError> {
        assert_eq!(
            self.state,
            State::ColumnsAdded,
            "columns must be added before constraints"
        );
        let sink = graph.sink();
        let mut sink_rows = 0;
        for arc in graph.sink_arcs() {
            let v = graph.source(arc).ok_or(ModelError::UnresolvedArc(arc))?;
            let nu = graph.potential(v).ok_or(ModelError::MissingPotential(v))?;
            let lam = &self.lambda[&v];
            let len = graph.arc_length(arc);
            let row = lp.add_row((len * lam.beta - len * lam.alpha - nu).le(-self.margin));
            self.rows.insert(arc, row);
            sink_rows += 1;
        }
        let mut interior_rows = 0;
        for v in graph.nodes() {
            if graph.is_structural(v) || graph.is_childless(v) {
                continue;
            }
            for arc in graph.out_arcs(v) {
                let u = graph.target(arc).ok_or(ModelError::UnresolvedArc(arc))?;
                if u == sink {
                    // Sink arcs already own their lambda rows.
                    continue;
                }
                let read = match graph.read(v) {
                    Some(read) => read,
                    None => continue,
                };
                let mut expr = LinExpr::new();
                for (pos, methylated) in read.positions() {
                    let dev = self
                        .deviation
                        .get(&pos)
                        .ok_or(ModelError::UnknownPosition(pos))?;
                    expr += dev.beta_cov - dev.alpha_cov;
                    if methylated {
                        expr += dev.beta_meth - dev.alpha_meth;
                    }
                }
                let nu_u = graph.potential(u).ok_or(ModelError::MissingPotential(u))?;
                let nu_v = graph.potential(v).ok_or(ModelError::MissingPotential(v))?;
                expr += nu_u - nu_v;
                let row = lp.add_row(expr.le(-self.margin));
                self.rows.insert(arc, row);
                interior_rows += 1;
            }
        }
        debug!("MODEL\tROWS\t{}\t{}", sink_rows, interior_rows);
        self.state = State::ConstraintsAdded;
        Ok(())
    }

    /// One-shot construction: columns, the combined objective at the given
    /// lambda, and both row families.
    pub fn build<G: FlowGraph, E: LpEngine>(
        &mut self,
        stats: &CpgStats,
        graph: &G,
        lp: &mut E,
        lambda: f64,
    ) -> Result<(), ModelError> {
        self.add_columns(stats, graph, lp);
        let mut obj = LinExpr::new();
        self.deviance_objective(stats, &mut obj);
        self.lambda_objective(graph, lambda, &mut obj);
        lp.set_objective(obj);
        self.add_constraints(graph, lp)
    }
}

fn unit_col<E: LpEngine>(lp: &mut E) -> Col {
    let col = lp.add_col();
    lp.set_col_bounds(col, 0f64, 1f64);
    col
}
