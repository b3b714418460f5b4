//! Lambda-parametric re-optimization.
//! Once the model is built and solved, tracing a regularization path only
//! needs the sink rows rewritten for each new lambda; the engine re-solves
//! from its previous basis instead of paying for a full rebuild.
use crate::graph::FlowGraph;
use crate::lp::LpEngine;
use crate::model::{ConsistencyModel, ModelError};
use definitions::CpgStats;
use std::io::Write;

/// Controller over a constraints-complete [ConsistencyModel](ConsistencyModel).
/// All methods leave the column set untouched.
#[derive(Debug)]
pub struct ParametricController<'a> {
    model: &'a ConsistencyModel,
}

impl<'a> ParametricController<'a> {
    pub fn new(model: &'a ConsistencyModel) -> Self {
        assert!(model.is_ready(), "constraints are not added yet");
        Self { model }
    }

    /// Lagrangian-adjusted score of the already-solved program: the primal
    /// objective minus `lambda * dual(row)` over every sink arc. An external
    /// search bisects on this value to pick the regularization strength.
    pub fn score<G: FlowGraph, E: LpEngine>(&self, graph: &G, lp: &E, lambda: f64) -> f64 {
        let mut obj = lp.objective_value();
        for arc in graph.sink_arcs() {
            let row = self.model.row(arc).expect("sink arc without a row");
            obj -= lambda * lp.dual(row);
        }
        trace!("LAMBDA\tSCORE\t{:.4}\t{:.4}", lambda, obj);
        obj
    }

    /// Rewrite every sink row in place for the new lambda:
    /// `lambda*beta_lambda - lambda*alpha_lambda - nu[v] <= -margin`.
    /// Interior rows, the right-hand sides, and the columns are unchanged.
    pub fn modify_lambda_constraints<G: FlowGraph, E: LpEngine>(
        &self,
        graph: &G,
        lp: &mut E,
        lambda: f64,
    ) -> Result<(), ModelError> {
        for arc in graph.sink_arcs() {
            let v = graph.source(arc).ok_or(ModelError::UnresolvedArc(arc))?;
            let nu = graph.potential(v).ok_or(ModelError::MissingPotential(v))?;
            let lam = self
                .model
                .lambda_cols(v)
                .expect("sink node without lambda columns");
            let row = self.model.row(arc).expect("sink arc without a row");
            let margin = self.model.margin();
            lp.set_row(row, (lambda * lam.beta - lambda * lam.alpha - nu).le(-margin));
        }
        trace!("LAMBDA\tMODIFY\t{:.4}", lambda);
        Ok(())
    }

    /// Dump the per-position deviation primals next to the inputs, then the
    /// node potentials. Trace only; never affects control flow.
    pub fn print_primal<G: FlowGraph, E: LpEngine, W: Write>(
        &self,
        stats: &CpgStats,
        graph: &G,
        lp: &E,
        mut wtr: W,
    ) -> std::io::Result<()> {
        for (pos, entry) in stats.iter() {
            let dev = match self.model.deviation_cols(pos) {
                Some(dev) => dev,
                None => continue,
            };
            writeln!(
                &mut wtr,
                "{}: ay={} by={} am={} bm={} y={} my={}",
                pos,
                lp.primal(dev.alpha_cov),
                lp.primal(dev.beta_cov),
                lp.primal(dev.alpha_meth),
                lp.primal(dev.beta_meth),
                entry.coverage,
                entry.methylated,
            )?;
        }
        for v in graph.nodes() {
            if let Some(nu) = graph.potential(v) {
                writeln!(&mut wtr, "nu[{}]={}", v.index(), lp.primal(nu))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::Rel;
    use crate::mocks::{mock_single_read_graph, MockLp};
    use crate::model::ConsistencyModel;

    fn solved_single_read_session() -> (crate::graph::MethylGraph, CpgStats, ConsistencyModel, MockLp)
    {
        let _ = env_logger::builder().is_test(true).try_init();
        let (mut graph, stats, _) = mock_single_read_graph();
        let mut lp = MockLp::new();
        graph.assign_potentials(&mut lp);
        let mut model = ConsistencyModel::default();
        model.build(&stats, &graph, &mut lp, 1.0).unwrap();
        lp.solve().unwrap();
        (graph, stats, model, lp)
    }

    #[test]
    fn sink_row_before_modification() {
        let (graph, _, model, lp) = solved_single_read_session();
        assert!(lp.is_solved());
        let arc = graph.sink_arcs()[0];
        let v = graph.source(arc).unwrap();
        let row = model.row(arc).unwrap();
        let constraint = lp.row(row);
        assert_eq!(constraint.rel, Rel::Le);
        assert_eq!(constraint.rhs, -0.1);
        let merged = constraint.expr.merged_terms();
        let lam = model.lambda_cols(v).unwrap();
        let nu = graph.potential(v).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[&lam.beta], 1.5);
        assert_eq!(merged[&lam.alpha], -1.5);
        assert_eq!(merged[&nu], -1.0);
    }

    #[test]
    fn sink_row_after_modification() {
        let (graph, _, model, mut lp) = solved_single_read_session();
        let arc = graph.sink_arcs()[0];
        let v = graph.source(arc).unwrap();
        let row = model.row(arc).unwrap();
        let before: Vec<_> = lp.row(row).expr.merged_terms().keys().copied().collect();
        let controller = ParametricController::new(&model);
        controller
            .modify_lambda_constraints(&graph, &mut lp, 0.5)
            .unwrap();
        let constraint = lp.row(row);
        assert_eq!(constraint.rel, Rel::Le);
        assert_eq!(constraint.rhs, -0.1);
        let merged = constraint.expr.merged_terms();
        let lam = model.lambda_cols(v).unwrap();
        let nu = graph.potential(v).unwrap();
        assert_eq!(merged[&lam.beta], 0.5);
        assert_eq!(merged[&lam.alpha], -0.5);
        assert_eq!(merged[&nu], -1.0);
        // Same column set as before the rewrite.
        let after: Vec<_> = merged.keys().copied().collect();
        assert_eq!(before, after);
        // Only the sink row was touched.
        assert_eq!(lp.nrows(), 1);
    }

    #[test]
    fn score_subtracts_weighted_duals() {
        let (graph, _, model, mut lp) = solved_single_read_session();
        let row = model.row(graph.sink_arcs()[0]).unwrap();
        lp.set_objective_value(3.0);
        lp.set_dual(row, 2.0);
        let controller = ParametricController::new(&model);
        let score = controller.score(&graph, &lp, 0.5);
        assert!((score - 2.0).abs() < 1e-10);
    }

    #[test]
    fn score_is_deterministic() {
        let (graph, _, model, mut lp) = solved_single_read_session();
        let row = model.row(graph.sink_arcs()[0]).unwrap();
        lp.set_objective_value(-1.25);
        lp.set_dual(row, 0.75);
        let controller = ParametricController::new(&model);
        let first = controller.score(&graph, &lp, 0.3);
        let second = controller.score(&graph, &lp, 0.3);
        assert_eq!(first, second);
    }

    #[test]
    fn modify_then_rescore_loop() {
        let (graph, _, model, mut lp) = solved_single_read_session();
        let controller = ParametricController::new(&model);
        for &lambda in &[0.1, 0.2, 0.4, 0.8] {
            controller
                .modify_lambda_constraints(&graph, &mut lp, lambda)
                .unwrap();
            lp.solve().unwrap();
            let _ = controller.score(&graph, &lp, lambda);
        }
        let arc = graph.sink_arcs()[0];
        let v = graph.source(arc).unwrap();
        let merged = lp.row(model.row(arc).unwrap()).expr.merged_terms();
        let lam = model.lambda_cols(v).unwrap();
        assert_eq!(merged[&lam.beta], 0.8);
        assert_eq!(merged[&lam.alpha], -0.8);
    }

    #[test]
    fn print_primal_reports_positions_and_potentials() {
        let (graph, stats, model, mut lp) = solved_single_read_session();
        let dev = model.deviation_cols(100).unwrap();
        lp.set_primal(dev.beta_cov, 0.25);
        let v = graph
            .nodes()
            .into_iter()
            .find(|&v| graph.potential(v).is_some())
            .unwrap();
        lp.set_primal(graph.potential(v).unwrap(), -0.6);
        let controller = ParametricController::new(&model);
        let mut out = Vec::new();
        controller
            .print_primal(&stats, &graph, &lp, &mut out)
            .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("100: ay=0 by=0.25"));
        assert!(out.contains("y=2 my=0"));
        assert!(out.contains(&format!("nu[{}]=-0.6", v.index())));
    }

    #[test]
    #[should_panic]
    fn controller_requires_constraints() {
        let model = ConsistencyModel::default();
        let _ = ParametricController::new(&model);
    }
}
