//! Cost-minimizing routing of ambulances from a single clinic to a set of simultaneously
//! declared emergencies over a street network.
//!
//! The pipeline has four stages, each logged at `info!` on entry with its relevant sizes:
//! prepare the street graph and bind destinations, build the multi-commodity flow MILP,
//! solve it, and extract routes/costs (or an infeasibility diagnosis) from the result.

pub mod cost;
pub mod error;
pub mod graph;
pub mod model;
pub mod result;
pub mod scenario;
pub mod solver;

use graph::prepare as graph_prepare;
use graph::{NodeId, RawGraph, StreetGraph};
use scenario::Emergency;

pub use cost::CostTable;
pub use error::{Error, Result};
pub use result::{InfeasibleResult, RunResult};
pub use solver::{SolveLimits, Status};

/// Parameters governing capacity assignment and emergency generation for one scenario.
#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    /// Minimum per-edge capacity, km/h.
    pub c_min: f64,
    /// Maximum per-edge capacity, km/h.
    pub c_max: f64,
    /// Minimum required speed across all severities, km/h.
    pub r_min: f64,
    /// Maximum required speed across all severities, km/h.
    pub r_max: f64,
    /// Number of emergencies to generate, in `1..=100`.
    pub n: u32,
}

/// Either a usable result or an advisory diagnosis of why none could be produced.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// An optimal (or time-limited-but-feasible) assignment of routes.
    Solved(RunResult),
    /// No usable assignment was found.
    Infeasible(InfeasibleResult),
}

/// Run `PrepareGraph`: assign capacities, derive travel times, collapse to a simple graph,
/// locate the origin, generate `params.n` emergencies, and bind each to a destination node.
pub fn prepare(
    raw: &RawGraph,
    origin_lat: f64,
    origin_lon: f64,
    params: &GenerationParams,
    seed: u64,
) -> Result<(StreetGraph, NodeId, Vec<Emergency>)> {
    if !(1..=100).contains(&params.n) {
        return Err(Error::InvalidRange(format!(
            "emergency count must satisfy 1 <= n <= 100, got {}",
            params.n
        )));
    }

    log::info!(
        "PrepareGraph: {} raw nodes, {} raw edges",
        raw.node_count(),
        raw.edge_count()
    );

    let capacitated = graph_prepare::assign_capacities(raw, params.c_min, params.c_max, seed)?;
    let timed = graph_prepare::derive_travel_time(&capacitated)?;
    let simple = graph_prepare::collapse_to_simple(&timed);
    let origin = graph_prepare::find_nearest(&simple, origin_lat, origin_lon);

    let emergencies = scenario::generate_set(params.n, params.r_min, params.r_max, seed)?;
    let emergencies = graph_prepare::bind_emergencies(&simple, emergencies, origin, seed)?;

    log::info!(
        "PrepareGraph done: {} prepared nodes, {} prepared edges, {} emergencies bound",
        simple.node_count(),
        simple.edge_count(),
        emergencies.len()
    );

    Ok((simple, origin, emergencies))
}

/// Run `BuildModel` + `Solve` + `Extract` on an already-prepared scenario.
pub fn solve_scenario(
    graph: &StreetGraph,
    emergencies: &[Emergency],
    origin: NodeId,
    costs: &CostTable,
    limits: SolveLimits,
) -> Result<RunOutcome> {
    log::info!(
        "BuildModel: {} nodes, {} edges, {} emergencies",
        graph.node_count(),
        graph.edge_count(),
        emergencies.len()
    );
    let model = model::build(graph, emergencies, origin, costs)?;
    log::info!(
        "BuildModel done: {} binary variables",
        model.num_edges * model.num_emergencies
    );

    log::info!("Solve: time_limit_s={}, gap={}", limits.time_limit_s, limits.gap);
    let outcome = solver::solve(&model, limits);
    log::info!(
        "Solve done: status={:?}, elapsed={:.3}s",
        outcome.status,
        outcome.elapsed.as_secs_f64()
    );

    log::info!("Extract");
    match result::extract(graph, emergencies, origin, &model, outcome, costs) {
        Ok(run_result) => {
            log::info!(
                "Extract done: total_cost={:.2}, routes={}",
                run_result.total_cost,
                run_result.routes.len()
            );
            Ok(RunOutcome::Solved(run_result))
        }
        Err(infeasible) => {
            log::warn!("Extract: no incumbent, {}", infeasible.message);
            Ok(RunOutcome::Infeasible(infeasible))
        }
    }
}

/// Run the whole pipeline end to end: prepare the graph and emergencies from scratch, then
/// build and solve the model.
pub fn run(
    raw: &RawGraph,
    origin_lat: f64,
    origin_lon: f64,
    params: &GenerationParams,
    seed: u64,
    costs: &CostTable,
    limits: SolveLimits,
) -> Result<RunOutcome> {
    let (graph, origin, emergencies) = prepare(raw, origin_lat, origin_lon, params, seed)?;
    solve_scenario(&graph, &emergencies, origin, costs, limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{raw_graph_from_edges, NodeRecord};

    fn chain_raw() -> RawGraph {
        let nodes = vec![
            NodeRecord { id: 0, lat: 0.0, lon: 0.0 },
            NodeRecord { id: 1, lat: 0.0, lon: 0.01 },
            NodeRecord { id: 2, lat: 0.0, lon: 0.02 },
            NodeRecord { id: 3, lat: 0.0, lon: 0.03 },
        ];
        let edges = vec![(0, 1, 1000.0), (1, 2, 1000.0), (2, 3, 1000.0)];
        raw_graph_from_edges(&nodes, &edges)
    }

    #[test]
    fn prepare_rejects_out_of_range_emergency_count() {
        let raw = chain_raw();
        let params = GenerationParams {
            c_min: 30.0,
            c_max: 90.0,
            r_min: 30.0,
            r_max: 90.0,
            n: 0,
        };
        assert!(prepare(&raw, 0.0, 0.0, &params, 1).is_err());
    }

    #[test]
    fn full_pipeline_is_deterministic() {
        let raw = chain_raw();
        let params = GenerationParams {
            c_min: 80.0,
            c_max: 80.0001,
            r_min: 30.0,
            r_max: 60.0,
            n: 2,
        };
        let costs = CostTable::default();
        let a = run(&raw, 0.0, 0.0, &params, 7, &costs, SolveLimits::default()).unwrap();
        let b = run(&raw, 0.0, 0.0, &params, 7, &costs, SolveLimits::default()).unwrap();
        match (a, b) {
            (RunOutcome::Solved(a), RunOutcome::Solved(b)) => {
                assert!((a.total_cost - b.total_cost).abs() < 1e-6);
            }
            (RunOutcome::Infeasible(a), RunOutcome::Infeasible(b)) => {
                assert_eq!(a.status, b.status);
            }
            _ => panic!("both runs should terminate the same way"),
        }
    }
}
