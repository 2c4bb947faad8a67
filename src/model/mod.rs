//! The multi-commodity flow MILP: one binary variable per (edge, emergency) pair, coupled
//! only through shared edge capacity.

use std::collections::HashMap;

use good_lp::{constraint, variable, Expression, ProblemVariables, Variable};
use itertools::iproduct;

use crate::cost::CostTable;
use crate::error::{Error, Result};
use crate::graph::{EdgeId, NodeId, StreetGraph};
use crate::scenario::Emergency;

/// The assembled MILP, ready to be handed to a solver backend.
///
/// No solver-specific type appears in this struct: callers drive [`crate::solver`] with it,
/// never `good_lp`'s solver types directly.
pub struct MilpModel {
    pub(crate) problem: ProblemVariables,
    pub(crate) objective: Expression,
    pub(crate) constraints: Vec<good_lp::Constraint>,
    /// `x[edge_id][emergency_index]`, in the same order the emergencies were supplied.
    pub(crate) vars: HashMap<(EdgeId, usize), Variable>,
    /// Number of emergencies (commodities) in the model.
    pub num_emergencies: usize,
    /// Number of edges in the model.
    pub num_edges: usize,
}

impl MilpModel {
    /// The decision variable for whether emergency `k`'s route uses `edge`.
    pub fn var(&self, edge: EdgeId, k: usize) -> Variable {
        self.vars[&(edge, k)]
    }
}

/// Build the MCF-MILP for routing every emergency from `origin` to its bound destination over
/// `graph`, using `costs` for the objective.
///
/// Every emergency must already have a `destination_node` (see
/// [`crate::graph::prepare::bind_emergencies`]); none may name `origin` or duplicate another
/// emergency's destination, and `origin` must be a node of `graph`.
pub fn build(
    graph: &StreetGraph,
    emergencies: &[Emergency],
    origin: NodeId,
    costs: &CostTable,
) -> Result<MilpModel> {
    if emergencies.is_empty() {
        return Err(Error::InvalidInput("no emergencies to route".into()));
    }
    if !graph.node_indices().any(|n| n == origin) {
        return Err(Error::InvalidInput(format!(
            "origin node {origin:?} is not part of the prepared graph"
        )));
    }

    let mut seen_destinations = std::collections::HashSet::with_capacity(emergencies.len());
    let mut destinations = Vec::with_capacity(emergencies.len());
    for e in emergencies {
        let dest = e.destination_node.ok_or_else(|| {
            Error::InvalidInput(format!("emergency {} has no bound destination", e.id))
        })?;
        if dest == origin {
            return Err(Error::InvalidInput(format!(
                "emergency {} has the origin as its destination",
                e.id
            )));
        }
        if !seen_destinations.insert(dest) {
            return Err(Error::InvalidInput(format!(
                "emergency {} duplicates another emergency's destination",
                e.id
            )));
        }
        destinations.push(dest);
    }

    let mut problem = ProblemVariables::new();
    let edges: Vec<EdgeId> = graph.edge_indices().collect();
    let mut vars = HashMap::with_capacity(edges.len() * emergencies.len());
    for (&edge, k) in iproduct!(&edges, 0..emergencies.len()) {
        vars.insert((edge, k), problem.add(variable().binary()));
    }

    let objective = objective_expression(graph, emergencies, &edges, &vars, costs);
    let mut constraints = Vec::new();
    flow_conservation_constraints(
        graph,
        emergencies,
        &destinations,
        origin,
        &edges,
        &vars,
        &mut constraints,
    );
    shared_capacity_constraints(graph, emergencies, &edges, &vars, &mut constraints);

    Ok(MilpModel {
        problem,
        objective,
        constraints,
        vars,
        num_emergencies: emergencies.len(),
        num_edges: edges.len(),
    })
}

/// Z = Σ_k fixed_cost(severity_k) + Σ_k Σ_(i,j) (length_m / 1000) · per_km_cost(severity_k) · x[i,j,k]
fn objective_expression(
    graph: &StreetGraph,
    emergencies: &[Emergency],
    edges: &[EdgeId],
    vars: &HashMap<(EdgeId, usize), Variable>,
    costs: &CostTable,
) -> Expression {
    let mut objective = Expression::from(0);
    for (k, emergency) in emergencies.iter().enumerate() {
        let row = costs.row(emergency.severity);
        objective += row.fixed_cost;
        for &edge in edges {
            let length_km = graph[edge].length_m / 1000.0;
            objective += row.per_km_cost * length_km * vars[&(edge, k)];
        }
    }
    objective
}

/// (C1) For every emergency k and every node v: outflow(v,k) - inflow(v,k) equals +1 at the
/// origin, -1 at k's destination, 0 elsewhere.
fn flow_conservation_constraints(
    graph: &StreetGraph,
    emergencies: &[Emergency],
    destinations: &[NodeId],
    origin: NodeId,
    edges: &[EdgeId],
    vars: &HashMap<(EdgeId, usize), Variable>,
    constraints: &mut Vec<good_lp::Constraint>,
) {
    let mut outgoing: HashMap<NodeId, Vec<EdgeId>> = HashMap::new();
    let mut incoming: HashMap<NodeId, Vec<EdgeId>> = HashMap::new();
    for &edge in edges {
        let (u, v) = graph.edge_endpoints(edge).expect("edge from this graph");
        outgoing.entry(u).or_default().push(edge);
        incoming.entry(v).or_default().push(edge);
    }

    for (k, &destination) in destinations.iter().enumerate() {
        for node in graph.node_indices() {
            let supply = if node == origin {
                1.0
            } else if node == destination {
                -1.0
            } else {
                0.0
            };

            let mut balance = Expression::from(0);
            for &edge in outgoing.get(&node).into_iter().flatten() {
                balance += vars[&(edge, k)];
            }
            for &edge in incoming.get(&node).into_iter().flatten() {
                balance -= vars[&(edge, k)];
            }
            constraints.push(constraint!(balance == supply));
        }
    }
    let _ = emergencies;
}

/// (C2) For every edge (i,j): Σ_k required_speed_kmh(k) · x[i,j,k] ≤ capacity_kmh(i,j).
fn shared_capacity_constraints(
    graph: &StreetGraph,
    emergencies: &[Emergency],
    edges: &[EdgeId],
    vars: &HashMap<(EdgeId, usize), Variable>,
    constraints: &mut Vec<good_lp::Constraint>,
) {
    for &edge in edges {
        let mut load = Expression::from(0);
        for (k, emergency) in emergencies.iter().enumerate() {
            load += emergency.required_speed_kmh * vars[&(edge, k)];
        }
        let capacity = graph[edge].capacity_kmh;
        constraints.push(constraint!(load <= capacity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeData, PreparedEdge};
    use crate::scenario::Severity;

    fn diamond() -> (StreetGraph, NodeId, NodeId) {
        let mut g = StreetGraph::new();
        let o = g.add_node(NodeData { lat: 0.0, lon: 0.0 });
        let a = g.add_node(NodeData { lat: 0.0, lon: 1.0 });
        let b = g.add_node(NodeData { lat: 1.0, lon: 0.0 });
        let d = g.add_node(NodeData { lat: 1.0, lon: 1.0 });
        let e = PreparedEdge {
            length_m: 1000.0,
            capacity_kmh: 90.0,
            travel_time_min: 1.0,
        };
        g.add_edge(o, a, e);
        g.add_edge(a, d, e);
        g.add_edge(o, b, e);
        g.add_edge(b, d, e);
        (g, o, d)
    }

    fn emergency(id: u32, destination: NodeId) -> Emergency {
        Emergency {
            id,
            severity: Severity::Media,
            required_speed_kmh: 40.0,
            destination_node: Some(destination),
            destination_lat: Some(0.0),
            destination_lon: Some(0.0),
        }
    }

    #[test]
    fn build_rejects_empty_emergency_list() {
        let (g, o, _d) = diamond();
        assert!(build(&g, &[], o, &CostTable::default()).is_err());
    }

    #[test]
    fn build_rejects_destination_equal_to_origin() {
        let (g, o, _d) = diamond();
        let emergencies = vec![emergency(1, o)];
        assert!(build(&g, &emergencies, o, &CostTable::default()).is_err());
    }

    #[test]
    fn build_rejects_duplicate_destinations() {
        let (g, o, d) = diamond();
        let emergencies = vec![emergency(1, d), emergency(2, d)];
        assert!(build(&g, &emergencies, o, &CostTable::default()).is_err());
    }

    #[test]
    fn build_produces_one_variable_per_edge_per_emergency() {
        let (g, o, d) = diamond();
        let emergencies = vec![emergency(1, d)];
        let model = build(&g, &emergencies, o, &CostTable::default()).unwrap();
        assert_eq!(model.num_edges, 4);
        assert_eq!(model.num_emergencies, 1);
        assert_eq!(model.vars.len(), 4);
    }
}
