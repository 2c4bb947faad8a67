//! Drives the bundled solver over a [`MilpModel`], translating its backend-specific status
//! and solution into this crate's own types. No `good_lp` type escapes this module's public
//! surface.

use std::time::{Duration, Instant};

use good_lp::solvers::coin_cbc::coin_cbc;
use good_lp::{Solution as _, SolverModel, Variable, WithMipGap, WithTimeLimit};

use crate::model::MilpModel;

/// How the solve terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A provably optimal solution was found.
    Optimal,
    /// No assignment satisfies every constraint.
    Infeasible,
    /// The objective is unbounded.
    Unbounded,
    /// The time limit (or the relative MIP gap) was reached before the search could prove
    /// optimality; the reported solution is the best incumbent found, if any.
    TimeLimit,
    /// The solver terminated abnormally (e.g. CBC `Abandoned`/`UserEvent`/stopped on
    /// difficulties) without reaching any of the above outcomes.
    Error,
}

/// Tunable limits handed to the solver.
#[derive(Debug, Clone, Copy)]
pub struct SolveLimits {
    /// Wall-clock budget in seconds.
    pub time_limit_s: f64,
    /// Relative MIP gap at which the solver may stop early, in `[0, 1]`.
    pub gap: f32,
    /// Whether to let the underlying solver print its own progress log.
    pub verbose: bool,
}

impl Default for SolveLimits {
    fn default() -> Self {
        SolveLimits {
            time_limit_s: 300.0,
            gap: 0.01,
            verbose: false,
        }
    }
}

/// Outcome of a solve attempt: the termination status, elapsed wall time, and — when a
/// solution was found — the objective value and per-variable assignment.
pub struct SolveOutcome {
    /// How the solve terminated.
    pub status: Status,
    /// Wall-clock time spent inside the solver.
    pub elapsed: Duration,
    /// Objective value, present whenever `status` is `Optimal` or `TimeLimit` and the
    /// solver produced an incumbent.
    pub objective: Option<f64>,
    /// Value of every decision variable, present under the same conditions as `objective`.
    values: Vec<(Variable, f64)>,
}

impl SolveOutcome {
    /// The value assigned to `var`, if a solution is present.
    pub fn value(&self, var: Variable) -> Option<f64> {
        self.values
            .iter()
            .find(|(v, _)| *v == var)
            .map(|(_, val)| *val)
    }
}

/// Solve `model` under `limits`, translating the backend's resolution result into a
/// [`SolveOutcome`]. This never returns `Err`: an unsolvable or unbounded model is reported
/// through `status`, matching the contract that infeasibility is an expected optimization
/// outcome rather than a pipeline failure.
///
/// Takes `model` by reference: the caller still owns it afterwards, needed to reconstruct
/// routes from the returned variable assignments.
pub fn solve(model: &MilpModel, limits: SolveLimits) -> SolveOutcome {
    let problem = model.problem.clone();
    let objective = model.objective.clone();
    let constraints = model.constraints.clone();
    let vars = &model.vars;

    let objective_expr = objective.clone();
    let mut cbc = coin_cbc(problem.minimise(objective));
    if !limits.verbose {
        cbc.set_parameter("logLevel", "0");
    }
    cbc = cbc.with_time_limit(limits.time_limit_s);
    if let Ok(gapped) = cbc.clone().with_mip_gap(limits.gap) {
        cbc = gapped;
    }
    for constraint in constraints {
        cbc.add_constraint(constraint);
    }

    let all_vars: Vec<Variable> = vars.values().copied().collect();
    let start = Instant::now();
    let result = cbc.solve();
    let elapsed = start.elapsed();

    match result {
        Ok(solution) => {
            let status = match solution.status() {
                good_lp::SolutionStatus::Optimal => Status::Optimal,
                good_lp::SolutionStatus::TimeLimit => Status::TimeLimit,
                good_lp::SolutionStatus::GapLimit => Status::TimeLimit,
            };
            let objective = objective_expr.eval_with(&solution);
            let values = all_vars.iter().map(|&v| (v, solution.value(v))).collect();
            SolveOutcome {
                status,
                elapsed,
                objective: Some(objective),
                values,
            }
        }
        Err(good_lp::ResolutionError::Infeasible) => SolveOutcome {
            status: Status::Infeasible,
            elapsed,
            objective: None,
            values: Vec::new(),
        },
        Err(good_lp::ResolutionError::Unbounded) => SolveOutcome {
            status: Status::Unbounded,
            elapsed,
            objective: None,
            values: Vec::new(),
        },
        Err(good_lp::ResolutionError::Other(_) | good_lp::ResolutionError::Str(_)) => SolveOutcome {
            status: Status::Error,
            elapsed,
            objective: None,
            values: Vec::new(),
        },
    }
}
