//! Error taxonomy shared by every stage of the pipeline.

/// Everything that can go wrong while preparing a scenario, building the MILP, or
/// driving the solver.
///
/// Solver-reported non-optimal terminations (`Infeasible`, `Unbounded`, `TimeLimit`)
/// are not represented here: those are returned as structured [`crate::result::RunResult`]
/// values, not as errors, since they are expected outcomes of optimization rather than
/// bugs in the pipeline itself.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A numeric range is empty or non-positive (severity bands, capacity range, costs).
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// An edge is missing a required attribute (`length_m` or `capacity_kmh`).
    #[error("missing attribute: {0}")]
    MissingAttribute(String),

    /// Fewer candidate destination nodes than emergencies to bind.
    #[error("insufficient destination candidates: {0}")]
    InsufficientNodes(String),

    /// Malformed input: origin not in graph, duplicate/self-loop destination, empty
    /// emergency list, and similar structural problems.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The underlying MILP solver could not be invoked at all.
    #[error("solver unavailable: {0}")]
    SolverUnavailable(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
