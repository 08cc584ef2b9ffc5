/// Errors reported for invalid input. Missing preconditions (unknown
/// source ledgers, mismatched join endpoints, unachievable amounts) are
/// expected outcomes and surface as `None` instead.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Curve points must have strictly increasing x values (point {0})")]
    NonIncreasingX(usize),
    #[error("Curve points must have non-decreasing y values (point {0})")]
    DecreasingY(usize),
    #[error("Curve points must be non-negative (point {0})")]
    NegativeCoordinate(usize),
    #[error("Route is missing required field: {0}")]
    MissingField(&'static str),
    #[error("maxPoints must be positive")]
    InvalidMaxPoints,
}
