//! # interledger-routing
//!
//! Liquidity-curve based routing tables for Interledger connectors.
//!
//! A connector holds, for each source ledger it is connected to, a table of
//! routes toward destination ledger prefixes. Each route carries a
//! piecewise-linear [`LiquidityCurve`] mapping source amounts to
//! destination amounts, so the tables can answer two questions: given a
//! source amount, which next hop delivers the most at the destination; and
//! given a desired destination amount, which next hop needs the least at
//! the source.
//!
//! [`RoutingTables`] composes announced routes with the locally configured
//! ledger pairs to derive transitive routes, keeps a monotonic epoch for
//! broadcast versioning, expires routes past their hold-down, and
//! serializes the combined tables into the external [`RouteData`] form.
//!
//! This crate is purely the routing core. Transports that carry route
//! announcements, quoting services, and packet forwarding live elsewhere
//! and talk to this crate through [`RouteData`] records and best-hop
//! queries.

mod clock;
mod curve;
pub mod decimal;
mod error;
mod prefix_map;
mod route;
mod routing_table;
mod routing_tables;

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod test_helpers;

pub use clock::{Clock, SystemClock};
pub use curve::{LiquidityCurve, Point};
pub use error::RoutingError;
pub use prefix_map::PrefixMap;
pub use route::{Route, RouteData};
pub use routing_table::{BestHop, RoutingTable};
pub use routing_tables::{RoutingTables, PAIR};
