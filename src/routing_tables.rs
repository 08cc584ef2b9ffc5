//! The routing-tables composer.
//!
//! Holds one [`RoutingTable`] per source ledger, derives transitive routes
//! from locally configured ledger pairs and announced routes, tracks a
//! monotonic epoch, expires stale routes, and serializes the combined
//! tables for broadcast.

use crate::clock::{Clock, SystemClock};
use crate::error::RoutingError;
use crate::prefix_map::PrefixMap;
use crate::route::{Route, RouteData};
use crate::routing_table::{BestHop, RoutingTable};
use chrono::Duration;
use hashbrown::HashMap;
use num_rational::BigRational;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Next-hop key reserved for locally configured ledger pairs. Derived
/// routes are keyed by the connector account that announced them, so the
/// two can never collide.
pub const PAIR: &str = "PAIR";

/// Transitive derivation is bounded by the local-pair rule; this guard
/// stops propagation outright if that assumption is ever violated.
const MAX_DERIVATION_DEPTH: u32 = 10;

pub struct RoutingTables {
    sources: PrefixMap<RoutingTable>,
    /// Account URI of our own connector on each local ledger.
    local_accounts: HashMap<String, String>,
    current_epoch: u64,
    /// Hold-down applied to derived routes.
    expiry_duration: Duration,
    clock: Arc<dyn Clock>,
}

impl RoutingTables {
    pub fn new(
        local_routes: Vec<RouteData>,
        expiry_duration: Duration,
    ) -> Result<Self, RoutingError> {
        Self::with_clock(local_routes, expiry_duration, Arc::new(SystemClock))
    }

    pub fn with_clock(
        local_routes: Vec<RouteData>,
        expiry_duration: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RoutingError> {
        let mut tables = RoutingTables {
            sources: PrefixMap::new(),
            local_accounts: HashMap::new(),
            current_epoch: 0,
            expiry_duration,
            clock,
        };
        let routes = local_routes
            .into_iter()
            .map(Route::from_data)
            .collect::<Result<Vec<_>, _>>()?;
        tables.add_local_routes(routes);
        Ok(tables)
    }

    /// The version of the tables, bumped on every successful insertion.
    pub fn current_epoch(&self) -> u64 {
        self.current_epoch
    }

    /// Install locally configured ledger pairs, then derive the transitive
    /// routes they enable.
    pub fn add_local_routes(&mut self, routes: impl IntoIterator<Item = Route>) {
        let mut local_routes = Vec::new();
        for mut route in routes {
            route.is_local = true;
            debug!(
                "adding local pair {} -> {}",
                route.source_ledger, route.destination_ledger
            );
            if let Some(account) = &route.source_account {
                self.local_accounts
                    .insert(route.source_ledger.clone(), account.clone());
            }
            if let Some(account) = &route.destination_account {
                self.local_accounts
                    .insert(route.destination_ledger.clone(), account.clone());
            }
            if self.sources.get(&route.source_ledger).is_none() {
                self.sources
                    .insert(route.source_ledger.clone(), RoutingTable::new());
            }
            if let Some(table) = self.sources.get_mut(&route.source_ledger) {
                table.add_route(&route.destination_ledger, PAIR, route.clone());
            }
            local_routes.push(route);
        }
        for route in local_routes {
            self.add_route(route);
        }
    }

    /// Compose an announced route with every local pair that reaches its
    /// source ledger. Returns true, and advances the epoch, if any new
    /// (destination, connector) slot appeared.
    pub fn add_route(&mut self, route: Route) -> bool {
        self.add_route_at_depth(&route, 0)
    }

    fn add_route_at_depth(&mut self, route: &Route, depth: u32) -> bool {
        if depth > MAX_DERIVATION_DEPTH {
            warn!(
                "not propagating route {} -> {} past depth {}",
                route.source_ledger, route.target_prefix, MAX_DERIVATION_DEPTH
            );
            return false;
        }
        let source_ledgers = self.sources.keys().to_vec();
        let mut added = false;
        for source in source_ledgers {
            added = self.add_route_from_source(&source, route, depth) || added;
        }
        if added {
            self.current_epoch += 1;
            trace!("routing tables at epoch {}", self.current_epoch);
        }
        added
    }

    fn add_route_from_source(&mut self, source: &str, route: &Route, depth: u32) -> bool {
        let destination = route.target_prefix.clone();
        let connector = match &route.source_account {
            Some(connector) => connector.clone(),
            None => {
                debug!(
                    "ignoring route {} -> {} with no source account",
                    route.source_ledger, destination
                );
                return false;
            }
        };

        // A direct local pair is never overridden by a derived route.
        if route.is_local && self.get_local_pair_route(source, &destination).is_some() {
            return false;
        }

        let now = self.clock.now();
        let mut derived = {
            let pair = match self.get_local_pair_route(source, &route.source_ledger) {
                Some(pair) => pair,
                None => return false,
            };
            match pair.join(
                route,
                Some(self.expiry_duration),
                self.current_epoch,
                now,
            ) {
                Some(derived) => derived,
                None => return false,
            }
        };

        let is_new = self
            .sources
            .get(source)
            .and_then(|table| table.get_route(&destination, &connector))
            .is_none();
        if is_new {
            derived.added_during_epoch += 1;
        }
        debug!(
            "derived route {} -> {} via {} (new: {})",
            source, destination, connector, is_new
        );
        if let Some(table) = self.sources.get_mut(source) {
            table.add_route(&destination, &connector, derived.clone());
        }
        if is_new {
            self.add_route_at_depth(&derived, depth + 1);
        }
        is_new
    }

    /// The locally configured pair from `source` to `destination`, if any.
    pub fn get_local_pair_route(&self, source: &str, destination: &str) -> Option<&Route> {
        self.sources.get(source)?.get_route(destination, PAIR)
    }

    /// Drop every route from or to the given ledger.
    pub fn remove_ledger(&mut self, ledger: &str) {
        let lost = self.remove_matching(|source, destination, _next_hop, _route| {
            source == ledger || destination == ledger
        });
        if !lost.is_empty() {
            debug!("removed ledger {} ({} destinations lost)", ledger, lost.len());
        }
    }

    /// Drop every route past its hold-down. Returns the destination
    /// prefixes that lost at least one route.
    pub fn remove_expired_routes(&mut self) -> Vec<String> {
        let now = self.clock.now();
        let lost = self.remove_matching(|_source, _destination, _next_hop, route| {
            route.is_expired(now)
        });
        if !lost.is_empty() {
            debug!("expired routes to {:?}", lost);
        }
        lost
    }

    /// Refresh the hold-down of every route through the given connector.
    pub fn bump_connector(&mut self, connector: &str, hold_down: Duration) {
        let now = self.clock.now();
        self.sources.each_mut(|table, _source| {
            table.destinations.each_mut(|routes, _destination| {
                if let Some(route) = routes.get_mut(connector) {
                    route.bump_expiration(now, hold_down);
                }
            });
        });
    }

    /// Drop every non-static route through the given connector. Returns the
    /// destination prefixes that lost at least one route.
    pub fn invalidate_connector(&mut self, connector: &str) -> Vec<String> {
        self.remove_matching(|_source, _destination, next_hop, route| {
            next_hop == connector && route.expires_at.is_some()
        })
    }

    /// Drop the non-static routes through the given connector to one
    /// destination ledger.
    pub fn invalidate_connectors_routes_to(
        &mut self,
        connector: &str,
        ledger: &str,
    ) -> Vec<String> {
        self.remove_matching(|_source, destination, next_hop, route| {
            next_hop == connector && destination == ledger && route.expires_at.is_some()
        })
    }

    fn remove_matching(
        &mut self,
        mut predicate: impl FnMut(&str, &str, &str, &Route) -> bool,
    ) -> Vec<String> {
        let mut victims = Vec::new();
        self.sources.each(|table, source| {
            table.destinations.each(|routes, destination| {
                for (next_hop, route) in routes.iter() {
                    if predicate(source, destination, next_hop, route) {
                        victims.push((
                            source.to_string(),
                            destination.to_string(),
                            next_hop.clone(),
                        ));
                    }
                }
            });
        });

        let mut lost = Vec::new();
        for (source, destination, next_hop) in victims {
            if let Some(table) = self.sources.get_mut(&source) {
                if table.remove_route(&destination, &next_hop) {
                    lost.push(destination);
                }
            }
        }
        lost.sort();
        lost.dedup();
        lost
    }

    /// Best next hop from `source` toward `destination` for a given source
    /// amount. A local-pair winner is reported as our own account on the
    /// destination ledger.
    pub fn find_best_hop_for_source_amount(
        &self,
        source: &str,
        destination: &str,
        source_amount: &BigRational,
    ) -> Option<BestHop> {
        let table = self.sources.resolve(source)?;
        let mut hop = table.find_best_hop_for_source_amount(destination, source_amount)?;
        self.rewrite_local_hop(&mut hop);
        Some(hop)
    }

    /// Best next hop from `source` toward `destination` for a desired
    /// destination amount.
    pub fn find_best_hop_for_destination_amount(
        &self,
        source: &str,
        destination: &str,
        destination_amount: &BigRational,
    ) -> Option<BestHop> {
        let table = self.sources.resolve(source)?;
        let mut hop =
            table.find_best_hop_for_destination_amount(destination, destination_amount)?;
        self.rewrite_local_hop(&mut hop);
        Some(hop)
    }

    fn rewrite_local_hop(&self, hop: &mut BestHop) {
        if hop.next_hop == PAIR {
            match self.local_accounts.get(&hop.route.destination_ledger) {
                Some(account) => hop.next_hop = account.clone(),
                None => warn!(
                    "no local account configured for {}",
                    hop.route.destination_ledger
                ),
            }
        }
    }

    /// Serialize the tables for broadcast: one record per (source,
    /// destination), with all connectors collapsed into a single curve of at
    /// most `max_points` points.
    pub fn to_route_data(&self, max_points: usize) -> Result<Vec<RouteData>, RoutingError> {
        if max_points == 0 {
            return Err(RoutingError::InvalidMaxPoints);
        }
        let mut records = Vec::new();
        self.sources.each(|table, source| {
            table.destinations.each(|routes, _destination| {
                let mut combined: Option<Route> = None;
                for route in routes.values() {
                    combined = Some(match combined {
                        Some(total) => total.combine(route),
                        None => route.clone(),
                    });
                }
                if let Some(combined) = combined {
                    let simplified = Route {
                        curve: combined.curve.simplify(max_points),
                        ..combined
                    };
                    let mut data = simplified.to_data();
                    data.source_account = self.local_accounts.get(source).cloned();
                    records.push(data);
                }
            });
        });
        Ok(records)
    }
}

#[cfg(test)]
fn chain_tables() -> (RoutingTables, Arc<crate::test_helpers::TestClock>) {
    use crate::test_helpers::{local_route, now, TestClock};

    let clock = TestClock::starting_at(now());
    let mut tables = RoutingTables {
        sources: PrefixMap::new(),
        local_accounts: HashMap::new(),
        current_epoch: 0,
        expiry_duration: Duration::milliseconds(45_000),
        clock: clock.clone(),
    };
    tables.add_local_routes(vec![
        local_route("a.", "b.", &[(0, 0), (100, 100)]),
        local_route("b.", "c.", &[(0, 0), (100, 100)]),
    ]);
    (tables, clock)
}

#[cfg(test)]
mod add_local_routes {
    use super::*;
    use crate::test_helpers::rational;

    #[test]
    fn installs_pairs_and_local_accounts() {
        let (tables, _clock) = chain_tables();
        let pair = tables.get_local_pair_route("a.", "b.").unwrap();
        assert!(pair.is_local);
        assert_eq!(pair.expires_at, None);
        assert_eq!(tables.local_accounts.get("a."), Some(&"a.mark".to_string()));
        assert_eq!(tables.local_accounts.get("c."), Some(&"c.mark".to_string()));
    }

    #[test]
    fn derives_the_transitive_route_between_pairs() {
        let (tables, _clock) = chain_tables();
        // a->b joined with b->c, keyed by the b->c pair's source account
        let derived = tables
            .sources
            .get("a.")
            .and_then(|table| table.get_route("c.", "b.mark"))
            .unwrap();
        assert_eq!(derived.hops, vec!["a.", "b.", "c."]);
        assert_eq!(derived.path_length(), 2);
        assert!(!derived.is_local);
        assert_eq!(derived.amount_at(&rational(50)), rational(50));
    }
}


#[cfg(test)]
mod expiry {
    use super::*;
    use crate::fixtures::{ROUTE_C_TO_D, ROUTE_C_TO_E};

    fn announce(tables: &mut RoutingTables) {
        tables.add_route(Route::from_data(ROUTE_C_TO_D.clone()).unwrap());
    }

    #[test]
    fn remove_expired_routes_reports_lost_destinations() {
        let (mut tables, clock) = chain_tables();
        announce(&mut tables);
        assert!(tables.remove_expired_routes().is_empty());

        clock.advance(Duration::milliseconds(45_001));
        let lost = tables.remove_expired_routes();
        assert_eq!(lost, vec!["c.".to_string(), "d.".to_string()]);
        assert!(tables
            .sources
            .get("b.")
            .and_then(|table| table.get_route("d.", "c.martin"))
            .is_none());
    }

    #[test]
    fn local_pairs_never_expire() {
        let (mut tables, clock) = chain_tables();
        clock.advance(Duration::days(1));
        tables.remove_expired_routes();
        assert!(tables.get_local_pair_route("a.", "b.").is_some());
        assert!(tables.get_local_pair_route("b.", "c.").is_some());
    }

    #[test]
    fn bump_connector_extends_the_hold_down() {
        let (mut tables, clock) = chain_tables();
        announce(&mut tables);

        clock.advance(Duration::milliseconds(40_000));
        tables.bump_connector("c.martin", Duration::milliseconds(45_000));
        clock.advance(Duration::milliseconds(10_000));

        // the bumped route survives its original deadline
        assert!(tables
            .sources
            .get("b.")
            .and_then(|table| table.get_route("d.", "c.martin"))
            .map(|route| !route.is_expired(clock.now()))
            .unwrap_or(false));
    }

    #[test]
    fn invalidate_connector_spares_static_routes() {
        let (mut tables, _clock) = chain_tables();
        announce(&mut tables);

        let lost = tables.invalidate_connector("c.martin");
        assert_eq!(lost, vec!["d.".to_string()]);
        assert!(tables.get_local_pair_route("b.", "c.").is_some());
    }

    #[test]
    fn invalidate_routes_to_one_ledger_only() {
        let (mut tables, _clock) = chain_tables();
        announce(&mut tables);
        tables.add_route(Route::from_data(ROUTE_C_TO_E.clone()).unwrap());

        let lost = tables.invalidate_connectors_routes_to("c.martin", "d.");
        assert_eq!(lost, vec!["d.".to_string()]);
        assert!(tables
            .sources
            .get("b.")
            .and_then(|table| table.get_route("e.", "c.martin"))
            .is_some());
    }
}
