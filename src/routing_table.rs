//! The per-source routing table: destination prefixes to candidate routes,
//! one per next hop, with best-hop selection.

use crate::decimal;
use crate::prefix_map::PrefixMap;
use crate::route::Route;
use num_rational::BigRational;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Winner of a best-hop query.
#[derive(Clone, Debug)]
pub struct BestHop {
    pub next_hop: String,
    /// The destination amount reachable (source-amount query) or the source
    /// amount required (destination-amount query), as a decimal string.
    pub amount: String,
    pub route: Route,
}

/// Routes from one source ledger, keyed by destination prefix and then by
/// next-hop identifier. At most one route per (destination, next hop) pair;
/// the inner map is ordered so candidate iteration is deterministic.
#[derive(Clone, Debug, Default)]
pub struct RoutingTable {
    pub(crate) destinations: PrefixMap<BTreeMap<String, Route>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        RoutingTable::default()
    }

    /// Set the route for this destination and next hop, overwriting the one
    /// that was there before.
    pub fn add_route(&mut self, destination: &str, next_hop: &str, route: Route) {
        if let Some(routes) = self.destinations.get_mut(destination) {
            routes.insert(next_hop.to_string(), route);
        } else {
            let mut routes = BTreeMap::new();
            routes.insert(next_hop.to_string(), route);
            self.destinations.insert(destination, routes);
        }
    }

    /// Remove the route for this destination and next hop. Returns true if
    /// that route existed before.
    pub fn remove_route(&mut self, destination: &str, next_hop: &str) -> bool {
        let removed = match self.destinations.get_mut(destination) {
            Some(routes) => routes.remove(next_hop).is_some(),
            None => false,
        };
        if removed
            && self
                .destinations
                .get(destination)
                .map_or(false, BTreeMap::is_empty)
        {
            self.destinations.remove(destination);
        }
        removed
    }

    pub fn get_route(&self, destination: &str, next_hop: &str) -> Option<&Route> {
        self.destinations.get(destination)?.get(next_hop)
    }

    /// The hop that yields the highest destination amount for the given
    /// source amount.
    pub fn find_best_hop_for_source_amount(
        &self,
        destination: &str,
        source_amount: &BigRational,
    ) -> Option<BestHop> {
        let routes = self.destinations.resolve(destination)?;
        let mut best: Option<PathQuote> = None;
        for (next_hop, route) in routes.iter() {
            best = Some(better_path(
                best,
                PathQuote {
                    value: Some(route.amount_at(source_amount)),
                    cost: None,
                    path_length: route.path_length(),
                    next_hop,
                    route,
                },
            ));
        }
        into_best_hop(best)
    }

    /// The hop that requires the lowest source amount to deliver the given
    /// destination amount. Hops that cannot reach the amount at all are
    /// ignored.
    pub fn find_best_hop_for_destination_amount(
        &self,
        destination: &str,
        destination_amount: &BigRational,
    ) -> Option<BestHop> {
        let routes = self.destinations.resolve(destination)?;
        let mut best: Option<PathQuote> = None;
        for (next_hop, route) in routes.iter() {
            let cost = match route.amount_reverse(destination_amount) {
                Some(cost) => cost,
                None => continue,
            };
            best = Some(better_path(
                best,
                PathQuote {
                    value: None,
                    cost: Some(cost),
                    path_length: route.path_length(),
                    next_hop,
                    route,
                },
            ));
        }
        into_best_hop(best)
    }
}

struct PathQuote<'a> {
    value: Option<BigRational>,
    cost: Option<BigRational>,
    path_length: u32,
    next_hop: &'a str,
    route: &'a Route,
}

/// Pick the better of two candidate paths: higher value (or lower cost)
/// wins, equal amounts fall back to the shorter path, and a full tie keeps
/// the current candidate.
fn better_path<'a>(
    current: Option<PathQuote<'a>>,
    other: PathQuote<'a>,
) -> PathQuote<'a> {
    match current {
        None => other,
        Some(current) => {
            if replaces(&other, &current) {
                other
            } else {
                current
            }
        }
    }
}

fn replaces(other: &PathQuote, current: &PathQuote) -> bool {
    match (&current.value, &other.value) {
        (None, Some(_)) => return true,
        (Some(_), None) => return false,
        (Some(current_value), Some(other_value)) => {
            return match other_value.cmp(current_value) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => other.path_length < current.path_length,
            };
        }
        (None, None) => {}
    }
    match (&current.cost, &other.cost) {
        (None, Some(_)) => return true,
        (Some(_), None) => return false,
        (Some(current_cost), Some(other_cost)) => {
            return match other_cost.cmp(current_cost) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => other.path_length < current.path_length,
            };
        }
        (None, None) => {}
    }
    other.path_length < current.path_length
}

fn into_best_hop(best: Option<PathQuote>) -> Option<BestHop> {
    let best = best?;
    let amount = best.value.as_ref().or_else(|| best.cost.as_ref())?;
    Some(BestHop {
        next_hop: best.next_hop.to_string(),
        amount: decimal::format(amount),
        route: best.route.clone(),
    })
}

#[cfg(test)]
fn two_hop_table() -> RoutingTable {
    use crate::test_helpers::curve;

    let mut table = RoutingTable::new();
    table.add_route(
        "b.",
        "b.mark",
        Route::from_hops(curve(&[(0, 0), (100, 100)]), vec!["a.".to_string(), "b.".to_string()]),
    );
    table.add_route(
        "b.",
        "b.mary",
        Route::from_hops(curve(&[(0, 0), (50, 60)]), vec!["a.".to_string(), "b.".to_string()]),
    );
    table
}
