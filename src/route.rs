//! Routes: a liquidity curve plus the hop metadata needed to pick a next
//! hop and to re-broadcast the route to peers.

use crate::curve::{LiquidityCurve, Point};
use crate::decimal;
use crate::error::RoutingError;
use chrono::{DateTime, Duration, Utc};
use num_rational::BigRational;
use serde::{Deserialize, Serialize};

/// A route from a source ledger to a destination ledger through a chain of
/// intermediary ledgers.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub curve: LiquidityCurve,
    /// Ledgers traversed, source first. Always has at least the two
    /// endpoints.
    pub hops: Vec<String>,
    pub source_ledger: String,
    /// The ledger reached by the first hop.
    pub next_ledger: String,
    pub destination_ledger: String,
    pub source_account: Option<String>,
    pub destination_account: Option<String>,
    /// Sum of the per-hop message windows, in seconds.
    pub min_message_window: u64,
    /// `None` marks a static route: never expires, immune to invalidation.
    pub expires_at: Option<DateTime<Utc>>,
    pub added_during_epoch: u64,
    /// True iff this is a locally configured ledger pair.
    pub is_local: bool,
    /// The destination prefix this route matches. Defaults to
    /// `destination_ledger`.
    pub target_prefix: String,
}

impl Route {
    /// Build a route from a chain of ledgers, deriving the endpoint fields.
    /// Metadata defaults to a static, non-local route.
    pub fn from_hops(curve: LiquidityCurve, hops: Vec<String>) -> Route {
        let source_ledger = hops.first().cloned().unwrap_or_default();
        let destination_ledger = hops.last().cloned().unwrap_or_default();
        let next_ledger = hops
            .get(1)
            .cloned()
            .unwrap_or_else(|| destination_ledger.clone());
        Route {
            curve,
            target_prefix: destination_ledger.clone(),
            source_ledger,
            next_ledger,
            destination_ledger,
            source_account: None,
            destination_account: None,
            min_message_window: 0,
            expires_at: None,
            added_during_epoch: 0,
            is_local: false,
            hops,
        }
    }

    /// Construct a route from its external form.
    pub fn from_data(data: RouteData) -> Result<Route, RoutingError> {
        if data.source_ledger.is_empty() {
            return Err(RoutingError::MissingField("source_ledger"));
        }
        if data.destination_ledger.is_empty() {
            return Err(RoutingError::MissingField("destination_ledger"));
        }
        let mut points = Vec::with_capacity(data.points.len());
        for [x, y] in data.points.iter() {
            points.push(Point::new(decimal::parse(x)?, decimal::parse(y)?));
        }
        let curve = LiquidityCurve::new(points)?;

        let hops = match data.hops {
            Some(hops) if !hops.is_empty() => hops,
            _ => vec![
                data.source_ledger.clone(),
                data.destination_ledger.clone(),
            ],
        };
        let destination_ledger = data.destination_ledger;
        let next_ledger = hops
            .get(1)
            .cloned()
            .unwrap_or_else(|| destination_ledger.clone());

        Ok(Route {
            curve,
            source_ledger: data.source_ledger,
            next_ledger,
            target_prefix: data
                .target_prefix
                .unwrap_or_else(|| destination_ledger.clone()),
            destination_ledger,
            source_account: data.source_account,
            destination_account: data.destination_account,
            min_message_window: data.min_message_window,
            expires_at: data.expires_at,
            added_during_epoch: data.added_during_epoch.unwrap_or(0),
            is_local: false,
            hops,
        })
    }

    /// The external form of this route.
    pub fn to_data(&self) -> RouteData {
        RouteData {
            source_ledger: self.source_ledger.clone(),
            destination_ledger: self.destination_ledger.clone(),
            source_account: self.source_account.clone(),
            destination_account: self.destination_account.clone(),
            points: self
                .curve
                .points()
                .iter()
                .map(|p| [decimal::format(&p.x), decimal::format(&p.y)])
                .collect(),
            min_message_window: self.min_message_window,
            expires_at: self.expires_at,
            added_during_epoch: Some(self.added_during_epoch),
            hops: Some(self.hops.clone()),
            target_prefix: if self.target_prefix == self.destination_ledger {
                None
            } else {
                Some(self.target_prefix.clone())
            },
        }
    }

    pub fn amount_at(&self, x: &BigRational) -> BigRational {
        self.curve.amount_at(x)
    }

    pub fn amount_reverse(&self, y: &BigRational) -> Option<BigRational> {
        self.curve.amount_reverse(y)
    }

    /// Number of hops between the endpoint ledgers.
    pub fn path_length(&self) -> u32 {
        self.hops.len().saturating_sub(1) as u32
    }

    /// Parallel composition with an alternative route to the same
    /// destination: the curve takes the better of the two at every amount,
    /// the metadata stays ours, and the message window covers both.
    pub fn combine(&self, alt: &Route) -> Route {
        Route {
            curve: self.curve.combine(&alt.curve),
            min_message_window: self.min_message_window.max(alt.min_message_window),
            ..self.clone()
        }
    }

    /// Serial composition: extend this route with `tail`, whose source
    /// ledger must be our destination ledger.
    ///
    /// Returns `None` when the endpoints do not meet or the joined curve is
    /// empty.
    pub fn join(
        &self,
        tail: &Route,
        expiry_duration: Option<Duration>,
        epoch: u64,
        now: DateTime<Utc>,
    ) -> Option<Route> {
        if self.destination_ledger != tail.source_ledger {
            return None;
        }
        let curve = self.curve.join(&tail.curve);
        if curve.is_empty() {
            return None;
        }

        // The shared midpoint ledger appears only once.
        let mut hops = self.hops.clone();
        hops.extend(tail.hops.iter().skip(1).cloned());

        Some(Route {
            curve,
            source_ledger: self.source_ledger.clone(),
            next_ledger: self.next_ledger.clone(),
            destination_ledger: tail.destination_ledger.clone(),
            source_account: self.source_account.clone(),
            destination_account: tail.destination_account.clone(),
            min_message_window: self.min_message_window + tail.min_message_window,
            expires_at: expiry_duration.map(|duration| now + duration),
            added_during_epoch: epoch,
            is_local: false,
            target_prefix: tail.target_prefix.clone(),
            hops,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    /// Refresh the hold-down timer. Static routes are left untouched.
    pub fn bump_expiration(&mut self, now: DateTime<Utc>, hold_down: Duration) {
        if self.expires_at.is_some() {
            self.expires_at = Some(now + hold_down);
        }
    }
}

/// The external (broadcast) form of a route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteData {
    pub source_ledger: String,
    pub destination_ledger: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_account: Option<String>,
    /// Curve break-points as `[x, y]` decimal-string pairs.
    pub points: Vec<[String; 2]>,
    #[serde(default)]
    pub min_message_window: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_during_epoch: Option<u64>,
    /// Ledgers traversed, source first. Some peers broadcast this under the
    /// older `paths` name.
    #[serde(default, alias = "paths", skip_serializing_if = "Option::is_none")]
    pub hops: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_prefix: Option<String>,
}
