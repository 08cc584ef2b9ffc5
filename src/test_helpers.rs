use crate::clock::Clock;
use crate::curve::{LiquidityCurve, Point};
use crate::route::{Route, RouteData};
use chrono::{DateTime, Duration, TimeZone, Utc};
use num_rational::BigRational;
use std::sync::{Arc, Mutex};

pub fn rational(value: i64) -> BigRational {
    BigRational::from_integer(value.into())
}

pub fn curve(points: &[(i64, i64)]) -> LiquidityCurve {
    LiquidityCurve::new(
        points
            .iter()
            .map(|(x, y)| Point::new(rational(*x), rational(*y)))
            .collect(),
    )
    .unwrap()
}

/// The fixed instant all tests start from.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 6, 16, 0, 0, 0).unwrap()
}

/// A locally configured pair between two adjacent ledgers, with our
/// connector ("mark") holding an account on both.
pub fn local_route(source: &str, destination: &str, points: &[(i64, i64)]) -> Route {
    let mut route = Route::from_hops(
        curve(points),
        vec![source.to_string(), destination.to_string()],
    );
    route.source_account = Some(format!("{}mark", source));
    route.destination_account = Some(format!("{}mark", destination));
    route.min_message_window = 1;
    route
}

pub fn route_data(source: &str, destination: &str, points: &[(&str, &str)]) -> RouteData {
    RouteData {
        source_ledger: source.to_string(),
        destination_ledger: destination.to_string(),
        source_account: None,
        destination_account: None,
        points: points
            .iter()
            .map(|(x, y)| [x.to_string(), y.to_string()])
            .collect(),
        min_message_window: 1,
        expires_at: None,
        added_during_epoch: None,
        hops: None,
        target_prefix: None,
    }
}

/// A clock tests can advance by hand.
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn starting_at(start: DateTime<Utc>) -> Arc<TestClock> {
        Arc::new(TestClock {
            now: Mutex::new(start),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
