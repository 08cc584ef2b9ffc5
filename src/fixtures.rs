use crate::route::RouteData;
use crate::test_helpers::route_data;
use once_cell::sync::Lazy;

/// An announcement from the connector c.martin for a route doubling amounts
/// on the way to d.
pub static ROUTE_C_TO_D: Lazy<RouteData> = Lazy::new(|| {
    let mut data = route_data("c.", "d.", &[("0", "0"), ("100", "200")]);
    data.source_account = Some("c.martin".to_string());
    data
});

/// A second announcement from the same connector toward a different ledger.
pub static ROUTE_C_TO_E: Lazy<RouteData> = Lazy::new(|| {
    let mut data = route_data("c.", "e.", &[("0", "0"), ("100", "100")]);
    data.source_account = Some("c.martin".to_string());
    data
});
