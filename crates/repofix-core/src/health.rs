//! Smoke probes against a locally running dev server.

use crate::error::Result;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Routes probed by `smoke`, relative to the web origin.
pub const DEFAULT_ROUTES: &[&str] = &["/", "/tracker", "/tracker/activity?id=demo"];

#[derive(Debug, Serialize)]
pub struct Probe {
    pub route: String,
    pub url: String,
    /// HTTP status, or `None` when the request itself failed.
    pub status: Option<u16>,
    pub ok: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// GET each route once with `timeout`. Connection failures become a
/// failed probe rather than an error, so one dead route doesn't hide
/// the rest.
pub fn probe_routes(base_url: &str, routes: &[&str], timeout: Duration) -> Result<Vec<Probe>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()?;
    let base = base_url.trim_end_matches('/');

    let mut probes = Vec::with_capacity(routes.len());
    for route in routes {
        let url = format!("{base}{route}");
        let start = Instant::now();
        let (status, error) = match client.get(&url).send() {
            Ok(resp) => (Some(resp.status().as_u16()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        probes.push(Probe {
            route: route.to_string(),
            url,
            status,
            ok: status.is_some_and(|s| (200..400).contains(&s)),
            duration_ms: start.elapsed().as_millis() as u64,
            error,
        });
    }
    Ok(probes)
}

pub fn all_ok(probes: &[Probe]) -> bool {
    !probes.is_empty() && probes.iter().all(|p| p.ok)
}
