//! View-model derivations for dashboard panels.

use serde::Serialize;

use crate::registry::AgentRecord;

/// Scale floor of the performance chart.
const MIN_PERFORMANCE_SCALE: f64 = 100.0;

/// One bar of the vote distribution panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteShare {
    pub id: String,
    pub value: f64,
    /// Share of the active total, 0–100.
    pub percentage: f64,
}

/// One bar of the performance chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformancePoint {
    pub id: String,
    pub performance: f64,
    /// Bar width relative to the chart scale, 0–100.
    pub width_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSeries {
    pub points: Vec<PerformancePoint>,
    pub max_performance: f64,
}

/// First `n` characters of `id`.
pub fn short_id(id: &str, n: usize) -> String {
    id.chars().take(n).collect()
}

/// Abbreviate an address as `0x1234...abcd`.
pub fn short_address(address: &str) -> String {
    let head: String = address.chars().take(6).collect();
    let tail: String = address.chars().skip(38).collect();
    format!("{}...{}", head, tail)
}

/// Whether the connected wallet owns an agent.
pub fn is_owner(wallet: Option<&str>, owner: &str) -> bool {
    wallet.is_some_and(|w| w.eq_ignore_ascii_case(owner))
}

/// Vote share of every active agent.
///
/// Undecodable votes count as zero.
pub fn vote_distribution(agents: &[AgentRecord]) -> Vec<VoteShare> {
    let active: Vec<(&AgentRecord, f64)> = agents
        .iter()
        .filter(|a| a.is_active())
        .map(|a| (a, a.vote().unwrap_or(0.0)))
        .collect();
    let total: f64 = active.iter().map(|(_, v)| v).sum();

    active
        .into_iter()
        .map(|(agent, value)| VoteShare {
            id: short_id(&agent.id, 6),
            value,
            percentage: if total > 0.0 { value / total * 100.0 } else { 0.0 },
        })
        .collect()
}

/// Performance bars for every agent with a numeric performance value.
pub fn performance_series(agents: &[AgentRecord]) -> PerformanceSeries {
    let parsed: Vec<(String, f64)> = agents
        .iter()
        .filter_map(|a| {
            a.performance
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|p| !p.is_nan())
                .map(|p| (short_id(&a.id, 6), p))
        })
        .collect();

    let max_performance = parsed
        .iter()
        .map(|(_, p)| *p)
        .fold(MIN_PERFORMANCE_SCALE, f64::max);

    let points = parsed
        .into_iter()
        .map(|(id, performance)| PerformancePoint {
            id,
            performance,
            width_percentage: performance / max_performance * 100.0,
        })
        .collect();

    PerformanceSeries {
        points,
        max_performance,
    }
}
