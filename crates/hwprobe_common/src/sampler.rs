//! Utilization sampler
//!
//! A sampling pass reads every `cpu*` line of /proc/stat (the aggregate
//! first, then one per logical core) plus a best-effort temperature for
//! each index. Usage is derived from two passes taken some time apart:
//!
//! ```text
//! usage = 100 * (1 - idle_delta / total_delta)
//! ```
//!
//! with 0 when there is no baseline for an index or no time elapsed.

use crate::evidence::{paths, EvidenceReader};
use crate::types::{CoreCounterSnapshot, CoreUsageResult};
use tracing::debug;

/// Aggregate line plus 128 cores
pub const MAX_CPU_LINES: usize = 129;

/// One /proc/stat line and the temperature read alongside it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreSample {
    pub counters: CoreCounterSnapshot,
    pub temperature_celsius: i32,
}

/// Result of one sampling pass. Index 0 is the aggregate line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuSample {
    pub cores: Vec<CoreSample>,
}

impl CpuSample {
    /// Take a sampling pass. A missing /proc/stat yields an empty sample.
    pub fn capture<E: EvidenceReader + ?Sized>(evidence: &E) -> Self {
        let counters = evidence
            .read_optional(paths::PROC_STAT)
            .map(|stat| parse_stat(&stat))
            .unwrap_or_default();

        let cores = counters
            .into_iter()
            .enumerate()
            .map(|(index, counters)| CoreSample {
                counters,
                temperature_celsius: core_temperature(evidence, index),
            })
            .collect::<Vec<_>>();

        debug!("Sampled {} cpu lines", cores.len());
        Self { cores }
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }
}

/// Counters for the leading run of `cpu*` lines, capped at `MAX_CPU_LINES`.
pub fn parse_stat(stat: &str) -> Vec<CoreCounterSnapshot> {
    stat.lines()
        .take_while(|line| line.starts_with("cpu"))
        .take(MAX_CPU_LINES)
        .map(parse_cpu_line)
        .collect()
}

/// Parse `cpuN user nice system idle iowait irq softirq steal guest guest_nice`.
/// The two guest counters are ignored; missing or malformed fields read as 0.
pub fn parse_cpu_line(line: &str) -> CoreCounterSnapshot {
    let mut values = [0u64; 8];
    for (slot, field) in values.iter_mut().zip(line.split_whitespace().skip(1)) {
        *slot = field.parse().unwrap_or(0);
    }

    let [user, nice, system, idle, iowait, irq, softirq, steal] = values;
    CoreCounterSnapshot {
        user,
        nice,
        system,
        idle,
        iowait,
        irq,
        softirq,
        steal,
    }
}

/// Temperature for a stat index in whole degrees Celsius.
///
/// Tries `thermal_zone{index}` first, then `temp{index+1}_input` under the
/// coretemp hwmon directories (temp1 is the package sensor, so the aggregate
/// line lines up with it and core N with temp N+1). Returns 0 when neither
/// answers.
pub fn core_temperature<E: EvidenceReader + ?Sized>(evidence: &E, index: usize) -> i32 {
    let zone = format!("{}/thermal_zone{}/temp", paths::THERMAL_ZONE_DIR, index);
    if let Some(celsius) = read_millidegrees(evidence, &zone) {
        return celsius;
    }

    let hwmons = match evidence.list_dir(paths::CORETEMP_HWMON_DIR) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("{}", e);
            return 0;
        }
    };

    hwmons
        .iter()
        .filter(|name| name.starts_with("hwmon"))
        .find_map(|name| {
            let input = format!(
                "{}/{}/temp{}_input",
                paths::CORETEMP_HWMON_DIR,
                name,
                index + 1
            );
            read_millidegrees(evidence, &input)
        })
        .unwrap_or(0)
}

fn read_millidegrees<E: EvidenceReader + ?Sized>(evidence: &E, path: &str) -> Option<i32> {
    let raw = evidence.first_line(path)?;
    match raw.parse::<i64>() {
        Ok(milli) => i32::try_from(milli / 1000).ok(),
        Err(_) => {
            debug!("Unparsable temperature in {}: {}", path, raw);
            None
        }
    }
}

/// Usage between two snapshots of the same core.
pub fn usage_percent(baseline: &CoreCounterSnapshot, current: &CoreCounterSnapshot) -> f64 {
    let total_delta = current.total().saturating_sub(baseline.total());
    let idle_delta = current.idle.saturating_sub(baseline.idle);

    if total_delta == 0 {
        return 0.0;
    }

    let usage = 100.0 * (1.0 - idle_delta as f64 / total_delta as f64);
    usage.clamp(0.0, 100.0)
}

/// Per-index results for `current`.
///
/// Deltas are only computed for indices present in both passes; if the
/// core count changed in between, the extra indices keep usage 0.
pub fn compute_usage(baseline: Option<&CpuSample>, current: &CpuSample) -> Vec<CoreUsageResult> {
    let mut results: Vec<CoreUsageResult> = current
        .cores
        .iter()
        .map(|core| CoreUsageResult {
            usage_percent: 0.0,
            temperature_celsius: core.temperature_celsius,
        })
        .collect();

    let Some(baseline) = baseline else {
        return results;
    };

    if baseline.len() != current.len() {
        debug!(
            "Core count changed between passes ({} -> {})",
            baseline.len(),
            current.len()
        );
    }

    // zip stops at min(baseline, current)
    for ((result, before), after) in results
        .iter_mut()
        .zip(&baseline.cores)
        .zip(&current.cores)
    {
        result.usage_percent = usage_percent(&before.counters, &after.counters);
    }

    results
}
