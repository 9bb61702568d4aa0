//! Memory and swap totals
//!
//! Totals come from sysinfo(2) (pages scaled by the reported unit size);
//! the page cache figure comes from /proc/meminfo. Available memory is
//! always derived as free + cached, never read from a source.

use crate::evidence::{paths, EvidenceReader};
use serde::Serialize;
use tracing::debug;

/// Raw kernel totals in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelMemory {
    pub total: u64,
    pub free: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

impl KernelMemory {
    /// Scale page counts by the kernel's unit size. A unit of 0 is
    /// treated as 1, as on old kernels that left the field unset.
    pub fn from_pages(total: u64, free: u64, swap_total: u64, swap_free: u64, unit: u64) -> Self {
        let unit = unit.max(1);
        Self {
            total: total.saturating_mul(unit),
            free: free.saturating_mul(unit),
            swap_total: swap_total.saturating_mul(unit),
            swap_free: swap_free.saturating_mul(unit),
        }
    }
}

/// Memory figures for one sampling pass, all in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryTotals {
    pub total: u64,
    pub free: u64,
    available: u64,
    pub cached: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

impl MemoryTotals {
    pub fn new(kernel: KernelMemory, cached: u64) -> Self {
        Self {
            total: kernel.total,
            free: kernel.free,
            available: kernel.free.saturating_add(cached),
            cached,
            swap_total: kernel.swap_total,
            swap_free: kernel.swap_free,
        }
    }

    /// free + cached
    pub fn available(&self) -> u64 {
        self.available
    }

    /// Capture the current totals. Each source is independent: a failed
    /// sysinfo call leaves the kernel figures at zero but still reads cached.
    pub fn capture<E: EvidenceReader + ?Sized>(evidence: &E) -> Self {
        let kernel = evidence.kernel_memory().unwrap_or_else(|e| {
            debug!("{}", e);
            KernelMemory::default()
        });

        let cached = evidence
            .read_optional(paths::MEMINFO)
            .and_then(|content| parse_cached_kib(&content))
            .map(|kib| kib.saturating_mul(1024))
            .unwrap_or(0);

        Self::new(kernel, cached)
    }
}

/// Value of the `Cached:` line in KiB. `SwapCached:` is a different field.
pub fn parse_cached_kib(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|line| line.starts_with("Cached:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|value| value.parse::<u64>().ok())
}
