//! Core data model shared by the classifier, the sampler and the report

use crate::evidence::bounded;
use crate::memory::MemoryTotals;
use crate::virt::{CloudProvider, VirtualizationKind};
use serde::{Deserialize, Serialize};

/// Sentinel for string fields with no evidence
pub const UNKNOWN: &str = "unknown";

/// Field capacities, in characters
pub const UUID_MAX_CHARS: usize = 36;
pub const SERIAL_MAX_CHARS: usize = 64;
pub const MODEL_MAX_CHARS: usize = 255;
pub const VENDOR_MAX_CHARS: usize = 63;

/// Host identity as decided by the environment classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareIdentity {
    pub system_uuid: String,
    pub motherboard_serial: String,
    pub product_name: String,
    pub bios_vendor: String,
    pub bios_version: String,

    pub cpu_model: String,
    pub cpu_vendor: String,
    pub cpu_family: u32,
    pub cpu_stepping: u32,
    pub cpu_microcode: u64,

    /// Set only on the Raspberry Pi path
    pub is_arm: bool,
    pub is_virtual: bool,
    pub virt_kind: VirtualizationKind,

    /// "none" unless `is_virtual`
    pub hypervisor_vendor: String,

    /// Which provider produced a `Cloud` verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<CloudProvider>,
}

impl Default for HardwareIdentity {
    fn default() -> Self {
        Self {
            system_uuid: UNKNOWN.to_string(),
            motherboard_serial: UNKNOWN.to_string(),
            product_name: UNKNOWN.to_string(),
            bios_vendor: UNKNOWN.to_string(),
            bios_version: UNKNOWN.to_string(),
            cpu_model: UNKNOWN.to_string(),
            cpu_vendor: UNKNOWN.to_string(),
            cpu_family: 0,
            cpu_stepping: 0,
            cpu_microcode: 0,
            is_arm: false,
            is_virtual: false,
            virt_kind: VirtualizationKind::None,
            hypervisor_vendor: VirtualizationKind::None.profile().vendor.to_string(),
            cloud_provider: None,
        }
    }
}

impl HardwareIdentity {
    /// Clamp every string field to its capacity. Called once when the
    /// classifier hands the record out.
    pub fn bounded(self) -> Self {
        Self {
            system_uuid: bounded(&self.system_uuid, UUID_MAX_CHARS),
            motherboard_serial: bounded(&self.motherboard_serial, SERIAL_MAX_CHARS),
            product_name: bounded(&self.product_name, MODEL_MAX_CHARS),
            bios_vendor: bounded(&self.bios_vendor, VENDOR_MAX_CHARS),
            bios_version: bounded(&self.bios_version, VENDOR_MAX_CHARS),
            cpu_model: bounded(&self.cpu_model, MODEL_MAX_CHARS),
            cpu_vendor: bounded(&self.cpu_vendor, VENDOR_MAX_CHARS),
            hypervisor_vendor: bounded(&self.hypervisor_vendor, VENDOR_MAX_CHARS),
            ..self
        }
    }
}

/// Cumulative jiffies for one /proc/stat cpu line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreCounterSnapshot {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CoreCounterSnapshot {
    /// Sum of the eight counters. Guest time is already folded into user
    /// and nice by the kernel, so it is not added again.
    pub fn total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}

/// Derived per-core figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreUsageResult {
    /// 0..=100, 0 without a baseline or when no time elapsed
    pub usage_percent: f64,
    /// Best effort, 0 when no sensor answered
    pub temperature_celsius: i32,
}

/// One row of the merged snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreEntry {
    pub counters: CoreCounterSnapshot,
    pub usage: CoreUsageResult,
}

/// Everything captured in one invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub identity: HardwareIdentity,
    /// Index 0 is the aggregate line, 1..N the individual cores
    pub cores: Vec<CoreEntry>,
    pub memory: MemoryTotals,
}

impl SystemSnapshot {
    pub fn aggregate(&self) -> Option<&CoreEntry> {
        self.cores.first()
    }

    pub fn per_core(&self) -> &[CoreEntry] {
        self.cores.get(1..).unwrap_or(&[])
    }

    /// Number of individual cores, excluding the aggregate line
    pub fn core_count(&self) -> usize {
        self.cores.len().saturating_sub(1)
    }
}
