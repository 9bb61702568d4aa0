//! Output document
//!
//! The field names and nesting here are consumed by inventory and
//! monitoring tooling; keep them stable.

use crate::types::{HardwareIdentity, SystemSnapshot};
use crate::virt::{CloudProvider, VirtualizationKind};
use serde::Serialize;

/// Complete snapshot document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotDocument {
    pub hardware: HardwareSection,
    pub cpu_usage: CpuUsageSection,
    pub memory: MemorySection,
}

/// Document carrying only the hardware section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityDocument {
    pub hardware: HardwareSection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HardwareSection {
    pub system_uuid: String,
    pub motherboard_serial: String,
    pub product_name: String,
    pub is_arm: bool,
    pub virtualization: VirtualizationSection,
    pub cpu: CpuSection,
    pub bios: BiosSection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualizationSection {
    pub is_virtual: bool,
    #[serde(rename = "type")]
    pub kind: VirtualizationKind,
    pub hypervisor_vendor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<CloudProvider>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuSection {
    pub model: String,
    pub vendor: String,
    pub family: u32,
    pub stepping: u32,
    /// `0x`-prefixed hex
    pub microcode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiosSection {
    pub vendor: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuUsageSection {
    /// Individual cores, excluding the aggregate line
    pub cores: usize,
    pub total_usage: f64,
    pub core_info: Vec<CoreInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreInfo {
    pub core: usize,
    pub usage: f64,
    pub temperature: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemorySection {
    pub total: u64,
    pub free: u64,
    pub available: u64,
    pub cached: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

impl From<&HardwareIdentity> for HardwareSection {
    fn from(identity: &HardwareIdentity) -> Self {
        Self {
            system_uuid: identity.system_uuid.clone(),
            motherboard_serial: identity.motherboard_serial.clone(),
            product_name: identity.product_name.clone(),
            is_arm: identity.is_arm,
            virtualization: VirtualizationSection {
                is_virtual: identity.is_virtual,
                kind: identity.virt_kind,
                hypervisor_vendor: identity.hypervisor_vendor.clone(),
                cloud_provider: identity.cloud_provider,
            },
            cpu: CpuSection {
                model: identity.cpu_model.clone(),
                vendor: identity.cpu_vendor.clone(),
                family: identity.cpu_family,
                stepping: identity.cpu_stepping,
                microcode: format!("0x{:x}", identity.cpu_microcode),
            },
            bios: BiosSection {
                vendor: identity.bios_vendor.clone(),
                version: identity.bios_version.clone(),
            },
        }
    }
}

impl From<&SystemSnapshot> for SnapshotDocument {
    fn from(snapshot: &SystemSnapshot) -> Self {
        let total_usage = snapshot
            .aggregate()
            .map(|core| round2(core.usage.usage_percent))
            .unwrap_or(0.0);

        let core_info = snapshot
            .per_core()
            .iter()
            .enumerate()
            .map(|(core, entry)| CoreInfo {
                core,
                usage: round2(entry.usage.usage_percent),
                temperature: entry.usage.temperature_celsius,
            })
            .collect();

        let memory = &snapshot.memory;

        Self {
            hardware: HardwareSection::from(&snapshot.identity),
            cpu_usage: CpuUsageSection {
                cores: snapshot.core_count(),
                total_usage,
                core_info,
            },
            memory: MemorySection {
                total: memory.total,
                free: memory.free,
                available: memory.available(),
                cached: memory.cached,
                swap_total: memory.swap_total,
                swap_free: memory.swap_free,
            },
        }
    }
}

impl From<&HardwareIdentity> for IdentityDocument {
    fn from(identity: &HardwareIdentity) -> Self {
        Self {
            hardware: HardwareSection::from(identity),
        }
    }
}

/// Render any document as JSON
pub fn to_json<T: Serialize>(document: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(document)
    } else {
        serde_json::to_string(document)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
