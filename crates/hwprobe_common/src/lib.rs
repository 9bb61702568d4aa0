//! hwprobe common - host identity, execution environment and utilization
//!
//! Produces a point-in-time snapshot of a host: who it is (firmware and CPU
//! identity), what it runs on (bare metal, Raspberry Pi, VM or container)
//! and how busy it is (per-core CPU usage, memory totals).

pub mod classifier;
pub mod config;
pub mod cpuinfo;
pub mod error;
pub mod evidence;
pub mod memory;
pub mod report;
pub mod sampler;
pub mod snapshot;
pub mod types;
pub mod virt;

#[cfg(test)]
mod testing;

pub use classifier::{classify, detect_virtualization, Detection, DetectionTier};
pub use config::Config;
pub use error::EvidenceError;
pub use evidence::{EvidenceReader, SysEvidence};
pub use memory::{KernelMemory, MemoryTotals};
pub use report::{IdentityDocument, SnapshotDocument};
pub use sampler::{compute_usage, CpuSample};
pub use snapshot::{capture, capture_with_pause};
pub use types::*;
pub use virt::{CloudProvider, VirtualizationKind};
