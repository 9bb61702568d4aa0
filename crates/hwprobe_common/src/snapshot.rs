//! Snapshot orchestration
//!
//! One invocation classifies the host once, then takes a baseline
//! sampling pass, pauses, takes the final pass and derives usage from the
//! pair. Nothing is carried across invocations.

use crate::classifier::classify;
use crate::evidence::EvidenceReader;
use crate::memory::MemoryTotals;
use crate::sampler::{compute_usage, CpuSample};
use crate::types::{CoreEntry, HardwareIdentity, SystemSnapshot};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Progress of the two-pass sampler within one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingPhase {
    BaselineCaptured,
    Wait,
    FinalCaptured,
    DeltaComputed,
}

/// Everything read in one sampling pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplingPass {
    pub cpu: CpuSample,
    pub memory: MemoryTotals,
}

impl SamplingPass {
    pub fn capture<E: EvidenceReader + ?Sized>(evidence: &E) -> Self {
        Self {
            cpu: CpuSample::capture(evidence),
            memory: MemoryTotals::capture(evidence),
        }
    }
}

/// Full snapshot with a real-time pause between passes.
pub fn capture<E: EvidenceReader + ?Sized>(evidence: &E, interval: Duration) -> SystemSnapshot {
    let identity = classify(evidence);
    capture_with_pause(evidence, identity, || thread::sleep(interval))
}

/// Full snapshot where the caller controls the pause between passes.
pub fn capture_with_pause<E, F>(evidence: &E, identity: HardwareIdentity, pause: F) -> SystemSnapshot
where
    E: EvidenceReader + ?Sized,
    F: FnOnce(),
{
    let baseline = SamplingPass::capture(evidence);
    trace_phase(SamplingPhase::BaselineCaptured);

    trace_phase(SamplingPhase::Wait);
    pause();

    let current = SamplingPass::capture(evidence);
    trace_phase(SamplingPhase::FinalCaptured);

    let snapshot = merge(identity, Some(&baseline), current);
    trace_phase(SamplingPhase::DeltaComputed);

    info!(
        "Snapshot complete: {} cores, {} aggregate usage",
        snapshot.core_count(),
        snapshot
            .aggregate()
            .map(|core| format!("{:.2}%", core.usage.usage_percent))
            .unwrap_or_else(|| "n/a".to_string())
    );
    snapshot
}

/// Combine a final pass with an optional baseline into a snapshot.
pub fn merge(
    identity: HardwareIdentity,
    baseline: Option<&SamplingPass>,
    current: SamplingPass,
) -> SystemSnapshot {
    let usage = compute_usage(baseline.map(|pass| &pass.cpu), &current.cpu);

    let cores = current
        .cpu
        .cores
        .iter()
        .zip(usage)
        .map(|(sample, usage)| CoreEntry {
            counters: sample.counters,
            usage,
        })
        .collect();

    SystemSnapshot {
        identity,
        cores,
        memory: current.memory,
    }
}

fn trace_phase(phase: SamplingPhase) {
    debug!("Sampler phase: {:?}", phase);
}
