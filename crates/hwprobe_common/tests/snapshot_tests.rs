//! End-to-end snapshot tests against synthetic evidence trees.
//!
//! Each test lays out a fake /proc and /sys under a temporary root and runs
//! the real filesystem reader over it. The detection helper is disabled so
//! results do not depend on the machine running the tests.

use approx::assert_relative_eq;
use hwprobe_common::evidence::paths;
use hwprobe_common::{
    capture_with_pause, classify, EvidenceReader, SnapshotDocument, SysEvidence,
    VirtualizationKind,
};
use std::cell::Cell;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Fixture helpers
// ============================================================================

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path.trim_start_matches('/'));
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

fn reader(root: &TempDir) -> SysEvidence {
    SysEvidence::new(root.path(), None)
}

const CPUINFO: &str = "processor\t: 0
vendor_id\t: GenuineIntel
cpu family\t: 6
model name\t: Intel(R) Core(TM) i5-10210U CPU @ 1.60GHz
stepping\t: 12
microcode\t: 0xde
flags\t\t: fpu vme de pse tsc
";

const STAT_BASELINE: &str = "cpu  200 0 0 800 0 0 0 0 0 0
cpu0 100 0 0 400 0 0 0 0 0 0
cpu1 100 0 0 400 0 0 0 0 0 0
intr 12345
";

const STAT_FINAL: &str = "cpu  350 0 0 850 0 0 0 0 0 0
cpu0 200 0 0 410 0 0 0 0 0 0
cpu1 150 0 0 440 0 0 0 0 0 0
intr 12400
";

fn physical_host(root: &Path) {
    write(root, paths::CPUINFO, CPUINFO);
    write(root, paths::DMI_PRODUCT_UUID, "03000200-0400-0500-0006-000700080009\n");
    write(root, paths::DMI_BOARD_SERIAL, "L1HF05S00Y3\n");
    write(root, paths::DMI_PRODUCT_NAME, "20U9CTO1WW\n");
    write(root, paths::DMI_SYS_VENDOR, "LENOVO\n");
    write(root, paths::DMI_BIOS_VENDOR, "LENOVO\n");
    write(root, paths::DMI_BIOS_VERSION, "N2WET30W (1.20 )\n");
    write(root, paths::MEMINFO, "MemTotal: 16000000 kB\nCached:  2048 kB\n");
    write(root, "/sys/class/thermal/thermal_zone0/temp", "45000\n");
    write(root, "/sys/devices/platform/coretemp.0/hwmon/hwmon4/temp2_input", "47000\n");
    write(root, "/sys/devices/platform/coretemp.0/hwmon/hwmon4/temp3_input", "49000\n");
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_empty_root_yields_defaults() {
    let root = TempDir::new().unwrap();
    let identity = classify(&reader(&root));

    assert_eq!(identity.system_uuid, "unknown");
    assert_eq!(identity.motherboard_serial, "unknown");
    assert_eq!(identity.product_name, "unknown");
    assert_eq!(identity.bios_vendor, "unknown");
    assert_eq!(identity.bios_version, "unknown");
    assert_eq!(identity.cpu_model, "unknown");
    assert_eq!(identity.cpu_vendor, "unknown");
    assert_eq!(identity.cpu_microcode, 0);
    assert_eq!(identity.virt_kind, VirtualizationKind::None);
    assert!(!identity.is_virtual);
}

#[test]
fn test_physical_host_identity() {
    let root = TempDir::new().unwrap();
    physical_host(root.path());

    let identity = classify(&reader(&root));
    assert_eq!(identity.virt_kind, VirtualizationKind::None);
    assert_eq!(identity.system_uuid, "03000200-0400-0500-0006-000700080009");
    assert_eq!(identity.motherboard_serial, "L1HF05S00Y3");
    assert_eq!(identity.product_name, "20U9CTO1WW");
    assert_eq!(identity.bios_version, "N2WET30W (1.20 )");
    assert_eq!(identity.cpu_model, "Intel(R) Core(TM) i5-10210U CPU @ 1.60GHz");
    assert_eq!(identity.cpu_stepping, 12);
    assert_eq!(identity.cpu_microcode, 0xde);
}

#[test]
fn test_raspberry_pi_marker_overrides_container_evidence() {
    let root = TempDir::new().unwrap();
    write(root.path(), paths::BOARD_MODEL, "Raspberry Pi 3 Model B Plus Rev 1.3\0");
    write(
        root.path(),
        paths::CPUINFO,
        "model name\t: ARMv7 Processor rev 4 (v7l)\nHardware\t: BCM2835\nRevision\t: a020d3\nSerial\t\t: 00000000c1d2e3f4\n",
    );
    write(root.path(), paths::INIT_CGROUP, "0::/docker/deadbeef\n");
    write(root.path(), paths::OPENVZ_MARKER, "");

    let identity = classify(&reader(&root));
    assert!(identity.is_arm);
    assert!(!identity.is_virtual);
    assert_eq!(identity.virt_kind, VirtualizationKind::None);
    assert_eq!(identity.product_name, "Raspberry Pi 3 Model B Plus Rev 1.3");
    assert_eq!(identity.system_uuid, "00000000c1d2e3f4");
}

#[test]
fn test_docker_container_identity() {
    let root = TempDir::new().unwrap();
    write(root.path(), paths::CPUINFO, CPUINFO);
    write(root.path(), paths::INIT_CGROUP, "13:pids:/docker/0123456789abcdef\n");
    write(root.path(), paths::SELF_CGROUP, "13:pids:/docker/0123456789abcdef\n");
    fs::create_dir_all(root.path().join("proc/vz")).unwrap();

    let identity = classify(&reader(&root));
    assert_eq!(identity.virt_kind, VirtualizationKind::Docker);
    assert!(identity.is_virtual);
    assert_eq!(identity.system_uuid, "0123456789abcdef");
    assert_eq!(identity.motherboard_serial, "Virtual Environment");
    assert_eq!(identity.hypervisor_vendor, "Docker");
}

#[test]
fn test_virtual_uuid_is_bounded() {
    let root = TempDir::new().unwrap();
    let long_id = "a".repeat(64);
    write(root.path(), paths::INIT_CGROUP, &format!("0::/docker/{}\n", long_id));
    write(root.path(), paths::SELF_CGROUP, &format!("0::/docker/{}\n", long_id));

    let identity = classify(&reader(&root));
    assert_eq!(identity.system_uuid, "a".repeat(36));
}

// ============================================================================
// Sampling
// ============================================================================

#[test]
fn test_two_pass_snapshot() {
    let root = TempDir::new().unwrap();
    physical_host(root.path());
    write(root.path(), paths::PROC_STAT, STAT_BASELINE);

    let ev = reader(&root);
    let identity = classify(&ev);
    let snapshot = capture_with_pause(&ev, identity, || {
        write(root.path(), paths::PROC_STAT, STAT_FINAL);
    });

    assert_eq!(snapshot.core_count(), 2);
    // aggregate: total 1000 -> 1200, idle 800 -> 850
    assert_relative_eq!(snapshot.cores[0].usage.usage_percent, 75.0);
    // cpu0: total 500 -> 610, idle 400 -> 410
    assert_relative_eq!(
        snapshot.cores[1].usage.usage_percent,
        100.0 * (1.0 - 10.0 / 110.0)
    );
    // cpu1: total 500 -> 590, idle 400 -> 440
    assert_relative_eq!(
        snapshot.cores[2].usage.usage_percent,
        100.0 * (1.0 - 40.0 / 90.0)
    );

    assert_eq!(snapshot.cores[0].usage.temperature_celsius, 45);
    assert_eq!(snapshot.cores[1].usage.temperature_celsius, 47);
    assert_eq!(snapshot.cores[2].usage.temperature_celsius, 49);

    assert_eq!(snapshot.memory.cached, 2048 * 1024);
    assert_eq!(
        snapshot.memory.available(),
        snapshot.memory.free + snapshot.memory.cached
    );
}

#[test]
fn test_hotplug_between_passes() {
    let root = TempDir::new().unwrap();
    write(root.path(), paths::PROC_STAT, STAT_BASELINE);

    let ev = reader(&root);
    let identity = classify(&ev);
    let snapshot = capture_with_pause(&ev, identity, || {
        let grown = format!("{}cpu2 10 0 0 10 0 0 0 0 0 0\n", STAT_FINAL.replace("intr 12400\n", ""));
        write(root.path(), paths::PROC_STAT, &grown);
    });

    assert_eq!(snapshot.core_count(), 3);
    assert_relative_eq!(snapshot.cores[0].usage.usage_percent, 75.0);
    assert_eq!(snapshot.cores[3].usage.usage_percent, 0.0);
}

#[test]
fn test_unchanged_counters_report_zero() {
    let root = TempDir::new().unwrap();
    write(root.path(), paths::PROC_STAT, STAT_BASELINE);

    let ev = reader(&root);
    let paused = Cell::new(0);
    let snapshot = capture_with_pause(&ev, classify(&ev), || paused.set(paused.get() + 1));

    assert_eq!(paused.get(), 1);
    assert!(snapshot.cores.iter().all(|c| c.usage.usage_percent == 0.0));
}

// ============================================================================
// Document
// ============================================================================

#[test]
fn test_document_from_snapshot() {
    let root = TempDir::new().unwrap();
    physical_host(root.path());
    write(root.path(), paths::PROC_STAT, STAT_BASELINE);

    let ev = reader(&root);
    let snapshot = capture_with_pause(&ev, classify(&ev), || {
        write(root.path(), paths::PROC_STAT, STAT_FINAL);
    });
    let value = serde_json::to_value(SnapshotDocument::from(&snapshot)).unwrap();

    assert_eq!(value["hardware"]["cpu"]["microcode"], "0xde");
    assert_eq!(value["hardware"]["virtualization"]["type"], "none");
    assert_eq!(value["cpu_usage"]["cores"], 2);
    assert_eq!(value["cpu_usage"]["total_usage"], 75.0);
    assert_eq!(value["cpu_usage"]["core_info"][1]["core"], 1);
    assert_eq!(value["cpu_usage"]["core_info"][1]["temperature"], 49);
    assert!(value["memory"]["available"].is_u64());
}

#[test]
fn test_rooted_reader_does_not_escape() {
    let root = TempDir::new().unwrap();
    let ev = reader(&root);
    assert!(!ev.exists(paths::BOARD_MODEL));
    assert!(ev.first_line(paths::CPUINFO).is_none());
}
