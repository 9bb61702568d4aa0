//! Environment classifier
//!
//! Decides whether the host is bare metal, a Raspberry Pi, a virtual
//! machine or a container, and fills `HardwareIdentity` consistently with
//! that verdict.
//!
//! Detection is a first-match-wins cascade over evidence tiers:
//!
//! 1. the external detection helper (`systemd-detect-virt`)
//! 2. virtual CPU brand strings in /proc/cpuinfo
//! 3. the firmware system vendor (hypervisors and cloud providers)
//! 4. container evidence (cgroup, OpenVZ marker, init environment)
//! 5. the generic `hypervisor` cpu flag
//!
//! The Raspberry Pi board marker is checked before any of this and, when
//! present, bypasses virtualization detection entirely.

use crate::cpuinfo::{BoardDetails, CpuDetails};
use crate::evidence::{clean, paths, EvidenceReader};
use crate::types::{HardwareIdentity, UNKNOWN};
use crate::virt::{CloudProvider, VirtualizationKind};
use tracing::{debug, info};

/// Serial reported for every virtual machine and container
pub const VIRTUAL_SERIAL: &str = "Virtual Environment";

/// Vendor reported on the Raspberry Pi path
pub const ARM_VENDOR: &str = "ARM";

const DJB2_SEED: u64 = 5381;

/// Virtual CPU brand strings (tier 2)
const CPU_BRANDS: [(&str, VirtualizationKind); 4] = [
    ("QEMU Virtual CPU", VirtualizationKind::Qemu),
    ("VMware", VirtualizationKind::Vmware),
    ("VirtualBox", VirtualizationKind::Virtualbox),
    ("Xen", VirtualizationKind::Xen),
];

/// Firmware system vendor markers (tier 3), checked in order
const VENDOR_MARKERS: [(&str, VirtualizationKind, Option<CloudProvider>); 10] = [
    ("QEMU", VirtualizationKind::Qemu, None),
    ("VMware", VirtualizationKind::Vmware, None),
    ("innotek", VirtualizationKind::Virtualbox, None),
    ("VirtualBox", VirtualizationKind::Virtualbox, None),
    ("Xen", VirtualizationKind::Xen, None),
    ("Microsoft Corporation", VirtualizationKind::Hyperv, None),
    ("Parallels", VirtualizationKind::Parallels, None),
    ("Amazon EC2", VirtualizationKind::Cloud, Some(CloudProvider::Aws)),
    ("Google", VirtualizationKind::Cloud, Some(CloudProvider::Gcp)),
    ("Azure", VirtualizationKind::Cloud, Some(CloudProvider::Azure)),
];

/// Which cascade tier produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionTier {
    Helper,
    CpuBrand,
    FirmwareVendor,
    Container,
    HypervisorFlag,
    /// No tier matched
    Exhausted,
}

/// Outcome of the detection cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub kind: VirtualizationKind,
    pub tier: DetectionTier,
    pub cloud_provider: Option<CloudProvider>,
}

impl Detection {
    fn new(kind: VirtualizationKind, tier: DetectionTier) -> Self {
        Self {
            kind,
            tier,
            cloud_provider: None,
        }
    }

    fn bare_metal() -> Self {
        Self::new(VirtualizationKind::None, DetectionTier::Exhausted)
    }
}

/// Classify the host and build its identity record.
///
/// Never fails: every unavailable evidence source leaves its field at the
/// documented default.
pub fn classify<E: EvidenceReader + ?Sized>(evidence: &E) -> HardwareIdentity {
    // raw bytes feed the VM hash; parsing works on the lossy text
    let cpuinfo_raw = evidence.read_optional_bytes(paths::CPUINFO);
    let cpuinfo_text = cpuinfo_raw.as_deref().map(String::from_utf8_lossy);
    let cpuinfo = cpuinfo_text.as_deref();

    let identity = if evidence.exists(paths::BOARD_MODEL) {
        debug!("board model marker present, skipping virtualization detection");
        raspberry_pi_identity(evidence, cpuinfo)
    } else {
        let detection = detect_virtualization(evidence, cpuinfo);
        if detection.kind.is_virtual() {
            virtual_identity(evidence, cpuinfo, cpuinfo_raw.as_deref(), detection)
        } else {
            physical_identity(evidence, cpuinfo)
        }
    };

    info!(
        "Classified host as {} (virtual: {}, arm: {})",
        identity.virt_kind, identity.is_virtual, identity.is_arm
    );

    identity.bounded()
}

/// Run the detection cascade. `cpuinfo` is the already-read CPU
/// identification text, if any.
pub fn detect_virtualization<E: EvidenceReader + ?Sized>(
    evidence: &E,
    cpuinfo: Option<&str>,
) -> Detection {
    let detection = helper_tier(evidence)
        .or_else(|| cpu_brand_tier(cpuinfo))
        .or_else(|| firmware_vendor_tier(evidence))
        .or_else(|| container_tier(evidence))
        .or_else(|| hypervisor_flag_tier(cpuinfo))
        .unwrap_or_else(Detection::bare_metal);

    debug!("Virtualization verdict {} from {:?}", detection.kind, detection.tier);
    detection
}

fn helper_tier<E: EvidenceReader + ?Sized>(evidence: &E) -> Option<Detection> {
    let token = match evidence.run_virt_helper() {
        Ok(token) => token,
        Err(e) => {
            debug!("{}", e);
            return None;
        }
    };

    let kind = VirtualizationKind::from_helper_token(&token);
    if kind.is_none() {
        debug!("Detection helper reported '{}', deferring to next tier", token);
    }
    kind.map(|kind| Detection::new(kind, DetectionTier::Helper))
}

fn cpu_brand_tier(cpuinfo: Option<&str>) -> Option<Detection> {
    let cpuinfo = cpuinfo?;
    CPU_BRANDS
        .iter()
        .find(|(brand, _)| cpuinfo.contains(brand))
        .map(|(_, kind)| Detection::new(*kind, DetectionTier::CpuBrand))
}

fn firmware_vendor_tier<E: EvidenceReader + ?Sized>(evidence: &E) -> Option<Detection> {
    let vendor = evidence.read_optional(paths::DMI_SYS_VENDOR)?;
    VENDOR_MARKERS
        .iter()
        .find(|(marker, _, _)| vendor.contains(marker))
        .map(|(_, kind, provider)| Detection {
            kind: *kind,
            tier: DetectionTier::FirmwareVendor,
            cloud_provider: *provider,
        })
}

fn container_tier<E: EvidenceReader + ?Sized>(evidence: &E) -> Option<Detection> {
    let in_docker = evidence
        .read_optional(paths::INIT_CGROUP)
        .map(|cgroup| cgroup.lines().any(|line| line.contains("docker")))
        .unwrap_or(false);
    if in_docker {
        return Some(Detection::new(VirtualizationKind::Docker, DetectionTier::Container));
    }

    if evidence.exists(paths::OPENVZ_MARKER) {
        return Some(Detection::new(VirtualizationKind::Openvz, DetectionTier::Container));
    }

    let in_lxc = evidence
        .read_optional(paths::INIT_ENVIRON)
        .map(|environ| environ.contains("container=lxc"))
        .unwrap_or(false);
    if in_lxc {
        return Some(Detection::new(VirtualizationKind::Lxc, DetectionTier::Container));
    }

    None
}

fn hypervisor_flag_tier(cpuinfo: Option<&str>) -> Option<Detection> {
    cpuinfo
        .filter(|text| text.contains("hypervisor"))
        .map(|_| Detection::new(VirtualizationKind::Unknown, DetectionTier::HypervisorFlag))
}

fn raspberry_pi_identity<E: EvidenceReader + ?Sized>(
    evidence: &E,
    cpuinfo: Option<&str>,
) -> HardwareIdentity {
    let board = cpuinfo.map(BoardDetails::parse).unwrap_or_default();
    let mut identity = HardwareIdentity::default();

    if let Some(model) = board.cpu_model {
        identity.cpu_model = model;
    }
    if let Some(revision) = board.revision {
        identity.motherboard_serial = revision;
    }
    if let Some(serial) = board.serial {
        identity.system_uuid = serial;
    }

    if let Some(model) = evidence.read_optional(paths::BOARD_MODEL) {
        let model = clean(&model);
        if !model.is_empty() {
            identity.product_name = model.to_string();
        }
    }

    identity.cpu_vendor = ARM_VENDOR.to_string();
    identity.is_arm = true;
    identity.is_virtual = false;
    identity.virt_kind = VirtualizationKind::None;
    identity
}

fn virtual_identity<E: EvidenceReader + ?Sized>(
    evidence: &E,
    cpuinfo: Option<&str>,
    cpuinfo_raw: Option<&[u8]>,
    detection: Detection,
) -> HardwareIdentity {
    let profile = detection.kind.profile();

    let mut identity = HardwareIdentity {
        is_virtual: true,
        virt_kind: detection.kind,
        hypervisor_vendor: profile.vendor.to_string(),
        product_name: profile.product.to_string(),
        motherboard_serial: VIRTUAL_SERIAL.to_string(),
        cloud_provider: detection.cloud_provider,
        ..HardwareIdentity::default()
    };

    if profile.prefer_firmware_product {
        if let Some(product) = evidence.first_line(paths::DMI_PRODUCT_NAME) {
            identity.product_name = product;
        }
    }

    identity.system_uuid = virtual_uuid(evidence, cpuinfo_raw, detection.kind)
        .unwrap_or_else(|| UNKNOWN.to_string());

    apply_bios(evidence, &mut identity);
    apply_cpu(cpuinfo, &mut identity);
    identity
}

fn physical_identity<E: EvidenceReader + ?Sized>(
    evidence: &E,
    cpuinfo: Option<&str>,
) -> HardwareIdentity {
    let mut identity = HardwareIdentity::default();

    if let Some(uuid) = evidence.first_line(paths::DMI_PRODUCT_UUID) {
        identity.system_uuid = uuid;
    }
    if let Some(serial) = evidence.first_line(paths::DMI_BOARD_SERIAL) {
        identity.motherboard_serial = serial;
    }
    if let Some(product) = evidence.first_line(paths::DMI_PRODUCT_NAME) {
        identity.product_name = product;
    }

    apply_bios(evidence, &mut identity);
    apply_cpu(cpuinfo, &mut identity);
    identity
}

fn apply_bios<E: EvidenceReader + ?Sized>(evidence: &E, identity: &mut HardwareIdentity) {
    if let Some(vendor) = evidence.first_line(paths::DMI_BIOS_VENDOR) {
        identity.bios_vendor = vendor;
    }
    if let Some(version) = evidence.first_line(paths::DMI_BIOS_VERSION) {
        identity.bios_version = version;
    }
}

fn apply_cpu(cpuinfo: Option<&str>, identity: &mut HardwareIdentity) {
    let Some(text) = cpuinfo else {
        return;
    };
    let cpu = CpuDetails::parse(text);
    if let Some(model) = cpu.model {
        identity.cpu_model = model;
    }
    if let Some(vendor) = cpu.vendor {
        identity.cpu_vendor = vendor;
    }
    identity.cpu_family = cpu.family;
    identity.cpu_stepping = cpu.stepping;
    identity.cpu_microcode = cpu.microcode;
}

/// UUID for a virtual host: the first identity file with content, then a
/// verdict-specific fallback.
fn virtual_uuid<E: EvidenceReader + ?Sized>(
    evidence: &E,
    cpuinfo_raw: Option<&[u8]>,
    kind: VirtualizationKind,
) -> Option<String> {
    if let Some(uuid) = paths::UUID_CANDIDATES
        .iter()
        .find_map(|path| evidence.first_line(path))
    {
        return Some(uuid);
    }

    match kind {
        VirtualizationKind::Docker => evidence
            .read_optional(paths::SELF_CGROUP)
            .and_then(|cgroup| docker_container_id(&cgroup)),
        VirtualizationKind::Lxc => evidence
            .read_optional(paths::SELF_ENVIRON)
            .and_then(|environ| lxc_container_uuid(&environ)),
        _ => cpuinfo_raw.map(|raw| format!("vm-{:x}", djb2(raw))),
    }
}

/// Last path segment of the cgroup line naming docker, or of the last
/// cgroup line when none does.
pub fn docker_container_id(cgroup: &str) -> Option<String> {
    let line = cgroup
        .lines()
        .find(|line| line.contains("docker"))
        .or_else(|| cgroup.lines().filter(|line| !line.trim().is_empty()).last())?;

    let id = line.rsplit('/').next()?.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Value of `container_uuid=` in a NUL- or newline-separated environment.
pub fn lxc_container_uuid(environ: &str) -> Option<String> {
    let start = environ.find("container_uuid=")? + "container_uuid=".len();
    let value = environ[start..]
        .split(|c: char| c == '\0' || c == '\n')
        .next()?
        .trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// DJB2 rolling hash (seed 5381, multiplier 33)
pub fn djb2(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(DJB2_SEED, |hash, &b| hash.wrapping_mul(33).wrapping_add(u64::from(b)))
}
