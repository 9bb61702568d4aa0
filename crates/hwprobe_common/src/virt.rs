//! Virtualization verdicts and their display identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution environment verdict. Discriminants are stable display indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VirtualizationKind {
    None = 0,
    Kvm = 1,
    Qemu = 2,
    Vmware = 3,
    Virtualbox = 4,
    Xen = 5,
    Hyperv = 6,
    Docker = 7,
    Lxc = 8,
    Openvz = 9,
    Parallels = 10,
    Cloud = 11,
    Unknown = 12,
}

impl VirtualizationKind {
    pub const ALL: [VirtualizationKind; 13] = [
        VirtualizationKind::None,
        VirtualizationKind::Kvm,
        VirtualizationKind::Qemu,
        VirtualizationKind::Vmware,
        VirtualizationKind::Virtualbox,
        VirtualizationKind::Xen,
        VirtualizationKind::Hyperv,
        VirtualizationKind::Docker,
        VirtualizationKind::Lxc,
        VirtualizationKind::Openvz,
        VirtualizationKind::Parallels,
        VirtualizationKind::Cloud,
        VirtualizationKind::Unknown,
    ];

    /// Map a detection helper token to a verdict. Only the technologies the
    /// helper reports under a stable name are recognized; anything else
    /// (including "none") defers to the next detection tier.
    pub fn from_helper_token(token: &str) -> Option<Self> {
        match token.trim() {
            "kvm" => Some(Self::Kvm),
            "qemu" => Some(Self::Qemu),
            "vmware" => Some(Self::Vmware),
            "oracle" | "virtualbox" => Some(Self::Virtualbox),
            "xen" => Some(Self::Xen),
            "microsoft" => Some(Self::Hyperv),
            "docker" => Some(Self::Docker),
            "lxc" => Some(Self::Lxc),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Kvm => "kvm",
            Self::Qemu => "qemu",
            Self::Vmware => "vmware",
            Self::Virtualbox => "virtualbox",
            Self::Xen => "xen",
            Self::Hyperv => "hyperv",
            Self::Docker => "docker",
            Self::Lxc => "lxc",
            Self::Openvz => "openvz",
            Self::Parallels => "parallels",
            Self::Cloud => "cloud",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_virtual(self) -> bool {
        self != Self::None
    }

    /// Display identity for this verdict
    pub fn profile(self) -> &'static VirtProfile {
        &PROFILES[self as usize]
    }
}

impl fmt::Display for VirtualizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloud provider behind a `Cloud` verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
}

impl CloudProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
            Self::Azure => "azure",
        }
    }
}

/// Fixed identity attached to a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtProfile {
    pub kind: VirtualizationKind,
    /// Reported as `hypervisor_vendor`
    pub vendor: &'static str,
    /// Default `product_name` when no better evidence exists
    pub product: &'static str,
    /// Whether a firmware product name overrides `product`
    pub prefer_firmware_product: bool,
}

const fn profile(
    kind: VirtualizationKind,
    vendor: &'static str,
    product: &'static str,
    prefer_firmware_product: bool,
) -> VirtProfile {
    VirtProfile {
        kind,
        vendor,
        product,
        prefer_firmware_product,
    }
}

/// Indexed by `VirtualizationKind` discriminant.
static PROFILES: [VirtProfile; 13] = [
    profile(VirtualizationKind::None, "none", "unknown", false),
    profile(VirtualizationKind::Kvm, "KVM", "KVM Virtual Machine", false),
    profile(VirtualizationKind::Qemu, "QEMU", "QEMU Virtual Machine", false),
    profile(VirtualizationKind::Vmware, "VMware", "VMware Virtual Platform", true),
    profile(VirtualizationKind::Virtualbox, "Oracle", "VirtualBox", false),
    profile(VirtualizationKind::Xen, "Xen", "Xen Virtual Machine", false),
    profile(VirtualizationKind::Hyperv, "Microsoft", "Hyper-V Virtual Machine", false),
    profile(VirtualizationKind::Docker, "Docker", "Docker Container", false),
    profile(VirtualizationKind::Lxc, "LXC", "LXC Container", false),
    profile(VirtualizationKind::Openvz, "OpenVZ", "OpenVZ Container", false),
    profile(VirtualizationKind::Parallels, "Parallels", "Parallels Virtual Platform", false),
    profile(VirtualizationKind::Cloud, "Cloud Provider", "Cloud Instance", true),
    profile(VirtualizationKind::Unknown, "Unknown", "Unknown Virtual Machine", false),
];
