//! Evidence sources
//!
//! Every piece of information hwprobe reports comes from an evidence source:
//! a sysfs/procfs file, the output of the virtualization helper, or the
//! kernel's sysinfo(2) structure. Any of them may be absent. The
//! `EvidenceReader` trait is the seam between the decision logic
//! (classifier, sampler) and the host, so the logic can run against a
//! rooted directory tree or a fake in tests.

use crate::error::EvidenceError;
use crate::memory::KernelMemory;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Well-known evidence paths, always absolute; `SysEvidence` re-roots them.
pub mod paths {
    pub const CPUINFO: &str = "/proc/cpuinfo";
    pub const PROC_STAT: &str = "/proc/stat";
    pub const MEMINFO: &str = "/proc/meminfo";

    pub const BOARD_MODEL: &str = "/proc/device-tree/model";

    pub const DMI_PRODUCT_UUID: &str = "/sys/class/dmi/id/product_uuid";
    pub const DMI_BOARD_SERIAL: &str = "/sys/class/dmi/id/board_serial";
    pub const DMI_PRODUCT_NAME: &str = "/sys/class/dmi/id/product_name";
    pub const DMI_SYS_VENDOR: &str = "/sys/class/dmi/id/sys_vendor";
    pub const DMI_BIOS_VENDOR: &str = "/sys/class/dmi/id/bios_vendor";
    pub const DMI_BIOS_VERSION: &str = "/sys/class/dmi/id/bios_version";

    /// UUID candidates for virtual machines and containers, in priority order.
    pub const UUID_CANDIDATES: [&str; 5] = [
        "/sys/class/dmi/id/product_uuid",
        "/sys/devices/virtual/dmi/id/product_uuid",
        "/sys/hypervisor/uuid",
        "/etc/machine-id",
        "/var/lib/dbus/machine-id",
    ];

    pub const INIT_CGROUP: &str = "/proc/1/cgroup";
    pub const INIT_ENVIRON: &str = "/proc/1/environ";
    pub const SELF_CGROUP: &str = "/proc/self/cgroup";
    pub const SELF_ENVIRON: &str = "/proc/self/environ";
    pub const OPENVZ_MARKER: &str = "/proc/vz";

    pub const THERMAL_ZONE_DIR: &str = "/sys/class/thermal";
    pub const CORETEMP_HWMON_DIR: &str = "/sys/devices/platform/coretemp.0/hwmon";
}

/// Default external helper consulted by the first detection tier.
pub const DEFAULT_VIRT_HELPER: &str = "systemd-detect-virt";

/// Read access to evidence sources.
///
/// Implementations report failures as `EvidenceError`; the provided helpers
/// turn those into `Option`s and log them at debug level, which is how the
/// rest of the crate consumes evidence.
pub trait EvidenceReader {
    /// Raw byte content of a file-like source.
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, EvidenceError>;

    /// Whether a marker path exists.
    fn exists(&self, path: &str) -> bool;

    /// Entry names inside a directory source.
    fn list_dir(&self, path: &str) -> Result<Vec<String>, EvidenceError>;

    /// Raw output of the virtualization detection helper.
    fn run_virt_helper(&self) -> Result<String, EvidenceError>;

    /// Memory and swap totals from the kernel, already scaled to bytes.
    fn kernel_memory(&self) -> Result<KernelMemory, EvidenceError>;

    /// Full text content. procfs environ files are NUL separated and may
    /// not be valid UTF-8, so invalid sequences are replaced.
    fn read_text(&self, path: &str) -> Result<String, EvidenceError> {
        self.read_bytes(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Raw content, or `None` when the source is unavailable.
    fn read_optional_bytes(&self, path: &str) -> Option<Vec<u8>> {
        match self.read_bytes(path) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }

    /// Full content, or `None` when the source is unavailable.
    fn read_optional(&self, path: &str) -> Option<String> {
        match self.read_text(path) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }

    /// First line of a source with surrounding whitespace stripped.
    /// Empty content counts as unavailable.
    fn first_line(&self, path: &str) -> Option<String> {
        let content = self.read_optional(path)?;
        let line = clean(content.lines().next().unwrap_or(""));
        if line.is_empty() {
            debug!("{}", EvidenceError::Empty { path: path.to_string() });
            None
        } else {
            Some(line.to_string())
        }
    }
}

/// Evidence read from the live host, with every path resolved under `root`.
#[derive(Debug, Clone)]
pub struct SysEvidence {
    root: PathBuf,
    helper: Option<String>,
}

impl SysEvidence {
    pub fn new(root: impl Into<PathBuf>, helper: Option<String>) -> Self {
        Self {
            root: root.into(),
            helper: helper.filter(|h| !h.trim().is_empty()),
        }
    }

    /// Reader for the running host with the default helper.
    pub fn host() -> Self {
        Self::new("/", Some(DEFAULT_VIRT_HELPER.to_string()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn helper(&self) -> Option<&str> {
        self.helper.as_deref()
    }

    /// Map an absolute evidence path onto the configured root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Default for SysEvidence {
    fn default() -> Self {
        Self::host()
    }
}

impl EvidenceReader for SysEvidence {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, EvidenceError> {
        fs::read(self.resolve(path)).map_err(|e| EvidenceError::from_io(path, e))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, EvidenceError> {
        let entries = fs::read_dir(self.resolve(path)).map_err(|e| EvidenceError::from_io(path, e))?;
        let mut names: Vec<String> = entries
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    fn run_virt_helper(&self) -> Result<String, EvidenceError> {
        let helper = self
            .helper
            .as_deref()
            .ok_or_else(|| EvidenceError::Helper("disabled".to_string()))?;

        // systemd-detect-virt exits non-zero when it prints "none", so only stdout matters
        let output = Command::new(helper)
            .output()
            .map_err(|e| EvidenceError::Helper(format!("{}: {}", helper, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.split_whitespace().next() {
            Some(token) => Ok(token.to_string()),
            None => Err(EvidenceError::Helper(format!("{}: no output", helper))),
        }
    }

    #[cfg(target_os = "linux")]
    fn kernel_memory(&self) -> Result<KernelMemory, EvidenceError> {
        // SAFETY: sysinfo is a plain C struct; all-zero is a valid value.
        let mut info: libc::sysinfo = unsafe { std::mem::zeroed() };
        // SAFETY: the pointer is valid for the duration of the call.
        let rc = unsafe { libc::sysinfo(&mut info) };
        if rc != 0 {
            return Err(EvidenceError::Kernel(format!(
                "sysinfo: {}",
                std::io::Error::last_os_error()
            )));
        }

        Ok(KernelMemory::from_pages(
            info.totalram as u64,
            info.freeram as u64,
            info.totalswap as u64,
            info.freeswap as u64,
            u64::from(info.mem_unit),
        ))
    }

    #[cfg(not(target_os = "linux"))]
    fn kernel_memory(&self) -> Result<KernelMemory, EvidenceError> {
        Err(EvidenceError::Kernel("sysinfo is only available on Linux".to_string()))
    }
}

/// Strip whitespace and the NUL terminators device-tree files carry.
pub fn clean(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || c == '\0')
}

/// Truncate to at most `max_chars` characters without splitting a character.
pub fn bounded(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, path: &str, content: &str) {
        let full = root.join(path.trim_start_matches('/'));
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    #[test]
    fn test_resolve_under_root() {
        let ev = SysEvidence::new("/mnt/image", None);
        assert_eq!(
            ev.resolve(paths::CPUINFO),
            PathBuf::from("/mnt/image/proc/cpuinfo")
        );
    }

    #[test]
    fn test_first_line_trims() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), paths::DMI_BIOS_VENDOR, "  American Megatrends Inc.  \nsecond\n");
        let ev = SysEvidence::new(dir.path(), None);

        assert_eq!(
            ev.first_line(paths::DMI_BIOS_VENDOR).as_deref(),
            Some("American Megatrends Inc.")
        );
    }

    #[test]
    fn test_first_line_empty_is_unavailable() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), paths::DMI_BOARD_SERIAL, "   \n");
        let ev = SysEvidence::new(dir.path(), None);

        assert!(ev.first_line(paths::DMI_BOARD_SERIAL).is_none());
        assert!(ev.first_line(paths::DMI_PRODUCT_UUID).is_none());
    }

    #[test]
    fn test_missing_file_is_missing_error() {
        let dir = TempDir::new().unwrap();
        let ev = SysEvidence::new(dir.path(), None);

        let err = ev.read_text(paths::CPUINFO).unwrap_err();
        assert!(matches!(err, EvidenceError::Missing { .. }));
        assert!(!ev.exists(paths::OPENVZ_MARKER));
    }

    #[test]
    fn test_device_tree_nul_stripped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), paths::BOARD_MODEL, "Raspberry Pi 4 Model B Rev 1.4\0");
        let ev = SysEvidence::new(dir.path(), None);

        assert_eq!(
            ev.first_line(paths::BOARD_MODEL).as_deref(),
            Some("Raspberry Pi 4 Model B Rev 1.4")
        );
    }

    #[test]
    fn test_list_dir_sorted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "/sys/devices/platform/coretemp.0/hwmon/hwmon3/name", "coretemp");
        write(dir.path(), "/sys/devices/platform/coretemp.0/hwmon/hwmon1/name", "coretemp");
        let ev = SysEvidence::new(dir.path(), None);

        let names = ev.list_dir(paths::CORETEMP_HWMON_DIR).unwrap();
        assert_eq!(names, vec!["hwmon1".to_string(), "hwmon3".to_string()]);
    }

    #[test]
    fn test_disabled_helper() {
        let ev = SysEvidence::new("/", Some("  ".to_string()));
        assert!(matches!(ev.run_virt_helper(), Err(EvidenceError::Helper(_))));
    }

    #[test]
    fn test_bounded_respects_char_boundaries() {
        assert_eq!(bounded("abcdef", 3), "abc");
        assert_eq!(bounded("ab", 10), "ab");
        assert_eq!(bounded("çàé", 2), "çà");
    }
}
