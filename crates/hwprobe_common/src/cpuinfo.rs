//! /proc/cpuinfo parsing
//!
//! The CPU identification text is a sequence of `label<TAB>: value` lines,
//! one block per logical CPU. Labels repeat across blocks; the last value
//! seen for a label wins.

/// Iterate `(label, value)` pairs, skipping lines without a value.
pub fn fields(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines().filter_map(|line| {
        let (label, value) = line.split_once(':')?;
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some((label.trim(), value))
        }
    })
}

/// x86-style CPU identity fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuDetails {
    pub model: Option<String>,
    pub vendor: Option<String>,
    pub family: u32,
    pub stepping: u32,
    pub microcode: u64,
}

impl CpuDetails {
    pub fn parse(text: &str) -> Self {
        let mut details = Self::default();
        for (label, value) in fields(text) {
            match label {
                "model name" => details.model = Some(value.to_string()),
                "vendor_id" => details.vendor = Some(value.to_string()),
                "cpu family" => details.family = parse_leading_u32(value),
                "stepping" => details.stepping = parse_leading_u32(value),
                "microcode" => details.microcode = parse_hex_u64(value),
                _ => {}
            }
        }
        details
    }
}

/// Identity fields exposed by Raspberry Pi firmware in cpuinfo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardDetails {
    /// `Hardware` or `model name`, whichever appears last
    pub cpu_model: Option<String>,
    /// `Revision`
    pub revision: Option<String>,
    /// `Serial`
    pub serial: Option<String>,
}

impl BoardDetails {
    pub fn parse(text: &str) -> Self {
        let mut details = Self::default();
        for (label, value) in fields(text) {
            match label {
                "Hardware" | "model name" => details.cpu_model = Some(value.to_string()),
                "Revision" => details.revision = Some(value.to_string()),
                "Serial" => details.serial = Some(value.to_string()),
                _ => {}
            }
        }
        details
    }
}

/// Leading decimal digits, 0 when there are none.
pub fn parse_leading_u32(value: &str) -> u32 {
    let digits: String = value.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Hexadecimal with or without a `0x` prefix, 0 when unparsable.
pub fn parse_hex_u64(value: &str) -> u64 {
    let value = value.trim();
    let hex = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    let digits: String = hex.chars().take_while(|c| c.is_ascii_hexdigit()).collect();
    u64::from_str_radix(&digits, 16).unwrap_or(0)
}
