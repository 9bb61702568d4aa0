//! In-memory evidence for unit tests

use crate::error::EvidenceError;
use crate::evidence::EvidenceReader;
use crate::memory::KernelMemory;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default, Clone)]
pub struct FakeEvidence {
    files: HashMap<String, Vec<u8>>,
    helper: Option<String>,
    memory: Option<KernelMemory>,
}

impl FakeEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.with_bytes(path, content.as_bytes())
    }

    pub fn with_bytes(mut self, path: &str, content: &[u8]) -> Self {
        self.files.insert(path.to_string(), content.to_vec());
        self
    }

    pub fn with_helper(mut self, token: &str) -> Self {
        self.helper = Some(token.to_string());
        self
    }

    pub fn with_memory(mut self, memory: KernelMemory) -> Self {
        self.memory = Some(memory);
        self
    }
}

impl EvidenceReader for FakeEvidence {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, EvidenceError> {
        self.files.get(path).cloned().ok_or_else(|| EvidenceError::Missing {
            path: path.to_string(),
        })
    }

    fn exists(&self, path: &str) -> bool {
        let prefix = format!("{}/", path);
        self.files.contains_key(path) || self.files.keys().any(|k| k.starts_with(&prefix))
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, EvidenceError> {
        let prefix = format!("{}/", path);
        let names: BTreeSet<String> = self
            .files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            Err(EvidenceError::Missing {
                path: path.to_string(),
            })
        } else {
            Ok(names.into_iter().collect())
        }
    }

    fn run_virt_helper(&self) -> Result<String, EvidenceError> {
        self.helper
            .clone()
            .ok_or_else(|| EvidenceError::Helper("not installed".to_string()))
    }

    fn kernel_memory(&self) -> Result<KernelMemory, EvidenceError> {
        self.memory
            .ok_or_else(|| EvidenceError::Kernel("sysinfo unavailable".to_string()))
    }
}
