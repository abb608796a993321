//! Packet-capture merging through an external utility
//!
//! The merge itself is delegated to a tool such as Wireshark's `mergecap`,
//! invoked as `<tool> -w <output> <inputs>...`.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

/// Why a capture merge did not produce an output file
#[derive(Debug)]
pub enum MergeError {
    /// The merge utility is not on the execution path
    ToolNotFound { tool: String },

    /// The merge utility ran and exited unsuccessfully
    ToolFailed { tool: String, status: String, stderr: String },

    /// The merge utility exists but could not be started
    Launch { tool: String, source: io::Error },
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::ToolNotFound { tool } => {
                write!(f, "'{tool}' was not found on PATH")
            }
            MergeError::ToolFailed { tool, status, stderr } if stderr.is_empty() => {
                write!(f, "'{tool}' failed ({status})")
            }
            MergeError::ToolFailed { tool, status, stderr } => {
                write!(f, "'{tool}' failed ({status}): {stderr}")
            }
            MergeError::Launch { tool, source } => {
                write!(f, "could not start '{tool}': {source}")
            }
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MergeError::Launch { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Combines several capture files into one
pub trait CaptureMerger {
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MergeError>;
}

/// Runs an external `mergecap`-compatible executable
#[derive(Debug, Clone)]
pub struct Mergecap {
    program: String,
}

impl Mergecap {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl CaptureMerger for Mergecap {
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MergeError> {
        debug!("{} -w {} <{} inputs>", self.program, output.display(), inputs.len());

        let result = Command::new(&self.program)
            .arg("-w")
            .arg(output)
            .args(inputs)
            .output();

        let out = match result {
            Ok(out) => out,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MergeError::ToolNotFound { tool: self.program.clone() });
            }
            Err(e) => {
                return Err(MergeError::Launch { tool: self.program.clone(), source: e });
            }
        };

        if !out.status.success() {
            // A failed run may leave a truncated capture behind
            let _ = std::fs::remove_file(output);
            return Err(MergeError::ToolFailed {
                tool: self.program.clone(),
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_tool_is_reported() {
        let dir = tempdir().unwrap();
        let merger = Mergecap::new("ciciot-dl-no-such-merge-tool");
        let result = merger.merge(&[dir.path().join("a.pcap")], &dir.path().join("out.pcap"));
        match result {
            Err(MergeError::ToolNotFound { tool }) => assert_eq!(tool, "ciciot-dl-no-such-merge-tool"),
            other => panic!("Expected ToolNotFound, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_reported_and_output_removed() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.pcap");
        std::fs::write(&output, b"partial").unwrap();

        let result = Mergecap::new("false").merge(&[], &output);
        assert!(matches!(result, Err(MergeError::ToolFailed { .. })), "{result:?}");
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_exit_is_success() {
        let dir = tempdir().unwrap();
        let result = Mergecap::new("true").merge(&[dir.path().join("a.pcap")], &dir.path().join("out.pcap"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_display() {
        let err = MergeError::ToolFailed {
            tool: "mergecap".to_string(),
            status: "exit status: 2".to_string(),
            stderr: "mergecap: The file \"a.pcap\" isn't a capture file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "'mergecap' failed (exit status: 2): mergecap: The file \"a.pcap\" isn't a capture file"
        );
        assert_eq!(
            MergeError::ToolNotFound { tool: "mergecap".to_string() }.to_string(),
            "'mergecap' was not found on PATH"
        );
    }
}
