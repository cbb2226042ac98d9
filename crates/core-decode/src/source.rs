//! Source identifier resolution.

use crate::DecodeError;
use std::io::Read;
use std::path::Path;
use std::process::Command;
use tracing::debug;

pub const STDIN_SCHEME: &str = "stdin://";
pub const EXEC_SCHEME: &str = "exec://";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind<'a> {
    File(&'a Path),
    Stdin,
    Exec(&'a str),
}

/// Classify a source string into its access scheme.
pub fn classify(source: &str) -> SourceKind<'_> {
    if source == STDIN_SCHEME || source == "-" {
        SourceKind::Stdin
    } else if let Some(cmd) = source.strip_prefix(EXEC_SCHEME) {
        SourceKind::Exec(cmd)
    } else {
        SourceKind::File(Path::new(source))
    }
}

/// Slurp the full byte stream behind a source identifier.
pub fn read_source(source: &str) -> Result<Vec<u8>, DecodeError> {
    match classify(source) {
        SourceKind::File(path) => Ok(std::fs::read(path)?),
        SourceKind::Stdin => {
            let mut bytes = Vec::new();
            std::io::stdin().lock().read_to_end(&mut bytes)?;
            debug!(target: "decode.source", size = bytes.len(), "read stdin");
            Ok(bytes)
        }
        SourceKind::Exec(cmd) => {
            let output = Command::new("sh").arg("-c").arg(cmd).output()?;
            if !output.status.success() {
                return Err(DecodeError::Io(std::io::Error::other(format!(
                    "command `{cmd}` exited with {}",
                    output.status
                ))));
            }
            debug!(target: "decode.source", cmd, size = output.stdout.len(), "captured exec output");
            Ok(output.stdout)
        }
    }
}
