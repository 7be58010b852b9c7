//! Seed inputs: the byte strings traced against the target parser.

use std::fmt;
use std::path::Path;

/// A single input byte-string used as evidence, together with an opaque name.
///
/// The indices `0..len()` are the atomic units that the tracer attributes to
/// frames. A seed is read-only for the lifetime of a run.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed {
    name: String,
    bytes: Vec<u8>,
}

impl Seed {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Load a seed from a file, using the file stem as its name.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self { name, bytes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_file_uses_stem_as_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calc_01.bin");
        std::fs::write(&path, b"1+2").unwrap();
        let seed = Seed::from_file(&path).unwrap();
        assert_eq!(seed.name(), "calc_01");
        assert_eq!(seed.bytes(), b"1+2");
        assert_eq!(seed.len(), 3);
    }
}
