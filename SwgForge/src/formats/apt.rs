//! `.apt` appearance redirect (`FORM APT  / 0000 / NAME`)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::asset_root::AssetRoot;
use crate::error::Result;
use crate::formats::common::check_version;
use crate::iff::Iff;

/// A single reference to another appearance file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AptFile {
    /// Path relative to the asset root, e.g. `appearance/lod/hut.lod`.
    pub reference: String,
}

impl AptFile {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }

    /// Redirect to `appearance/lod/<name>.lod`.
    pub fn for_lod(name: &str) -> Self {
        Self::new(format!("appearance/lod/{name}.lod"))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut iff = Iff::open(path.as_ref())?;
        Self::read(&mut iff)
    }

    pub fn read(iff: &mut Iff) -> Result<Self> {
        iff.enter_form("APT ")?;
        let version = iff.current_name();
        check_version("APT", &version, &["0000"])?;
        iff.enter_form("0000")?;
        iff.enter_chunk("NAME")?;
        let reference = iff.read_string()?;
        iff.exit_chunk("NAME")?;
        iff.exit_form("0000")?;
        iff.exit_form("APT ")?;
        Ok(Self { reference })
    }

    pub fn to_iff(&self) -> Result<Iff> {
        let mut iff = Iff::new(64);
        iff.insert_form("APT ", true)?;
        iff.insert_form("0000", true)?;
        iff.insert_chunk("NAME", true)?;
        iff.insert_string(&self.reference)?;
        iff.exit_chunk("NAME")?;
        iff.exit_form("0000")?;
        iff.exit_form("APT ")?;
        Ok(iff)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_iff()?.write(path)
    }

    /// Locate the referenced file under `root`.
    pub fn resolve(&self, root: &AssetRoot) -> Result<PathBuf> {
        root.find_file(&self.reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_apt_roundtrip() {
        let apt = AptFile::for_lod("thm_tato_hut");
        assert_eq!(apt.reference, "appearance/lod/thm_tato_hut.lod");
        let back = AptFile::read(&mut Iff::from_bytes(apt.to_iff().unwrap().into_bytes())).unwrap();
        assert_eq!(back, apt);
    }

    #[test]
    fn test_apt_layout() {
        let bytes = AptFile::new("a").to_iff().unwrap().into_bytes();
        // FORM(12) FORM(12) NAME(8) "a\0"
        assert_eq!(bytes.len(), 34);
        assert_eq!(&bytes[8..12], b"APT ");
    }
}
