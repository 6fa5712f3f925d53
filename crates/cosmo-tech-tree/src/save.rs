//! Binary save format for research state.
//!
//! Research state of every empire is written with `bitcode` behind a
//! versioned header. Tech definitions are not saved: they are reloaded from
//! content, and saved state refers to them by name.

use cosmo_core::fixed::Turn;
use serde::{Deserialize, Serialize};

use crate::EmpireResearch;

/// Magic number identifying a research save.
pub const SAVE_MAGIC: u32 = 0xC05E_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SAVE_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version {0} (this build reads {FORMAT_VERSION})")]
    UnsupportedVersion(u32),
}

/// Header prepended to every save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveHeader {
    pub magic: u32,
    pub version: u32,
    /// Turn the save was taken on.
    pub turn: Turn,
}

impl SaveHeader {
    pub fn new(turn: Turn) -> Self {
        Self {
            magic: SAVE_MAGIC,
            version: FORMAT_VERSION,
            turn,
        }
    }

    pub fn validate(&self) -> Result<(), SaveError> {
        if self.magic != SAVE_MAGIC {
            return Err(SaveError::InvalidMagic(self.magic));
        }
        if self.version != FORMAT_VERSION {
            return Err(SaveError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Research state of every empire at one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchSave {
    pub header: SaveHeader,
    pub empires: Vec<EmpireResearch>,
}

impl ResearchSave {
    pub fn new(turn: Turn, empires: Vec<EmpireResearch>) -> Self {
        Self {
            header: SaveHeader::new(turn),
            empires,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, SaveError> {
        bitcode::serialize(self).map_err(|e| SaveError::Encode(e.to_string()))
    }

    /// Decode and validate the header. Pending events are never saved.
    pub fn decode(data: &[u8]) -> Result<Self, SaveError> {
        let save: ResearchSave =
            bitcode::deserialize(data).map_err(|e| SaveError::Decode(e.to_string()))?;
        save.header.validate()?;
        Ok(save)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::diamond_tree;
    use cosmo_core::id::EmpireId;

    fn sample() -> ResearchSave {
        let tree = diamond_tree();
        let mut a = EmpireResearch::new(EmpireId(1));
        a.add_newly_researched(&tree, "ALGO").unwrap();
        a.apply_new_techs(&tree, 3);
        a.add_newly_researched(&tree, "ECOL").unwrap();
        let b = EmpireResearch::new(EmpireId(2));
        ResearchSave::new(4, vec![a, b])
    }

    #[test]
    fn round_trip() {
        let mut save = sample();
        let bytes = save.encode().unwrap();
        let restored = ResearchSave::decode(&bytes).unwrap();

        for empire in &mut save.empires {
            empire.drain_events();
        }
        assert_eq!(restored, save);
        assert_eq!(restored.header.turn, 4);
        assert_eq!(restored.empires[0].researched_turn("ALGO"), Some(3));
        assert_eq!(
            restored.empires[0].newly_researched().collect::<Vec<_>>(),
            vec!["ECOL"]
        );
    }

    #[test]
    fn wrong_magic_rejected() {
        let mut save = sample();
        save.header.magic = 0xDEAD_BEEF;
        let bytes = save.encode().unwrap();
        assert!(matches!(
            ResearchSave::decode(&bytes),
            Err(SaveError::InvalidMagic(0xDEAD_BEEF))
        ));
    }

    #[test]
    fn other_version_rejected() {
        let mut save = sample();
        save.header.version = FORMAT_VERSION + 1;
        let bytes = save.encode().unwrap();
        assert!(matches!(
            ResearchSave::decode(&bytes),
            Err(SaveError::UnsupportedVersion(v)) if v == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn garbage_is_decode_error() {
        assert!(matches!(
            ResearchSave::decode(&[1, 2, 3]),
            Err(SaveError::Decode(_))
        ));
    }
}
