//! Hardpoints (`FORM HPTS` / `HPNT`)

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::iff::Iff;

/// Named attachment transform.
///
/// `transform` is the 3x4 block exactly as stored: three rows of
/// rotation followed by translation (`xx xy xz px yx yy yz py zx zy zz pz`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hardpoint {
    pub name: String,
    pub transform: [f32; 12],
}

impl Hardpoint {
    pub const IDENTITY: [f32; 12] = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0];

    pub fn position(&self) -> [f32; 3] {
        [self.transform[3], self.transform[7], self.transform[11]]
    }
}

/// Read `FORM HPTS`. Each `HPNT` holds 12 floats and a name.
pub fn read_hardpoints(iff: &mut Iff) -> Result<Vec<Hardpoint>> {
    iff.enter_form("HPTS")?;
    let mut hardpoints = Vec::new();
    while !iff.at_end_of_form() {
        iff.enter_chunk("HPNT")?;
        let transform = iff.read_floats::<12>()?;
        let name = iff.read_string()?;
        iff.exit_chunk("HPNT")?;
        hardpoints.push(Hardpoint { name, transform });
    }
    iff.exit_form("HPTS")?;
    Ok(hardpoints)
}

/// Write `FORM HPTS`, empty when there are no hardpoints.
pub fn write_hardpoints(iff: &mut Iff, hardpoints: &[Hardpoint]) -> Result<()> {
    iff.insert_form("HPTS", true)?;
    for hp in hardpoints {
        iff.insert_chunk("HPNT", true)?;
        iff.insert_floats(&hp.transform)?;
        iff.insert_string(&hp.name)?;
        iff.exit_chunk("HPNT")?;
    }
    iff.exit_form("HPTS")?;
    Ok(())
}
