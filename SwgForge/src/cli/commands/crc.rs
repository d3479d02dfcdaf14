use std::path::Path;

use crate::formats::PortalContainer;
use crate::iff::Iff;

pub fn execute(path: &Path) -> anyhow::Result<()> {
    let iff = Iff::open(path)?;
    println!("file crc:   {:#010x}", iff.calculate());

    if iff.current_name() == "PRTO" {
        let mut iff = iff;
        let pob = PortalContainer::read(&mut iff)?;
        match pob.crc {
            Some(crc) => println!("stored crc: {crc:#010x}"),
            None => println!("stored crc: none"),
        }
    }
    Ok(())
}
