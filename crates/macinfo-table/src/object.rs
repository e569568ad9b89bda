//! Section extraction from object files

use goblin::Object;
use macinfo_core::{Error, Result};
use tracing::debug;

/// `SHF_COMPRESSED`
const SHF_COMPRESSED: u64 = 0x800;

/// Copy the contents of section `name` out of an ELF object.
///
/// Returns `Ok(None)` when the object has no such section.
pub fn extract_section(bytes: &[u8], name: &str) -> Result<Option<Vec<u8>>> {
    let elf = match Object::parse(bytes).map_err(|e| Error::Object(e.to_string()))? {
        Object::Elf(elf) => elf,
        _ => return Err(Error::Object("only ELF objects are supported".into())),
    };

    for header in &elf.section_headers {
        if elf.shdr_strtab.get_at(header.sh_name) != Some(name) {
            continue;
        }
        if header.sh_flags & SHF_COMPRESSED != 0 {
            return Err(Error::Object(format!("{} is compressed", name)));
        }
        let range = header
            .file_range()
            .ok_or_else(|| Error::Object(format!("{} has no file contents", name)))?;
        let data = bytes.get(range.clone()).ok_or_else(|| {
            Error::Object(format!("{} extends past end of file ({:?})", name, range))
        })?;

        debug!("Found {} at {:#x}, {} bytes", name, range.start, data.len());
        return Ok(Some(data.to_vec()));
    }

    Ok(None)
}
