//! Reading the word-width marker from object file headers.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::platform::BitWidth;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ELF_CLASS_32: u8 = 1;
const ELF_CLASS_64: u8 = 2;

const COFF_MACHINE_I386: u16 = 0x014c;
const COFF_MACHINE_AMD64: u16 = 0x8664;
const COFF_MACHINE_ARM64: u16 = 0xaa64;

/// Decode the bit width from the first bytes of an object file.
///
/// ELF objects carry the class in `e_ident[EI_CLASS]`; COFF objects (as produced by
/// MinGW and the Intel compiler on Windows) start with the little-endian machine field.
/// Returns `None` when the header is not recognised.
pub fn decode(header: &[u8]) -> Option<BitWidth> {
  if header.len() >= 5 && header[..4] == ELF_MAGIC {
    return match header[4] {
      ELF_CLASS_32 => Some(BitWidth::W32),
      ELF_CLASS_64 => Some(BitWidth::W64),
      _ => None,
    };
  }

  if header.len() >= 2 {
    return match u16::from_le_bytes([header[0], header[1]]) {
      COFF_MACHINE_I386 => Some(BitWidth::W32),
      COFF_MACHINE_AMD64 | COFF_MACHINE_ARM64 => Some(BitWidth::W64),
      _ => None,
    };
  }

  None
}

/// Read the marker from an object file on disk.
pub fn read(path: &Path) -> io::Result<Option<BitWidth>> {
  let mut header = [0u8; 8];
  let mut file = File::open(path)?;
  let mut filled = 0;
  while filled < header.len() {
    let n = file.read(&mut header[filled..])?;
    if n == 0 {
      break;
    }
    filled += n;
  }
  Ok(decode(&header[..filled]))
}
