//! Binary Loader and Image Placement.
//!
//! This module places firmware images into the machine's memories. It performs:
//! 1. **Binary loading:** Reads image files from disk into a byte buffer.
//! 2. **UF2:** Parses 512-byte magic-delimited blocks and writes each payload to flash.
//! 3. **ELF:** Writes every loadable segment at its physical address (flash or SRAM).
//! 4. **Raw images:** Copies flat binaries to the flash base and boot ROM images to 0.
//!
//! Images are written straight into the backing arrays, bypassing the bus, so flash
//! (read-only to the core in hardware) can be populated.

use std::fs;
use std::path::Path;

use object::elf::{EM_ARM, PT_LOAD};
use object::read::elf::{ElfFile32, FileHeader, ProgramHeader};

use crate::common::constants::{FLASH_BASE, FLASH_END, FLASH_SIZE, RAM_BASE, RAM_SIZE, ROM_SIZE};
use crate::common::error::LoadError;
use crate::soc::Bus;

/// UF2 block size in bytes.
pub const UF2_BLOCK_SIZE: usize = 512;
/// Largest payload a UF2 block may carry.
pub const UF2_MAX_PAYLOAD: u32 = 476;
/// First start magic (`"UF2\n"`).
pub const UF2_MAGIC_START0: u32 = 0x0A32_4655;
/// Second start magic.
pub const UF2_MAGIC_START1: u32 = 0x9E5D_5157;
/// End magic.
pub const UF2_MAGIC_END: u32 = 0x0AB1_6F30;
/// Block flag: payload is not for main flash.
pub const UF2_FLAG_NOT_MAIN_FLASH: u32 = 0x0000_0001;
/// Block flag: the family id field is present.
pub const UF2_FLAG_FAMILY_ID: u32 = 0x0000_2000;
/// UF2 family id of the RP2040.
pub const RP2040_FAMILY_ID: u32 = 0xE48B_FF56;

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// Container format of a firmware image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    /// USB flashing format.
    Uf2,
    /// ELF executable.
    Elf,
    /// Flat binary for the start of flash.
    Binary,
}

impl ImageFormat {
    /// Guesses the format from the leading bytes.
    pub fn detect(image: &[u8]) -> Self {
        if image.starts_with(ELF_MAGIC) {
            Self::Elf
        } else if image.len() >= 4 && read_le32(image, 0) == UF2_MAGIC_START0 {
            Self::Uf2
        } else {
            Self::Binary
        }
    }
}

/// Loads a binary file from disk into a byte vector.
///
/// # Arguments
///
/// * `path` - Path to the image file.
///
/// # Errors
///
/// [`LoadError::Io`] if the file cannot be read.
pub fn load_binary(path: impl AsRef<Path>) -> Result<Vec<u8>, LoadError> {
    Ok(fs::read(path)?)
}

#[inline]
fn read_le32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

/// Copies `bytes` to `address` in flash, SRAM or boot ROM.
fn place(bus: &mut Bus, address: u32, bytes: &[u8]) -> Result<(), LoadError> {
    let out_of_range = || LoadError::OutOfRange { addr: address, len: bytes.len() };
    let placed = if (FLASH_BASE..FLASH_END).contains(&address) {
        let offset = (address - FLASH_BASE) as usize & (FLASH_SIZE - 1);
        bus.flash.load(offset, bytes)
    } else if (RAM_BASE..RAM_BASE + RAM_SIZE as u32).contains(&address) {
        bus.sram.load((address - RAM_BASE) as usize, bytes)
    } else if (address as usize) < ROM_SIZE {
        bus.rom.load(address as usize, bytes)
    } else {
        return Err(out_of_range());
    };
    if placed { Ok(()) } else { Err(out_of_range()) }
}

/// Loads a UF2 image into flash.
///
/// Invalid blocks are logged and skipped: a bad magic, a payload size outside
/// `1..=476`, a block number past the declared total, or a payload that does not fit.
/// Blocks flagged as not for main flash, blocks targeting anything other than flash,
/// and a trailing partial block are skipped too. A family id other than the RP2040's
/// is logged but loaded.
///
/// # Arguments
///
/// * `bus` - The bus whose flash receives the payloads.
/// * `image` - The whole UF2 file.
///
/// # Returns
///
/// The number of blocks written.
///
/// # Errors
///
/// [`LoadError::NoBlocks`] when no block was loadable.
pub fn load_uf2(bus: &mut Bus, image: &[u8]) -> Result<usize, LoadError> {
    let blocks = image.chunks_exact(UF2_BLOCK_SIZE);
    if !blocks.remainder().is_empty() {
        tracing::warn!(
            target: "loader",
            "ignoring {} trailing bytes after the last UF2 block",
            blocks.remainder().len()
        );
    }
    let mut loaded = 0;
    for (index, block) in blocks.enumerate() {
        let magics = [read_le32(block, 0), read_le32(block, 4), read_le32(block, 508)];
        if magics != [UF2_MAGIC_START0, UF2_MAGIC_START1, UF2_MAGIC_END] {
            tracing::warn!(target: "loader", index, "skipping UF2 block, bad magic {magics:08x?}");
            continue;
        }
        let flags = read_le32(block, 8);
        let target = read_le32(block, 12);
        let size = read_le32(block, 16);
        let block_no = read_le32(block, 20);
        let num_blocks = read_le32(block, 24);
        let family = read_le32(block, 28);

        if flags & UF2_FLAG_NOT_MAIN_FLASH != 0 {
            tracing::debug!(target: "loader", index, "skipping UF2 block not for main flash");
            continue;
        }
        if size == 0 || size > UF2_MAX_PAYLOAD {
            tracing::warn!(target: "loader", index, "skipping UF2 block, payload {size} bytes");
            continue;
        }
        if num_blocks != 0 && block_no >= num_blocks {
            tracing::warn!(target: "loader", index, "skipping UF2 block {block_no}/{num_blocks}");
            continue;
        }
        if flags & UF2_FLAG_FAMILY_ID != 0 && family != RP2040_FAMILY_ID {
            tracing::warn!(target: "loader", index, "UF2 block has family id {family:#010x}");
        }
        if !(FLASH_BASE..FLASH_END).contains(&target) {
            tracing::warn!(target: "loader", index, "UF2 block outside flash at {target:#010x}");
            continue;
        }
        if let Err(err) = place(bus, target, &block[32..32 + size as usize]) {
            tracing::warn!(target: "loader", index, "skipping UF2 block: {err}");
            continue;
        }
        loaded += 1;
    }
    if loaded == 0 {
        return Err(LoadError::NoBlocks);
    }
    tracing::info!(target: "loader", blocks = loaded, "UF2 image loaded");
    Ok(loaded)
}

/// Loads every `PT_LOAD` segment of a 32-bit ELF at its physical address.
///
/// # Returns
///
/// The entry point recorded in the ELF header.
///
/// # Errors
///
/// [`LoadError::Elf`] if the file does not parse and [`LoadError::OutOfRange`] if a
/// segment lands outside flash, SRAM and boot ROM.
pub fn load_elf(bus: &mut Bus, image: &[u8]) -> Result<u32, LoadError> {
    let elf: ElfFile32<'_> =
        ElfFile32::parse(image).map_err(|e| LoadError::Elf(e.to_string()))?;
    let endian = elf.endian();
    let header = elf.elf_header();
    if header.e_machine(endian) != EM_ARM {
        tracing::warn!(target: "loader", "ELF machine {} is not ARM", header.e_machine(endian));
    }
    for segment in elf.elf_program_headers() {
        if segment.p_type(endian) != PT_LOAD {
            continue;
        }
        let data = segment
            .data(endian, image)
            .map_err(|()| LoadError::Elf("segment data out of bounds".to_string()))?;
        if data.is_empty() {
            continue;
        }
        let paddr = segment.p_paddr(endian);
        tracing::debug!(target: "loader", "segment {paddr:#010x} ({} bytes)", data.len());
        place(bus, paddr, data)?;
    }
    let entry = header.e_entry(endian);
    tracing::info!(target: "loader", "ELF image loaded, entry {entry:#010x}");
    Ok(entry)
}

/// Copies a flat binary to the start of flash.
///
/// # Errors
///
/// [`LoadError::OutOfRange`] if the image is larger than flash.
pub fn load_bin(bus: &mut Bus, image: &[u8]) -> Result<(), LoadError> {
    place(bus, FLASH_BASE, image)?;
    tracing::info!(target: "loader", bytes = image.len(), "raw image loaded to flash");
    Ok(())
}

/// Copies a boot ROM image to address 0.
///
/// # Errors
///
/// [`LoadError::OutOfRange`] if the image is larger than the boot ROM.
pub fn load_bootrom(bus: &mut Bus, image: &[u8]) -> Result<(), LoadError> {
    if !bus.rom.load(0, image) {
        return Err(LoadError::OutOfRange { addr: 0, len: image.len() });
    }
    tracing::info!(target: "loader", bytes = image.len(), "boot ROM loaded");
    Ok(())
}

/// Loads an image of any supported format, detected from its contents.
///
/// # Returns
///
/// The detected format.
///
/// # Errors
///
/// Any error of the format-specific loader.
pub fn load_image(bus: &mut Bus, image: &[u8]) -> Result<ImageFormat, LoadError> {
    let format = ImageFormat::detect(image);
    match format {
        ImageFormat::Uf2 => {
            let _ = load_uf2(bus, image)?;
        }
        ImageFormat::Elf => {
            let _ = load_elf(bus, image)?;
        }
        ImageFormat::Binary => load_bin(bus, image)?,
    }
    Ok(format)
}
