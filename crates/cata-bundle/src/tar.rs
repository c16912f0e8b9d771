//! A minimal USTAR writer/reader, sufficient for bundle entries: flat
//! names, regular files, 512-byte blocks.

use std::io::{Read, Write};

use anyhow::{bail, Result};

const BLOCK: usize = 512;

pub struct Writer<'a> {
    out: &'a mut dyn Write,
}

impl<'a> Writer<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Writer { out }
    }

    /// Append one entry.
    pub fn put(&mut self, name: &str, data: &[u8]) -> Result<()> {
        if name.len() > 100 {
            bail!("entry name too long: {name}");
        }
        let mut header = [0u8; BLOCK];
        header[..name.len()].copy_from_slice(name.as_bytes());
        header[100..107].copy_from_slice(b"0000644");
        header[108..115].copy_from_slice(b"0000000");
        header[116..123].copy_from_slice(b"0000000");
        let size = format!("{:011o}", data.len());
        header[124..124 + size.len()].copy_from_slice(size.as_bytes());
        header[136..147].copy_from_slice(b"00000000000");
        header[156] = b'0';
        header[257..262].copy_from_slice(b"ustar");
        header[263..265].copy_from_slice(b"00");

        // checksum is computed with the checksum field set to spaces
        header[148..156].copy_from_slice(b"        ");
        let sum: u32 = header.iter().map(|&b| b as u32).sum();
        let checksum = format!("{sum:06o}\0 ");
        header[148..156].copy_from_slice(checksum.as_bytes());

        self.out.write_all(&header)?;
        self.out.write_all(data)?;
        let pad = (BLOCK - data.len() % BLOCK) % BLOCK;
        self.out.write_all(&vec![0u8; pad])?;
        Ok(())
    }

    /// Write the end-of-archive marker.
    pub fn finish(&mut self) -> Result<()> {
        self.out.write_all(&[0u8; BLOCK * 2])?;
        Ok(())
    }
}

/// Read every entry of an archive into memory.
pub fn read_entries(input: &mut dyn Read) -> Result<Vec<(String, Vec<u8>)>> {
    let mut raw = Vec::new();
    input.read_to_end(&mut raw)?;

    let mut entries = Vec::new();
    let mut offset = 0usize;
    while offset + BLOCK <= raw.len() {
        let header = &raw[offset..offset + BLOCK];
        if header.iter().all(|&b| b == 0) {
            break;
        }
        let name_end = header[..100].iter().position(|&b| b == 0).unwrap_or(100);
        let name = String::from_utf8_lossy(&header[..name_end]).into_owned();
        let size_field = &header[124..136];
        let size_text = std::str::from_utf8(size_field)
            .unwrap_or("")
            .trim_end_matches(['\0', ' '])
            .trim();
        let size = usize::from_str_radix(size_text, 8)
            .map_err(|_| anyhow::anyhow!("malformed size field in entry `{name}`"))?;

        let data_start = offset + BLOCK;
        if data_start + size > raw.len() {
            bail!("truncated entry `{name}`");
        }
        entries.push((name, raw[data_start..data_start + size].to_vec()));
        offset = data_start + size.next_multiple_of(BLOCK);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_entries() {
        let mut buf = Vec::new();
        {
            let mut writer = Writer::new(&mut buf);
            writer.put("bitcode", b"some bytes").unwrap();
            writer.put("metadata", b"CATA_META\n").unwrap();
            writer.finish().unwrap();
        }
        let entries = read_entries(&mut buf.as_slice()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "bitcode");
        assert_eq!(entries[0].1, b"some bytes");
        assert_eq!(entries[1].0, "metadata");
    }

    #[test]
    fn empty_entries_are_preserved() {
        let mut buf = Vec::new();
        {
            let mut writer = Writer::new(&mut buf);
            writer.put("empty", b"").unwrap();
            writer.put("after", b"x").unwrap();
            writer.finish().unwrap();
        }
        let entries = read_entries(&mut buf.as_slice()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].1.is_empty());
        assert_eq!(entries[1].1, b"x");
    }
}
