//! Bundle persistence for compiled modules.
//!
//! A bundle is a TAR container with one entry per target architecture (an
//! opaque object blob), one `bitcode` entry (the serialised LLIR), and one
//! `metadata` entry describing every exported symbol, so another session
//! can import the compilation without re-resolving it.

pub mod meta;
pub mod tar;

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use cata_sem::SemState;

/// Write a complete bundle: object blob for `arch`, bitcode, and symbol
/// metadata.
pub fn write_bundle_file(path: &Path, state: &SemState, arch: &str) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create bundle at {}", path.display()))?;
    write_bundle(&mut file, state, arch)
}

pub fn write_bundle(out: &mut dyn Write, state: &SemState, arch: &str) -> Result<()> {
    let mut writer = tar::Writer::new(out);

    // the external backend consumes the bitcode; the per-arch entry
    // carries the same rendering as an opaque blob
    let bitcode = state.builder.module.print_to_string().into_bytes();
    writer.put(arch, &bitcode)?;
    writer.put("bitcode", &bitcode)?;

    let mut metadata = Vec::new();
    meta::write_meta(state, &mut metadata)?;
    writer.put("metadata", &metadata)?;

    writer.finish()
}

/// Read a bundle and import its symbol records into the session.
pub fn read_bundle_file(path: &Path, state: &mut SemState) -> Result<()> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open bundle at {}", path.display()))?;
    read_bundle(&mut file, state)
}

pub fn read_bundle(input: &mut dyn Read, state: &mut SemState) -> Result<()> {
    let entries = tar::read_entries(input)?;
    let Some(metadata) = entries
        .iter()
        .find(|(name, _)| name == "metadata")
        .map(|(_, data)| data)
    else {
        bail!("bundle has no metadata entry");
    };
    meta::read_meta(state, metadata)
}
