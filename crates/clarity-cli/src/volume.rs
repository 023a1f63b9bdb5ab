//! Headerless little-endian `f32` volumes, x fastest-varying.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use clarity_core::Dim3;

/// Parses `XxYxZ` or `X,Y,Z`.
pub fn parse_dim(s: &str) -> std::result::Result<Dim3, String> {
    let parts: Vec<&str> = s.split(|c| c == 'x' || c == ',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected three extents like 64x64x16, got '{s}'"));
    }
    let mut dims = [0usize; 3];
    for (d, p) in dims.iter_mut().zip(&parts) {
        *d = p.parse().map_err(|_| format!("invalid extent '{p}' in '{s}'"))?;
        if *d == 0 {
            return Err(format!("extents must be positive, got '{s}'"));
        }
    }
    Ok(Dim3::from_array(dims))
}

pub fn read_volume(path: &Path, dim: Dim3) -> Result<Vec<f32>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let expected = (dim.voxel_count() * 4) as u64;
    let actual = file.metadata()?.len();
    if actual != expected {
        bail!(
            "{} holds {actual} bytes, expected {expected} for a {dim} f32 volume",
            path.display()
        );
    }
    let mut data = vec![0.0f32; dim.voxel_count()];
    BufReader::new(file)
        .read_f32_into::<LittleEndian>(&mut data)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(data)
}

pub fn write_volume(path: &Path, data: &[f32]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for &v in data {
        writer.write_f32::<LittleEndian>(v)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dim_accepts_both_separators() {
        assert_eq!(parse_dim("64x32x8").unwrap(), Dim3::new(64, 32, 8));
        assert_eq!(parse_dim("5, 6, 7").unwrap(), Dim3::new(5, 6, 7));
        assert!(parse_dim("64x32").is_err());
        assert!(parse_dim("0x1x1").is_err());
        assert!(parse_dim("ax1x1").is_err());
    }

    #[test]
    fn volume_round_trip_and_size_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("volume.raw");
        let dim = Dim3::new(3, 2, 2);
        let data: Vec<f32> = (0..12).map(|v| v as f32 * 0.5 - 1.0).collect();
        write_volume(&path, &data).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 48);
        assert_eq!(read_volume(&path, dim).unwrap(), data);
        assert!(read_volume(&path, Dim3::new(4, 2, 2)).is_err());
    }
}
