//! Binary and JSON (de)serialization for a single [`Vector`] or an array of
//! them, matching the wire format external tooling already produces.
//!
//! The binary format is bit-exact:
//!
//! ```text
//! u32   version (= 1)
//! u8    has_indexes (0/1)
//! [ if has_indexes: u32 n, n x i32 indexes ]
//! u8    has_values  (always 1 for live vectors)
//! u32   m
//! m x f32 values (little-endian IEEE 754)
//! ```
//!
//! An array is `u32 count` followed by `count` records. A `.gz`-suffixed
//! path selects gzip compression via [`flate2`]; callers name the suffix,
//! this module doesn't inspect paths itself. Bulk index/value arrays are
//! cast through [`bytemuck`] rather than written element-by-element.
//!
//! [`write_checkpoint`]/[`read_checkpoint`] wrap the array format in a
//! postcard-encoded header plus a trailing CRC32 (via [`crc32fast`]), for
//! callers that want integrity-checked snapshots rather than the bare wire
//! format above.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};
use crate::vector::Vector;

const FORMAT_VERSION: u32 = 1;

fn io_err(e: impl std::fmt::Display) -> ClusterError {
    ClusterError::Other(e.to_string())
}

/// JSON wire shape: `{ "Indexes": [i32...] | null, "Values": [f32...] }`.
#[derive(Debug, Serialize, Deserialize)]
struct JsonVector {
    #[serde(rename = "Indexes")]
    indexes: Option<Vec<i32>>,
    #[serde(rename = "Values")]
    values: Vec<f32>,
}

pub fn to_json(v: &Vector) -> Result<String> {
    let json = match v {
        Vector::Dense(d) => JsonVector {
            indexes: None,
            values: d.values().to_vec(),
        },
        Vector::Sparse(s) => JsonVector {
            indexes: Some(s.indices().iter().map(|&i| i as i32).collect()),
            values: s.values().to_vec(),
        },
    };
    serde_json::to_string(&json).map_err(|e| ClusterError::Other(e.to_string()))
}

pub fn from_json(text: &str) -> Result<Vector> {
    let parsed: JsonVector =
        serde_json::from_str(text).map_err(|e| ClusterError::Other(e.to_string()))?;
    match parsed.indexes {
        Some(indexes) => {
            let indices: Vec<u32> = indexes.into_iter().map(|i| i as u32).collect();
            Vector::sparse(indices, parsed.values)
        }
        None => Ok(Vector::dense(parsed.values)),
    }
}

/// Write a single vector in the binary format described above.
pub fn write_binary<W: Write>(w: &mut W, v: &Vector) -> io::Result<()> {
    w.write_u32::<LittleEndian>(FORMAT_VERSION)?;

    match v {
        Vector::Sparse(s) => {
            w.write_u8(1)?;
            w.write_u32::<LittleEndian>(s.nnz() as u32)?;
            let idx_i32: Vec<i32> = s.indices().iter().map(|&idx| idx as i32).collect();
            w.write_all(bytemuck::cast_slice(&idx_i32))?;
            w.write_u8(1)?;
            w.write_u32::<LittleEndian>(s.values().len() as u32)?;
            w.write_all(bytemuck::cast_slice(s.values()))?;
        }
        Vector::Dense(d) => {
            w.write_u8(0)?;
            w.write_u8(1)?;
            w.write_u32::<LittleEndian>(d.dim() as u32)?;
            w.write_all(bytemuck::cast_slice(d.values()))?;
        }
    }
    Ok(())
}

/// Read a single vector in the binary format described above.
pub fn read_binary<R: Read>(r: &mut R) -> Result<Vector> {
    let version = r
        .read_u32::<LittleEndian>()
        .map_err(|e| ClusterError::Other(e.to_string()))?;
    if version != FORMAT_VERSION {
        return Err(ClusterError::Other(format!(
            "unsupported vector format version {version}"
        )));
    }

    let has_indexes = r.read_u8().map_err(|e| ClusterError::Other(e.to_string()))? != 0;
    let indices: Option<Vec<u32>> = if has_indexes {
        let n = r
            .read_u32::<LittleEndian>()
            .map_err(|e| ClusterError::Other(e.to_string()))? as usize;
        let mut idx_i32 = vec![0i32; n];
        r.read_exact(bytemuck::cast_slice_mut(&mut idx_i32))
            .map_err(|e| ClusterError::Other(e.to_string()))?;
        Some(idx_i32.into_iter().map(|idx| idx as u32).collect())
    } else {
        None
    };

    let has_values = r.read_u8().map_err(|e| ClusterError::Other(e.to_string()))? != 0;
    if !has_values {
        return Err(ClusterError::Other(
            "vector record has no values (has_values = 0)".into(),
        ));
    }
    let m = r
        .read_u32::<LittleEndian>()
        .map_err(|e| ClusterError::Other(e.to_string()))? as usize;
    let mut values = vec![0.0f32; m];
    r.read_exact(bytemuck::cast_slice_mut(&mut values))
        .map_err(|e| ClusterError::Other(e.to_string()))?;

    match indices {
        Some(indices) => Vector::sparse(indices, values),
        None => Ok(Vector::dense(values)),
    }
}

pub fn write_binary_array<W: Write>(w: &mut W, vectors: &[Vector]) -> io::Result<()> {
    w.write_u32::<LittleEndian>(vectors.len() as u32)?;
    for v in vectors {
        write_binary(w, v)?;
    }
    Ok(())
}

pub fn read_binary_array<R: Read>(r: &mut R) -> Result<Vec<Vector>> {
    let count = r
        .read_u32::<LittleEndian>()
        .map_err(|e| ClusterError::Other(e.to_string()))? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(read_binary(r)?);
    }
    Ok(out)
}

/// Gzip-wrap `write_binary_array`; selected by a `.gz` filename suffix at
/// the caller's discretion (this module only implements the codec).
pub fn write_binary_array_gz<W: Write>(w: W, vectors: &[Vector]) -> io::Result<()> {
    let mut encoder = flate2::write::GzEncoder::new(w, flate2::Compression::default());
    write_binary_array(&mut encoder, vectors)?;
    encoder.finish()?;
    Ok(())
}

pub fn read_binary_array_gz<R: Read>(r: R) -> Result<Vec<Vector>> {
    let mut decoder = flate2::read::GzDecoder::new(r);
    read_binary_array(&mut decoder)
}

/// Postcard-encoded header in front of a checkpoint's payload.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointHeader {
    format: u8,
}

/// Write a checksummed checkpoint: a postcard-encoded header, the binary
/// vector array payload, then a trailing CRC32 over header + payload. The
/// envelope shape follows the teacher's write-ahead-log entries.
pub fn write_checkpoint<W: Write>(w: &mut W, vectors: &[Vector]) -> Result<()> {
    let header = CheckpointHeader {
        format: FORMAT_VERSION as u8,
    };
    let header_bytes = postcard::to_allocvec(&header).map_err(io_err)?;

    let mut payload = Vec::new();
    write_binary_array(&mut payload, vectors).map_err(io_err)?;

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header_bytes);
    hasher.update(&payload);
    let checksum = hasher.finalize();

    w.write_u32::<LittleEndian>(header_bytes.len() as u32)
        .map_err(io_err)?;
    w.write_all(&header_bytes).map_err(io_err)?;
    w.write_all(&payload).map_err(io_err)?;
    w.write_u32::<LittleEndian>(checksum).map_err(io_err)?;
    Ok(())
}

/// Read back a checkpoint written by [`write_checkpoint`], verifying the
/// CRC32 trailer before decoding the payload.
pub fn read_checkpoint<R: Read>(r: &mut R) -> Result<Vec<Vector>> {
    let header_len = r.read_u32::<LittleEndian>().map_err(io_err)? as usize;
    let mut header_bytes = vec![0u8; header_len];
    r.read_exact(&mut header_bytes).map_err(io_err)?;
    let header: CheckpointHeader = postcard::from_bytes(&header_bytes).map_err(io_err)?;
    if header.format as u32 != FORMAT_VERSION {
        return Err(ClusterError::Other(format!(
            "unsupported checkpoint format {}",
            header.format
        )));
    }

    let mut rest = Vec::new();
    r.read_to_end(&mut rest).map_err(io_err)?;
    if rest.len() < 4 {
        return Err(ClusterError::Other(
            "checkpoint truncated before checksum trailer".into(),
        ));
    }
    let split = rest.len() - 4;
    let (payload, checksum_bytes) = rest.split_at(split);
    let expected = u32::from_le_bytes(checksum_bytes.try_into().unwrap());

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header_bytes);
    hasher.update(payload);
    let actual = hasher.finalize();
    if actual != expected {
        return Err(ClusterError::Other(format!(
            "checkpoint checksum mismatch: expected {expected}, got {actual}"
        )));
    }

    read_binary_array(&mut &payload[..])
}
