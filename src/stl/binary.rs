//! Binary STL reader and writer.
//!
//! All multi-byte fields are little-endian, as written by every mainstream
//! producer. The per-triangle attribute word is read and discarded; some
//! exporters store colors there but there is no agreed encoding.

use std::io::{self, Read, Write};

use super::{LoadError, LoadResult, HEADER_SIZE, RECORD_SIZE};
use crate::math::vec3::Vec3;
use crate::model::TriangleSoup;

/// Upper bound on the up-front allocation driven by the header's count.
/// A lying header must not make the loader reserve gigabytes.
const MAX_RESERVED_TRIANGLES: usize = 1 << 16;

#[inline]
fn read_vec3(buf: &[u8]) -> Vec3 {
    let f = |i: usize| f32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
    Vec3::new(f(0), f(4), f(8))
}

#[inline]
fn write_vec3(buf: &mut [u8], v: Vec3) {
    buf[0..4].copy_from_slice(&v.x.to_le_bytes());
    buf[4..8].copy_from_slice(&v.y.to_le_bytes());
    buf[8..12].copy_from_slice(&v.z.to_le_bytes());
}

/// Parse a binary body. `consumed` header bytes were already read by format
/// detection.
pub(super) fn parse<R: Read>(
    reader: &mut R,
    use_file_normals: bool,
    consumed: usize,
) -> LoadResult<TriangleSoup> {
    let remaining = HEADER_SIZE.saturating_sub(consumed) as u64;
    let skipped = io::copy(&mut reader.by_ref().take(remaining), &mut io::sink())?;
    if skipped < remaining {
        return Err(LoadError::FileTruncated);
    }

    let mut count = [0u8; 4];
    reader.read_exact(&mut count)?;
    let count = u32::from_le_bytes(count) as usize;

    let mut soup =
        TriangleSoup::with_capacity(use_file_normals, count.min(MAX_RESERVED_TRIANGLES));
    let mut record = [0u8; RECORD_SIZE];

    for _ in 0..count {
        reader.read_exact(&mut record)?;

        let normal = read_vec3(&record[0..12]);
        let vertices = [
            read_vec3(&record[12..24]),
            read_vec3(&record[24..36]),
            read_vec3(&record[36..48]),
        ];
        // record[48..50]: attribute word, ignored

        soup.push(normal, vertices);
    }

    Ok(soup)
}

/// Write `count` triangles as `(normal, vertices)` pairs behind a
/// space-padded header starting with `banner`.
pub(super) fn write<W, I>(mut writer: W, banner: &[u8], count: usize, triangles: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = (Vec3, [Vec3; 3])>,
{
    let mut header = [b' '; HEADER_SIZE];
    let banner = &banner[..banner.len().min(HEADER_SIZE)];
    header[..banner.len()].copy_from_slice(banner);
    writer.write_all(&header)?;

    let count = u32::try_from(count)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many triangles for STL"))?;
    writer.write_all(&count.to_le_bytes())?;

    let mut record = [0u8; RECORD_SIZE];
    for (normal, [a, b, c]) in triangles {
        write_vec3(&mut record[0..12], normal);
        write_vec3(&mut record[12..24], a);
        write_vec3(&mut record[24..36], b);
        write_vec3(&mut record[36..48], c);
        writer.write_all(&record)?;
    }

    writer.flush()
}
