//! ASCII STL parser.
//!
//! Every expected-token boundary is checked in the same order: an exhausted
//! stream is [`LoadError::FileTruncated`], a wrong keyword is
//! [`LoadError::UnexpectedToken`] and an unparsable number is
//! [`LoadError::InvalidToken`].

use std::io::BufRead;

use super::reader::StlReader;
use super::{Detected, LoadError, LoadResult};
use crate::math::vec3::Vec3;
use crate::model::TriangleSoup;

fn unexpected(expected: &'static str, found: &[u8]) -> LoadError {
    LoadError::UnexpectedToken {
        expected,
        found: String::from_utf8_lossy(found).into_owned(),
    }
}

fn expect<R: BufRead>(reader: &mut StlReader<R>, keyword: &'static str) -> LoadResult<()> {
    match reader.token()? {
        [] => Err(LoadError::FileTruncated),
        tok if tok == keyword.as_bytes() => Ok(()),
        tok => Err(unexpected(keyword, tok)),
    }
}

fn number<R: BufRead>(reader: &mut StlReader<R>) -> LoadResult<f32> {
    let tok = reader.token()?;
    if tok.is_empty() {
        return Err(LoadError::FileTruncated);
    }

    std::str::from_utf8(tok)
        .ok()
        .and_then(|s| s.parse::<f32>().ok())
        .ok_or_else(|| LoadError::InvalidToken {
            token: String::from_utf8_lossy(tok).into_owned(),
        })
}

fn vec3<R: BufRead>(reader: &mut StlReader<R>) -> LoadResult<Vec3> {
    Ok(Vec3::new(number(reader)?, number(reader)?, number(reader)?))
}

pub(super) fn parse<R: BufRead>(
    reader: &mut StlReader<R>,
    use_file_normals: bool,
    detected: Detected,
) -> LoadResult<TriangleSoup> {
    match detected {
        Detected::TextUnverified => {
            expect(reader, "solid")?;
            reader.skip_line()?;
        }
        Detected::Text { line_done: false } => reader.skip_line()?,
        _ => {}
    }

    let mut soup = TriangleSoup::new(use_file_normals);

    loop {
        match reader.token()? {
            b"facet" => {}
            b"endsolid" => break,
            [] => return Err(LoadError::FileTruncated),
            tok => return Err(unexpected("facet", tok)),
        }

        expect(reader, "normal")?;
        let normal = vec3(reader)?;

        expect(reader, "outer")?;
        expect(reader, "loop")?;

        let mut vertices = [Vec3::ZERO; 3];
        for vertex in &mut vertices {
            expect(reader, "vertex")?;
            *vertex = vec3(reader)?;
        }

        expect(reader, "endloop")?;
        expect(reader, "endfacet")?;

        soup.push(normal, vertices);
    }

    Ok(soup)
}
