//! STL (stereolithography) mesh loading.
//!
//! Both encodings of the format are supported:
//!
//! ```text
//! solid name                       UINT8[80]  header (ignored)
//!   facet normal nx ny nz          UINT32     triangle count
//!     outer loop                   foreach triangle
//!       vertex x y z   (x3)          REAL32[3]  normal
//!     endloop                        REAL32[9]  vertices
//!   endfacet                         UINT16     attributes (ignored)
//! endsolid name
//! ```
//!
//! The format is a triangle soup. Every load welds coincident vertices so the
//! resulting [`Model`] is an indexed mesh.
//!
//! # Format detection
//!
//! In [`LoadMode::Guess`] leading whitespace is skipped and the next bytes
//! are compared against `solid`, all within the first [`HEADER_SIZE`] bytes.
//! The byte after `solid` is then peeked and may lie one past that budget:
//! whitespace selects the text parser, anything else selects the binary
//! parser, as does any earlier mismatch. If the budget runs out before
//! `solid` is either matched or refuted, loading fails with
//! [`LoadError::GuessFailed`].

mod binary;
mod reader;
mod text;

use std::io::{self, BufRead, Write};

use log::debug;
use thiserror::Error;

use crate::math::vec3::Vec3;
use crate::model::Model;
use reader::StlReader;

/// Size of the binary header, which is also the format-guess budget.
pub const HEADER_SIZE: usize = 80;

/// Size of one binary triangle record: 12 floats plus 2 attribute bytes.
pub const RECORD_SIZE: usize = 50;

const SIGNATURE: &[u8] = b"solid";

/// Result type for STL loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors that can occur while loading an STL stream.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A field expected to be numeric failed to parse.
    #[error("invalid token: {token:?}")]
    InvalidToken { token: String },

    /// A keyword did not match the grammar.
    #[error("unexpected token: expected `{expected}`, found {found:?}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },

    /// The stream ended before a required field was fully read.
    #[error("file truncated")]
    FileTruncated,

    /// Format detection could not classify the header.
    #[error("guess failed")]
    GuessFailed,

    /// The underlying reader failed for a reason other than end of stream.
    #[error("i/o error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            LoadError::FileTruncated
        } else {
            LoadError::Io(err)
        }
    }
}

/// Which STL encoding to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Detect the encoding from the first bytes of the stream.
    #[default]
    Guess,
    /// ASCII `solid ... endsolid`.
    Text,
    /// 80-byte header, triangle count, 50-byte records.
    Binary,
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadMode::Guess => write!(f, "guess"),
            LoadMode::Text => write!(f, "text"),
            LoadMode::Binary => write!(f, "binary"),
        }
    }
}

/// What the parser has already seen of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detected {
    /// Text mode requested explicitly; `solid` still has to be read.
    TextUnverified,
    /// `solid` and one whitespace byte consumed. `line_done` is set when that
    /// byte ended the header line.
    Text { line_done: bool },
    /// Binary, with `consumed` header bytes already read.
    Binary { consumed: usize },
}

fn guess<R: BufRead>(reader: &mut StlReader<R>) -> LoadResult<Detected> {
    let mut consumed = reader.skip_whitespace(HEADER_SIZE)?;
    let mut matched = 0;

    while matched < SIGNATURE.len() {
        if consumed == HEADER_SIZE {
            return Err(LoadError::GuessFailed);
        }

        let byte = reader.next_byte()?.ok_or(LoadError::FileTruncated)?;
        consumed += 1;

        if byte != SIGNATURE[matched] {
            return Ok(Detected::Binary { consumed });
        }
        matched += 1;
    }

    // Peeked, not consumed: past the header it is the first triangle count
    // byte of a binary file.
    let delimiter = reader.peek_byte()?.ok_or(LoadError::FileTruncated)?;
    if reader::is_space(delimiter) {
        reader.next_byte()?;
        Ok(Detected::Text {
            line_done: delimiter == b'\n',
        })
    } else {
        Ok(Detected::Binary { consumed })
    }
}

impl Model {
    /// Replace this model's geometry with the contents of an STL stream.
    ///
    /// Normals are recomputed from the vertices (counter-clockwise winding)
    /// unless `use_file_normals` is set. Coincident vertices are merged, the
    /// bounding box is updated and any previous hierarchy is dropped.
    ///
    /// On error the model may hold partial data and must not be relied on.
    pub fn load_stl<R: BufRead>(
        &mut self,
        reader: R,
        use_file_normals: bool,
        mode: LoadMode,
    ) -> LoadResult<()> {
        let mut reader = StlReader::new(reader);

        let detected = match mode {
            LoadMode::Guess => guess(&mut reader)?,
            LoadMode::Text => Detected::TextUnverified,
            LoadMode::Binary => Detected::Binary { consumed: 0 },
        };

        self.clear();

        let soup = match detected {
            Detected::TextUnverified | Detected::Text { .. } => {
                text::parse(&mut reader, use_file_normals, detected)?
            }
            Detected::Binary { consumed } => {
                binary::parse(reader.get_mut(), use_file_normals, consumed)?
            }
        };

        let raw_vertices = soup.len() * 3;
        soup.finish(self);

        debug!(
            "loaded {} faces ({} of {} vertices after welding) from {} stl",
            self.faces.len(),
            self.vertices.len(),
            raw_vertices,
            match detected {
                Detected::Binary { .. } => LoadMode::Binary,
                _ => LoadMode::Text,
            }
        );

        Ok(())
    }

    /// Load a new model from an STL stream, guessing the encoding.
    pub fn from_stl<R: BufRead>(reader: R) -> LoadResult<Self> {
        let mut model = Model::new();
        model.load_stl(reader, false, LoadMode::Guess)?;
        Ok(model)
    }

    /// Serialize the model as binary STL with the stored face normals.
    pub fn write_stl_binary<W: Write>(&self, writer: W) -> io::Result<()> {
        let triangles = self
            .faces
            .iter()
            .map(|face| (face.normal, self.face_vertices(face)));
        binary::write(writer, b"binary STL written by stlrast", self.faces.len(), triangles)
    }
}

/// Write an arbitrary triangle soup as binary STL.
pub(crate) fn write_triangles<W, I>(writer: W, banner: &[u8], count: usize, triangles: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = (Vec3, [Vec3; 3])>,
{
    binary::write(writer, banner, count, triangles)
}
