//! Column-encoded patch decoding
//!
//! Patches (sprites, menu graphics) arrive as a byte stream: a small
//! header, one offset per column, and per-column runs ("posts") of
//! opaque pixels. Transparent gaps are simply not encoded.

/// One opaque run inside a column
#[derive(Debug, Clone)]
pub struct Post {
    /// Rows from the top of the patch to the first pixel of the run
    pub top_delta: u8,
    pub pixels: Vec<u8>,
}

/// A decoded transparent bitmap
#[derive(Debug, Clone)]
pub struct Patch {
    pub width: i32,
    pub height: i32,
    /// Drawing origin adjustment (sprites hang from their hotspot)
    pub left_offset: i32,
    pub top_offset: i32,
    pub columns: Vec<Vec<Post>>,
}

/// Error type for patch decoding
#[derive(Debug)]
pub enum PatchError {
    Truncated,
    BadColumnOffset { column: usize, offset: usize },
}

impl std::fmt::Display for PatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchError::Truncated => write!(f, "patch data truncated"),
            PatchError::BadColumnOffset { column, offset } => {
                write!(f, "column {} has offset {} past the end of the data", column, offset)
            }
        }
    }
}

const END_OF_COLUMN: u8 = 0xff;

fn read_i16(bytes: &[u8], at: usize) -> Result<i16, PatchError> {
    if at + 2 > bytes.len() {
        return Err(PatchError::Truncated);
    }
    Ok(i16::from_le_bytes([bytes[at], bytes[at + 1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, PatchError> {
    if at + 4 > bytes.len() {
        return Err(PatchError::Truncated);
    }
    Ok(u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]))
}

impl Patch {
    /// Decode the on-disk format: header of four i16 fields (width,
    /// height, left offset, top offset), one u32 data offset per column,
    /// then per column a list of (top_delta, length, pad, pixels.., pad)
    /// posts terminated by 0xff.
    pub fn parse(bytes: &[u8]) -> Result<Self, PatchError> {
        let width = read_i16(bytes, 0)? as i32;
        let height = read_i16(bytes, 2)? as i32;
        let left_offset = read_i16(bytes, 4)? as i32;
        let top_offset = read_i16(bytes, 6)? as i32;
        if width <= 0 || height <= 0 {
            return Err(PatchError::Truncated);
        }

        let mut columns = Vec::with_capacity(width as usize);
        for col in 0..width as usize {
            let offset = read_u32(bytes, 8 + col * 4)? as usize;
            if offset >= bytes.len() {
                return Err(PatchError::BadColumnOffset { column: col, offset });
            }
            let mut posts = Vec::new();
            let mut at = offset;
            loop {
                let top_delta = *bytes.get(at).ok_or(PatchError::Truncated)?;
                if top_delta == END_OF_COLUMN {
                    break;
                }
                let length = *bytes.get(at + 1).ok_or(PatchError::Truncated)? as usize;
                // one pad byte on each side of the pixel run
                let start = at + 3;
                if start + length + 1 > bytes.len() {
                    return Err(PatchError::Truncated);
                }
                posts.push(Post {
                    top_delta,
                    pixels: bytes[start..start + length].to_vec(),
                });
                at = start + length + 1;
            }
            columns.push(posts);
        }

        Ok(Self {
            width,
            height,
            left_offset,
            top_offset,
            columns,
        })
    }

    /// Build a patch directly from columns (procedural graphics, tests)
    pub fn from_columns(width: i32, height: i32, columns: Vec<Vec<Post>>) -> Self {
        Self {
            width,
            height,
            left_offset: 0,
            top_offset: 0,
            columns,
        }
    }

    /// A fully opaque patch from a row-major pixel block
    pub fn from_block(width: i32, height: i32, pixels: &[u8]) -> Self {
        let columns = (0..width as usize)
            .map(|x| {
                vec![Post {
                    top_delta: 0,
                    pixels: (0..height as usize)
                        .map(|y| pixels[y * width as usize + x])
                        .collect(),
                }]
            })
            .collect();
        Self::from_columns(width, height, columns)
    }
}
