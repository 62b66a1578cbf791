//! Column/span rasterization primitives
//!
//! Stateless between calls: every draw consumes one caller-populated
//! context and produces palette-index pixel writes into a [`Screen`].
//! The only persistent state is the fuzz cursor, advanced once per game
//! tic so the spectre shimmer animates at a fixed rate regardless of
//! frame rate.

mod column;
mod fuzz;
mod span;
pub mod tables;

pub use column::{draw_column, draw_sky_column, draw_translated_column, draw_translucent_column};
pub use fuzz::{draw_fuzz_column, draw_fuzz_column_blocky, FuzzState, FUZZ_TABLE};
pub use span::draw_span;

use crate::fixed::Fixed;

/// Destination pixel buffer: raw palette indices, row-major with an
/// explicit pitch (the physical buffer may be wider than the image).
pub struct Screen {
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub pitch: usize,
}

impl Screen {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height],
            width,
            height,
            pitch: width,
        }
    }

    pub fn with_pitch(width: usize, height: usize, pitch: usize) -> Self {
        Self {
            pixels: vec![0; pitch * height],
            width,
            height,
            pitch,
        }
    }

    #[inline]
    pub fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.pitch + x as usize
    }

    pub fn clear(&mut self, color: u8) {
        self.pixels.fill(color);
    }
}

/// One vertical draw: an inclusive y range at column x, a 16.16 texture
/// coordinate walked by `step`, and the lookup tables the variant needs.
/// Lives only for the duration of a single call.
pub struct ColumnContext<'a> {
    pub x: i32,
    pub y1: i32,
    pub y2: i32,
    pub frac: Fixed,
    pub step: Fixed,
    /// Source texture height in texels; need not be a power of two
    pub tex_height: i32,
    /// One texture column of palette indices, `tex_height` long
    pub source: &'a [u8],
    /// [normal, full-bright] light remap tables, 256 entries each
    pub colormap: [&'a [u8]; 2],
    /// Per-source-pixel selector into `colormap` (0 or 1)
    pub brightmap: &'a [u8],
    /// 256-entry palette remap applied before the colormap (sprite recolor)
    pub translation: Option<&'a [u8]>,
    /// 256x256 blend table indexed by (existing << 8) | incoming
    pub blend: Option<&'a [u8]>,
}

/// One horizontal floor/ceiling draw at row y, tiling a 64x64 flat.
pub struct SpanContext<'a> {
    pub y: i32,
    pub x1: i32,
    pub x2: i32,
    pub xfrac: Fixed,
    pub yfrac: Fixed,
    pub xstep: Fixed,
    pub ystep: Fixed,
    /// 64x64 flat, row-major palette indices
    pub source: &'a [u8],
    pub colormap: [&'a [u8]; 2],
    pub brightmap: &'a [u8],
}

/// Closed set of column draw variants, replacing the classic
/// function-pointer `colfunc` dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Opaque,
    Translucent,
    Sky,
    Fuzz,
    Translated,
    TranslatedTranslucent,
}

/// Rasterizer service object: fuzz cursor plus the few scalar knobs that
/// are not part of a per-call context.
pub struct Raster {
    pub fuzz: FuzzState,
    /// Flat color the sky fades into at the horizon
    pub sky_color: u8,
    /// Replicate fuzz samples over blocks of this size at scaled
    /// resolutions so the grain stays resolution-independent
    pub fuzz_block: (usize, usize),
}

impl Raster {
    pub fn new() -> Self {
        Self {
            fuzz: FuzzState::new(),
            sky_color: 0,
            fuzz_block: (1, 1),
        }
    }

    /// Dispatch one column draw to the selected variant.
    pub fn draw_column_as(&mut self, kind: ColumnKind, ctx: &ColumnContext, screen: &mut Screen) {
        match kind {
            ColumnKind::Opaque => draw_column(ctx, screen),
            ColumnKind::Translucent => draw_translucent_column(ctx, screen),
            ColumnKind::Sky => draw_sky_column(ctx, screen, self.sky_color),
            ColumnKind::Fuzz => {
                if self.fuzz_block != (1, 1) {
                    fuzz::draw_fuzz_column_blocky(ctx, screen, &self.fuzz, self.fuzz_block);
                } else {
                    fuzz::draw_fuzz_column(ctx, screen, &self.fuzz);
                }
            }
            ColumnKind::Translated => draw_translated_column(ctx, screen, false),
            ColumnKind::TranslatedTranslucent => draw_translated_column(ctx, screen, true),
        }
    }
}

impl Default for Raster {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
pub(crate) fn shade(ctx: &ColumnContext, pix: u8) -> u8 {
    ctx.colormap[ctx.brightmap[pix as usize] as usize][pix as usize]
}
