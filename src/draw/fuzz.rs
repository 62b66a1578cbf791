//! Fuzz ("spectre") column drawers
//!
//! Instead of sampling a texture, fuzz re-reads the framebuffer one row
//! above or below the destination pixel through a fixed dark colormap,
//! picking the direction from a 50-entry offset table. The table cursor
//! advances once per game tic, not per pixel, so the shimmer rate is
//! tied to game time rather than to frame rate. Draw order is
//! single-threaded and deterministic, which keeps recorded gameplay
//! reproducible bit for bit.

use super::{ColumnContext, Screen};

/// Per-pixel scanline offsets, always exactly one row up or down.
/// Same sign sequence the original shipped with.
pub const FUZZ_TABLE: [i32; 50] = [
    1, -1, 1, -1, 1, 1, -1,
    1, 1, -1, 1, 1, 1, -1,
    1, 1, 1, -1, -1, -1, -1,
    1, -1, -1, 1, 1, 1, 1, -1,
    1, -1, 1, 1, -1, -1, 1,
    1, -1, -1, -1, -1, 1, 1,
    1, 1, -1, 1, 1, -1, 1,
];

/// Shared fuzz cursor, advanced once per tic.
pub struct FuzzState {
    pos: usize,
}

impl FuzzState {
    pub fn new() -> Self {
        Self { pos: 0 }
    }

    /// Advance the cursor; call exactly once per game tic.
    pub fn tic(&mut self) {
        self.pos = (self.pos + 1) % FUZZ_TABLE.len();
    }

    pub fn pos(&self) -> usize {
        self.pos
    }
}

impl Default for FuzzState {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn start_index(state: &FuzzState, column: usize) -> usize {
    (state.pos + column) % FUZZ_TABLE.len()
}

/// Original fuzz: one framebuffer read per destination pixel.
///
/// The top and bottom rows clamp the offset inward by one row so the
/// sampler never reads outside the column's own [y1, y2] range.
pub fn draw_fuzz_column(ctx: &ColumnContext, screen: &mut Screen, state: &FuzzState) {
    let count = ctx.y2 - ctx.y1;
    if count < 0 {
        return;
    }
    debug_assert!(ctx.x >= 0 && (ctx.x as usize) < screen.width);
    debug_assert!(ctx.y1 >= 0 && (ctx.y2 as usize) < screen.height);

    // the fixed dark remap (colormap index 6 in the stock tables)
    let dark = ctx.colormap[0];
    let mut idx = start_index(state, ctx.x as usize);

    for y in ctx.y1..=ctx.y2 {
        let mut off = FUZZ_TABLE[idx];
        if y == ctx.y1 && off < 0 {
            off = 1;
        }
        if y == ctx.y2 && off > 0 {
            off = -1;
        }
        if ctx.y1 == ctx.y2 {
            off = 0;
        }
        let src = screen.pixels[screen.index(ctx.x, y + off)];
        let dest = screen.index(ctx.x, y);
        screen.pixels[dest] = dark[src as usize];
        idx += 1;
        if idx == FUZZ_TABLE.len() {
            idx = 0;
        }
    }
}

/// Blocky fuzz for scaled-up output: one logical sample is replicated
/// over a `block.0` x `block.1` group of physical pixels, so the grain
/// size matches the original resolution instead of shrinking with it.
pub fn draw_fuzz_column_blocky(
    ctx: &ColumnContext,
    screen: &mut Screen,
    state: &FuzzState,
    block: (usize, usize),
) {
    let count = ctx.y2 - ctx.y1;
    if count < 0 {
        return;
    }
    debug_assert!(ctx.x >= 0 && (ctx.x as usize) < screen.width);
    debug_assert!(ctx.y1 >= 0 && (ctx.y2 as usize) < screen.height);

    let (bw, bh) = (block.0.max(1), block.1.max(1));
    let dark = ctx.colormap[0];
    let mut idx = start_index(state, ctx.x as usize / bw);

    let mut y = ctx.y1;
    while y <= ctx.y2 {
        // offset by a whole logical scanline, clamped into the column
        let mut src_y = y + FUZZ_TABLE[idx] * bh as i32;
        if src_y < ctx.y1 {
            src_y = (y + bh as i32).min(ctx.y2);
        } else if src_y > ctx.y2 {
            src_y = (y - bh as i32).max(ctx.y1);
        }
        let pix = dark[screen.pixels[screen.index(ctx.x, src_y)] as usize];

        let y_end = (y + bh as i32 - 1).min(ctx.y2);
        let x_end = ((ctx.x as usize + bw).min(screen.width)) as i32;
        for yy in y..=y_end {
            for xx in ctx.x..x_end {
                let dest = screen.index(xx, yy);
                screen.pixels[dest] = pix;
            }
        }
        idx += 1;
        if idx == FUZZ_TABLE.len() {
            idx = 0;
        }
        y += bh as i32;
    }
}
