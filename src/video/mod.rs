//! Resolution-independent coordinate scaling
//!
//! Everything draws in a logical 320x200 (optionally widescreen-extended)
//! coordinate space; this layer maps it onto an arbitrary physical
//! framebuffer. Four monotone lookup tables partition the physical axes
//! among logical coordinates, so every blit translates coordinates by
//! table lookup instead of per-pixel multiplies, and all primitives agree
//! pixel-for-pixel on what a logical rectangle covers physically.

mod blit;
mod patch;

pub use blit::{draw_patch, PatchOpts};
pub use patch::{Patch, PatchError, Post};

use crate::draw::Screen;
use crate::fixed::{Fixed, FRACBITS};

/// Logical base resolution
pub const BASE_WIDTH: usize = 320;
pub const BASE_HEIGHT: usize = 200;

/// Fixed per video mode: physical geometry plus the fixed-point scale
/// factors and their per-output-pixel inverse steps.
#[derive(Debug, Clone)]
pub struct ScaleConfig {
    pub physical_width: usize,
    pub physical_height: usize,
    pub pitch: usize,
    pub logical_width: usize,
    pub logical_height: usize,
    /// Logical columns added on each side by widescreen
    pub wide_delta: i32,
    pub xscale: Fixed,
    pub yscale: Fixed,
    /// Inverse steps: logical distance covered by one physical pixel
    pub xstep: Fixed,
    pub ystep: Fixed,
}

impl ScaleConfig {
    /// Derive a config for a physical mode. With `widescreen` the logical
    /// width grows to match the physical aspect ratio; otherwise the
    /// classic 320 columns are stretched over the full width.
    pub fn new(physical_width: usize, physical_height: usize, widescreen: bool) -> Self {
        let logical_height = BASE_HEIGHT;
        let logical_width = if widescreen {
            let fitted = physical_width * logical_height / physical_height;
            // keep the delta symmetric
            BASE_WIDTH.max(fitted & !1)
        } else {
            BASE_WIDTH
        };
        let wide_delta = ((logical_width - BASE_WIDTH) / 2) as i32;
        let xscale = Fixed::from_int(physical_width as i32).div(Fixed::from_int(logical_width as i32));
        let yscale = Fixed::from_int(physical_height as i32).div(Fixed::from_int(logical_height as i32));
        Self {
            physical_width,
            physical_height,
            pitch: physical_width,
            logical_width,
            logical_height,
            wide_delta,
            xscale,
            yscale,
            xstep: Fixed::from_int(logical_width as i32).div(Fixed::from_int(physical_width as i32)),
            ystep: Fixed::from_int(logical_height as i32).div(Fixed::from_int(physical_height as i32)),
        }
    }
}

/// The scaling layer: a config plus the four lookup tables, rebuilt only
/// on a video-mode change and read-only afterwards.
pub struct Video {
    pub config: ScaleConfig,
    x1: Vec<i32>,
    x2: Vec<i32>,
    y1: Vec<i32>,
    y2: Vec<i32>,
}

fn partition(physical: usize, logical: usize) -> (Vec<i32>, Vec<i32>) {
    let mut first = Vec::with_capacity(logical);
    let mut last = Vec::with_capacity(logical);
    let mut prev = 0i32;
    for i in 0..logical {
        let end = ((i + 1) * physical / logical) as i32;
        first.push(prev);
        last.push(end - 1);
        prev = end;
    }
    (first, last)
}

impl Video {
    pub fn new(config: ScaleConfig) -> Self {
        let (x1, x2) = partition(config.physical_width, config.logical_width);
        let (y1, y2) = partition(config.physical_height, config.logical_height);
        Self { config, x1, x2, y1, y2 }
    }

    /// Allocate a physical screen buffer matching this mode
    pub fn new_screen(&self) -> Screen {
        Screen::with_pitch(
            self.config.physical_width,
            self.config.physical_height,
            self.config.pitch,
        )
    }

    /// First physical column of a logical column. Coordinates outside the
    /// table fall back to floor division, which stays correct for extreme
    /// off-screen values a naive scale multiply would overflow on.
    pub fn scale_x(&self, x: i32) -> i32 {
        if x >= 0 && (x as usize) < self.config.logical_width {
            self.x1[x as usize]
        } else {
            ((x as i64 * self.config.physical_width as i64)
                .div_euclid(self.config.logical_width as i64)) as i32
        }
    }

    /// First physical row of a logical row
    pub fn scale_y(&self, y: i32) -> i32 {
        if y >= 0 && (y as usize) < self.config.logical_height {
            self.y1[y as usize]
        } else {
            ((y as i64 * self.config.physical_height as i64)
                .div_euclid(self.config.logical_height as i64)) as i32
        }
    }

    /// Last physical column of a logical column
    pub fn x_last(&self, x: usize) -> i32 {
        self.x2[x]
    }

    /// Last physical row of a logical row
    pub fn y_last(&self, y: usize) -> i32 {
        self.y2[y]
    }

    /// Fill a logical rectangle with one palette color
    pub fn fill_rect(&self, screen: &mut Screen, x: i32, y: i32, w: i32, h: i32, color: u8) {
        let Some((lx0, ly0, lx1, ly1)) = self.clip(x, y, w, h) else {
            return;
        };
        let px0 = self.x1[lx0];
        let px1 = self.x2[lx1];
        let py0 = self.y1[ly0];
        let py1 = self.y2[ly1];
        // at downscale the whole logical extent can land between two
        // physical pixels
        if px1 < px0 || py1 < py0 {
            return;
        }
        for py in py0..=py1 {
            let row = py as usize * screen.pitch;
            screen.pixels[row + px0 as usize..=row + px1 as usize].fill(color);
        }
    }

    /// Copy a logical rectangle between two physical buffers of this mode.
    /// The destination extent decides the physical width; at non-integer
    /// scales the source may be narrower by a column, and the copy is
    /// clamped rather than resampled.
    pub fn copy_rect(
        &self,
        src: &Screen,
        sx: i32,
        sy: i32,
        dest: &mut Screen,
        dx: i32,
        dy: i32,
        w: i32,
        h: i32,
    ) {
        // joint clip: shrinking one rectangle shifts the other
        let (mut sx, mut sy, mut dx, mut dy, mut w, mut h) = (sx, sy, dx, dy, w, h);
        if sx < 0 {
            w += sx;
            dx -= sx;
            sx = 0;
        }
        if sy < 0 {
            h += sy;
            dy -= sy;
            sy = 0;
        }
        if dx < 0 {
            w += dx;
            sx -= dx;
            dx = 0;
        }
        if dy < 0 {
            h += dy;
            sy -= dy;
            dy = 0;
        }
        let lw = self.config.logical_width as i32;
        let lh = self.config.logical_height as i32;
        w = w.min(lw - sx).min(lw - dx);
        h = h.min(lh - sy).min(lh - dy);
        if w <= 0 || h <= 0 {
            return;
        }

        let pdx0 = self.x1[dx as usize] as usize;
        let pdw = (self.x2[(dx + w - 1) as usize] - self.x1[dx as usize] + 1) as usize;
        let psx0 = self.x1[sx as usize] as usize;
        let psw = (self.x2[(sx + w - 1) as usize] - self.x1[sx as usize] + 1) as usize;
        let width = pdw.min(psw);
        let pdy0 = self.y1[dy as usize];
        let pdy1 = self.y2[(dy + h - 1) as usize];
        let psy0 = self.y1[sy as usize];
        for (i, py) in (pdy0..=pdy1).enumerate() {
            let sp = (psy0 as usize + i) * src.pitch + psx0;
            let dp = py as usize * dest.pitch + pdx0;
            dest.pixels[dp..dp + width].copy_from_slice(&src.pixels[sp..sp + width]);
        }
    }

    /// Scale a logical block of raw palette bytes onto the screen
    pub fn draw_block(&self, screen: &mut Screen, x: i32, y: i32, w: i32, h: i32, block: &[u8]) {
        let Some((lx0, ly0, lx1, ly1)) = self.clip(x, y, w, h) else {
            return;
        };
        for ly in ly0..=ly1 {
            for lx in lx0..=lx1 {
                let pix = block[(ly as i32 - y) as usize * w as usize + (lx as i32 - x) as usize];
                let (px0, px1) = (self.x1[lx], self.x2[lx]);
                let (py0, py1) = (self.y1[ly], self.y2[ly]);
                if px1 < px0 || py1 < py0 {
                    continue;
                }
                for py in py0..=py1 {
                    let row = py as usize * screen.pitch;
                    screen.pixels[row + px0 as usize..=row + px1 as usize].fill(pix);
                }
            }
        }
    }

    /// Read a logical block back out of the screen (one sample per cell)
    pub fn read_block(&self, screen: &Screen, x: i32, y: i32, w: i32, h: i32) -> Vec<u8> {
        if w <= 0 || h <= 0 {
            return Vec::new();
        }
        let mut out = vec![0u8; (w * h) as usize];
        let Some((lx0, ly0, lx1, ly1)) = self.clip(x, y, w, h) else {
            return out;
        };
        for ly in ly0..=ly1 {
            for lx in lx0..=lx1 {
                let px = self.x1[lx] as usize;
                let py = self.y1[ly] as usize;
                out[(ly as i32 - y) as usize * w as usize + (lx as i32 - x) as usize] =
                    screen.pixels[py * screen.pitch + px];
            }
        }
        out
    }

    /// Tile a 64x64 flat over the whole logical area, widescreen included
    pub fn tile_background(&self, screen: &mut Screen, flat: &[u8]) {
        for ly in 0..self.config.logical_height {
            for lx in 0..self.config.logical_width {
                let pix = flat[(ly & 63) * 64 + (lx & 63)];
                let (px0, px1) = (self.x1[lx], self.x2[lx]);
                let (py0, py1) = (self.y1[ly], self.y2[ly]);
                if px1 < px0 || py1 < py0 {
                    continue;
                }
                for py in py0..=py1 {
                    let row = py as usize * screen.pitch;
                    screen.pixels[row + px0 as usize..=row + px1 as usize].fill(pix);
                }
            }
        }
    }

    /// Clip a logical rectangle to the logical screen; None when empty
    fn clip(&self, x: i32, y: i32, w: i32, h: i32) -> Option<(usize, usize, usize, usize)> {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.config.logical_width as i32) - 1;
        let y1 = (y + h).min(self.config.logical_height as i32) - 1;
        if x0 > x1 || y0 > y1 {
            None
        } else {
            Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
        }
    }
}

/// Integer-scale block size for resolution-independent effects (fuzz)
pub fn effect_block(config: &ScaleConfig) -> (usize, usize) {
    let bw = ((config.xscale.0 + (1 << FRACBITS) - 1) >> FRACBITS).max(1) as usize;
    let bh = ((config.yscale.0 + (1 << FRACBITS) - 1) >> FRACBITS).max(1) as usize;
    (bw, bh)
}
