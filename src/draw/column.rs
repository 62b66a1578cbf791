//! Vertical texture samplers
//!
//! All variants walk a 16.16 texture coordinate down one screen column.
//! Power-of-two texture heights tile by bit-masking; any other height
//! wraps by conditional add/subtract of the shifted height, which keeps
//! seams aligned where masking would produce the Tutti-Frutti artifact.

use super::{shade, ColumnContext, Screen};
use crate::fixed::FRACBITS;

#[inline]
fn wrap(frac: &mut i32, heightmask: i32) {
    if *frac >= heightmask {
        *frac -= heightmask;
    } else if *frac < 0 {
        *frac += heightmask;
    }
}

#[inline]
fn check_range(ctx: &ColumnContext, screen: &Screen) {
    debug_assert!(ctx.x >= 0 && (ctx.x as usize) < screen.width, "column x out of range");
    debug_assert!(
        ctx.y1 >= 0 && (ctx.y2 as usize) < screen.height,
        "column y range out of range"
    );
}

/// Opaque nearest-neighbor column draw.
pub fn draw_column(ctx: &ColumnContext, screen: &mut Screen) {
    let count = ctx.y2 - ctx.y1;
    if count < 0 {
        return;
    }
    check_range(ctx, screen);

    let pitch = screen.pitch;
    let mut dest = screen.index(ctx.x, ctx.y1);
    let mut frac = ctx.frac.0;
    let step = ctx.step.0;
    let heightmask = ctx.tex_height - 1;

    if ctx.tex_height & heightmask != 0 {
        // non-power-of-two height
        let heightmask = (heightmask + 1) << FRACBITS;
        while frac < 0 {
            frac += heightmask;
        }
        while frac >= heightmask {
            frac -= heightmask;
        }
        let mut n = count + 1;
        while n > 0 {
            let pix = ctx.source[(frac >> FRACBITS) as usize];
            screen.pixels[dest] = shade(ctx, pix);
            dest += pitch;
            frac += step;
            wrap(&mut frac, heightmask);
            n -= 1;
        }
    } else {
        // power-of-two fast path, unrolled x2
        let mut n = count + 1;
        while n >= 2 {
            let pix = ctx.source[((frac >> FRACBITS) & heightmask) as usize];
            screen.pixels[dest] = shade(ctx, pix);
            dest += pitch;
            frac += step;
            let pix = ctx.source[((frac >> FRACBITS) & heightmask) as usize];
            screen.pixels[dest] = shade(ctx, pix);
            dest += pitch;
            frac += step;
            n -= 2;
        }
        if n == 1 {
            let pix = ctx.source[((frac >> FRACBITS) & heightmask) as usize];
            screen.pixels[dest] = shade(ctx, pix);
        }
    }
}

/// Translucent column: the destination pixel and the incoming pixel index
/// a precomputed 256x256 blend table instead of arithmetic mixing.
/// Without a blend table this degenerates to an opaque draw.
pub fn draw_translucent_column(ctx: &ColumnContext, screen: &mut Screen) {
    let Some(blend) = ctx.blend else {
        return draw_column(ctx, screen);
    };
    let count = ctx.y2 - ctx.y1;
    if count < 0 {
        return;
    }
    check_range(ctx, screen);

    let pitch = screen.pitch;
    let mut dest = screen.index(ctx.x, ctx.y1);
    let mut frac = ctx.frac.0;
    let step = ctx.step.0;
    let heightmask = ctx.tex_height - 1;

    if ctx.tex_height & heightmask != 0 {
        let heightmask = (heightmask + 1) << FRACBITS;
        while frac < 0 {
            frac += heightmask;
        }
        while frac >= heightmask {
            frac -= heightmask;
        }
        let mut n = count + 1;
        while n > 0 {
            let pix = shade(ctx, ctx.source[(frac >> FRACBITS) as usize]);
            let old = screen.pixels[dest];
            screen.pixels[dest] = blend[((old as usize) << 8) | pix as usize];
            dest += pitch;
            frac += step;
            wrap(&mut frac, heightmask);
            n -= 1;
        }
    } else {
        let mut n = count + 1;
        while n >= 2 {
            let pix = shade(ctx, ctx.source[((frac >> FRACBITS) & heightmask) as usize]);
            let old = screen.pixels[dest];
            screen.pixels[dest] = blend[((old as usize) << 8) | pix as usize];
            dest += pitch;
            frac += step;
            let pix = shade(ctx, ctx.source[((frac >> FRACBITS) & heightmask) as usize]);
            let old = screen.pixels[dest];
            screen.pixels[dest] = blend[((old as usize) << 8) | pix as usize];
            dest += pitch;
            frac += step;
            n -= 2;
        }
        if n == 1 {
            let pix = shade(ctx, ctx.source[((frac >> FRACBITS) & heightmask) as usize]);
            let old = screen.pixels[dest];
            screen.pixels[dest] = blend[((old as usize) << 8) | pix as usize];
        }
    }
}

/// Sky column: ordinary sampling except that the bottom one or two texture
/// rows are pulled toward `sky_color` through one or two nested blend-table
/// lookups, faking a soft horizon instead of a hard texture edge.
pub fn draw_sky_column(ctx: &ColumnContext, screen: &mut Screen, sky_color: u8) {
    let count = ctx.y2 - ctx.y1;
    if count < 0 {
        return;
    }
    check_range(ctx, screen);

    let pitch = screen.pitch;
    let mut dest = screen.index(ctx.x, ctx.y1);
    let mut frac = ctx.frac.0;
    let step = ctx.step.0;
    let heightmask = (ctx.tex_height) << FRACBITS;
    let sky = (sky_color as usize) << 8;

    while frac < 0 {
        frac += heightmask;
    }
    while frac >= heightmask {
        frac -= heightmask;
    }
    let mut n = count + 1;
    while n > 0 {
        let row = frac >> FRACBITS;
        let pix = shade(ctx, ctx.source[row as usize]);
        let out = match ctx.blend {
            Some(blend) if row == ctx.tex_height - 1 => {
                blend[sky | blend[sky | pix as usize] as usize]
            }
            Some(blend) if row == ctx.tex_height - 2 => blend[sky | pix as usize],
            _ => pix,
        };
        screen.pixels[dest] = out;
        dest += pitch;
        frac += step;
        wrap(&mut frac, heightmask);
        n -= 1;
    }
}

/// Translated column: every sampled palette index passes through a
/// 256-entry remap table before the colormap (sprite recoloring). With
/// `translucent` set, the remapped pixel additionally blends against the
/// destination through the context's blend table.
pub fn draw_translated_column(ctx: &ColumnContext, screen: &mut Screen, translucent: bool) {
    let Some(translation) = ctx.translation else {
        return if translucent {
            draw_translucent_column(ctx, screen)
        } else {
            draw_column(ctx, screen)
        };
    };
    let count = ctx.y2 - ctx.y1;
    if count < 0 {
        return;
    }
    check_range(ctx, screen);

    let pitch = screen.pitch;
    let mut dest = screen.index(ctx.x, ctx.y1);
    let mut frac = ctx.frac.0;
    let step = ctx.step.0;
    let heightmask = (ctx.tex_height) << FRACBITS;
    let blend = if translucent { ctx.blend } else { None };

    while frac < 0 {
        frac += heightmask;
    }
    while frac >= heightmask {
        frac -= heightmask;
    }
    let mut n = count + 1;
    while n > 0 {
        let raw = ctx.source[(frac >> FRACBITS) as usize];
        let pix = shade(ctx, translation[raw as usize]);
        screen.pixels[dest] = match blend {
            Some(blend) => blend[((screen.pixels[dest] as usize) << 8) | pix as usize],
            None => pix,
        };
        dest += pitch;
        frac += step;
        wrap(&mut frac, heightmask);
        n -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{Fixed, FRACUNIT};

    fn identity_map() -> Vec<u8> {
        (0..=255).collect()
    }

    fn ctx<'a>(
        source: &'a [u8],
        cmap: &'a [u8],
        bmap: &'a [u8],
        y1: i32,
        y2: i32,
        step: Fixed,
    ) -> ColumnContext<'a> {
        ColumnContext {
            x: 0,
            y1,
            y2,
            frac: Fixed::ZERO,
            step,
            tex_height: source.len() as i32,
            source,
            colormap: [cmap, cmap],
            brightmap: bmap,
            translation: None,
            blend: None,
        }
    }

    #[test]
    fn test_draw_column_tiles_pow2() {
        let source = [10u8, 20, 30, 40];
        let cmap = identity_map();
        let bmap = [0u8; 256];
        let mut screen = Screen::new(1, 8);
        let c = ctx(&source, &cmap, &bmap, 0, 7, Fixed::ONE);
        draw_column(&c, &mut screen);
        assert_eq!(screen.pixels, vec![10, 20, 30, 40, 10, 20, 30, 40]);
    }

    #[test]
    fn test_draw_column_zero_length_is_noop() {
        let source = [1u8, 2, 3, 4];
        let cmap = identity_map();
        let bmap = [0u8; 256];
        let mut screen = Screen::new(1, 4);
        screen.clear(99);
        let c = ctx(&source, &cmap, &bmap, 3, 2, Fixed::ONE);
        draw_column(&c, &mut screen);
        assert!(screen.pixels.iter().all(|&p| p == 99));
    }

    #[test]
    fn test_non_pow2_height_never_reads_out_of_bounds() {
        // height 3 with a coarse step and a negative starting fraction;
        // indexing past [0, 3) would panic on the slice access
        let source = [7u8, 8, 9];
        let cmap = identity_map();
        let bmap = [0u8; 256];
        let mut screen = Screen::new(1, 200);
        let mut c = ctx(&source, &cmap, &bmap, 0, 199, Fixed(FRACUNIT * 2 + 1234));
        c.frac = Fixed(-3 * FRACUNIT - 77);
        draw_column(&c, &mut screen);
        assert!(screen.pixels.iter().all(|&p| p == 7 || p == 8 || p == 9));
    }

    #[test]
    fn test_colormap_applied() {
        let source = [5u8; 2];
        let mut cmap = identity_map();
        cmap[5] = 77;
        let bmap = [0u8; 256];
        let mut screen = Screen::new(1, 2);
        let c = ctx(&source, &cmap, &bmap, 0, 1, Fixed::ONE);
        draw_column(&c, &mut screen);
        assert_eq!(screen.pixels, vec![77, 77]);
    }

    #[test]
    fn test_brightmap_selects_second_colormap() {
        let source = [5u8, 6];
        let dark: Vec<u8> = (0..=255u8).map(|i| i.wrapping_add(1)).collect();
        let bright = identity_map();
        let mut bmap = [0u8; 256];
        bmap[6] = 1; // pixel 6 is full-bright
        let mut screen = Screen::new(1, 2);
        let mut c = ctx(&source, &dark, &bmap, 0, 1, Fixed::ONE);
        c.colormap = [&dark, &bright];
        draw_column(&c, &mut screen);
        assert_eq!(screen.pixels, vec![6, 6]); // 5 darkened to 6, 6 kept bright
    }

    #[test]
    fn test_translucent_uses_blend_table() {
        let source = [3u8; 4];
        let cmap = identity_map();
        let bmap = [0u8; 256];
        let mut blend = vec![0u8; 256 * 256];
        blend[(9 << 8) | 3] = 111;
        let mut screen = Screen::new(1, 4);
        screen.clear(9);
        let mut c = ctx(&source, &cmap, &bmap, 0, 3, Fixed::ONE);
        c.blend = Some(&blend);
        draw_translucent_column(&c, &mut screen);
        assert!(screen.pixels.iter().all(|&p| p == 111));
    }

    #[test]
    fn test_sky_horizon_rows_fade() {
        let source = [1u8, 2, 3, 4]; // rows 2 and 3 are the horizon band
        let cmap = identity_map();
        let bmap = [0u8; 256];
        let sky = 200u8;
        let mut blend = vec![0u8; 256 * 256];
        blend[((sky as usize) << 8) | 3] = 50; // one lookup for row h-2
        blend[((sky as usize) << 8) | 4] = 60;
        blend[((sky as usize) << 8) | 60] = 61; // nested lookup for row h-1
        let mut screen = Screen::new(1, 4);
        let mut c = ctx(&source, &cmap, &bmap, 0, 3, Fixed::ONE);
        c.blend = Some(&blend);
        draw_sky_column(&c, &mut screen, sky);
        assert_eq!(screen.pixels, vec![1, 2, 50, 61]);
    }

    #[test]
    fn test_translated_column_remaps() {
        let source = [5u8; 3];
        let cmap = identity_map();
        let bmap = [0u8; 256];
        let mut translation = identity_map();
        translation[5] = 42;
        let mut screen = Screen::new(1, 3);
        let mut c = ctx(&source, &cmap, &bmap, 0, 2, Fixed::ONE);
        c.translation = Some(&translation);
        draw_translated_column(&c, &mut screen, false);
        assert_eq!(screen.pixels, vec![42, 42, 42]);
    }
}
