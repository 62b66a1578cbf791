//! Horizontal flat sampler
//!
//! Floors and ceilings are always 64x64 flats, so tiling is a plain
//! bitmask on both axes (no wrap correction needed, unlike columns).

use super::{Screen, SpanContext};
use crate::fixed::FRACBITS;

#[inline]
fn spot(xfrac: i32, yfrac: i32) -> usize {
    (((yfrac >> (FRACBITS - 6)) & (63 * 64)) + ((xfrac >> FRACBITS) & 63)) as usize
}

#[inline]
fn shade(ctx: &SpanContext, pix: u8) -> u8 {
    ctx.colormap[ctx.brightmap[pix as usize] as usize][pix as usize]
}

/// Draw one horizontal span of a 64x64 flat, unrolled x4.
pub fn draw_span(ctx: &SpanContext, screen: &mut Screen) {
    let count = ctx.x2 - ctx.x1;
    if count < 0 {
        return;
    }
    debug_assert!(ctx.x1 >= 0 && (ctx.x2 as usize) < screen.width, "span x range out of range");
    debug_assert!(ctx.y >= 0 && (ctx.y as usize) < screen.height, "span y out of range");

    let mut dest = screen.index(ctx.x1, ctx.y);
    let mut xfrac = ctx.xfrac.0;
    let mut yfrac = ctx.yfrac.0;
    let xstep = ctx.xstep.0;
    let ystep = ctx.ystep.0;

    let mut n = count + 1;
    while n >= 4 {
        for _ in 0..4 {
            let pix = ctx.source[spot(xfrac, yfrac)];
            screen.pixels[dest] = shade(ctx, pix);
            dest += 1;
            xfrac = xfrac.wrapping_add(xstep);
            yfrac = yfrac.wrapping_add(ystep);
        }
        n -= 4;
    }
    while n > 0 {
        let pix = ctx.source[spot(xfrac, yfrac)];
        screen.pixels[dest] = shade(ctx, pix);
        dest += 1;
        xfrac = xfrac.wrapping_add(xstep);
        yfrac = yfrac.wrapping_add(ystep);
        n -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{Fixed, FRACUNIT};

    fn flat() -> Vec<u8> {
        // value encodes its own texel position
        (0..64 * 64).map(|i| (i % 251) as u8).collect()
    }

    fn span_ctx<'a>(
        source: &'a [u8],
        cmap: &'a [u8],
        bmap: &'a [u8],
        x1: i32,
        x2: i32,
    ) -> SpanContext<'a> {
        SpanContext {
            y: 0,
            x1,
            x2,
            xfrac: Fixed::ZERO,
            yfrac: Fixed::ZERO,
            xstep: Fixed::ONE,
            ystep: Fixed::ZERO,
            source,
            colormap: [cmap, cmap],
            brightmap: bmap,
        }
    }

    #[test]
    fn test_span_walks_one_texel_per_pixel() {
        let source = flat();
        let cmap: Vec<u8> = (0..=255).collect();
        let bmap = [0u8; 256];
        let mut screen = Screen::new(8, 1);
        let ctx = span_ctx(&source, &cmap, &bmap, 0, 7);
        draw_span(&ctx, &mut screen);
        for x in 0..8 {
            assert_eq!(screen.pixels[x], source[x]);
        }
    }

    #[test]
    fn test_span_tiles_at_64() {
        let source = flat();
        let cmap: Vec<u8> = (0..=255).collect();
        let bmap = [0u8; 256];
        let mut screen = Screen::new(4, 1);
        let mut ctx = span_ctx(&source, &cmap, &bmap, 0, 3);
        ctx.xfrac = Fixed::from_int(63); // 63, 64->0, 65->1, 66->2
        draw_span(&ctx, &mut screen);
        assert_eq!(screen.pixels[0], source[63]);
        assert_eq!(screen.pixels[1], source[0]);
        assert_eq!(screen.pixels[2], source[1]);
    }

    #[test]
    fn test_span_negative_frac_wraps() {
        let source = flat();
        let cmap: Vec<u8> = (0..=255).collect();
        let bmap = [0u8; 256];
        let mut screen = Screen::new(1, 1);
        let mut ctx = span_ctx(&source, &cmap, &bmap, 0, 0);
        ctx.xfrac = Fixed(-FRACUNIT); // -1 tiles to texel 63
        ctx.yfrac = Fixed(-FRACUNIT);
        draw_span(&ctx, &mut screen);
        assert_eq!(screen.pixels[0], source[63 * 64 + 63]);
    }

    #[test]
    fn test_span_zero_length_is_noop() {
        let source = flat();
        let cmap: Vec<u8> = (0..=255).collect();
        let bmap = [0u8; 256];
        let mut screen = Screen::new(4, 1);
        screen.clear(77);
        let ctx = span_ctx(&source, &cmap, &bmap, 2, 1);
        draw_span(&ctx, &mut screen);
        assert!(screen.pixels.iter().all(|&p| p == 77));
    }

    #[test]
    fn test_span_vertical_step() {
        let source = flat();
        let cmap: Vec<u8> = (0..=255).collect();
        let bmap = [0u8; 256];
        let mut screen = Screen::new(2, 1);
        let mut ctx = span_ctx(&source, &cmap, &bmap, 0, 1);
        ctx.xstep = Fixed::ZERO;
        ctx.ystep = Fixed::ONE;
        draw_span(&ctx, &mut screen);
        assert_eq!(screen.pixels[0], source[0]);
        assert_eq!(screen.pixels[1], source[64]);
    }
}
