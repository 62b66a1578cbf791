//! Scaled patch drawing
//!
//! Patches are drawn at logical coordinates and stretched through the
//! scale tables: the destination is walked physical pixel by physical
//! pixel while a fixed-point cursor steps through the source, so patch
//! edges land on exactly the same physical columns as rect fills.

use super::{Patch, Video};
use crate::draw::Screen;
use crate::fixed::FRACBITS;

/// Optional transforms for a patch draw
#[derive(Default)]
pub struct PatchOpts<'a> {
    /// Mirror horizontally around the patch center
    pub flip: bool,
    /// Palette remap applied to every pixel
    pub translation: Option<&'a [u8]>,
    /// Second remap, applied before `translation`
    pub translation2: Option<&'a [u8]>,
    /// 256x256 blend table against the destination
    pub blend: Option<&'a [u8]>,
}

/// Draw a column-encoded patch at a logical position.
///
/// Columns whose source x falls outside the patch after flip and offset
/// adjustment are skipped, and both screen edges clip. Far off-screen
/// positions go through the floor-division path in [`Video::scale_x`],
/// which a naive fixed-point multiply would overflow on.
pub fn draw_patch(video: &Video, screen: &mut Screen, x: i32, y: i32, patch: &Patch, opts: &PatchOpts) {
    let x = x - patch.left_offset;
    let y = y - patch.top_offset;
    let pw = patch.width;
    let px_origin = video.scale_x(x);
    let px_end = video.scale_x(x + pw);
    let xstep = video.config.xstep.0 as i64;
    let ystep = video.config.ystep.0 as i64;
    let phys_w = video.config.physical_width as i32;
    let phys_h = video.config.physical_height as i32;

    for px in px_origin.max(0)..px_end.min(phys_w) {
        let mut srccol = (((px - px_origin) as i64 * xstep) >> FRACBITS) as i32;
        if opts.flip {
            srccol = pw - 1 - srccol;
        }
        if srccol < 0 || srccol >= pw {
            continue;
        }
        for post in &patch.columns[srccol as usize] {
            let len = post.pixels.len() as i32;
            if len == 0 {
                continue;
            }
            let top = y + post.top_delta as i32;
            let py_top = video.scale_y(top);
            let py_end = video.scale_y(top + len);
            let mut frac: i64 = if py_top < 0 { (-py_top) as i64 * ystep } else { 0 };
            for py in py_top.max(0)..py_end.min(phys_h) {
                let srow = ((frac >> FRACBITS) as i32).clamp(0, len - 1);
                let mut pix = post.pixels[srow as usize];
                if let Some(t2) = opts.translation2 {
                    pix = t2[pix as usize];
                }
                if let Some(t) = opts.translation {
                    pix = t[pix as usize];
                }
                let di = py as usize * screen.pitch + px as usize;
                screen.pixels[di] = match opts.blend {
                    Some(blend) => blend[((screen.pixels[di] as usize) << 8) | pix as usize],
                    None => pix,
                };
                frac += ystep;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{Post, ScaleConfig};

    fn video_2x() -> Video {
        Video::new(ScaleConfig::new(640, 400, false))
    }

    fn sample_patch() -> Patch {
        Patch::from_block(2, 2, &[1, 2, 3, 4])
    }

    #[test]
    fn test_patch_scales_to_physical_blocks() {
        let v = video_2x();
        let mut screen = v.new_screen();
        draw_patch(&v, &mut screen, 10, 10, &sample_patch(), &PatchOpts::default());
        let expect = [[1, 1, 2, 2], [1, 1, 2, 2], [3, 3, 4, 4], [3, 3, 4, 4]];
        for (row, cells) in expect.iter().enumerate() {
            for (col, &want) in cells.iter().enumerate() {
                let px = 20 + col as i32;
                let py = 20 + row as i32;
                assert_eq!(screen.pixels[screen.index(px, py)], want, "at {},{}", px, py);
            }
        }
        // outside the patch footprint stays clear
        assert_eq!(screen.pixels[screen.index(19, 20)], 0);
        assert_eq!(screen.pixels[screen.index(24, 20)], 0);
    }

    #[test]
    fn test_patch_flip_mirrors_columns() {
        let v = video_2x();
        let mut screen = v.new_screen();
        let opts = PatchOpts {
            flip: true,
            ..Default::default()
        };
        draw_patch(&v, &mut screen, 0, 0, &sample_patch(), &opts);
        assert_eq!(screen.pixels[screen.index(0, 0)], 2);
        assert_eq!(screen.pixels[screen.index(2, 0)], 1);
    }

    #[test]
    fn test_patch_posts_leave_gaps_transparent() {
        let v = video_2x();
        let mut screen = v.new_screen();
        screen.clear(50);
        let patch = Patch::from_columns(
            1,
            6,
            vec![vec![
                Post { top_delta: 0, pixels: vec![1] },
                Post { top_delta: 4, pixels: vec![2] },
            ]],
        );
        draw_patch(&v, &mut screen, 0, 0, &patch, &PatchOpts::default());
        assert_eq!(screen.pixels[screen.index(0, 0)], 1);
        assert_eq!(screen.pixels[screen.index(0, 4)], 50); // the gap
        assert_eq!(screen.pixels[screen.index(0, 8)], 2);
    }

    #[test]
    fn test_patch_clips_at_screen_edges() {
        let v = video_2x();
        let mut screen = v.new_screen();
        draw_patch(&v, &mut screen, -1, -1, &sample_patch(), &PatchOpts::default());
        // only the bottom-right logical pixel survives
        assert_eq!(screen.pixels[screen.index(0, 0)], 4);
        assert_eq!(screen.pixels[screen.index(1, 1)], 4);
        assert_eq!(screen.pixels[screen.index(2, 0)], 0);
    }

    #[test]
    fn test_patch_far_offscreen_is_silent() {
        let v = video_2x();
        let mut screen = v.new_screen();
        draw_patch(&v, &mut screen, -1_000_000, 0, &sample_patch(), &PatchOpts::default());
        draw_patch(&v, &mut screen, 1_000_000, 0, &sample_patch(), &PatchOpts::default());
        draw_patch(&v, &mut screen, 0, -1_000_000, &sample_patch(), &PatchOpts::default());
        assert!(screen.pixels.iter().all(|&p| p == 0));
    }

    #[test]
    fn test_patch_offsets_shift_origin() {
        let v = video_2x();
        let mut screen = v.new_screen();
        let mut patch = sample_patch();
        patch.left_offset = 1;
        patch.top_offset = 1;
        draw_patch(&v, &mut screen, 1, 1, &patch, &PatchOpts::default());
        assert_eq!(screen.pixels[screen.index(0, 0)], 1);
    }

    #[test]
    fn test_patch_translation_and_blend() {
        let v = video_2x();
        let mut screen = v.new_screen();
        screen.clear(9);
        let mut translation = vec![0u8; 256];
        for i in 0..256 {
            translation[i] = i as u8;
        }
        translation[1] = 30;
        let mut blend = vec![0u8; 256 * 256];
        blend[(9 << 8) | 30] = 99;
        let patch = Patch::from_block(1, 1, &[1]);
        let opts = PatchOpts {
            translation: Some(&translation),
            blend: Some(&blend),
            ..Default::default()
        };
        draw_patch(&v, &mut screen, 0, 0, &patch, &opts);
        assert_eq!(screen.pixels[screen.index(0, 0)], 99);
    }

    #[test]
    fn test_patch_double_translation_order() {
        let v = video_2x();
        let mut screen = v.new_screen();
        let mut t1 = vec![0u8; 256];
        let mut t2 = vec![0u8; 256];
        for i in 0..256 {
            t1[i] = i as u8;
            t2[i] = i as u8;
        }
        t2[5] = 6; // applied first
        t1[6] = 7; // then this
        let patch = Patch::from_block(1, 1, &[5]);
        let opts = PatchOpts {
            translation: Some(&t1),
            translation2: Some(&t2),
            ..Default::default()
        };
        draw_patch(&v, &mut screen, 0, 0, &patch, &opts);
        assert_eq!(screen.pixels[screen.index(0, 0)], 7);
    }
}
