//! Visplane cache
//!
//! Floors and ceilings are accumulated per frame as visplanes: one record
//! per (texture, light, height, scroll offset) identity with per-column
//! vertical extents. Identical-looking surfaces merge into one plane when
//! their column ranges don't collide, which turns thousands of per-column
//! draws into a handful of horizontal spans at frame end. Planes are
//! recycled through a free list across frames; their column arrays are
//! Level-tag zone blocks, so the pool's memory follows level lifetime.

use crate::draw::{draw_span, Screen, SpanContext};
use crate::fixed::Fixed;
use crate::zone::{Handle, PurgeTag, Zone};

/// Sentinel for a column no draw has touched yet
pub const UNTOUCHED: u32 = u32::MAX;

const HASH_SIZE: usize = 128;

/// One cached floor/ceiling surface
pub struct VisPlane {
    pub picnum: i32,
    pub light: i32,
    pub height: Fixed,
    pub xoffs: Fixed,
    pub yoffs: Fixed,
    pub min_x: i32,
    pub max_x: i32,
    /// Zone block: `view_width` little-endian u32 tops, then as many bottoms
    cols: Handle,
    /// Hash chain / free list link
    next: Option<usize>,
}

#[inline]
fn get32(bytes: &[u8], i: usize) -> u32 {
    let o = i * 4;
    u32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]])
}

#[inline]
fn put32(bytes: &mut [u8], i: usize, v: u32) {
    let o = i * 4;
    bytes[o..o + 4].copy_from_slice(&v.to_le_bytes());
}

/// The per-frame plane cache
pub struct PlaneCache {
    planes: Vec<VisPlane>,
    hash: [Option<usize>; HASH_SIZE],
    free: Option<usize>,
    view_width: usize,
    view_height: usize,
    sky_picnum: i32,
    // span start x per row, reused by every emission walk
    span_start: Vec<i32>,
}

impl PlaneCache {
    pub fn new(view_width: usize, view_height: usize, sky_picnum: i32) -> Self {
        Self {
            planes: Vec::new(),
            hash: [None; HASH_SIZE],
            free: None,
            view_width,
            view_height,
            sky_picnum,
            span_start: vec![0; view_height],
        }
    }

    fn hash_key(picnum: i32, light: i32, height: Fixed) -> usize {
        let k = picnum as i64 * 3 + light as i64 + height.0 as i64 * 7;
        k.rem_euclid(HASH_SIZE as i64) as usize
    }

    /// Find or create the plane for an identity key. Sky flats normalize
    /// height and light to zero first, so every sky fragment on screen
    /// collapses onto one shared plane regardless of true geometry.
    pub fn find_plane(
        &mut self,
        zone: &mut Zone,
        mut height: Fixed,
        picnum: i32,
        mut light: i32,
        xoffs: Fixed,
        yoffs: Fixed,
    ) -> usize {
        if picnum == self.sky_picnum {
            height = Fixed::ZERO;
            light = 0;
        }
        let bucket = Self::hash_key(picnum, light, height);
        let mut cur = self.hash[bucket];
        while let Some(i) = cur {
            let p = &self.planes[i];
            if p.picnum == picnum
                && p.light == light
                && p.height == height
                && p.xoffs == xoffs
                && p.yoffs == yoffs
            {
                return i;
            }
            cur = p.next;
        }

        let i = self.new_plane(zone);
        let p = &mut self.planes[i];
        p.picnum = picnum;
        p.light = light;
        p.height = height;
        p.xoffs = xoffs;
        p.yoffs = yoffs;
        p.next = self.hash[bucket];
        self.hash[bucket] = Some(i);
        i
    }

    /// Try to grow a plane's column range to cover [start, stop].
    ///
    /// If no already-touched column collides, the range is extended in
    /// place and the same plane id comes back. Otherwise some column was
    /// drawn by this plane under an earlier call, and a fresh plane with
    /// an identical key and the candidate range is returned; the original
    /// is left untouched.
    pub fn check_plane(&mut self, zone: &mut Zone, id: usize, start: i32, stop: i32) -> usize {
        let p = &self.planes[id];
        let (unionl, intrl) = if start < p.min_x { (start, p.min_x) } else { (p.min_x, start) };
        let (unionh, intrh) = if stop > p.max_x { (stop, p.max_x) } else { (p.max_x, stop) };

        let mut x = intrl;
        {
            let cols = zone.bytes(p.cols);
            while x <= intrh {
                if get32(cols, x as usize) != UNTOUCHED {
                    break;
                }
                x += 1;
            }
        }
        if x > intrh {
            let p = &mut self.planes[id];
            p.min_x = unionl;
            p.max_x = unionh;
            return id;
        }

        // collision: fork a plane with the same key and the new range
        let (picnum, light, height, xoffs, yoffs) =
            (p.picnum, p.light, p.height, p.xoffs, p.yoffs);
        let i = self.new_plane(zone);
        let p = &mut self.planes[i];
        p.picnum = picnum;
        p.light = light;
        p.height = height;
        p.xoffs = xoffs;
        p.yoffs = yoffs;
        p.min_x = start;
        p.max_x = stop;
        let bucket = Self::hash_key(picnum, light, height);
        p.next = self.hash[bucket];
        self.hash[bucket] = Some(i);
        i
    }

    /// Record the vertical extent drawn at one column
    pub fn set_column(&mut self, zone: &mut Zone, id: usize, x: i32, top: u32, bottom: u32) {
        debug_assert!(x >= 0 && (x as usize) < self.view_width, "plane column out of range");
        debug_assert!(
            (bottom as usize) < self.view_height,
            "plane row out of range"
        );
        let w = self.view_width;
        let cols = zone.bytes_mut(self.planes[id].cols);
        put32(cols, x as usize, top);
        put32(cols, w + x as usize, bottom);
    }

    pub fn top(&self, zone: &Zone, id: usize, x: i32) -> u32 {
        get32(zone.bytes(self.planes[id].cols), x as usize)
    }

    pub fn bottom(&self, zone: &Zone, id: usize, x: i32) -> u32 {
        get32(zone.bytes(self.planes[id].cols), self.view_width + x as usize)
    }

    pub fn plane(&self, id: usize) -> &VisPlane {
        &self.planes[id]
    }

    pub fn is_sky(&self, id: usize) -> bool {
        self.planes[id].picnum == self.sky_picnum
    }

    /// Ids of every plane captured this frame, in hash-chain order
    pub fn frame_planes(&self) -> Vec<usize> {
        let mut ids = Vec::new();
        for bucket in &self.hash {
            let mut cur = *bucket;
            while let Some(i) = cur {
                ids.push(i);
                cur = self.planes[i].next;
            }
        }
        ids
    }

    /// Frame reset: concatenate every hash chain onto the free list.
    /// Planes (and their zone blocks) are recycled, never dropped.
    pub fn clear(&mut self) {
        for bucket in self.hash.iter_mut() {
            let Some(head) = bucket.take() else {
                continue;
            };
            let mut tail = head;
            while let Some(n) = self.planes[tail].next {
                tail = n;
            }
            self.planes[tail].next = self.free;
            self.free = Some(head);
        }
    }

    /// Walk a finished plane's columns and emit one (y, x1, x2) call per
    /// vertical run that stays constant between adjacent columns: a
    /// run-length encoding over columns that turns per-column draws into
    /// O(spans) span draws.
    pub fn emit_plane(&mut self, zone: &Zone, id: usize, mut emit: impl FnMut(i32, i32, i32)) {
        let min_x = self.planes[id].min_x;
        let max_x = self.planes[id].max_x;
        if min_x > max_x {
            return;
        }
        let w = self.view_width;
        let cols = zone.bytes(self.planes[id].cols);

        for x in min_x..=max_x + 1 {
            let (mut t1, mut b1) = if x == min_x {
                (UNTOUCHED, 0)
            } else {
                (get32(cols, (x - 1) as usize), get32(cols, w + (x - 1) as usize))
            };
            let (mut t2, mut b2) = if x > max_x {
                (UNTOUCHED, 0)
            } else {
                (get32(cols, x as usize), get32(cols, w + x as usize))
            };
            if (t1, b1) == (t2, b2) {
                continue;
            }
            while t1 < t2 && t1 <= b1 {
                emit(t1 as i32, self.span_start[t1 as usize], x - 1);
                t1 += 1;
            }
            while b1 > b2 && b1 >= t1 {
                emit(b1 as i32, self.span_start[b1 as usize], x - 1);
                b1 -= 1;
            }
            while t2 < t1 && t2 <= b2 {
                self.span_start[t2 as usize] = x;
                t2 += 1;
            }
            while b2 > b1 && b2 >= t2 {
                self.span_start[b2 as usize] = x;
                b2 -= 1;
            }
        }
    }

    /// Frame-end dispatch for one flat plane: emit its spans and draw them
    /// through the span mapper's projection.
    pub fn render_plane(&mut self, zone: &Zone, id: usize, mapper: &SpanMapper, screen: &mut Screen) {
        let p = &self.planes[id];
        let (height, xoffs, yoffs) = (p.height, p.xoffs, p.yoffs);
        self.emit_plane(zone, id, |y, x1, x2| {
            let ctx = mapper.context(height, xoffs, yoffs, y, x1, x2);
            draw_span(&ctx, screen);
        });
    }

    fn new_plane(&mut self, zone: &mut Zone) -> usize {
        let i = match self.free {
            Some(i) => {
                self.free = self.planes[i].next;
                i
            }
            None => {
                let cols = zone
                    .alloc(self.view_width * 8, PurgeTag::Level, None)
                    .expect("non-zero allocation");
                self.planes.push(VisPlane {
                    picnum: 0,
                    light: 0,
                    height: Fixed::ZERO,
                    xoffs: Fixed::ZERO,
                    yoffs: Fixed::ZERO,
                    min_x: 0,
                    max_x: 0,
                    cols,
                    next: None,
                });
                self.planes.len() - 1
            }
        };
        let p = &mut self.planes[i];
        p.min_x = self.view_width as i32;
        p.max_x = -1;
        p.next = None;
        let cols = zone.bytes_mut(p.cols);
        cols[..self.view_width * 4].fill(0xff); // tops to UNTOUCHED
        cols[self.view_width * 4..].fill(0);
        i
    }

    /// Number of plane records ever created (pool size)
    pub fn pool_len(&self) -> usize {
        self.planes.len()
    }
}

/// Projects plane spans back into flat texture space for a view standing
/// at (view_x, view_y) looking straight ahead. All math is 16.16.
pub struct SpanMapper<'a> {
    pub view_x: Fixed,
    pub view_y: Fixed,
    pub center_x: i32,
    pub center_y: i32,
    /// 64x64 flat to tile
    pub source: &'a [u8],
    pub colormap: [&'a [u8]; 2],
    pub brightmap: &'a [u8],
}

impl SpanMapper<'_> {
    pub fn context(
        &self,
        plane_height: Fixed,
        xoffs: Fixed,
        yoffs: Fixed,
        y: i32,
        x1: i32,
        x2: i32,
    ) -> SpanContext<'_> {
        // row distance: |height above eye| scaled by the row's slope
        let dy = (y - self.center_y).abs().max(1);
        let yslope = Fixed::from_int(self.center_x).div(Fixed::from_int(dy));
        let distance = plane_height.abs().mul(yslope);
        let xstep = distance.div_int(self.center_x);
        SpanContext {
            y,
            x1,
            x2,
            xfrac: self.view_x + xoffs + xstep.scale_int(x1 - self.center_x),
            yfrac: self.view_y + yoffs + distance,
            xstep,
            ystep: Fixed::ZERO,
            source: self.source,
            colormap: self.colormap,
            brightmap: self.brightmap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKY: i32 = 999;

    fn cache() -> (Zone, PlaneCache) {
        (Zone::new(1 << 20), PlaneCache::new(320, 200, SKY))
    }

    #[test]
    fn test_find_plane_dedupes_identical_keys() {
        let (mut zone, mut cache) = cache();
        let a = cache.find_plane(&mut zone, Fixed::from_int(128), 5, 3, Fixed::ZERO, Fixed::ZERO);
        let b = cache.find_plane(&mut zone, Fixed::from_int(128), 5, 3, Fixed::ZERO, Fixed::ZERO);
        assert_eq!(a, b);
        let c = cache.find_plane(&mut zone, Fixed::from_int(64), 5, 3, Fixed::ZERO, Fixed::ZERO);
        assert_ne!(a, c);
    }

    #[test]
    fn test_sky_collapses_onto_one_plane() {
        let (mut zone, mut cache) = cache();
        let a = cache.find_plane(&mut zone, Fixed::from_int(128), SKY, 7, Fixed::ZERO, Fixed::ZERO);
        let b = cache.find_plane(&mut zone, Fixed::from_int(-64), SKY, 2, Fixed::ZERO, Fixed::ZERO);
        assert_eq!(a, b);
        assert!(cache.is_sky(a));
    }

    #[test]
    fn test_new_plane_starts_empty_and_untouched() {
        let (mut zone, mut cache) = cache();
        let id = cache.find_plane(&mut zone, Fixed::from_int(128), 1, 0, Fixed::ZERO, Fixed::ZERO);
        assert_eq!(cache.plane(id).min_x, 320);
        assert_eq!(cache.plane(id).max_x, -1);
        for x in 0..320 {
            assert_eq!(cache.top(&zone, id, x), UNTOUCHED);
        }
    }

    #[test]
    fn test_check_plane_extends_disjoint_ranges_in_place() {
        let (mut zone, mut cache) = cache();
        let id = cache.find_plane(&mut zone, Fixed::from_int(128), 1, 0, Fixed::ZERO, Fixed::ZERO);
        let id = cache.check_plane(&mut zone, id, 5, 10);
        assert_eq!((cache.plane(id).min_x, cache.plane(id).max_x), (5, 10));
        let id2 = cache.check_plane(&mut zone, id, 12, 20);
        assert_eq!(id, id2);
        assert_eq!((cache.plane(id).min_x, cache.plane(id).max_x), (5, 20));
    }

    #[test]
    fn test_check_plane_forks_on_drawn_column() {
        let (mut zone, mut cache) = cache();
        let id = cache.find_plane(&mut zone, Fixed::from_int(128), 1, 0, Fixed::ZERO, Fixed::ZERO);
        let id = cache.check_plane(&mut zone, id, 5, 10);
        cache.set_column(&mut zone, id, 7, 3, 9);

        let forked = cache.check_plane(&mut zone, id, 7, 15);
        assert_ne!(forked, id);
        // original untouched
        assert_eq!((cache.plane(id).min_x, cache.plane(id).max_x), (5, 10));
        assert_eq!(cache.top(&zone, id, 7), 3);
        // the fork carries the candidate range and a clean slate
        assert_eq!((cache.plane(forked).min_x, cache.plane(forked).max_x), (7, 15));
        assert_eq!(cache.top(&zone, forked, 7), UNTOUCHED);
        // same identity key
        assert_eq!(cache.plane(forked).picnum, cache.plane(id).picnum);
        assert_eq!(cache.plane(forked).height, cache.plane(id).height);
    }

    #[test]
    fn test_forked_plane_is_findable() {
        let (mut zone, mut cache) = cache();
        let id = cache.find_plane(&mut zone, Fixed::from_int(128), 1, 0, Fixed::ZERO, Fixed::ZERO);
        let id = cache.check_plane(&mut zone, id, 5, 10);
        cache.set_column(&mut zone, id, 5, 0, 0);
        let forked = cache.check_plane(&mut zone, id, 5, 6);
        // find now returns one of the two same-key planes
        let found = cache.find_plane(&mut zone, Fixed::from_int(128), 1, 0, Fixed::ZERO, Fixed::ZERO);
        assert!(found == id || found == forked);
    }

    #[test]
    fn test_clear_recycles_the_pool() {
        let (mut zone, mut cache) = cache();
        for picnum in 0..4 {
            cache.find_plane(&mut zone, Fixed::from_int(128), picnum, 0, Fixed::ZERO, Fixed::ZERO);
        }
        assert_eq!(cache.pool_len(), 4);
        let used_before = zone.usage(PurgeTag::Level);

        cache.clear();
        assert!(cache.frame_planes().is_empty());
        for picnum in 0..4 {
            cache.find_plane(&mut zone, Fixed::from_int(128), picnum, 0, Fixed::ZERO, Fixed::ZERO);
        }
        // no new plane records, no new zone memory
        assert_eq!(cache.pool_len(), 4);
        assert_eq!(zone.usage(PurgeTag::Level), used_before);
    }

    #[test]
    fn test_emit_plane_runs_spans_over_constant_columns() {
        let (mut zone, mut cache) = cache();
        let id = cache.find_plane(&mut zone, Fixed::from_int(128), 1, 0, Fixed::ZERO, Fixed::ZERO);
        let id = cache.check_plane(&mut zone, id, 2, 5);
        for x in 2..=5 {
            cache.set_column(&mut zone, id, x, 1, 3);
        }
        let mut spans = Vec::new();
        cache.emit_plane(&zone, id, |y, x1, x2| spans.push((y, x1, x2)));
        spans.sort_unstable();
        assert_eq!(spans, vec![(1, 2, 5), (2, 2, 5), (3, 2, 5)]);
    }

    #[test]
    fn test_emit_plane_splits_on_extent_change() {
        let (mut zone, mut cache) = cache();
        let id = cache.find_plane(&mut zone, Fixed::from_int(128), 1, 0, Fixed::ZERO, Fixed::ZERO);
        let id = cache.check_plane(&mut zone, id, 0, 3);
        // columns 0-1 cover rows 4..=6, columns 2-3 cover rows 5..=6
        cache.set_column(&mut zone, id, 0, 4, 6);
        cache.set_column(&mut zone, id, 1, 4, 6);
        cache.set_column(&mut zone, id, 2, 5, 6);
        cache.set_column(&mut zone, id, 3, 5, 6);
        let mut spans = Vec::new();
        cache.emit_plane(&zone, id, |y, x1, x2| spans.push((y, x1, x2)));
        spans.sort_unstable();
        assert_eq!(spans, vec![(4, 0, 1), (5, 0, 3), (6, 0, 3)]);
    }

    #[test]
    fn test_emit_untouched_plane_is_silent() {
        let (mut zone, mut cache) = cache();
        let id = cache.find_plane(&mut zone, Fixed::from_int(128), 1, 0, Fixed::ZERO, Fixed::ZERO);
        let mut spans = Vec::new();
        cache.emit_plane(&zone, id, |y, x1, x2| spans.push((y, x1, x2)));
        assert!(spans.is_empty());
    }

    #[test]
    fn test_render_plane_fills_spans() {
        let (mut zone, mut cache) = cache();
        let flat = vec![9u8; 64 * 64];
        let cmap: Vec<u8> = (0..=255).collect();
        let bmap = [0u8; 256];
        let mapper = SpanMapper {
            view_x: Fixed::ZERO,
            view_y: Fixed::ZERO,
            center_x: 160,
            center_y: 100,
            source: &flat,
            colormap: [&cmap, &cmap],
            brightmap: &bmap,
        };
        let mut screen = Screen::new(320, 200);
        let id = cache.find_plane(&mut zone, Fixed::from_int(128), 1, 0, Fixed::ZERO, Fixed::ZERO);
        let id = cache.check_plane(&mut zone, id, 10, 20);
        for x in 10..=20 {
            cache.set_column(&mut zone, id, x, 150, 160);
        }
        cache.render_plane(&zone, id, &mapper, &mut screen);
        for x in 10..=20 {
            for y in 150..=160 {
                assert_eq!(screen.pixels[screen.index(x, y)], 9);
            }
        }
        assert_eq!(screen.pixels[screen.index(9, 155)], 0);
    }
}
