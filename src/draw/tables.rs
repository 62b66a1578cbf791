//! Precomputed shading tables
//!
//! Colormaps, the translucency blend table and the sprite translation
//! tables are built once at startup and live in Static-tag zone blocks;
//! the drawers get plain slices resolved from the handles. Blending is a
//! table lookup at draw time, so all the palette math happens here.

use crate::zone::{Handle, PurgeTag, Zone};

/// Number of diminishing light levels in the colormap array
pub const LIGHT_LEVELS: usize = 32;

/// Colormap index used by the fuzz effect
pub const FUZZ_DARK_LEVEL: usize = 6;

/// 256-entry RGB palette
#[derive(Clone)]
pub struct Palette {
    pub rgb: [[u8; 3]; 256],
}

/// Error type for palette loading
#[derive(Debug)]
pub enum PaletteError {
    WrongSize(usize),
}

impl std::fmt::Display for PaletteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaletteError::WrongSize(n) => write!(f, "palette must be 768 bytes, got {}", n),
        }
    }
}

impl Palette {
    /// Load from a raw 768-byte RGB dump
    pub fn from_raw(bytes: &[u8]) -> Result<Self, PaletteError> {
        if bytes.len() != 768 {
            return Err(PaletteError::WrongSize(bytes.len()));
        }
        let mut rgb = [[0u8; 3]; 256];
        for (i, entry) in rgb.iter_mut().enumerate() {
            entry.copy_from_slice(&bytes[i * 3..i * 3 + 3]);
        }
        Ok(Self { rgb })
    }

    /// A usable built-in palette: a ramp through gray, warm and cool tones
    pub fn built_in() -> Self {
        let mut rgb = [[0u8; 3]; 256];
        for (i, entry) in rgb.iter_mut().enumerate() {
            let i = i as u32;
            match i / 64 {
                0 => *entry = [(i * 4) as u8, (i * 4) as u8, (i * 4) as u8],
                1 => {
                    let t = (i - 64) * 4;
                    *entry = [t as u8, (t / 2) as u8, (t / 4) as u8]
                }
                2 => {
                    let t = (i - 128) * 4;
                    *entry = [(t / 4) as u8, (t / 2) as u8, t as u8]
                }
                _ => {
                    let t = (i - 192) * 4;
                    *entry = [(t / 3) as u8, t as u8, (t / 3) as u8]
                }
            }
        }
        Self { rgb }
    }

    /// Index of the palette entry closest to an RGB color
    pub fn nearest(&self, r: u8, g: u8, b: u8) -> u8 {
        let mut best = 0usize;
        let mut best_dist = i64::MAX;
        for (i, &[pr, pg, pb]) in self.rgb.iter().enumerate() {
            let dr = pr as i64 - r as i64;
            let dg = pg as i64 - g as i64;
            let db = pb as i64 - b as i64;
            let dist = dr * dr + dg * dg + db * db;
            if dist < best_dist {
                best_dist = dist;
                best = i;
                if dist == 0 {
                    break;
                }
            }
        }
        best as u8
    }
}

/// Sprite recolor targets (multiplayer skins)
#[derive(Debug, Clone, Copy)]
pub enum TranslationKind {
    Gray,
    Brown,
    Red,
}

/// All shading tables, stored as zone blocks.
pub struct RenderTables {
    colormaps: Handle,
    tranmap: Handle,
    translations: Handle,
    brightmap: Handle,
}

// palette range remapped by the translation tables
const TRANSLATED_LO: usize = 112;
const TRANSLATED_HI: usize = 127;

impl RenderTables {
    /// Build every table from a palette. `alpha_percent` is the weight of
    /// the incoming pixel in the translucency blend (0..=100).
    pub fn build(zone: &mut Zone, palette: &Palette, alpha_percent: u32) -> Self {
        let colormaps = zone
            .alloc(LIGHT_LEVELS * 256, PurgeTag::Static, None)
            .expect("non-zero allocation");
        {
            let buf = zone.bytes_mut(colormaps);
            for level in 0..LIGHT_LEVELS {
                for i in 0..256 {
                    let [r, g, b] = palette.rgb[i];
                    let k = (LIGHT_LEVELS - level) as u32;
                    let r = (r as u32 * k / LIGHT_LEVELS as u32) as u8;
                    let g = (g as u32 * k / LIGHT_LEVELS as u32) as u8;
                    let b = (b as u32 * k / LIGHT_LEVELS as u32) as u8;
                    buf[level * 256 + i] = palette.nearest(r, g, b);
                }
            }
        }

        let tranmap = zone
            .alloc(256 * 256, PurgeTag::Static, None)
            .expect("non-zero allocation");
        {
            let fg = alpha_percent.min(100);
            let bg = 100 - fg;
            let buf = zone.bytes_mut(tranmap);
            for old in 0..256 {
                for new in 0..256 {
                    let [or, og, ob] = palette.rgb[old];
                    let [nr, ng, nb] = palette.rgb[new];
                    let r = ((or as u32 * bg + nr as u32 * fg) / 100) as u8;
                    let g = ((og as u32 * bg + ng as u32 * fg) / 100) as u8;
                    let b = ((ob as u32 * bg + nb as u32 * fg) / 100) as u8;
                    buf[(old << 8) | new] = palette.nearest(r, g, b);
                }
            }
        }

        let translations = zone
            .alloc(3 * 256, PurgeTag::Static, None)
            .expect("non-zero allocation");
        {
            let buf = zone.bytes_mut(translations);
            for (t, base) in [96usize, 64, 32].into_iter().enumerate() {
                for i in 0..256 {
                    buf[t * 256 + i] = if (TRANSLATED_LO..=TRANSLATED_HI).contains(&i) {
                        (base + (i & 0xf)) as u8
                    } else {
                        i as u8
                    };
                }
            }
        }

        // identity brightmap: nothing full-bright until textures mark pixels
        let brightmap = zone
            .calloc(256, PurgeTag::Static, None)
            .expect("non-zero allocation");

        Self {
            colormaps,
            tranmap,
            translations,
            brightmap,
        }
    }

    /// Colormap for one light level (clamped to the last level)
    pub fn colormap<'a>(&self, zone: &'a Zone, level: usize) -> &'a [u8] {
        let level = level.min(LIGHT_LEVELS - 1);
        &zone.bytes(self.colormaps)[level * 256..(level + 1) * 256]
    }

    /// The fixed dark colormap the fuzz effect samples through
    pub fn fuzz_colormap<'a>(&self, zone: &'a Zone) -> &'a [u8] {
        self.colormap(zone, FUZZ_DARK_LEVEL)
    }

    /// The 256x256 translucency blend table
    pub fn tranmap<'a>(&self, zone: &'a Zone) -> &'a [u8] {
        zone.bytes(self.tranmap)
    }

    /// One sprite translation table
    pub fn translation<'a>(&self, zone: &'a Zone, kind: TranslationKind) -> &'a [u8] {
        let t = match kind {
            TranslationKind::Gray => 0,
            TranslationKind::Brown => 1,
            TranslationKind::Red => 2,
        };
        &zone.bytes(self.translations)[t * 256..(t + 1) * 256]
    }

    /// Default brightmap (no full-bright pixels)
    pub fn brightmap<'a>(&self, zone: &'a Zone) -> &'a [u8] {
        zone.bytes(self.brightmap)
    }

    /// Mark palette indices as full-bright in the shared brightmap
    pub fn mark_bright(&self, zone: &mut Zone, indices: &[u8]) {
        let buf = zone.bytes_mut(self.brightmap);
        for &i in indices {
            buf[i as usize] = 1;
        }
    }
}

/// A decoded image quantized to palette indices
pub struct IndexedImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

/// Decode an image (PNG/JPEG/BMP) and quantize it to the palette.
pub fn load_indexed_image(bytes: &[u8], palette: &Palette) -> Result<IndexedImage, String> {
    use image::GenericImageView;

    let img = image::load_from_memory(bytes).map_err(|e| format!("Failed to decode image: {}", e))?;
    let (width, height) = img.dimensions();
    let rgba = img.to_rgba8();
    let pixels: Vec<u8> = rgba
        .pixels()
        .map(|p| palette.nearest(p[0], p[1], p[2]))
        .collect();

    Ok(IndexedImage {
        width: width as usize,
        height: height as usize,
        pixels,
    })
}
