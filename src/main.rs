//! Demo front-end: a small walkthrough scene rendered entirely by the
//! software core and presented through macroquad.
//!
//! Nothing here touches pixels directly; it populates column contexts,
//! feeds the visplane cache and lets the core rasterize into the
//! palette-index framebuffer, which is expanded to RGBA only for display.

use macroquad::prelude::*;

use vista_engine::draw::tables::{Palette, RenderTables};
use vista_engine::draw::{ColumnContext, ColumnKind, Raster, Screen};
use vista_engine::fixed::{Fixed, FRACUNIT};
use vista_engine::plane::{PlaneCache, SpanMapper};
use vista_engine::settings::load_or_default;
use vista_engine::video::{draw_patch, effect_block, Patch, PatchOpts, ScaleConfig, Video};
use vista_engine::zone::{PurgeTag, Zone};
use vista_engine::VERSION;

const SKY_PIC: i32 = 0;
const FLOOR_PIC: i32 = 1;
const TICRATE: f32 = 35.0;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Vista Engine v{}", VERSION),
        window_width: 1280,
        window_height: 800,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

/// 64x64 checkerboard flat out of two palette ramps
fn make_flat(a: u8, b: u8) -> Vec<u8> {
    let mut flat = vec![0u8; 64 * 64];
    for y in 0..64 {
        for x in 0..64 {
            let checker = ((x / 8) + (y / 8)) % 2 == 0;
            let base = if checker { a } else { b };
            flat[y * 64 + x] = base + ((x + y) % 4) as u8;
        }
    }
    flat
}

/// A banded wall texture column set (non-power-of-two height on purpose,
/// to exercise the wrap correction)
fn make_wall(height: usize) -> Vec<u8> {
    (0..height).map(|y| 80 + (y % 24) as u8).collect()
}

/// Vertical sky gradient, brightest at the top
fn make_sky(height: usize) -> Vec<u8> {
    (0..height).map(|y| 128 + (y * 48 / height) as u8).collect()
}

/// A little procedural crosshair patch for the HUD
fn make_crosshair() -> Patch {
    let mut block = vec![0u8; 9 * 9];
    for i in 0..9 {
        block[4 * 9 + i] = 60;
        block[i * 9 + 4] = 60;
    }
    let mut patch = Patch::from_block(9, 9, &block);
    patch.left_offset = 4;
    patch.top_offset = 4;
    patch
}

#[macroquad::main(window_conf)]
async fn main() {
    let settings = load_or_default("vista.ron");
    println!(
        "Vista Engine v{}: {}x{}{}",
        VERSION,
        settings.width,
        settings.height,
        if settings.widescreen { " (widescreen)" } else { "" }
    );

    let mut zone = Zone::new(settings.zone_budget_mb * 1024 * 1024);
    let palette = Palette::built_in();
    let tables = RenderTables::build(&mut zone, &palette, settings.translucency_percent);
    println!("Shading tables: {} bytes static zone", zone.usage(PurgeTag::Static));

    let video = Video::new(ScaleConfig::new(settings.width, settings.height, settings.widescreen));
    let mut screen = video.new_screen();
    let (pw, ph) = (video.config.physical_width, video.config.physical_height);

    let mut raster = Raster::new();
    raster.fuzz_block = effect_block(&video.config);
    raster.sky_color = palette.nearest(40, 60, 130);

    let mut cache = PlaneCache::new(pw, ph, SKY_PIC);

    let flat = make_flat(16, 24);
    let wall = make_wall(72); // 72 rows: not a power of two
    let sky = make_sky(128);
    let crosshair = make_crosshair();

    let mut image = Image::gen_image_color(pw as u16, ph as u16, BLACK);
    let texture = Texture2D::from_image(&image);
    texture.set_filter(FilterMode::Nearest);

    let mut view_x = Fixed::ZERO;
    let mut tic_accum = 0.0f32;
    let horizon = (ph * 5 / 9) as i32;
    let pillar = (pw as i32 * 2 / 5, pw as i32 * 3 / 5);

    loop {
        // fixed-rate game tics drive the fuzz cursor and the camera walk
        tic_accum += get_frame_time();
        while tic_accum >= 1.0 / TICRATE {
            tic_accum -= 1.0 / TICRATE;
            raster.fuzz.tic();
            view_x += Fixed(FRACUNIT / 4);
        }

        // frame start: recycle every plane from the previous frame
        cache.clear();

        // sky columns over the top half
        let sky_step = Fixed::from_int(sky.len() as i32).div(Fixed::from_int(horizon));
        for x in 0..pw as i32 {
            let ctx = ColumnContext {
                x,
                y1: 0,
                y2: horizon - 1,
                frac: Fixed::ZERO,
                step: sky_step,
                tex_height: sky.len() as i32,
                source: &sky,
                colormap: [tables.colormap(&zone, 0), tables.colormap(&zone, 0)],
                brightmap: tables.brightmap(&zone),
                translation: None,
                blend: Some(tables.tranmap(&zone)),
            };
            raster.draw_column_as(ColumnKind::Sky, &ctx, &mut screen);
        }

        // the floor accumulates through the visplane cache
        let floor = cache.find_plane(
            &mut zone,
            Fixed::from_int(48),
            FLOOR_PIC,
            4,
            view_x,
            Fixed::ZERO,
        );
        let floor = cache.check_plane(&mut zone, floor, 0, pw as i32 - 1);
        for x in 0..pw as i32 {
            // the pillar pushes the visible floor down behind it
            let top = if x >= pillar.0 && x < pillar.1 {
                horizon + (ph as i32 / 8)
            } else {
                horizon
            };
            cache.set_column(&mut zone, floor, x, top as u32, ph as u32 - 1);
        }

        // wall columns for the pillar, shaded darker toward the edges
        let wall_step = Fixed(FRACUNIT / 2);
        for x in pillar.0..pillar.1 {
            let edge = (x - pillar.0).min(pillar.1 - 1 - x);
            let light = (8 - edge / 12).clamp(0, 15) as usize;
            let ctx = ColumnContext {
                x,
                y1: horizon - ph as i32 / 6,
                y2: horizon + ph as i32 / 8 - 1,
                frac: Fixed::ZERO,
                step: wall_step,
                tex_height: wall.len() as i32,
                source: &wall,
                colormap: [tables.colormap(&zone, light), tables.colormap(&zone, 0)],
                brightmap: tables.brightmap(&zone),
                translation: None,
                blend: Some(tables.tranmap(&zone)),
            };
            let kind = if x - pillar.0 < (pillar.1 - pillar.0) / 4 {
                ColumnKind::Translucent
            } else {
                ColumnKind::Opaque
            };
            raster.draw_column_as(kind, &ctx, &mut screen);
        }

        // a lurking spectre to the right of the pillar
        let fuzz_x0 = pillar.1 + pw as i32 / 20;
        let fuzz_x1 = fuzz_x0 + pw as i32 / 16;
        for x in fuzz_x0..fuzz_x1.min(pw as i32) {
            let ctx = ColumnContext {
                x,
                y1: horizon - ph as i32 / 10,
                y2: horizon + ph as i32 / 12,
                frac: Fixed::ZERO,
                step: Fixed::ZERO,
                tex_height: 1,
                source: &wall,
                colormap: [tables.fuzz_colormap(&zone), tables.fuzz_colormap(&zone)],
                brightmap: tables.brightmap(&zone),
                translation: None,
                blend: None,
            };
            raster.draw_column_as(ColumnKind::Fuzz, &ctx, &mut screen);
        }

        // frame end: the cache dispatches merged floor spans
        let mapper = SpanMapper {
            view_x,
            view_y: Fixed::ZERO,
            center_x: pw as i32 / 2,
            center_y: horizon,
            source: &flat,
            colormap: [tables.colormap(&zone, 4), tables.colormap(&zone, 0)],
            brightmap: tables.brightmap(&zone),
        };
        for id in cache.frame_planes() {
            if !cache.is_sky(id) {
                cache.render_plane(&zone, id, &mapper, &mut screen);
            }
        }

        // HUD through the scaling layer
        video.fill_rect(&mut screen, 0, 190, 320, 10, 2);
        draw_patch(
            &video,
            &mut screen,
            160,
            100,
            &crosshair,
            &PatchOpts {
                blend: Some(tables.tranmap(&zone)),
                ..Default::default()
            },
        );

        present(&screen, &palette, &mut image, &texture);
        next_frame().await
    }
}

/// Expand the palette-index framebuffer to RGBA and draw it scaled to
/// the window
fn present(screen: &Screen, palette: &Palette, image: &mut Image, texture: &Texture2D) {
    let data = image.get_image_data_mut();
    for y in 0..screen.height {
        for x in 0..screen.width {
            let pix = screen.pixels[y * screen.pitch + x];
            let [r, g, b] = palette.rgb[pix as usize];
            data[y * screen.width + x] = [r, g, b, 255];
        }
    }
    texture.update(image);

    clear_background(BLACK);
    let scale = (screen_width() / texture.width()).min(screen_height() / texture.height());
    let w = texture.width() * scale;
    let h = texture.height() * scale;
    draw_texture_ex(
        texture,
        (screen_width() - w) / 2.0,
        (screen_height() - h) / 2.0,
        WHITE,
        DrawTextureParams {
            dest_size: Some(vec2(w, h)),
            ..Default::default()
        },
    );
}
