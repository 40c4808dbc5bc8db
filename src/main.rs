//! IFF/TIFF raster tool.
//!
//! This binary inspects containers, decodes images to PNG and writes ILBM files.

use std::collections::HashMap;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iff_tiff_raster::{
    config::{Cli, Command, DecodeConfig, EncodeConfig, InspectConfig},
    decode_to_image, inspect, IlbmPixels, IlbmWriter, MemoryReader, Palette, Rgba,
};

/// Most colors an image may have to be written as indexed ILBM
const MAX_INDEXED_COLORS: usize = 256;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = cli.command.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Inspect(config) => run_inspect(&config),
        Command::Decode(config) => run_decode(&config),
        Command::EncodeIlbm(config) => run_encode(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "iff_tiff_raster=debug"
    } else {
        "iff_tiff_raster=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Inspect Command
// =============================================================================

fn run_inspect(config: &InspectConfig) -> Result<(), String> {
    let reader = MemoryReader::open(&config.input).map_err(|e| e.to_string())?;
    let report = inspect(&reader).map_err(|e| e.to_string())?;

    let json = if config.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    }
    .map_err(|e| format!("Failed to serialize report: {}", e))?;

    println!("{}", json);
    Ok(())
}

// =============================================================================
// Decode Command
// =============================================================================

fn run_decode(config: &DecodeConfig) -> Result<(), String> {
    let params = config.decode_params()?;
    let reader = MemoryReader::open(&config.input).map_err(|e| e.to_string())?;

    let decoded = decode_to_image(&reader, config.image, &params).map_err(|e| e.to_string())?;
    for warning in &decoded.warnings {
        warn!("{}", warning);
    }

    let image = decoded.to_dynamic_image().map_err(|e| e.to_string())?;
    image
        .save_with_format(&config.output, image::ImageFormat::Png)
        .map_err(|e| format!("Failed to write {}: {}", config.output.display(), e))?;

    info!(
        "Decoded {}x{} {:?} image to {}",
        decoded.width,
        decoded.height,
        decoded.layout.color,
        config.output.display()
    );
    Ok(())
}

// =============================================================================
// Encode Command
// =============================================================================

fn run_encode(config: &EncodeConfig) -> Result<(), String> {
    let source = image::open(&config.input)
        .map_err(|e| format!("Failed to read {}: {}", config.input.display(), e))?;
    let rgba = source.to_rgba8();
    let (width, height) = (rgba.width() as usize, rgba.height() as usize);
    let has_alpha = rgba.pixels().any(|p| p[3] != u8::MAX);

    let writer = IlbmWriter::new(!config.uncompressed);
    let indexed = if config.true_color || has_alpha {
        None
    } else {
        index_colors(rgba.as_raw())
    };

    let bytes = match indexed {
        Some((pixels, palette)) => {
            info!("Writing {} colors as indexed ILBM", palette.len());
            writer.encode(
                width,
                height,
                IlbmPixels::Indexed {
                    pixels: &pixels,
                    palette: &palette,
                },
            )
        }
        None if has_alpha => writer.encode(
            width,
            height,
            IlbmPixels::TrueColor {
                pixels: rgba.as_raw(),
                channels: 4,
            },
        ),
        None => {
            let rgb = source.to_rgb8();
            writer.encode(
                width,
                height,
                IlbmPixels::TrueColor {
                    pixels: rgb.as_raw(),
                    channels: 3,
                },
            )
        }
    }
    .map_err(|e| e.to_string())?;

    std::fs::write(&config.output, &bytes)
        .map_err(|e| format!("Failed to write {}: {}", config.output.display(), e))?;

    info!(
        "Wrote {}x{} ILBM ({} bytes) to {}",
        width,
        height,
        bytes.len(),
        config.output.display()
    );
    Ok(())
}

/// Map RGBA pixels to palette indices, `None` past 256 distinct colors.
fn index_colors(rgba: &[u8]) -> Option<(Vec<u8>, Palette)> {
    let mut lookup: HashMap<[u8; 3], u8> = HashMap::new();
    let mut colors = Vec::new();
    let mut pixels = Vec::with_capacity(rgba.len() / 4);

    for pixel in rgba.chunks_exact(4) {
        let key = [pixel[0], pixel[1], pixel[2]];
        let index = match lookup.get(&key) {
            Some(&index) => index,
            None => {
                if colors.len() == MAX_INDEXED_COLORS {
                    return None;
                }
                let index = colors.len() as u8;
                colors.push(Rgba::rgb(key[0], key[1], key[2]));
                lookup.insert(key, index);
                index
            }
        };
        pixels.push(index);
    }

    Some((pixels, Palette::new(colors)))
}
