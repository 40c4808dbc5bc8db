//! Command-line configuration for the raster tool.
//!
//! This module provides the CLI of the `iff-tiff-raster` binary:
//! - Subcommands `inspect`, `decode` and `encode-ilbm` via clap
//! - Environment variables with the `RASTER_` prefix
//! - Defaults for every optional setting
//!
//! # Example
//!
//! ```ignore
//! use iff_tiff_raster::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! if let Command::Decode(config) = cli.command {
//!     let params = config.decode_params()?;
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `RASTER_IMAGE` - Image index inside a multi-image TIFF (default: 0)
//! - `RASTER_REGION` - Source region as `x,y,width,height`
//! - `RASTER_X_SUBSAMPLING` / `RASTER_Y_SUBSAMPLING` - Keep every n-th column / row (default: 1)
//! - `RASTER_LZW_VARIANT` - Force `standard` or `legacy` LZW
//! - `RASTER_PALETTE_CACHE` - Row palettes kept for multi-palette images (default: 64)
//! - `RASTER_UNCOMPRESSED` - Write ILBM bodies without ByteRun1

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};

use crate::codec::LzwVariant;
use crate::decode::{DecodeParams, Region};
use crate::palette::DEFAULT_PALETTE_CACHE_CAPACITY;

// =============================================================================
// Default Values
// =============================================================================

/// Default image index.
pub const DEFAULT_IMAGE_INDEX: usize = 0;

/// Default subsampling step (every pixel).
pub const DEFAULT_SUBSAMPLING: u32 = 1;

// =============================================================================
// CLI Arguments
// =============================================================================

/// IFF/TIFF raster tool - inspect and decode IFF and TIFF images.
#[derive(Parser, Debug, Clone)]
#[command(name = "iff-tiff-raster")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the container structure as JSON.
    Inspect(InspectConfig),

    /// Decode an image to PNG.
    Decode(DecodeConfig),

    /// Write a PNG or JPEG image as an IFF ILBM.
    EncodeIlbm(EncodeConfig),
}

impl Command {
    /// Validate the selected subcommand.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Command::Inspect(config) => config.validate(),
            Command::Decode(config) => config.validate(),
            Command::EncodeIlbm(config) => config.validate(),
        }
    }
}

// =============================================================================
// Inspect
// =============================================================================

/// Options of `inspect`.
#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// IFF or TIFF file to inspect.
    pub input: PathBuf,

    /// Print compact JSON on one line.
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

impl InspectConfig {
    pub fn validate(&self) -> Result<(), String> {
        check_input(&self.input)
    }
}

// =============================================================================
// Decode
// =============================================================================

/// Options of `decode`.
#[derive(Args, Debug, Clone)]
pub struct DecodeConfig {
    /// IFF or TIFF file to decode.
    pub input: PathBuf,

    /// PNG file to write.
    pub output: PathBuf,

    /// Image index inside a multi-image TIFF.
    #[arg(long, default_value_t = DEFAULT_IMAGE_INDEX, env = "RASTER_IMAGE")]
    pub image: usize,

    /// Source region as `x,y,width,height`.
    #[arg(long, env = "RASTER_REGION")]
    pub region: Option<String>,

    /// Keep every n-th column.
    #[arg(long, default_value_t = DEFAULT_SUBSAMPLING, env = "RASTER_X_SUBSAMPLING")]
    pub x_subsampling: u32,

    /// Keep every n-th row.
    #[arg(long, default_value_t = DEFAULT_SUBSAMPLING, env = "RASTER_Y_SUBSAMPLING")]
    pub y_subsampling: u32,

    /// Force the LZW variant (`standard` or `legacy`) instead of sniffing it.
    #[arg(long, env = "RASTER_LZW_VARIANT")]
    pub lzw_variant: Option<String>,

    /// Row palettes kept for multi-palette (PCHG/SHAM/CTBL) images.
    #[arg(long, default_value_t = DEFAULT_PALETTE_CACHE_CAPACITY, env = "RASTER_PALETTE_CACHE")]
    pub palette_cache: usize,
}

impl DecodeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        check_input(&self.input)?;

        if let Some(ref region) = self.region {
            Region::from_str(region).map_err(|e| format!("Invalid region '{}': {}", region, e))?;
        }

        if self.x_subsampling == 0 || self.y_subsampling == 0 {
            return Err("subsampling must be greater than 0".to_string());
        }

        if self.palette_cache == 0 {
            return Err("palette_cache must be greater than 0".to_string());
        }

        if let Some(ref name) = self.lzw_variant {
            if LzwVariant::from_name(name).is_none() {
                return Err(format!(
                    "Unknown LZW variant '{}', expected 'standard' or 'legacy'",
                    name
                ));
            }
        }

        Ok(())
    }

    /// Build library decode parameters (call validate() first).
    pub fn decode_params(&self) -> Result<DecodeParams, String> {
        let mut params = DecodeParams::new()
            .with_subsampling(self.x_subsampling, self.y_subsampling)
            .with_palette_cache_capacity(self.palette_cache);

        if let Some(ref region) = self.region {
            params = params.with_region(Region::from_str(region)?);
        }
        if let Some(ref name) = self.lzw_variant {
            let variant = LzwVariant::from_name(name)
                .ok_or_else(|| format!("Unknown LZW variant '{}'", name))?;
            params = params.with_lzw_variant(variant);
        }

        Ok(params)
    }
}

// =============================================================================
// Encode
// =============================================================================

/// Options of `encode-ilbm`.
#[derive(Args, Debug, Clone)]
pub struct EncodeConfig {
    /// PNG or JPEG image to read.
    pub input: PathBuf,

    /// ILBM file to write.
    pub output: PathBuf,

    /// Store BODY rows without ByteRun1 compression.
    #[arg(long, default_value_t = false, env = "RASTER_UNCOMPRESSED")]
    pub uncompressed: bool,

    /// Always write 24/32-plane true color, even for images with few colors.
    #[arg(long, default_value_t = false)]
    pub true_color: bool,
}

impl EncodeConfig {
    pub fn validate(&self) -> Result<(), String> {
        check_input(&self.input)
    }
}

fn check_input(path: &std::path::Path) -> Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("input path is required".to_string());
    }
    if !path.is_file() {
        return Err(format!("input '{}' is not a readable file", path.display()));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
