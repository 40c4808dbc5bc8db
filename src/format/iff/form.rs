//! FORM accumulation.
//!
//! Chunks are folded into a [`Form`] one at a time with [`Form::with`]. The
//! reducer owns every structural rule about which chunks may appear together:
//!
//! - BMHD, CAMG, CMAP, DGBL, DLOC, DPEL and BODY are singletons
//! - PCHG wins over SHAM and CTBL in either order
//! - a second PCHG, or a second SHAM/CTBL, is rejected
//!
//! ```text
//! Form::new(ILBM)
//!   .with(BMHD)?  -> Ilbm { header }
//!   .with(CMAP)?  -> Ilbm { header, palette }
//!   .with(BODY)?  -> Ilbm { header, palette, body }
//!   .validate()?
//! ```

use serde::Serialize;
use tracing::debug;

use crate::error::IffError;
use crate::format::directory::fourcc_to_string;
use crate::palette::{HamMode, MultiPalette, MultiPaletteKind, Palette};

use super::chunk::{Chunk, ChunkHeader, TYPE_DEEP, TYPE_ILBM, TYPE_PBM, TYPE_RGB8, TYPE_TVPP};
use super::headers::{BitmapHeader, DeepGlobal, DeepLocation, DeepPixel, Masking, ViewMode};

// =============================================================================
// FormType
// =============================================================================

/// Supported FORM types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FormType {
    /// Interleaved bitplanes
    Ilbm,
    /// Chunky 8-bit indices ("PBM ")
    Pbm,
    /// Impulse 24-bit RGB with a genlock bit
    Rgb8,
    /// Chunky multi-element pixels
    Deep,
    /// TVPaint variant of DEEP
    Tvpp,
}

impl FormType {
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            TYPE_ILBM => Some(FormType::Ilbm),
            TYPE_PBM => Some(FormType::Pbm),
            TYPE_RGB8 => Some(FormType::Rgb8),
            TYPE_DEEP => Some(FormType::Deep),
            TYPE_TVPP => Some(FormType::Tvpp),
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        match self {
            FormType::Ilbm => TYPE_ILBM,
            FormType::Pbm => TYPE_PBM,
            FormType::Rgb8 => TYPE_RGB8,
            FormType::Deep => TYPE_DEEP,
            FormType::Tvpp => TYPE_TVPP,
        }
    }

    pub fn name(self) -> String {
        fourcc_to_string(self.id())
    }

    /// DEEP and TVPP use DGBL/DLOC/DPEL instead of BMHD.
    pub fn is_deep(self) -> bool {
        matches!(self, FormType::Deep | FormType::Tvpp)
    }
}

// =============================================================================
// ILBM family
// =============================================================================

/// Chunks of ILBM, PBM and RGB8 forms.
#[derive(Debug, Clone, PartialEq)]
pub struct IlbmForm {
    pub form_type: FormType,
    pub header: Option<BitmapHeader>,
    pub view_mode: Option<ViewMode>,
    pub palette: Option<Palette>,
    pub multi_palette: Option<MultiPalette>,
    pub body: Option<ChunkHeader>,
}

impl IlbmForm {
    fn with(mut self, chunk: Chunk) -> Result<Self, IffError> {
        match chunk {
            Chunk::BitmapHeader(header) => {
                set_once(&mut self.header, header, "BMHD")?;
            }
            Chunk::ViewMode(mode) => {
                set_once(&mut self.view_mode, mode, "CAMG")?;
            }
            Chunk::ColorMap(palette) => {
                set_once(&mut self.palette, palette, "CMAP")?;
            }
            Chunk::MultiPalette(multi) => {
                self.multi_palette = Some(merge_multi_palette(self.multi_palette.take(), multi)?);
            }
            Chunk::Body(body) => {
                set_once(&mut self.body, body, "BODY")?;
            }
            other => {
                debug!(chunk = %other.name(), form = %self.form_type.name(), "Chunk not used by form");
            }
        }
        Ok(self)
    }

    fn validate(&self) -> Result<(), IffError> {
        if self.header.is_none() {
            return Err(IffError::MissingChunk("BMHD"));
        }
        if self.body.is_none() {
            return Err(IffError::MissingChunk("BODY"));
        }
        Ok(())
    }

    pub fn is_ham(&self) -> bool {
        self.view_mode.is_some_and(ViewMode::is_ham)
    }

    pub fn is_ehb(&self) -> bool {
        self.view_mode.is_some_and(ViewMode::is_ehb)
    }

    pub fn is_laced(&self) -> bool {
        self.view_mode.is_some_and(ViewMode::is_laced)
    }

    /// HAM variant implied by CAMG and the plane count.
    pub fn ham_mode(&self) -> Option<HamMode> {
        if !self.is_ham() {
            return None;
        }
        self.header.as_ref().and_then(|h| HamMode::from_planes(h.planes))
    }

    /// Palette index that BMHD marks as transparent.
    pub fn transparent_index(&self) -> Option<usize> {
        self.header
            .as_ref()
            .filter(|h| h.masking == Masking::TransparentColor)
            .map(|h| h.transparent_color as usize)
    }
}

/// Apply the PCHG-over-SHAM/CTBL preference.
fn merge_multi_palette(
    current: Option<MultiPalette>,
    incoming: MultiPalette,
) -> Result<MultiPalette, IffError> {
    let Some(current) = current else {
        return Ok(incoming);
    };

    match (current.kind(), incoming.kind()) {
        (MultiPaletteKind::Pchg, MultiPaletteKind::Pchg) => Err(IffError::DuplicateChunk("PCHG")),
        (MultiPaletteKind::Pchg, _) => {
            debug!(ignored = incoming.kind().name(), "Preferring PCHG palette changes");
            Ok(current)
        }
        (_, MultiPaletteKind::Pchg) => {
            debug!(ignored = current.kind().name(), "Preferring PCHG palette changes");
            Ok(incoming)
        }
        _ => Err(IffError::DuplicateChunk("SHAM/CTBL")),
    }
}

// =============================================================================
// DEEP family
// =============================================================================

/// Chunks of DEEP and TVPP forms.
#[derive(Debug, Clone, PartialEq)]
pub struct DeepForm {
    pub form_type: FormType,
    pub global: Option<DeepGlobal>,
    pub location: Option<DeepLocation>,
    pub pixel: Option<DeepPixel>,
    pub body: Option<ChunkHeader>,
}

impl DeepForm {
    fn with(mut self, chunk: Chunk) -> Result<Self, IffError> {
        match chunk {
            Chunk::DeepGlobal(global) => set_once(&mut self.global, global, "DGBL")?,
            Chunk::DeepLocation(location) => set_once(&mut self.location, location, "DLOC")?,
            Chunk::DeepPixel(pixel) => set_once(&mut self.pixel, pixel, "DPEL")?,
            Chunk::Body(body) => set_once(&mut self.body, body, "DBOD")?,
            other => {
                debug!(chunk = %other.name(), form = %self.form_type.name(), "Chunk not used by form");
            }
        }
        Ok(self)
    }

    fn validate(&self) -> Result<(), IffError> {
        if self.global.is_none() {
            return Err(IffError::MissingChunk("DGBL"));
        }
        if self.pixel.is_none() {
            return Err(IffError::MissingChunk("DPEL"));
        }
        if self.body.is_none() {
            return Err(IffError::MissingChunk("DBOD"));
        }
        Ok(())
    }

    /// Body size: DLOC when present, else the DGBL display size.
    pub fn dimensions(&self) -> Option<(u16, u16)> {
        self.location
            .as_ref()
            .map(|l| (l.width, l.height))
            .or_else(|| self.global.as_ref().map(|g| (g.display_width, g.display_height)))
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: &'static str) -> Result<(), IffError> {
    if slot.is_some() {
        return Err(IffError::DuplicateChunk(name));
    }
    *slot = Some(value);
    Ok(())
}

// =============================================================================
// Form
// =============================================================================

/// The accumulated chunks of one FORM.
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Ilbm(IlbmForm),
    Deep(DeepForm),
}

impl Form {
    /// Empty form of the given type.
    pub fn new(form_type: FormType) -> Self {
        if form_type.is_deep() {
            Form::Deep(DeepForm {
                form_type,
                global: None,
                location: None,
                pixel: None,
                body: None,
            })
        } else {
            Form::Ilbm(IlbmForm {
                form_type,
                header: None,
                view_mode: None,
                palette: None,
                multi_palette: None,
                body: None,
            })
        }
    }

    /// Fold one chunk into the form.
    ///
    /// # Errors
    /// `DuplicateChunk` when a singleton chunk repeats.
    pub fn with(self, chunk: Chunk) -> Result<Form, IffError> {
        match self {
            Form::Ilbm(form) => form.with(chunk).map(Form::Ilbm),
            Form::Deep(form) => form.with(chunk).map(Form::Deep),
        }
    }

    /// Check that the chunks needed for decoding are present.
    pub fn validate(&self) -> Result<(), IffError> {
        match self {
            Form::Ilbm(form) => form.validate(),
            Form::Deep(form) => form.validate(),
        }
    }

    pub fn form_type(&self) -> FormType {
        match self {
            Form::Ilbm(form) => form.form_type,
            Form::Deep(form) => form.form_type,
        }
    }

    pub fn body(&self) -> Option<ChunkHeader> {
        match self {
            Form::Ilbm(form) => form.body,
            Form::Deep(form) => form.body,
        }
    }

    /// Image size in pixels, once the header chunks are known.
    pub fn dimensions(&self) -> Option<(u16, u16)> {
        match self {
            Form::Ilbm(form) => form.header.as_ref().map(|h| (h.width, h.height)),
            Form::Deep(form) => form.dimensions(),
        }
    }

    /// Height hint for CTBL parsing.
    pub fn height(&self) -> Option<u16> {
        self.dimensions().map(|(_, h)| h)
    }

    /// Bits per pixel: BMHD planes, or the DPEL element sum.
    pub fn bits_per_pixel(&self) -> Option<u32> {
        match self {
            Form::Ilbm(form) => form.header.as_ref().map(|h| h.planes as u32),
            Form::Deep(form) => form.pixel.as_ref().map(DeepPixel::bits_per_pixel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::iff::chunk::BODY;
    use crate::palette::PaletteChange;

    fn bmhd() -> Chunk {
        Chunk::BitmapHeader(BitmapHeader::new(4, 2, 2, Masking::None, 0))
    }

    fn body() -> Chunk {
        Chunk::Body(ChunkHeader {
            id: BODY,
            length: 8,
            offset: 48,
        })
    }

    fn multi(kind: MultiPaletteKind) -> Chunk {
        Chunk::MultiPalette(MultiPalette::new(
            kind,
            Vec::new(),
            vec![vec![PaletteChange {
                register: 0,
                color: Default::default(),
            }]],
        ))
    }

    // -------------------------------------------------------------------------
    // Reducer
    // -------------------------------------------------------------------------

    #[test]
    fn test_reduce_minimal_ilbm() {
        let form = Form::new(FormType::Ilbm)
            .with(bmhd())
            .and_then(|f| f.with(Chunk::ColorMap(Palette::grayscale(2))))
            .and_then(|f| f.with(body()))
            .unwrap();

        form.validate().unwrap();
        assert_eq!(form.dimensions(), Some((4, 2)));
        assert_eq!(form.bits_per_pixel(), Some(2));
        assert_eq!(form.body().map(|b| b.offset), Some(48));
    }

    #[test]
    fn test_duplicate_bmhd_rejected() {
        let result = Form::new(FormType::Ilbm).with(bmhd()).and_then(|f| f.with(bmhd()));
        assert!(matches!(result, Err(IffError::DuplicateChunk("BMHD"))));
    }

    #[test]
    fn test_missing_chunks() {
        let form = Form::new(FormType::Pbm).with(body()).unwrap();
        assert!(matches!(form.validate(), Err(IffError::MissingChunk("BMHD"))));

        let form = Form::new(FormType::Ilbm).with(bmhd()).unwrap();
        assert!(matches!(form.validate(), Err(IffError::MissingChunk("BODY"))));

        let form = Form::new(FormType::Deep).with(body()).unwrap();
        assert!(matches!(form.validate(), Err(IffError::MissingChunk("DGBL"))));
    }

    #[test]
    fn test_pchg_preferred_over_sham() {
        for order in [
            [MultiPaletteKind::Sham, MultiPaletteKind::Pchg],
            [MultiPaletteKind::Pchg, MultiPaletteKind::Ctbl],
        ] {
            let form = Form::new(FormType::Ilbm)
                .with(multi(order[0]))
                .and_then(|f| f.with(multi(order[1])))
                .unwrap();
            match form {
                Form::Ilbm(ilbm) => assert_eq!(
                    ilbm.multi_palette.map(|m| m.kind()),
                    Some(MultiPaletteKind::Pchg)
                ),
                other => panic!("unexpected form {:?}", other),
            }
        }
    }

    #[test]
    fn test_duplicate_multi_palettes_rejected() {
        let two_pchg = Form::new(FormType::Ilbm)
            .with(multi(MultiPaletteKind::Pchg))
            .and_then(|f| f.with(multi(MultiPaletteKind::Pchg)));
        assert!(matches!(two_pchg, Err(IffError::DuplicateChunk("PCHG"))));

        let sham_ctbl = Form::new(FormType::Ilbm)
            .with(multi(MultiPaletteKind::Sham))
            .and_then(|f| f.with(multi(MultiPaletteKind::Ctbl)));
        assert!(matches!(sham_ctbl, Err(IffError::DuplicateChunk(_))));
    }

    #[test]
    fn test_deep_dimensions_fall_back_to_dgbl() {
        let global = DeepGlobal {
            display_width: 10,
            display_height: 5,
            compression: 0,
            x_aspect: 1,
            y_aspect: 1,
        };
        let form = Form::new(FormType::Tvpp)
            .with(Chunk::DeepGlobal(global))
            .unwrap();
        assert_eq!(form.dimensions(), Some((10, 5)));

        let form = form
            .with(Chunk::DeepLocation(DeepLocation {
                width: 8,
                height: 4,
                x: 0,
                y: 0,
            }))
            .unwrap();
        assert_eq!(form.dimensions(), Some((8, 4)));
    }

    #[test]
    fn test_view_mode_flags() {
        let form = Form::new(FormType::Ilbm)
            .with(Chunk::BitmapHeader(BitmapHeader::new(4, 2, 6, Masking::TransparentColor, 0)))
            .and_then(|f| f.with(Chunk::ViewMode(ViewMode(ViewMode::HAM | ViewMode::LACE))))
            .unwrap();
        let Form::Ilbm(ilbm) = form else {
            panic!("expected ILBM form");
        };
        assert!(ilbm.is_ham() && ilbm.is_laced() && !ilbm.is_ehb());
        assert_eq!(ilbm.ham_mode(), Some(HamMode::Ham6));
        assert_eq!(ilbm.transparent_index(), Some(0));
    }
}
