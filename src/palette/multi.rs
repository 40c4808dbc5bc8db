//! Per-scanline palette changes (PCHG, SHAM, CTBL).
//!
//! # Key Concepts
//!
//! - **Change list**: a sparse map from scanline to register writes. PCHG
//!   may also carry writes that apply before the first line.
//!
//! - **Replay**: the palette for line `n` is the base palette with every
//!   change of lines `0..=n` applied in order.
//!
//! - **Resolver**: decoding walks rows top to bottom, so
//!   [`PaletteResolver`] keeps the last resolved line and only replays the
//!   lines in between. Random access falls back to an LRU of resolved
//!   palettes keyed by (palette generation, line).
//!
//! ```text
//! row 0   base + initial + changes[0]
//! row 1   row 0 + changes[1]            (cursor, no replay)
//! row 7   row 1 + changes[2..=7]
//! row 3   cache hit, or base + replay of 0..=3
//! ```

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use tracing::warn;

use crate::error::Warning;

use super::{Palette, Rgba};

/// Default number of resolved row palettes kept for random access
pub const DEFAULT_PALETTE_CACHE_CAPACITY: usize = 64;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// Change list
// =============================================================================

/// A single register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteChange {
    pub register: u16,
    pub color: Rgba,
}

/// Which chunk the changes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiPaletteKind {
    Pchg,
    Sham,
    Ctbl,
}

impl MultiPaletteKind {
    pub fn name(self) -> &'static str {
        match self {
            MultiPaletteKind::Pchg => "PCHG",
            MultiPaletteKind::Sham => "SHAM",
            MultiPaletteKind::Ctbl => "CTBL",
        }
    }
}

/// Register changes addressed by scanline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiPalette {
    kind: MultiPaletteKind,
    generation: u64,
    initial: Vec<PaletteChange>,
    lines: Vec<Vec<PaletteChange>>,
}

impl MultiPalette {
    /// Wrap a change list. `lines[n]` holds the writes for scanline `n`.
    pub fn new(
        kind: MultiPaletteKind,
        initial: Vec<PaletteChange>,
        lines: Vec<Vec<PaletteChange>>,
    ) -> Self {
        Self {
            kind,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            initial,
            lines,
        }
    }

    pub fn kind(&self) -> MultiPaletteKind {
        self.kind
    }

    /// Identity used to key cached palettes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of scanlines with a change slot.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Writes applied before line 0.
    pub fn initial(&self) -> &[PaletteChange] {
        &self.initial
    }

    /// Writes for one scanline.
    pub fn changes(&self, line: usize) -> &[PaletteChange] {
        self.lines.get(line).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of register writes.
    pub fn total_changes(&self) -> usize {
        self.initial.len() + self.lines.iter().map(Vec::len).sum::<usize>()
    }

    /// Scanline whose palette serves image row `row`.
    ///
    /// SHAM and CTBL store one palette per line pair in interlaced images.
    pub fn line_for_row(&self, row: u32, laced: bool) -> u32 {
        if laced && self.kind != MultiPaletteKind::Pchg {
            row / 2
        } else {
            row
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RowPaletteKey {
    generation: u64,
    line: u32,
}

/// Materializes the palette for each row of a multi-palette image.
pub struct PaletteResolver<'a> {
    base: &'a Palette,
    multi: &'a MultiPalette,
    laced: bool,
    cursor: Option<(u32, Palette)>,
    cache: LruCache<RowPaletteKey, Palette>,
    warnings: Vec<Warning>,
}

impl<'a> PaletteResolver<'a> {
    /// Create a resolver with an LRU of `cache_capacity` row palettes.
    pub fn new(
        base: &'a Palette,
        multi: &'a MultiPalette,
        laced: bool,
        cache_capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            base,
            multi,
            laced,
            cursor: None,
            cache: LruCache::new(capacity),
            warnings: Vec::new(),
        }
    }

    /// Palette for image row `row`.
    ///
    /// Rows past the last change line reuse the last palette.
    pub fn palette_for_row(&mut self, row: u32) -> &Palette {
        let mut line = self.multi.line_for_row(row, self.laced);
        let lines = self.multi.line_count() as u32;
        if line >= lines && lines > 0 {
            self.warn(Warning::PaletteRowOutOfRange { row: line, rows: lines });
            line = lines - 1;
        }

        let resolved = match self.cursor.take() {
            Some((at, palette)) if at == line => palette,
            Some((at, mut palette)) if at < line => {
                self.cache.put(
                    RowPaletteKey {
                        generation: self.multi.generation(),
                        line: at,
                    },
                    palette.clone(),
                );
                for next in at + 1..=line {
                    self.apply_line(&mut palette, next);
                }
                palette
            }
            previous => {
                if let Some((at, palette)) = previous {
                    self.cache.put(
                        RowPaletteKey {
                            generation: self.multi.generation(),
                            line: at,
                        },
                        palette,
                    );
                }
                self.lookup_or_replay(line)
            }
        };

        &self.cursor.insert((line, resolved)).1
    }

    /// Warnings raised so far, each reported once.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    fn lookup_or_replay(&mut self, line: u32) -> Palette {
        let key = RowPaletteKey {
            generation: self.multi.generation(),
            line,
        };
        if let Some(palette) = self.cache.get(&key) {
            return palette.clone();
        }

        let mut palette = self.base.clone();
        let multi = self.multi;
        for change in multi.initial() {
            self.apply_change(&mut palette, change, -1);
        }
        for next in 0..=line {
            self.apply_line(&mut palette, next);
        }
        palette
    }

    fn apply_line(&mut self, palette: &mut Palette, line: u32) {
        let multi = self.multi;
        for change in multi.changes(line as usize) {
            self.apply_change(palette, change, line as i32);
        }
    }

    fn apply_change(&mut self, palette: &mut Palette, change: &PaletteChange, line: i32) {
        if !palette.set(change.register as usize, change.color) {
            self.warn(Warning::PaletteIndexOutOfRange {
                register: change.register,
                palette_len: palette.len(),
                row: line,
            });
        }
    }

    fn warn(&mut self, warning: Warning) {
        if !self.warnings.contains(&warning) {
            warn!("{}", warning);
            self.warnings.push(warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Palette {
        Palette::new(vec![Rgba::rgb(0, 0, 0); 16])
    }

    fn set(register: u16, r: u8, g: u8, b: u8) -> PaletteChange {
        PaletteChange {
            register,
            color: Rgba::rgb(r, g, b),
        }
    }

    fn two_step_changes() -> MultiPalette {
        let mut lines = vec![Vec::new(); 20];
        lines[0] = vec![set(5, 1, 2, 3)];
        lines[10] = vec![set(5, 4, 5, 6)];
        MultiPalette::new(MultiPaletteKind::Pchg, Vec::new(), lines)
    }

    // -------------------------------------------------------------------------
    // Sequential access
    // -------------------------------------------------------------------------

    #[test]
    fn test_scanline_resolution() {
        let base = base();
        let multi = two_step_changes();
        let mut resolver = PaletteResolver::new(&base, &multi, false, 4);

        assert_eq!(resolver.palette_for_row(5).color(5), Rgba::rgb(1, 2, 3));
        assert_eq!(resolver.palette_for_row(15).color(5), Rgba::rgb(4, 5, 6));
        assert!(resolver.warnings().is_empty());
    }

    #[test]
    fn test_every_row_in_order() {
        let base = base();
        let multi = two_step_changes();
        let mut resolver = PaletteResolver::new(&base, &multi, false, 4);

        for row in 0..20 {
            let expected = if row < 10 {
                Rgba::rgb(1, 2, 3)
            } else {
                Rgba::rgb(4, 5, 6)
            };
            assert_eq!(resolver.palette_for_row(row).color(5), expected, "row {}", row);
        }
    }

    // -------------------------------------------------------------------------
    // Random access
    // -------------------------------------------------------------------------

    #[test]
    fn test_backwards_access_replays() {
        let base = base();
        let multi = two_step_changes();
        let mut resolver = PaletteResolver::new(&base, &multi, false, 1);

        assert_eq!(resolver.palette_for_row(15).color(5), Rgba::rgb(4, 5, 6));
        assert_eq!(resolver.palette_for_row(2).color(5), Rgba::rgb(1, 2, 3));
        assert_eq!(resolver.palette_for_row(12).color(5), Rgba::rgb(4, 5, 6));
    }

    #[test]
    fn test_initial_changes_apply_before_line_zero() {
        let base = base();
        let multi = MultiPalette::new(
            MultiPaletteKind::Pchg,
            vec![set(1, 9, 9, 9)],
            vec![Vec::new(); 2],
        );
        let mut resolver = PaletteResolver::new(&base, &multi, false, 2);
        assert_eq!(resolver.palette_for_row(0).color(1), Rgba::rgb(9, 9, 9));
    }

    // -------------------------------------------------------------------------
    // Soft errors
    // -------------------------------------------------------------------------

    #[test]
    fn test_out_of_range_register_warns() {
        let base = base();
        let multi = MultiPalette::new(
            MultiPaletteKind::Pchg,
            Vec::new(),
            vec![vec![set(40, 1, 1, 1), set(2, 7, 7, 7)]],
        );
        let mut resolver = PaletteResolver::new(&base, &multi, false, 2);

        assert_eq!(resolver.palette_for_row(0).color(2), Rgba::rgb(7, 7, 7));
        assert_eq!(
            resolver.warnings(),
            &[Warning::PaletteIndexOutOfRange {
                register: 40,
                palette_len: 16,
                row: 0
            }]
        );
    }

    #[test]
    fn test_rows_past_end_reuse_last_palette() {
        let base = base();
        let multi = two_step_changes();
        let mut resolver = PaletteResolver::new(&base, &multi, false, 2);

        assert_eq!(resolver.palette_for_row(25).color(5), Rgba::rgb(4, 5, 6));
        assert_eq!(
            resolver.take_warnings(),
            vec![Warning::PaletteRowOutOfRange { row: 25, rows: 20 }]
        );
    }

    #[test]
    fn test_laced_sham_uses_line_pairs() {
        let base = base();
        let lines = vec![vec![set(0, 1, 1, 1)], vec![set(0, 2, 2, 2)]];
        let multi = MultiPalette::new(MultiPaletteKind::Sham, Vec::new(), lines);
        let mut resolver = PaletteResolver::new(&base, &multi, true, 2);

        assert_eq!(resolver.palette_for_row(1).color(0), Rgba::rgb(1, 1, 1));
        assert_eq!(resolver.palette_for_row(2).color(0), Rgba::rgb(2, 2, 2));
        assert_eq!(multi.line_for_row(3, false), 3);
    }
}
