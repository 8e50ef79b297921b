use crate::mosaic::Mosaic;
use crate::product::ColorOverrides;
use crate::raster::RasterTile;
use std::fmt;

/// 256-entry RGBA palette for rendering byte-classified rasters.
///
/// The base table comes from a representative tile's embedded palette;
/// product-specific class overrides are applied on top and every other
/// entry keeps its base value.
#[derive(Debug, Clone)]
pub struct ColorMap {
    entries: [(u8, u8, u8, u8); 256],
}

#[derive(Debug)]
pub enum ColorMapError {
    MissingPalette(String),
    BadPaletteLength(usize),
}

impl fmt::Display for ColorMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMapError::MissingPalette(uri) => {
                write!(f, "Raster has no embedded color table: {}", uri)
            }
            ColorMapError::BadPaletteLength(len) => {
                write!(f, "Expected a 256-entry palette, got {} entries", len)
            }
        }
    }
}

impl std::error::Error for ColorMapError {}

impl ColorMap {
    pub fn from_palette(palette: &[(u8, u8, u8, u8)]) -> Result<Self, ColorMapError> {
        if palette.len() != 256 {
            return Err(ColorMapError::BadPaletteLength(palette.len()));
        }

        let mut entries = [(0, 0, 0, 0); 256];
        entries.copy_from_slice(palette);
        Ok(ColorMap { entries })
    }

    /// Base palette from a sample tile's embedded color table.
    pub fn from_tile(tile: &RasterTile, uri: &str) -> Result<Self, ColorMapError> {
        let palette = tile
            .palette
            .as_ref()
            .ok_or_else(|| ColorMapError::MissingPalette(uri.to_string()))?;
        Self::from_palette(palette)
    }

    /// Force the product's emphasis classes to the emphasis color and its
    /// background classes to fully transparent.
    pub fn with_overrides(mut self, overrides: &ColorOverrides) -> Self {
        for &class in overrides.emphasis {
            self.entries[class as usize] = overrides.emphasis_color;
        }
        for &class in overrides.transparent {
            self.entries[class as usize] = (0, 0, 0, 0);
        }
        self
    }

    pub fn entry(&self, class: u8) -> (u8, u8, u8, u8) {
        self.entries[class as usize]
    }

    /// Palette normalized to `[0, 1]` floats, the form plotting frontends
    /// take categorical colormaps in.
    pub fn normalized(&self) -> Vec<[f32; 4]> {
        self.entries
            .iter()
            .map(|(r, g, b, a)| {
                [
                    *r as f32 / 255.0,
                    *g as f32 / 255.0,
                    *b as f32 / 255.0,
                    *a as f32 / 255.0,
                ]
            })
            .collect()
    }

    /// Map a mosaic through the palette into an RGBA8 image buffer.
    pub fn apply(&self, mosaic: &Mosaic) -> Vec<u8> {
        let mut out = Vec::with_capacity(mosaic.data.len() * 4);
        for &class in &mosaic.data {
            let (r, g, b, a) = self.entries[class as usize];
            out.extend_from_slice(&[r, g, b, a]);
        }
        out
    }
}
