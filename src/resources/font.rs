//! Typeface JSON glyph-outline fonts.
//!
//! The format stores one outline string per glyph, made of single-letter
//! commands followed by font-unit coordinates:
//!
//! * `m x y` move to
//! * `l x y` line to
//! * `q x y cx cy` quadratic curve to `(x, y)` with control `(cx, cy)`
//! * `b x y c1x c1y c2x c2y` cubic curve to `(x, y)`
//! * `z` close the current contour
//!
//! Note that curves list the end point *before* their control points.

use std::{collections::HashMap, str::SplitWhitespace};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("invalid typeface json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("glyph {glyph:?}: {reason}")]
    Outline { glyph: char, reason: String },
    #[error("font resolution must be positive, got {0}")]
    Resolution(f32),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypefaceJson {
    glyphs: HashMap<String, GlyphJson>,
    #[serde(default)]
    family_name: String,
    resolution: f32,
    bounding_box: BoundingBoxJson,
    #[serde(default)]
    underline_thickness: f32,
}

#[derive(Deserialize)]
struct GlyphJson {
    ha: f32,
    #[serde(default)]
    o: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoundingBoxJson {
    y_min: f32,
    y_max: f32,
}

/// A point in font units.
pub type FontPoint = [f32; 2];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OutlineCommand {
    MoveTo(FontPoint),
    LineTo(FontPoint),
    QuadTo { ctrl: FontPoint, to: FontPoint },
    CubicTo { ctrl1: FontPoint, ctrl2: FontPoint, to: FontPoint },
    Close,
}

#[derive(Clone, Debug, Default)]
pub struct Glyph {
    /// Horizontal advance in font units.
    pub advance: f32,
    pub outline: Vec<OutlineCommand>,
}

#[derive(Debug)]
pub struct Font {
    pub family: String,
    /// Font units per em.
    pub resolution: f32,
    /// Baseline-to-baseline distance in font units.
    pub line_height: f32,
    glyphs: HashMap<char, Glyph>,
}

impl Font {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FontError> {
        let json: TypefaceJson = serde_json::from_slice(bytes)?;
        if json.resolution <= 0.0 || !json.resolution.is_finite() {
            return Err(FontError::Resolution(json.resolution));
        }
        let mut glyphs = HashMap::with_capacity(json.glyphs.len());
        for (key, glyph) in json.glyphs {
            let mut chars = key.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else {
                log::debug!("skipping multi-character glyph key {key:?}");
                continue;
            };
            let outline = match glyph.o.as_deref() {
                Some(o) => parse_outline(o).map_err(|reason| FontError::Outline { glyph: ch, reason })?,
                None => Vec::new(),
            };
            glyphs.insert(
                ch,
                Glyph {
                    advance: glyph.ha,
                    outline,
                },
            );
        }
        Ok(Self {
            family: json.family_name,
            resolution: json.resolution,
            line_height: json.bounding_box.y_max - json.bounding_box.y_min + json.underline_thickness,
            glyphs,
        })
    }

    /// The glyph for `ch`, falling back to `?` when the font lacks it.
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch).or_else(|| self.glyphs.get(&'?'))
    }

    pub fn has_glyph(&self, ch: char) -> bool {
        self.glyphs.contains_key(&ch)
    }
}

fn next_coord(tokens: &mut SplitWhitespace<'_>) -> Result<f32, String> {
    let token = tokens
        .next()
        .ok_or_else(|| "outline ends in the middle of a command".to_string())?;
    token
        .parse::<f32>()
        .map_err(|_| format!("expected a number, found {token:?}"))
}

fn next_point(tokens: &mut SplitWhitespace<'_>) -> Result<FontPoint, String> {
    Ok([next_coord(tokens)?, next_coord(tokens)?])
}

fn parse_outline(o: &str) -> Result<Vec<OutlineCommand>, String> {
    let mut tokens = o.split_whitespace();
    let mut commands = Vec::new();
    while let Some(op) = tokens.next() {
        let command = match op {
            "m" => OutlineCommand::MoveTo(next_point(&mut tokens)?),
            "l" => OutlineCommand::LineTo(next_point(&mut tokens)?),
            "q" => {
                let to = next_point(&mut tokens)?;
                let ctrl = next_point(&mut tokens)?;
                OutlineCommand::QuadTo { ctrl, to }
            }
            "b" => {
                let to = next_point(&mut tokens)?;
                let ctrl1 = next_point(&mut tokens)?;
                let ctrl2 = next_point(&mut tokens)?;
                OutlineCommand::CubicTo { ctrl1, ctrl2, to }
            }
            "z" => OutlineCommand::Close,
            other => return Err(format!("unknown outline command {other:?}")),
        };
        commands.push(command);
    }
    Ok(commands)
}
