//! Color schemes and multi-stop interpolation engine.

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

/// Available color schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    /// Blue -> Cyan -> Green -> Yellow -> Red (oxygenation index heat map)
    Oxygenation,
    /// Black -> White (reflectance and single bands)
    Grayscale,
    /// Blue -> White -> Red (signed index differences)
    Divergent,
    /// Black -> Dark red -> Red (mask overlays)
    Reds,
}

impl ColorScheme {
    /// All available schemes, useful for CLI help text.
    pub const ALL: &[ColorScheme] = &[
        Self::Oxygenation,
        Self::Grayscale,
        Self::Divergent,
        Self::Reds,
    ];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Oxygenation => "Oxygenation",
            Self::Grayscale => "Grayscale",
            Self::Divergent => "Divergent",
            Self::Reds => "Reds",
        }
    }
}

// ─── Color stop definitions ─────────────────────────────────────────────

const OXYGENATION_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 0, 0, 143),
    ColorStop::new(0.25, 0, 112, 255),
    ColorStop::new(0.50, 80, 255, 160),
    ColorStop::new(0.75, 255, 208, 0),
    ColorStop::new(1.00, 128, 0, 0),
];

const GRAYSCALE_STOPS: &[ColorStop] = &[
    ColorStop::new(0.0, 0, 0, 0),
    ColorStop::new(1.0, 255, 255, 255),
];

const DIVERGENT_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 33, 102, 172),
    ColorStop::new(0.25, 103, 169, 207),
    ColorStop::new(0.50, 247, 247, 247),
    ColorStop::new(0.75, 239, 138, 98),
    ColorStop::new(1.00, 178, 24, 43),
];

const REDS_STOPS: &[ColorStop] = &[
    ColorStop::new(0.0, 20, 0, 0),
    ColorStop::new(0.5, 160, 30, 30),
    ColorStop::new(1.0, 255, 80, 60),
];

fn stops(scheme: ColorScheme) -> &'static [ColorStop] {
    match scheme {
        ColorScheme::Oxygenation => OXYGENATION_STOPS,
        ColorScheme::Grayscale => GRAYSCALE_STOPS,
        ColorScheme::Divergent => DIVERGENT_STOPS,
        ColorScheme::Reds => REDS_STOPS,
    }
}

/// Evaluate a scheme at position `t` in [0, 1] (clamped).
///
/// Linearly interpolates between the surrounding color stops.
pub fn evaluate(scheme: ColorScheme, t: f64) -> Rgb {
    let stops = stops(scheme);
    let t = t.clamp(0.0, 1.0);

    let mut lower = stops[0];
    let mut upper = stops[stops.len() - 1];

    for window in stops.windows(2) {
        if t >= window[0].t && t <= window[1].t {
            lower = window[0];
            upper = window[1];
            break;
        }
    }

    let span = upper.t - lower.t;
    let f = if span.abs() < f64::EPSILON {
        0.0
    } else {
        (t - lower.t) / span
    };

    Rgb::new(
        lerp(lower.color.r, upper.color.r, f),
        lerp(lower.color.g, upper.color.g, f),
        lerp(lower.color.b, upper.color.b, f),
    )
}

fn lerp(a: u8, b: u8, f: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * f).round() as u8
}
