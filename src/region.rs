use serde::{Deserialize, Serialize};

/// Margin in pixels between the watermark region (or replacement logo) and
/// the frame edges it is anchored to.
pub const EDGE_MARGIN: u32 = 20;

/// Resolution class derived from frame height alone. Exactly one class per
/// (width, height) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Resolution {
    P480,
    P720,
    P1080,
    Uhd4K,
}

impl Resolution {
    pub fn from_height(height: u32) -> Self {
        if height >= 2160 {
            Resolution::Uhd4K
        } else if height >= 1080 {
            Resolution::P1080
        } else if height >= 720 {
            Resolution::P720
        } else {
            Resolution::P480
        }
    }

    /// Canonical reference dimensions the base regions are defined against.
    pub fn reference_dimensions(self) -> (u32, u32) {
        match self {
            Resolution::P480 => (854, 480),
            Resolution::P720 => (1280, 720),
            Resolution::P1080 => (1920, 1080),
            Resolution::Uhd4K => (3840, 2160),
        }
    }

    /// Approximate watermark bounding box (x, y, w, h) for NotebookLM-style
    /// AI tool watermarks at the reference resolution.
    fn base_region(self) -> (u32, u32, u32, u32) {
        match self {
            Resolution::P480 => (700, 440, 140, 40),
            Resolution::P720 => (1100, 660, 180, 60),
            Resolution::P1080 => (1700, 1000, 220, 80),
            Resolution::Uhd4K => (3600, 2080, 400, 160),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Resolution::P480 => "480p",
            Resolution::P720 => "720p",
            Resolution::P1080 => "1080p",
            Resolution::Uhd4K => "4k",
        }
    }
}

/// Corner the source watermark sits in, as stated by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

impl WatermarkPosition {
    /// Strict parse used at the request boundary; unknown values are the
    /// caller's error.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bottom-right" => Some(Self::BottomRight),
            "bottom-left" => Some(Self::BottomLeft),
            "top-right" => Some(Self::TopRight),
            "top-left" => Some(Self::TopLeft),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BottomRight => "bottom-right",
            Self::BottomLeft => "bottom-left",
            Self::TopRight => "top-right",
            Self::TopLeft => "top-left",
        }
    }

    /// FFmpeg overlay position expression against output and overlay
    /// dimensions, mirroring the four region corners.
    pub fn overlay_expr(self) -> &'static str {
        match self {
            Self::BottomRight => "W-w-20:H-h-20",
            Self::BottomLeft => "20:H-h-20",
            Self::TopRight => "W-w-20:20",
            Self::TopLeft => "20:20",
        }
    }
}

/// Rectangular pixel area heuristically believed to contain the source
/// watermark. Computed fresh per job, never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatermarkRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Map actual frame dimensions and a stated corner to the region to blur.
///
/// The base region for the resolution class is scaled linearly per axis by
/// actual/reference, truncated to integers, then anchored 20px from the
/// edges implied by `position` with x and y clamped to >= 0. The far edge
/// may legally extend past the frame for implausible inputs; the heuristic
/// is not validated further.
pub fn calculate(width: u32, height: u32, position: WatermarkPosition) -> WatermarkRegion {
    let resolution = Resolution::from_height(height);
    let (ref_w, ref_h) = resolution.reference_dimensions();
    let (_, _, base_w, base_h) = resolution.base_region();

    let scale_x = f64::from(width) / f64::from(ref_w);
    let scale_y = f64::from(height) / f64::from(ref_h);

    let region_w = (f64::from(base_w) * scale_x) as u32;
    let region_h = (f64::from(base_h) * scale_y) as u32;

    let (x, y) = match position {
        WatermarkPosition::BottomRight => (
            i64::from(width) - i64::from(region_w) - i64::from(EDGE_MARGIN),
            i64::from(height) - i64::from(region_h) - i64::from(EDGE_MARGIN),
        ),
        WatermarkPosition::BottomLeft => (
            i64::from(EDGE_MARGIN),
            i64::from(height) - i64::from(region_h) - i64::from(EDGE_MARGIN),
        ),
        WatermarkPosition::TopRight => (
            i64::from(width) - i64::from(region_w) - i64::from(EDGE_MARGIN),
            i64::from(EDGE_MARGIN),
        ),
        WatermarkPosition::TopLeft => (i64::from(EDGE_MARGIN), i64::from(EDGE_MARGIN)),
    };

    WatermarkRegion {
        x: x.max(0) as u32,
        y: y.max(0) as u32,
        w: region_w,
        h: region_h,
    }
}
