//! Core value types shared by the prober, selector and recording session

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capture resolutions, in priority order (highest quality first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "3840x2160")]
    Uhd2160,
    #[serde(rename = "1920x1080")]
    Hd1080,
    #[serde(rename = "1280x720")]
    Hd720,
    #[serde(rename = "640x480")]
    Sd480,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [
        Resolution::Uhd2160,
        Resolution::Hd1080,
        Resolution::Hd720,
        Resolution::Sd480,
    ];

    /// Natural landscape (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Uhd2160 => (3840, 2160),
            Resolution::Hd1080 => (1920, 1080),
            Resolution::Hd720 => (1280, 720),
            Resolution::Sd480 => (640, 480),
        }
    }

    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Uhd2160 => "4K Ultra HD (3840x2160)",
            Resolution::Hd1080 => "1080p",
            Resolution::Hd720 => "720p",
            Resolution::Sd480 => "480p",
        }
    }

    /// Wire form, e.g. "1920x1080"
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Uhd2160 => "3840x2160",
            Resolution::Hd1080 => "1920x1080",
            Resolution::Hd720 => "1280x720",
            Resolution::Sd480 => "640x480",
        }
    }

    /// Whether both dimensions fit inside the given maxima
    pub fn fits_within(&self, max_width: u32, max_height: u32) -> bool {
        let (w, h) = self.dimensions();
        w <= max_width && h <= max_height
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resolution::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| format!("Unsupported resolution: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum FrameRate {
    Fps15,
    Fps24,
    Fps30,
    Fps60,
}

impl FrameRate {
    /// Presentation order (ascending)
    pub const ALL: [FrameRate; 4] = [
        FrameRate::Fps15,
        FrameRate::Fps24,
        FrameRate::Fps30,
        FrameRate::Fps60,
    ];

    pub fn fps(&self) -> u32 {
        match self {
            FrameRate::Fps15 => 15,
            FrameRate::Fps24 => 24,
            FrameRate::Fps30 => 30,
            FrameRate::Fps60 => 60,
        }
    }

    pub fn label(&self) -> String {
        format!("{} FPS", self.fps())
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fps())
    }
}

impl TryFrom<u32> for FrameRate {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        FrameRate::ALL
            .into_iter()
            .find(|r| r.fps() == value)
            .ok_or_else(|| format!("Unsupported frame rate: {}", value))
    }
}

impl From<FrameRate> for u32 {
    fn from(rate: FrameRate) -> Self {
        rate.fps()
    }
}

impl FromStr for FrameRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("Unsupported frame rate: {}", s))?;
        FrameRate::try_from(value)
    }
}

/// Recorder bit rates in bits per second, largest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum BitRate {
    Bps8G,
    Bps800M,
    Bps8M,
    Bps800K,
    Bps8K,
    Bps800,
}

impl BitRate {
    pub const ALL: [BitRate; 6] = [
        BitRate::Bps8G,
        BitRate::Bps800M,
        BitRate::Bps8M,
        BitRate::Bps800K,
        BitRate::Bps8K,
        BitRate::Bps800,
    ];

    pub fn bits_per_second(&self) -> u64 {
        match self {
            BitRate::Bps8G => 8_000_000_000,
            BitRate::Bps800M => 800_000_000,
            BitRate::Bps8M => 8_000_000,
            BitRate::Bps800K => 800_000,
            BitRate::Bps8K => 8_000,
            BitRate::Bps800 => 800,
        }
    }

    /// Byte-oriented label shown next to the selector
    pub fn label(&self) -> &'static str {
        match self {
            BitRate::Bps8G => "1 GB bps",
            BitRate::Bps800M => "100 MB bps",
            BitRate::Bps8M => "1 MB bps",
            BitRate::Bps800K => "100 KB bps",
            BitRate::Bps8K => "1 KB bps",
            BitRate::Bps800 => "100 Bytes bps",
        }
    }
}

impl fmt::Display for BitRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

impl TryFrom<u64> for BitRate {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        BitRate::ALL
            .into_iter()
            .find(|r| r.bits_per_second() == value)
            .ok_or_else(|| format!("Unsupported bit rate: {}", value))
    }
}

impl From<BitRate> for u64 {
    fn from(rate: BitRate) -> Self {
        rate.bits_per_second()
    }
}

/// Supported ranges reported by a camera device. Immutable once probed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySnapshot {
    pub max_frame_rate: Option<f64>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl CapabilitySnapshot {
    pub fn new(max_frame_rate: Option<f64>, max_width: Option<u32>, max_height: Option<u32>) -> Self {
        Self {
            max_frame_rate,
            max_width,
            max_height,
        }
    }

    /// Human readable summary for a camera info panel
    pub fn describe(&self) -> String {
        let fps = self
            .max_frame_rate
            .map(|f| format!("{}", f))
            .unwrap_or_else(|| "N/A".to_string());
        let res = match (self.max_width, self.max_height) {
            (Some(w), Some(h)) => format!("{}x{}", w, h),
            _ => "N/A".to_string(),
        };
        format!("Max FPS: {}, Max Resolution(WxH): {}", fps, res)
    }
}

/// The active (resolution, frame rate, bit rate) triple
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub resolution: Option<Resolution>,
    pub frame_rate: Option<FrameRate>,
    pub bit_rate: Option<BitRate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Landscape,
    /// Capture is rotated: width and height are swapped on request
    Portrait,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    #[default]
    Environment,
    User,
}

/// Container/codec pair, chosen once per controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerFormat {
    Webm,
    Mp4,
}

impl ContainerFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ContainerFormat::Webm => "video/webm;codecs=vp8",
            ContainerFormat::Mp4 => "video/mp4",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Webm => ".webm",
            ContainerFormat::Mp4 => ".mp4",
        }
    }

    /// WebM when the recorder accepts it, MP4 otherwise
    pub fn detect(supports: impl Fn(&str) -> bool) -> Self {
        if supports(ContainerFormat::Webm.mime_type()) {
            ContainerFormat::Webm
        } else {
            ContainerFormat::Mp4
        }
    }
}

/// Opaque identifier of a video input device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
