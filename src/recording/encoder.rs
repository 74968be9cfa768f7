//! H.264 encoder wrapper using openh264

use crate::errors::CaptureError;
use openh264::encoder::{BitRate, Encoder, EncoderConfig, FrameType, RateControlMode};
use openh264::formats::YUVBuffer;
use openh264::OpenH264API;

pub struct H264Encoder {
    encoder: Encoder,
    width: u32,
    height: u32,
    frame_count: u64,
}

impl H264Encoder {
    /// Create an encoder for frames of the given size.
    ///
    /// openh264 infers dimensions from each YUV source. With a bit rate the
    /// encoder runs bitrate-mode rate control targeting it; without one it
    /// keeps openh264's defaults.
    pub fn new(width: u32, height: u32, bits_per_second: Option<u64>) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(CaptureError::Recorder(format!(
                "H.264 needs even, non-zero dimensions, got {}x{}",
                width, height
            )));
        }

        let encoder = match bits_per_second {
            Some(bps) => {
                log::debug!("Encoder {}x{} targeting {} bps", width, height, bps);
                let config = EncoderConfig::new()
                    .rate_control_mode(RateControlMode::Bitrate)
                    .bitrate(BitRate::from_bps(bps.min(u32::MAX as u64) as u32));
                Encoder::with_api_config(OpenH264API::from_source(), config)
            }
            None => Encoder::new(),
        }
        .map_err(|e| CaptureError::Recorder(format!("Failed to create encoder: {}", e)))?;

        Ok(Self {
            encoder,
            width,
            height,
            frame_count: 0,
        })
    }

    /// Encode an RGB24 frame into Annex B NAL units
    pub fn encode_rgb(&mut self, rgb: &[u8]) -> Result<EncodedFrame, CaptureError> {
        let expected = (self.width * self.height * 3) as usize;
        if rgb.len() != expected {
            return Err(CaptureError::Recorder(format!(
                "Invalid frame size: expected {} bytes, got {}",
                expected,
                rgb.len()
            )));
        }

        let yuv = rgb_to_yuv420(rgb, self.width, self.height);
        let source = YUVBuffer::from_vec(yuv, self.width as usize, self.height as usize);

        let bitstream = self
            .encoder
            .encode(&source)
            .map_err(|e| CaptureError::Recorder(format!("Encoding failed: {}", e)))?;

        self.frame_count += 1;

        Ok(EncodedFrame {
            is_keyframe: matches!(bitstream.frame_type(), FrameType::IDR | FrameType::I),
            data: bitstream.to_vec(),
        })
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Annex B data, start codes included
    pub data: Vec<u8>,
    pub is_keyframe: bool,
}

/// BT.601 RGB24 to planar YUV420 with 2x2 chroma subsampling
fn rgb_to_yuv420(rgb: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let y_size = w * h;
    let uv_size = (w / 2) * (h / 2);

    let mut yuv = vec![0u8; y_size + uv_size * 2];
    let (y_plane, chroma) = yuv.split_at_mut(y_size);
    let (u_plane, v_plane) = chroma.split_at_mut(uv_size);

    for (row, line) in rgb.chunks_exact(w * 3).enumerate().take(h) {
        for (col, px) in line.chunks_exact(3).enumerate() {
            let (r, g, b) = (px[0] as i32, px[1] as i32, px[2] as i32);
            let luma = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
            y_plane[row * w + col] = luma.clamp(0, 255) as u8;

            if row % 2 == 0 && col % 2 == 0 {
                let idx = (row / 2) * (w / 2) + col / 2;
                let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
                let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
                u_plane[idx] = u.clamp(0, 255) as u8;
                v_plane[idx] = v.clamp(0, 255) as u8;
            }
        }
    }

    yuv
}
