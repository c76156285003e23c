//! Software pixel conversion from the sensor's packed YUYV output.
//!
//! [`SoftwareConverter`] is the reference [`FormatConverter`]: it accepts
//! YUYV frames and produces planar/semi-planar 4:2:0, packed 4:2:2 or RGBA.

use crate::capability::{FormatConverter, FrameDescriptor};
use crate::errors::SessionError;
use crate::format::{FourCc, PixelFormat};
use crate::testing::yuyv_frame_len;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct SoftwareConverter {
    destination: Mutex<Option<PixelFormat>>,
}

impl SoftwareConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn supports(format: PixelFormat) -> bool {
        matches!(
            format,
            PixelFormat::Yuv420p
                | PixelFormat::Yuv420sp
                | PixelFormat::Yuv422i
                | PixelFormat::Rgba8888
        )
    }
}

impl FormatConverter for SoftwareConverter {
    fn set_destination_format(&self, format: PixelFormat) -> Result<(), SessionError> {
        let mut destination = self.destination.lock().unwrap_or_else(PoisonError::into_inner);
        if !Self::supports(format) {
            *destination = None;
            return Err(SessionError::InvalidFormat(format!(
                "no software conversion from YUYV to {format}"
            )));
        }
        *destination = Some(format);
        Ok(())
    }

    fn destination_format(&self) -> Option<PixelFormat> {
        *self.destination.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_valid(&self) -> bool {
        self.destination_format().is_some()
    }

    fn convert(&self, frame: &FrameDescriptor<'_>) -> Result<Vec<u8>, SessionError> {
        let destination = self
            .destination_format()
            .ok_or_else(|| SessionError::InvalidFormat("converter has no destination".into()))?;
        if frame.fourcc != FourCc::YUYV {
            return Err(SessionError::InvalidFormat(format!(
                "cannot convert from {}",
                frame.fourcc
            )));
        }
        let expected = yuyv_frame_len(frame.width, frame.height);
        if frame.data.len() < expected {
            return Err(SessionError::InvalidFormat(format!(
                "short YUYV frame: {} bytes, expected {}",
                frame.data.len(),
                expected
            )));
        }
        let data = &frame.data[..expected];
        let (w, h) = (frame.width, frame.height);
        Ok(match destination {
            PixelFormat::Yuv420p => yuyv_to_i420(data, w, h),
            PixelFormat::Yuv420sp => yuyv_to_nv21(data, w, h),
            PixelFormat::Yuv422i => data.to_vec(),
            PixelFormat::Rgba8888 => yuyv_to_rgba(data, w, h),
            other => {
                return Err(SessionError::InvalidFormat(format!(
                    "no software conversion from YUYV to {other}"
                )))
            }
        })
    }
}

/// Average of the chroma samples of two vertically adjacent rows.
fn chroma_pair(data: &[u8], stride: usize, y: usize, x: usize, offset: usize) -> u8 {
    let top = data[y * stride + x * 2 + offset] as u16;
    let bottom = data[(y + 1) * stride + x * 2 + offset] as u16;
    ((top + bottom + 1) / 2) as u8
}

/// Packed 4:2:2 to planar 4:2:0 (Y plane, U plane, V plane).
pub fn yuyv_to_i420(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let stride = w * 2;
    let (cw, ch) = (w / 2, h / 2);
    let mut out = vec![0u8; w * h + 2 * cw * ch];
    let (luma, chroma) = out.split_at_mut(w * h);
    let (u_plane, v_plane) = chroma.split_at_mut(cw * ch);

    for (y, row) in data.chunks_exact(stride).enumerate().take(h) {
        for x in 0..w {
            luma[y * w + x] = row[x * 2];
        }
    }
    for cy in 0..ch {
        for cx in 0..cw {
            let x = cx * 2;
            u_plane[cy * cw + cx] = chroma_pair(data, stride, cy * 2, x, 1);
            v_plane[cy * cw + cx] = chroma_pair(data, stride, cy * 2, x, 3);
        }
    }
    out
}

/// Packed 4:2:2 to semi-planar 4:2:0 with interleaved V/U.
pub fn yuyv_to_nv21(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let stride = w * 2;
    let (cw, ch) = (w / 2, h / 2);
    let mut out = vec![0u8; w * h + 2 * cw * ch];
    let (luma, vu) = out.split_at_mut(w * h);

    for (y, row) in data.chunks_exact(stride).enumerate().take(h) {
        for x in 0..w {
            luma[y * w + x] = row[x * 2];
        }
    }
    for cy in 0..ch {
        for cx in 0..cw {
            let x = cx * 2;
            let idx = (cy * cw + cx) * 2;
            vu[idx] = chroma_pair(data, stride, cy * 2, x, 3);
            vu[idx + 1] = chroma_pair(data, stride, cy * 2, x, 1);
        }
    }
    out
}

/// Packed 4:2:2 to RGBA using BT.601 coefficients.
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = width as usize * height as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    // Y0 U Y1 V - two pixels per group
    for chunk in data.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            rgba.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
            rgba.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
            rgba.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
            rgba.push(255);
        }
        if rgba.len() >= pixel_count * 4 {
            break;
        }
    }

    rgba
}

/// Packed 4:2:2 to RGB24, used for still-picture encoding.
pub fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    yuyv_to_rgba(data, width, height)
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect()
}
