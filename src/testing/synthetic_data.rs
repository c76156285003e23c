//! Synthetic YUYV frames
//!
//! A moving gradient that changes every frame, so consumers can tell
//! consecutive frames apart and converters see realistic chroma variation.

/// Byte length of a packed YUYV frame.
pub fn yuyv_frame_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 2
}

/// Create a YUYV 4:2:2 frame with a gradient that shifts with `frame_number`.
///
/// `width` is expected to be even; a trailing odd column is left black.
pub fn synthetic_yuyv_frame(frame_number: u64, width: u32, height: u32) -> Vec<u8> {
    let mut data = vec![0u8; yuyv_frame_len(width, height)];
    let base = (frame_number % 256) as u8;
    let stride = width as usize * 2;

    for y in 0..height as usize {
        let row = &mut data[y * stride..(y + 1) * stride];
        for (pair, chunk) in row.chunks_exact_mut(4).enumerate() {
            let x = pair * 2;
            // Y0 U Y1 V
            chunk[0] = base.wrapping_add((x % 256) as u8);
            chunk[1] = 128u8.wrapping_add((y % 64) as u8);
            chunk[2] = base.wrapping_add(((x + 1) % 256) as u8);
            chunk[3] = 128u8.wrapping_sub((x % 64) as u8);
        }
    }

    data
}
