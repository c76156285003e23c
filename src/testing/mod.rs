//! Testing utilities for camhal
//!
//! Synthetic sensor output for exercising sessions without hardware.

pub mod synthetic_data;

pub use synthetic_data::{synthetic_yuyv_frame, yuyv_frame_len};
