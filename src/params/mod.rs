//! Negotiable camera settings.
//!
//! A [`ParameterSet`] is a string-to-string mapping exchanged with the
//! application in flattened `key=value;key=value` form. The session keeps one
//! accepted set and replaces it wholesale; it is never edited key by key after
//! acceptance.

pub mod keys;

use crate::config::SessionConfig;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: BTreeMap<String, String>,
}

/// One key whose value differs between two parameter sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamChange {
    pub key: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the initial set advertised right after the camera is opened.
    pub fn from_config(config: &SessionConfig) -> Self {
        let mut p = Self::new();
        let camera = &config.camera;
        let picture = &config.picture;
        let exposure = &config.exposure;

        p.set(keys::FACING, camera.facing.as_str());
        p.set(keys::ORIENTATION, &camera.orientation.to_string());

        p.set(keys::PREVIEW_SIZE, &format_size(camera.preview_size));
        p.set(keys::SUPPORTED_PREVIEW_SIZES, &format_size(camera.preview_size));
        p.set(keys::PREVIEW_FORMAT, &camera.preview_format);
        p.set(keys::SUPPORTED_PREVIEW_FORMATS, &camera.preview_format);
        p.set(keys::VIDEO_FRAME_FORMAT, &camera.video_format);
        p.set(keys::PREVIEW_FRAME_RATE, &camera.preview_fps.to_string());
        p.set(
            keys::SUPPORTED_PREVIEW_FRAME_RATES,
            &join(camera.supported_fps.iter().map(|f| f.to_string())),
        );
        let (lo, hi) = (camera.fps_range[0], camera.fps_range[1]);
        p.set(keys::PREVIEW_FPS_RANGE, &format!("{lo},{hi}"));
        p.set(keys::SUPPORTED_PREVIEW_FPS_RANGE, &format!("({lo},{hi})"));

        p.set(keys::PICTURE_SIZE, &format_size(picture.size));
        p.set(keys::SUPPORTED_PICTURE_SIZES, &format_size(picture.size));
        p.set(keys::PICTURE_FORMAT, &picture.format);
        p.set(keys::SUPPORTED_PICTURE_FORMATS, &picture.format);
        p.set(keys::JPEG_QUALITY, &picture.jpeg_quality.to_string());
        p.set(keys::JPEG_THUMBNAIL_WIDTH, &picture.thumbnail_size[0].to_string());
        p.set(keys::JPEG_THUMBNAIL_HEIGHT, &picture.thumbnail_size[1].to_string());
        p.set(keys::JPEG_THUMBNAIL_QUALITY, &picture.thumbnail_quality.to_string());
        p.set(keys::SUPPORTED_JPEG_THUMBNAIL_SIZES, "320x240,0x0");
        p.set(keys::FOCAL_LENGTH, &camera.focal_length.to_string());
        p.set(keys::HORIZONTAL_VIEW_ANGLE, &camera.view_angles[0].to_string());
        p.set(keys::VERTICAL_VIEW_ANGLE, &camera.view_angles[1].to_string());

        p.set(keys::MAX_EXPOSURE_COMPENSATION, &exposure.max.to_string());
        p.set(keys::MIN_EXPOSURE_COMPENSATION, &exposure.min.to_string());
        p.set(keys::EXPOSURE_COMPENSATION_STEP, &exposure.step.to_string());
        p.set(keys::EXPOSURE_COMPENSATION, "0");

        p.set(
            keys::SUPPORTED_WHITE_BALANCE,
            &join(config.white_balance.iter().map(|wb| wb.mode.clone())),
        );
        if let Some(first) = config.white_balance.first() {
            p.set(keys::WHITE_BALANCE, &first.mode);
        }

        p.set(keys::SUPPORTED_FOCUS_MODES, "fixed");
        p.set(keys::FOCUS_MODE, "fixed");
        p
    }

    /// Parses the flattened form. Malformed entries are skipped.
    pub fn unflatten(flat: &str) -> Self {
        let mut p = Self::new();
        for entry in flat.split(';').filter(|e| !e.is_empty()) {
            match entry.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    p.entries.insert(key.to_string(), value.to_string());
                }
                _ => log::warn!("Skipping malformed parameter entry '{}'", entry),
            }
        }
        p
    }

    pub fn flatten(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Sets a value while building a candidate set.
    ///
    /// Keys and values containing the `=`/`;` separators are rejected.
    pub fn set(&mut self, key: &str, value: &str) {
        if key.is_empty() || key.contains(['=', ';']) || value.contains(['=', ';']) {
            log::warn!("Rejecting parameter {}={}: contains a separator", key, value);
            return;
        }
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get(key)?.trim().parse().ok()
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        self.get(key)?.trim().parse().ok()
    }

    /// Parses a `WIDTHxHEIGHT` value.
    pub fn get_size(&self, key: &str) -> Option<(u32, u32)> {
        parse_size(self.get(key)?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn preview_size(&self) -> Option<(u32, u32)> {
        self.get_size(keys::PREVIEW_SIZE)
    }

    pub fn video_size(&self) -> Option<(u32, u32)> {
        self.get_size(keys::VIDEO_SIZE)
    }

    pub fn picture_size(&self) -> Option<(u32, u32)> {
        self.get_size(keys::PICTURE_SIZE)
    }

    pub fn preview_format(&self) -> Option<&str> {
        self.get(keys::PREVIEW_FORMAT)
    }

    pub fn video_format(&self) -> Option<&str> {
        self.get(keys::VIDEO_FRAME_FORMAT)
    }

    pub fn picture_format(&self) -> Option<&str> {
        self.get(keys::PICTURE_FORMAT)
    }

    pub fn preview_frame_rate(&self) -> Option<u32> {
        self.get(keys::PREVIEW_FRAME_RATE)?.trim().parse().ok()
    }

    pub fn recording_hint(&self) -> bool {
        self.get(keys::RECORDING_HINT) == Some(keys::TRUE)
    }

    /// Comma-separated list value split into its members.
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Keys whose values differ between `self` and `other`.
    pub fn diff(&self, other: &ParameterSet) -> Vec<ParamChange> {
        let mut changes = Vec::new();
        for (key, old) in &self.entries {
            match other.entries.get(key) {
                Some(new) if new == old => {}
                new => changes.push(ParamChange {
                    key: key.clone(),
                    old: Some(old.clone()),
                    new: new.cloned(),
                }),
            }
        }
        for (key, new) in &other.entries {
            if !self.entries.contains_key(key) {
                changes.push(ParamChange {
                    key: key.clone(),
                    old: None,
                    new: Some(new.clone()),
                });
            }
        }
        changes
    }
}

pub fn parse_size(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.trim().split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

fn format_size(size: [u32; 2]) -> String {
    format!("{}x{}", size[0], size[1])
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(",")
}
