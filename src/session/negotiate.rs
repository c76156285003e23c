//! Device-affecting diffs applied before a candidate parameter set is accepted.

use crate::params::{keys, ParameterSet};

/// Clamps the candidate's exposure compensation into its declared bounds.
///
/// Returns the EV to program into the sensor when the clamped step count
/// differs from the active one. Bounds of `0/0` (or none) mean exposure
/// compensation is unsupported and the value is left untouched.
pub(crate) fn negotiate_exposure(
    candidate: &mut ParameterSet,
    active: &ParameterSet,
) -> Option<f32> {
    let min = candidate.get_int(keys::MIN_EXPOSURE_COMPENSATION).unwrap_or(0);
    let max = candidate.get_int(keys::MAX_EXPOSURE_COMPENSATION).unwrap_or(0);
    if min == 0 && max == 0 {
        return None;
    }
    if min > max {
        log::warn!("Ignoring inverted exposure compensation bounds [{}, {}]", min, max);
        return None;
    }

    let requested = candidate.get_int(keys::EXPOSURE_COMPENSATION)?;
    let clamped = requested.clamp(min, max);
    if clamped != requested {
        log::debug!(
            "Exposure compensation {} clamped to {} (bounds [{}, {}])",
            requested,
            clamped,
            min,
            max
        );
        candidate.set(keys::EXPOSURE_COMPENSATION, &clamped.to_string());
    }

    let current = active.get_int(keys::EXPOSURE_COMPENSATION).unwrap_or(0);
    if clamped == current {
        return None;
    }

    match candidate.get_float(keys::EXPOSURE_COMPENSATION_STEP) {
        Some(step) => Some(clamped as f32 * step),
        None => {
            log::warn!("Exposure compensation changed without a step size, device left as is");
            None
        }
    }
}

/// Returns the white-balance mode to program when the candidate requests a
/// mode it lists as supported and that differs from the active one.
pub(crate) fn negotiate_white_balance<'a>(
    candidate: &'a ParameterSet,
    active: &ParameterSet,
) -> Option<&'a str> {
    let requested = candidate.get(keys::WHITE_BALANCE)?;
    if !candidate
        .get_list(keys::SUPPORTED_WHITE_BALANCE)
        .contains(&requested)
    {
        log::debug!("White balance '{}' not in supported list, ignoring", requested);
        return None;
    }
    if active.get(keys::WHITE_BALANCE) == Some(requested) {
        return None;
    }
    Some(requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active() -> ParameterSet {
        ParameterSet::unflatten(
            "exposure-compensation=0;min-exposure-compensation=-6;max-exposure-compensation=6;\
             exposure-compensation-step=0.5;whitebalance=auto;whitebalance-values=auto,daylight",
        )
    }

    #[test]
    fn test_exposure_clamped_to_max() {
        let mut candidate = active();
        candidate.set(keys::EXPOSURE_COMPENSATION, "10");
        let ev = negotiate_exposure(&mut candidate, &active());
        assert_eq!(ev, Some(3.0));
        assert_eq!(candidate.get_int(keys::EXPOSURE_COMPENSATION), Some(6));
    }

    #[test]
    fn test_exposure_clamped_to_min() {
        let mut candidate = active();
        candidate.set(keys::EXPOSURE_COMPENSATION, "-9");
        assert_eq!(negotiate_exposure(&mut candidate, &active()), Some(-3.0));
        assert_eq!(candidate.get_int(keys::EXPOSURE_COMPENSATION), Some(-6));
    }

    #[test]
    fn test_exposure_unchanged_is_not_reprogrammed() {
        let mut candidate = active();
        assert_eq!(negotiate_exposure(&mut candidate, &active()), None);
    }

    #[test]
    fn test_exposure_zero_bounds_ignored() {
        let mut candidate = ParameterSet::unflatten(
            "exposure-compensation=4;min-exposure-compensation=0;max-exposure-compensation=0",
        );
        assert_eq!(negotiate_exposure(&mut candidate, &active()), None);
        assert_eq!(candidate.get_int(keys::EXPOSURE_COMPENSATION), Some(4));
    }

    #[test]
    fn test_exposure_without_step_is_accepted_but_not_programmed() {
        let mut candidate = active();
        candidate.remove(keys::EXPOSURE_COMPENSATION_STEP);
        candidate.set(keys::EXPOSURE_COMPENSATION, "2");
        assert_eq!(negotiate_exposure(&mut candidate, &active()), None);
        assert_eq!(candidate.get_int(keys::EXPOSURE_COMPENSATION), Some(2));
    }

    #[test]
    fn test_white_balance_supported_change() {
        let mut candidate = active();
        candidate.set(keys::WHITE_BALANCE, "daylight");
        assert_eq!(negotiate_white_balance(&candidate, &active()), Some("daylight"));
    }

    #[test]
    fn test_white_balance_checked_against_candidate_list() {
        let mut candidate = active();
        candidate.set(keys::WHITE_BALANCE, "twilight");
        assert_eq!(negotiate_white_balance(&candidate, &active()), None);

        candidate.set(keys::SUPPORTED_WHITE_BALANCE, "auto,twilight");
        assert_eq!(negotiate_white_balance(&candidate, &active()), Some("twilight"));
    }

    #[test]
    fn test_white_balance_requires_whole_word_match() {
        let mut candidate = active();
        candidate.set(keys::WHITE_BALANCE, "day");
        assert_eq!(negotiate_white_balance(&candidate, &active()), None);
    }

    #[test]
    fn test_white_balance_same_mode_skipped() {
        assert_eq!(negotiate_white_balance(&active(), &active()), None);
    }
}
