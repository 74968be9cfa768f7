//! Capture parameter selection
//!
//! Derives the active resolution, frame rate and bit rate from a camera's
//! capability snapshot or from user overrides. Frame rate and resolution
//! depend only on capability; bit rate depends on both and is recomputed
//! whenever either changes.

use crate::types::{BitRate, CapabilitySnapshot, FrameRate, Resolution, SelectionState};
use serde::{Deserialize, Serialize};

/// Assumed encoder efficiency used to estimate a sufficient bit rate
pub const COMPRESSION_RATIO: f64 = 0.8;

/// Highest enumerated frame rate not above the device maximum
pub fn derive_frame_rate(snapshot: &CapabilitySnapshot) -> Option<FrameRate> {
    let max = snapshot.max_frame_rate?;
    FrameRate::ALL
        .into_iter()
        .rev()
        .find(|rate| rate.fps() as f64 <= max)
}

/// First resolution, in priority order, that fits the device maxima
pub fn derive_resolution(snapshot: &CapabilitySnapshot) -> Option<Resolution> {
    let (max_width, max_height) = (snapshot.max_width?, snapshot.max_height?);
    Resolution::ALL
        .into_iter()
        .find(|res| res.fits_within(max_width, max_height))
}

/// Estimated bits per second needed for the given resolution and frame rate
pub fn target_bit_rate(resolution: Resolution, frame_rate: FrameRate) -> f64 {
    let (width, height) = resolution.dimensions();
    width as f64 * height as f64 * frame_rate.fps() as f64 * COMPRESSION_RATIO
}

/// Largest enumerated bit rate not above the target.
///
/// Returns `None` when even the smallest value exceeds the target; there is
/// deliberately no fallback to the smallest entry.
pub fn derive_bit_rate(resolution: Resolution, frame_rate: FrameRate) -> Option<BitRate> {
    let target = target_bit_rate(resolution, frame_rate);
    BitRate::ALL
        .into_iter()
        .find(|rate| rate.bits_per_second() as f64 <= target)
}

/// One entry of the frame-rate selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRateOption {
    pub value: FrameRate,
    pub label: String,
    /// Above the device's maximum frame rate
    pub disabled: bool,
}

/// Frame-rate entries with those above `max_frame_rate` disabled
pub fn frame_rate_options(snapshot: Option<&CapabilitySnapshot>) -> Vec<FrameRateOption> {
    let max = snapshot.and_then(|s| s.max_frame_rate);
    FrameRate::ALL
        .into_iter()
        .map(|value| FrameRateOption {
            value,
            label: value.label(),
            disabled: max.map(|m| value.fps() as f64 > m).unwrap_or(false),
        })
        .collect()
}

/// What changed upstream of a recomputation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Capability,
    Resolution,
    FrameRate,
}

/// Holds the capability snapshot and the current selection, re-running the
/// derivation pipeline in dependency order after every upstream change.
#[derive(Debug, Clone, Default)]
pub struct ParameterSelector {
    capability: Option<CapabilitySnapshot>,
    state: SelectionState,
}

impl ParameterSelector {
    /// Start from configured defaults; bit rate is derived from them
    pub fn new(resolution: Option<Resolution>, frame_rate: Option<FrameRate>) -> Self {
        let mut selector = Self {
            capability: None,
            state: SelectionState {
                resolution,
                frame_rate,
                bit_rate: None,
            },
        };
        selector.update(Change::FrameRate);
        selector
    }

    pub fn selection(&self) -> SelectionState {
        self.state
    }

    pub fn capability(&self) -> Option<&CapabilitySnapshot> {
        self.capability.as_ref()
    }

    /// Install a freshly probed snapshot (or `None` when probing failed)
    pub fn apply_capability(&mut self, snapshot: Option<CapabilitySnapshot>) -> SelectionState {
        self.capability = snapshot;
        self.update(Change::Capability)
    }

    /// User override of the resolution
    pub fn set_resolution(&mut self, resolution: Option<Resolution>) -> SelectionState {
        self.state.resolution = resolution;
        self.update(Change::Resolution)
    }

    /// User override of the frame rate
    pub fn set_frame_rate(&mut self, frame_rate: Option<FrameRate>) -> SelectionState {
        self.state.frame_rate = frame_rate;
        self.update(Change::FrameRate)
    }

    pub fn frame_rate_options(&self) -> Vec<FrameRateOption> {
        frame_rate_options(self.capability.as_ref())
    }

    fn update(&mut self, change: Change) -> SelectionState {
        if change == Change::Capability {
            if let Some(snapshot) = self.capability {
                // Undefined capability values keep the current selection
                if snapshot.max_frame_rate.is_some() {
                    self.state.frame_rate = derive_frame_rate(&snapshot);
                }
                if snapshot.max_width.is_some() && snapshot.max_height.is_some() {
                    self.state.resolution = derive_resolution(&snapshot);
                }
            }
        }

        // Bit rate only follows once both inputs are concrete. Clearing either
        // input keeps the last derived bit rate in effect.
        if let (Some(resolution), Some(frame_rate)) = (self.state.resolution, self.state.frame_rate)
        {
            self.state.bit_rate = derive_bit_rate(resolution, frame_rate);
            if self.state.bit_rate.is_none() {
                log::warn!(
                    "No bit rate fits {} @ {} fps (target {:.0} bps); leaving bit rate unset",
                    resolution,
                    frame_rate,
                    target_bit_rate(resolution, frame_rate)
                );
            }
        }

        log::debug!("Selection after {:?} change: {:?}", change, self.state);
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fps(max: f64) -> CapabilitySnapshot {
        CapabilitySnapshot::new(Some(max), None, None)
    }

    #[test]
    fn test_frame_rate_derivation() {
        assert_eq!(derive_frame_rate(&fps(10.0)), None);
        assert_eq!(derive_frame_rate(&fps(45.0)), Some(FrameRate::Fps30));
        assert_eq!(derive_frame_rate(&fps(60.0)), Some(FrameRate::Fps60));
        assert_eq!(derive_frame_rate(&fps(29.97)), Some(FrameRate::Fps24));
        assert_eq!(derive_frame_rate(&CapabilitySnapshot::default()), None);
    }

    #[test]
    fn test_resolution_derivation_takes_first_fit() {
        let snap = CapabilitySnapshot::new(None, Some(1920), Some(1080));
        assert_eq!(derive_resolution(&snap), Some(Resolution::Hd1080));

        let portrait_sensor = CapabilitySnapshot::new(None, Some(1080), Some(1920));
        assert_eq!(derive_resolution(&portrait_sensor), Some(Resolution::Sd480));

        let tiny = CapabilitySnapshot::new(None, Some(320), Some(240));
        assert_eq!(derive_resolution(&tiny), None);
    }

    #[test]
    fn test_bit_rate_derivation() {
        assert_eq!(
            derive_bit_rate(Resolution::Hd1080, FrameRate::Fps30),
            Some(BitRate::Bps8M)
        );
        assert_eq!(
            derive_bit_rate(Resolution::Sd480, FrameRate::Fps15),
            Some(BitRate::Bps800K)
        );
        assert_eq!(
            target_bit_rate(Resolution::Hd1080, FrameRate::Fps30),
            49_766_400.0
        );
    }

    #[test]
    fn test_selector_keeps_defaults_without_capability() {
        let mut selector = ParameterSelector::new(Some(Resolution::Hd720), Some(FrameRate::Fps30));
        let state = selector.apply_capability(None);
        assert_eq!(state.resolution, Some(Resolution::Hd720));
        assert_eq!(state.frame_rate, Some(FrameRate::Fps30));
        assert_eq!(state.bit_rate, Some(BitRate::Bps8M));
    }

    #[test]
    fn test_selector_partial_capability_retains_resolution() {
        let mut selector = ParameterSelector::new(Some(Resolution::Hd1080), None);
        let state = selector.apply_capability(Some(CapabilitySnapshot::new(Some(24.0), None, Some(720))));
        assert_eq!(state.resolution, Some(Resolution::Hd1080));
        assert_eq!(state.frame_rate, Some(FrameRate::Fps24));
        assert!(state.bit_rate.is_some());
    }

    #[test]
    fn test_selector_recomputes_bit_rate_on_override() {
        let mut selector = ParameterSelector::default();
        selector.apply_capability(Some(CapabilitySnapshot::new(
            Some(30.0),
            Some(1920),
            Some(1080),
        )));
        assert_eq!(selector.selection().bit_rate, Some(BitRate::Bps8M));

        let state = selector.set_resolution(Some(Resolution::Sd480));
        assert_eq!(state.frame_rate, Some(FrameRate::Fps30));
        assert_eq!(state.bit_rate, Some(BitRate::Bps800K));
    }

    #[test]
    fn test_bit_rate_waits_for_both_inputs() {
        let mut selector = ParameterSelector::default();
        let state = selector.set_resolution(Some(Resolution::Hd720));
        assert_eq!(state.bit_rate, None);
        let state = selector.set_frame_rate(Some(FrameRate::Fps15));
        assert_eq!(state.bit_rate, Some(BitRate::Bps8M));
    }

    #[test]
    fn test_unset_input_keeps_last_bit_rate() {
        let mut selector = ParameterSelector::default();
        selector.set_resolution(Some(Resolution::Uhd2160));
        let state = selector.set_frame_rate(Some(FrameRate::Fps60));
        assert_eq!(state.bit_rate, Some(BitRate::Bps8M));

        let state = selector.set_frame_rate(None);
        assert_eq!(state.bit_rate, Some(BitRate::Bps8M));

        let state = selector.set_resolution(Some(Resolution::Sd480));
        assert_eq!(state.frame_rate, None);
        assert_eq!(state.bit_rate, Some(BitRate::Bps8M));
    }

    #[test]
    fn test_frame_rate_options_disable_above_max() {
        let snap = fps(30.0);
        let options = frame_rate_options(Some(&snap));
        let disabled: Vec<u32> = options
            .iter()
            .filter(|o| o.disabled)
            .map(|o| o.value.fps())
            .collect();
        assert_eq!(disabled, vec![60]);
        assert!(frame_rate_options(None).iter().all(|o| !o.disabled));
    }
}
