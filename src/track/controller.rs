use anyhow::{bail, Result};
use serde::Serialize;

use crate::actuator::{Actuator, Axis};
use crate::track::selector::{FrameScale, ImageBox};

/// Proportional control law parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlParams {
    /// Error is divided by this before it is applied (gain = 1 / divisor).
    pub gain_divisor: f32,
    /// Errors with magnitude at or below this many pixels leave the axis alone.
    pub deadband_px: f32,
    pub pan_min: f32,
    pub pan_max: f32,
    pub tilt_min: f32,
    pub tilt_max: f32,
    pub initial_pan: f32,
    pub initial_tilt: f32,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            gain_divisor: 180.0,
            deadband_px: 5.0,
            pan_min: 0.0,
            pan_max: 180.0,
            tilt_min: 0.0,
            tilt_max: 135.0,
            initial_pan: 90.0,
            initial_tilt: 90.0,
        }
    }
}

/// Current pan/tilt angles in degrees.
///
/// Only [`TrackingController`] can change the angles, and every change is
/// clamped to the configured range.
///
/// ```compile_fail
/// let mut state = servo_tracker::TrackerState::default();
/// state.pan = 400.0;
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrackerState {
    pan: f32,
    tilt: f32,
}

impl Default for TrackerState {
    fn default() -> Self {
        let params = ControlParams::default();
        Self {
            pan: params.initial_pan,
            tilt: params.initial_tilt,
        }
    }
}

impl TrackerState {
    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn tilt(&self) -> f32 {
        self.tilt
    }
}

/// Pixel error between the target center and the frame center.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrackingError {
    pub pan: f32,
    pub tilt: f32,
}

/// Single-gain proportional pan/tilt controller with hard saturation.
///
/// Owns the tracker state and the actuator, so there is exactly one writer
/// of the angles: whoever holds the controller mutably.
pub struct TrackingController<A: Actuator> {
    params: ControlParams,
    scale: FrameScale,
    state: TrackerState,
    actuator: A,
}

impl<A: Actuator> TrackingController<A> {
    /// Create the controller and drive both axes to their initial angles.
    pub fn new(params: ControlParams, scale: FrameScale, mut actuator: A) -> Result<Self> {
        if !(params.pan_min <= params.pan_max) || !(params.tilt_min <= params.tilt_max) {
            bail!("pan/tilt ranges must be non-empty");
        }
        if !(params.gain_divisor > 0.0) {
            bail!("gain divisor must be positive");
        }
        let state = TrackerState {
            pan: params.initial_pan.clamp(params.pan_min, params.pan_max),
            tilt: params.initial_tilt.clamp(params.tilt_min, params.tilt_max),
        };
        actuator.set_angle(Axis::Pan, state.pan)?;
        actuator.set_angle(Axis::Tilt, state.tilt)?;
        Ok(Self {
            params,
            scale,
            state,
            actuator,
        })
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn params(&self) -> &ControlParams {
        &self.params
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    /// Error of `target` relative to the frame center.
    pub fn error_for(&self, target: &ImageBox) -> TrackingError {
        let (obj_x, obj_y) = target.center();
        let (center_x, center_y) = self.scale.frame_center();
        TrackingError {
            pan: obj_x - center_x,
            tilt: obj_y - center_y,
        }
    }

    /// Run one control step toward `target` and write both axes.
    pub fn track(&mut self, target: &ImageBox) -> Result<TrackerState> {
        let error = self.error_for(target);
        self.apply_error(error)
    }

    /// Apply one pixel error to the state, clamp, and write both axes.
    ///
    /// Both axes are written every call, including when the error sits in the deadband.
    pub fn apply_error(&mut self, error: TrackingError) -> Result<TrackerState> {
        let p = &self.params;
        if error.pan.abs() > p.deadband_px {
            self.state.pan -= error.pan / p.gain_divisor;
        }
        if error.tilt.abs() > p.deadband_px {
            self.state.tilt -= error.tilt / p.gain_divisor;
        }
        self.state.pan = self.state.pan.clamp(p.pan_min, p.pan_max);
        self.state.tilt = self.state.tilt.clamp(p.tilt_min, p.tilt_max);

        self.actuator.set_angle(Axis::Pan, self.state.pan)?;
        self.actuator.set_angle(Axis::Tilt, self.state.tilt)?;
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::MemoryActuator;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn controller() -> TrackingController<MemoryActuator> {
        TrackingController::new(
            ControlParams::default(),
            FrameScale::default(),
            MemoryActuator::new(),
        )
        .unwrap()
    }

    #[test]
    fn homes_actuator_on_construction() {
        let ctl = controller();
        assert_eq!(ctl.actuator().last(Axis::Pan), Some(90.0));
        assert_eq!(ctl.actuator().last(Axis::Tilt), Some(90.0));
        assert_eq!(ctl.state(), TrackerState::default());
    }

    #[test]
    fn deadband_boundary() {
        let mut ctl = controller();
        let state = ctl.apply_error(TrackingError { pan: 5.0, tilt: -5.0 }).unwrap();
        assert_eq!(state.pan(), 90.0);
        assert_eq!(state.tilt(), 90.0);

        let state = ctl.apply_error(TrackingError { pan: 6.0, tilt: -6.0 }).unwrap();
        assert!((state.pan() - (90.0 - 6.0 / 180.0)).abs() < 1e-5);
        assert!((state.tilt() - (90.0 + 6.0 / 180.0)).abs() < 1e-5);
    }

    #[test]
    fn writes_both_axes_every_step() {
        let mut ctl = controller();
        ctl.actuator_mut().clear();
        ctl.apply_error(TrackingError { pan: 0.0, tilt: 0.0 }).unwrap();
        let axes: Vec<Axis> = ctl.actuator().commands().iter().map(|c| c.axis).collect();
        assert_eq!(axes, vec![Axis::Pan, Axis::Tilt]);
    }

    #[test]
    fn target_right_of_center_pans_negative() {
        let mut ctl = controller();
        // Center at (500, 240): pan error 180, tilt error 0.
        let target = ImageBox { x: 450.0, y: 190.0, width: 100.0, height: 100.0 };
        assert_eq!(ctl.error_for(&target), TrackingError { pan: 180.0, tilt: 0.0 });
        let state = ctl.track(&target).unwrap();
        assert!((state.pan() - 89.0).abs() < 1e-5);
        assert_eq!(state.tilt(), 90.0);
    }

    #[test]
    fn saturates_without_windup() {
        let mut ctl = controller();
        let state = ctl.apply_error(TrackingError { pan: -1.0e6, tilt: 1.0e6 }).unwrap();
        assert_eq!(state.pan(), 180.0);
        assert_eq!(state.tilt(), 0.0);
        // A single small opposite error moves straight off the limit.
        let state = ctl.apply_error(TrackingError { pan: 180.0, tilt: -180.0 }).unwrap();
        assert!((state.pan() - 179.0).abs() < 1e-4);
        assert!((state.tilt() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn angles_stay_in_range_for_any_error_sequence() {
        let mut ctl = controller();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5_000 {
            let error = TrackingError {
                pan: rng.gen_range(-5_000.0..5_000.0),
                tilt: rng.gen_range(-5_000.0..5_000.0),
            };
            let state = ctl.apply_error(error).unwrap();
            assert!((0.0..=180.0).contains(&state.pan()));
            assert!((0.0..=135.0).contains(&state.tilt()));
        }
        for extreme in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN, f32::MAX] {
            let state = ctl.apply_error(TrackingError { pan: extreme, tilt: extreme }).unwrap();
            assert!((0.0..=180.0).contains(&state.pan()));
            assert!((0.0..=135.0).contains(&state.tilt()));
        }
    }
}
