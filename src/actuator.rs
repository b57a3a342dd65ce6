//! Pan/tilt actuator boundary.
//!
//! The physical servo driver lives outside this crate. The tracker only
//! needs "set the angle of axis A to N degrees", expressed by [`Actuator`].

use anyhow::Result;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Pan,
    Tilt,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Pan => f.write_str("pan"),
            Axis::Tilt => f.write_str("tilt"),
        }
    }
}

/// Servo driver binding.
///
/// Calls are synchronous and unacknowledged. An error means the device
/// binding itself is broken; the tracker does not retry.
pub trait Actuator: Send {
    fn set_angle(&mut self, axis: Axis, degrees: f32) -> Result<()>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn set_angle(&mut self, axis: Axis, degrees: f32) -> Result<()> {
        (**self).set_angle(axis, degrees)
    }
}

/// Servo board channel assignment for the two axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServoChannels {
    pub pan: u8,
    pub tilt: u8,
}

impl Default for ServoChannels {
    fn default() -> Self {
        Self { pan: 0, tilt: 1 }
    }
}

impl ServoChannels {
    pub fn channel(&self, axis: Axis) -> u8 {
        match axis {
            Axis::Pan => self.pan,
            Axis::Tilt => self.tilt,
        }
    }
}

/// Actuator that only logs the commanded angles.
///
/// Used when no servo board is attached.
#[derive(Debug, Default)]
pub struct LogActuator {
    channels: ServoChannels,
    commands: u64,
}

impl LogActuator {
    pub fn new(channels: ServoChannels) -> Self {
        Self {
            channels,
            commands: 0,
        }
    }

    pub fn commands(&self) -> u64 {
        self.commands
    }
}

impl Actuator for LogActuator {
    fn set_angle(&mut self, axis: Axis, degrees: f32) -> Result<()> {
        self.commands += 1;
        log::debug!(
            "servo[{}] {} -> {:.2} deg",
            self.channels.channel(axis),
            axis,
            degrees
        );
        Ok(())
    }
}

/// One recorded actuator command.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AngleCommand {
    pub axis: Axis,
    pub degrees: f32,
}

/// Actuator that records every command in memory.
#[derive(Debug, Default)]
pub struct MemoryActuator {
    commands: Vec<AngleCommand>,
}

impl MemoryActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[AngleCommand] {
        &self.commands
    }

    /// Last angle written to `axis`, if any.
    pub fn last(&self, axis: Axis) -> Option<f32> {
        self.commands
            .iter()
            .rev()
            .find(|cmd| cmd.axis == axis)
            .map(|cmd| cmd.degrees)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Actuator for MemoryActuator {
    fn set_angle(&mut self, axis: Axis, degrees: f32) -> Result<()> {
        self.commands.push(AngleCommand { axis, degrees });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_actuator_tracks_last_angle_per_axis() {
        let mut act = MemoryActuator::new();
        act.set_angle(Axis::Pan, 90.0).unwrap();
        act.set_angle(Axis::Tilt, 45.0).unwrap();
        act.set_angle(Axis::Pan, 91.5).unwrap();
        assert_eq!(act.commands().len(), 3);
        assert_eq!(act.last(Axis::Pan), Some(91.5));
        assert_eq!(act.last(Axis::Tilt), Some(45.0));
    }

    #[test]
    fn boxed_actuator_forwards_commands() {
        let mut act: Box<dyn Actuator> = Box::new(LogActuator::new(ServoChannels::default()));
        act.set_angle(Axis::Tilt, 10.0).unwrap();
    }
}
