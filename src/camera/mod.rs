//! Orbit/pan/zoom camera driven from the shared pointer stream.
//!
//! The rig always looks at `target`; orbit swings the eye around it, pan moves
//! both, zoom changes the distance between them.

use crate::scene::SceneObject;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;
use std::fmt;

const MIN_DISTANCE: f32 = 0.1;
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Radians per pointer pixel.
    pub orbit_sensitivity: f32,
    /// Scaled by the eye-target distance.
    pub pan_sensitivity: f32,
    pub zoom_speed: f32,
    /// Zoom amount per wheel notch, before `zoom_speed`.
    pub wheel_step: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            orbit_sensitivity: 0.01,
            pan_sensitivity: 0.01,
            zoom_speed: 0.5,
            wheel_step: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewPreset {
    #[default]
    Perspective,
    Top,
    Front,
    Side,
}

impl ViewPreset {
    pub fn name(self) -> &'static str {
        match self {
            Self::Perspective => "perspective",
            Self::Top => "top",
            Self::Front => "front",
            Self::Side => "side",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "perspective" => Some(Self::Perspective),
            "top" => Some(Self::Top),
            "front" => Some(Self::Front),
            "side" => Some(Self::Side),
            _ => None,
        }
    }

    fn eye(self) -> Vec3 {
        match self {
            Self::Perspective => Vec3::splat(5.0),
            Self::Top => Vec3::new(0.0, 10.0, 0.0),
            Self::Front => Vec3::new(0.0, 0.0, 10.0),
            Self::Side => Vec3::new(10.0, 0.0, 0.0),
        }
    }
}

impl fmt::Display for ViewPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraDrag {
    Orbit,
    Pan,
}

#[derive(Debug, Clone)]
pub struct CameraRig {
    pub position: Vec3,
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    preset: ViewPreset,
    settings: CameraSettings,
    drag: Option<(CameraDrag, Vec2)>,
}

impl CameraRig {
    pub fn new(settings: CameraSettings) -> Self {
        let mut rig = Self {
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            preset: ViewPreset::Perspective,
            settings,
            drag: None,
        };
        rig.set_preset(ViewPreset::Perspective);
        rig
    }

    pub fn preset(&self) -> ViewPreset {
        self.preset
    }

    pub fn set_preset(&mut self, preset: ViewPreset) {
        self.preset = preset;
        self.target = Vec3::ZERO;
        self.position = preset.eye();
        let (yaw, pitch) = forward_to_yaw_pitch(self.target - self.position);
        self.yaw = yaw;
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.place_eye(self.distance());
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).length().max(MIN_DISTANCE)
    }

    /// Unit view direction, right vector and up vector.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        camera_basis(self.yaw, self.pitch)
    }

    pub fn orbit(&mut self, delta: Vec2) {
        let s = self.settings.orbit_sensitivity;
        let distance = self.distance();
        self.yaw = wrap_angle(self.yaw + delta.x * s);
        self.pitch = (self.pitch - delta.y * s).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.place_eye(distance);
    }

    pub fn pan(&mut self, delta: Vec2) {
        let (_, right, up) = self.basis();
        let scale = self.settings.pan_sensitivity * self.distance();
        let offset = (-right * delta.x + up * delta.y) * scale;
        self.position += offset;
        self.target += offset;
    }

    /// Positive `amount` moves towards the target.
    pub fn zoom(&mut self, amount: f32) {
        let distance = (self.distance() - amount * self.settings.zoom_speed).max(MIN_DISTANCE);
        self.place_eye(distance);
    }

    /// Wheel input: scrolling up (`delta_y < 0`) zooms in.
    pub fn wheel(&mut self, delta_y: f32) {
        if delta_y == 0.0 {
            return;
        }
        self.zoom(-delta_y.signum() * self.settings.wheel_step);
    }

    pub fn begin_drag(&mut self, mode: CameraDrag, at: Vec2) {
        self.drag = Some((mode, at));
    }

    pub fn drag_to(&mut self, at: Vec2) -> bool {
        let Some((mode, last)) = self.drag else {
            return false;
        };
        let delta = at - last;
        match mode {
            CameraDrag::Orbit => self.orbit(delta),
            CameraDrag::Pan => self.pan(delta),
        }
        self.drag = Some((mode, at));
        true
    }

    pub fn end_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn frame_bounds_preserve_orientation(&mut self, center: Vec3, extent: Vec3) {
        let radius = extent.max_element();
        let distance = if radius > 0.0 { radius * 3.0 } else { 3.0 };
        self.target = center;
        self.place_eye(distance);
    }

    /// Frames the given objects. Returns false when there is nothing to frame.
    pub fn frame_objects<'a>(&mut self, objects: impl IntoIterator<Item = &'a SceneObject>) -> bool {
        let mut bounds: Option<(Vec3, Vec3)> = None;
        for object in objects {
            let half = object.transform.scale.abs() * 0.5;
            let lo = object.transform.position - half;
            let hi = object.transform.position + half;
            bounds = Some(match bounds {
                Some((min, max)) => (min.min(lo), max.max(hi)),
                None => (lo, hi),
            });
        }
        let Some((min, max)) = bounds else {
            return false;
        };
        self.frame_bounds_preserve_orientation((min + max) * 0.5, (max - min) * 0.5);
        true
    }

    fn place_eye(&mut self, distance: f32) {
        let (forward, _, _) = self.basis();
        self.position = self.target - forward * distance;
    }
}

fn forward_to_yaw_pitch(forward: Vec3) -> (f32, f32) {
    let dir = forward.normalize_or_zero();
    let yaw = dir.z.atan2(dir.x);
    let pitch = dir.y.clamp(-1.0, 1.0).asin();
    (yaw, pitch)
}

fn camera_basis(yaw: f32, pitch: f32) -> (Vec3, Vec3, Vec3) {
    let cos_pitch = pitch.cos();
    let forward = Vec3::new(yaw.cos() * cos_pitch, pitch.sin(), yaw.sin() * cos_pitch);
    let right = Vec3::new(-yaw.sin(), 0.0, yaw.cos());
    let up = right.cross(forward).normalize_or_zero();
    (forward, right, up)
}

fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if angle.is_finite() {
        (angle + PI).rem_euclid(TAU) - PI
    } else {
        angle
    }
}
