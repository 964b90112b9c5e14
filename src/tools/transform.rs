use super::{AxisConstraint, ToolSettings};
use crate::scene::Transform;
use glam::{Vec2, Vec3};

/// Transform field a tool edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    Translate,
    Rotate,
    Scale,
}

impl TransformMode {
    pub fn history_label(self) -> &'static str {
        match self {
            Self::Translate => "Move Objects",
            Self::Rotate => "Rotate Objects",
            Self::Scale => "Scale Objects",
        }
    }

    /// Key under `transform` in the bound model.
    pub fn field(self) -> &'static str {
        match self {
            Self::Translate => "position",
            Self::Rotate => "rotation",
            Self::Scale => "scale",
        }
    }

    pub fn component(self, transform: &Transform) -> Vec3 {
        match self {
            Self::Translate => transform.position,
            Self::Rotate => transform.rotation,
            Self::Scale => transform.scale,
        }
    }
}

/// Applies one pointer delta (screen pixels, Y down) to `transform`.
pub fn apply_delta(
    mut transform: Transform,
    mode: TransformMode,
    constraint: AxisConstraint,
    delta: Vec2,
    settings: &ToolSettings,
) -> Transform {
    let s = settings.sensitivity;
    let horizontal = delta.x * s;
    match mode {
        TransformMode::Translate => {
            let vertical = -delta.y * s;
            let offset = match constraint {
                AxisConstraint::Free => Vec3::new(horizontal, vertical, 0.0),
                AxisConstraint::X => Vec3::new(horizontal, 0.0, 0.0),
                AxisConstraint::Y => Vec3::new(0.0, vertical, 0.0),
                AxisConstraint::Z => Vec3::new(0.0, 0.0, horizontal),
            };
            transform.position += offset;
        }
        TransformMode::Rotate => match constraint {
            AxisConstraint::X => transform.rotation.x += horizontal,
            AxisConstraint::Free | AxisConstraint::Y => transform.rotation.y += horizontal,
            AxisConstraint::Z => transform.rotation.z += horizontal,
        },
        TransformMode::Scale => {
            let min = settings.min_scale;
            match constraint {
                AxisConstraint::Free => {
                    transform.scale = Vec3::splat((transform.scale.x + horizontal).max(min));
                }
                AxisConstraint::X => transform.scale.x = (transform.scale.x + horizontal).max(min),
                AxisConstraint::Y => transform.scale.y = (transform.scale.y + horizontal).max(min),
                AxisConstraint::Z => transform.scale.z = (transform.scale.z + horizontal).max(min),
            }
        }
    }
    transform
}
