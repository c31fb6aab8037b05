use crate::config::{AngleRange, LimitsConfig};
use crate::rig::{ArmRig, JointId};
use anyhow::{bail, Result};
use glam::Vec3;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationAxis {
    X,
    Y,
    Z,
}

impl RotationAxis {
    pub fn label(self) -> &'static str {
        match self {
            RotationAxis::X => "X axis",
            RotationAxis::Y => "Y axis",
            RotationAxis::Z => "Z axis",
        }
    }

    pub fn get(self, rotation: Vec3) -> f32 {
        match self {
            RotationAxis::X => rotation.x,
            RotationAxis::Y => rotation.y,
            RotationAxis::Z => rotation.z,
        }
    }

    pub fn set(self, rotation: &mut Vec3, value: f32) {
        match self {
            RotationAxis::X => rotation.x = value,
            RotationAxis::Y => rotation.y = value,
            RotationAxis::Z => rotation.z = value,
        }
    }
}

/// Shared clamp for drag-time and frame-time enforcement. NaN collapses to the in-range value nearest zero.
pub fn clamp_angle(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        return 0.0_f32.clamp(min, max);
    }
    value.clamp(min, max)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointConstraint {
    joint: JointId,
    axis: RotationAxis,
    min: f32,
    max: f32,
}

impl JointConstraint {
    pub fn new(joint: JointId, axis: RotationAxis, min: f32, max: f32) -> Result<Self> {
        if !(min.is_finite() && max.is_finite()) {
            bail!("Constraint bounds on {} must be finite, got [{min}, {max}]", axis.label());
        }
        if min > max {
            bail!("Constraint on {} has min {min} above max {max}", axis.label());
        }
        Ok(Self { joint, axis, min, max })
    }

    pub fn from_range(joint: JointId, axis: RotationAxis, range: AngleRange) -> Result<Self> {
        Self::new(joint, axis, range.min, range.max)
    }

    pub fn joint(&self) -> JointId {
        self.joint
    }

    pub fn axis(&self) -> RotationAxis {
        self.axis
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn clamp(&self, value: f32) -> f32 {
        clamp_angle(value, self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Per-frame backstop that pulls every constrained axis back into range.
#[derive(Debug, Clone, Default)]
pub struct ConstraintEnforcer {
    constraints: SmallVec<[JointConstraint; 2]>,
}

impl ConstraintEnforcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Z-axis limits for shoulder and elbow; yaw stays free on both joints.
    pub fn for_rig(rig: &ArmRig, limits: &LimitsConfig) -> Result<Self> {
        let mut enforcer = Self::new();
        enforcer.push(JointConstraint::from_range(rig.shoulder(), RotationAxis::Z, limits.shoulder_z)?);
        enforcer.push(JointConstraint::from_range(rig.elbow(), RotationAxis::Z, limits.elbow_z)?);
        Ok(enforcer)
    }

    pub fn push(&mut self, constraint: JointConstraint) {
        self.constraints.retain(|c| !(c.joint == constraint.joint && c.axis == constraint.axis));
        self.constraints.push(constraint);
    }

    pub fn iter(&self) -> impl Iterator<Item = &JointConstraint> + '_ {
        self.constraints.iter()
    }

    pub fn limits_for(&self, joint: JointId, axis: RotationAxis) -> Option<&JointConstraint> {
        self.constraints.iter().find(|c| c.joint == joint && c.axis == axis)
    }

    /// Clamps every constrained axis in place and returns how many values moved.
    pub fn enforce(&self, rig: &mut ArmRig) -> usize {
        let mut clamped = 0;
        for constraint in &self.constraints {
            let Some(node) = rig.joint_mut(constraint.joint) else {
                continue;
            };
            let current = constraint.axis.get(node.local_rotation);
            let next = constraint.clamp(current);
            if next.to_bits() != current.to_bits() {
                constraint.axis.set(&mut node.local_rotation, next);
                clamped += 1;
                tracing::trace!(
                    joint = node.role().label(),
                    axis = constraint.axis.label(),
                    from = current,
                    to = next,
                    "clamped joint rotation"
                );
            }
        }
        clamped
    }

    pub fn is_satisfied(&self, rig: &ArmRig) -> bool {
        self.constraints.iter().all(|c| {
            rig.joint(c.joint).map_or(true, |node| c.contains(c.axis.get(node.local_rotation)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RigConfig;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn rig_and_enforcer() -> (ArmRig, ConstraintEnforcer) {
        let config = RigConfig::default();
        let rig = ArmRig::new(&config);
        let enforcer = ConstraintEnforcer::for_rig(&rig, &config.limits).expect("default limits");
        (rig, enforcer)
    }

    #[test]
    fn enforce_clamps_out_of_range_pitch() {
        let (mut rig, enforcer) = rig_and_enforcer();
        let (shoulder, elbow) = (rig.shoulder(), rig.elbow());
        rig.joint_mut(shoulder).unwrap().local_rotation.z = 4.0;
        rig.joint_mut(elbow).unwrap().local_rotation.z = -3.0;
        assert_eq!(enforcer.enforce(&mut rig), 2);
        assert_eq!(rig.joint(shoulder).unwrap().local_rotation.z, FRAC_PI_2);
        assert_eq!(rig.joint(elbow).unwrap().local_rotation.z, -0.8 * PI);
        assert!(enforcer.is_satisfied(&rig));
    }

    #[test]
    fn enforce_is_idempotent_and_leaves_yaw_alone() {
        let (mut rig, enforcer) = rig_and_enforcer();
        let shoulder = rig.shoulder();
        rig.joint_mut(shoulder).unwrap().local_rotation = Vec3::new(0.3, 9.0, -2.0);
        enforcer.enforce(&mut rig);
        let once = rig.joint(shoulder).unwrap().local_rotation;
        assert_eq!(enforcer.enforce(&mut rig), 0);
        assert_eq!(rig.joint(shoulder).unwrap().local_rotation, once);
        assert_eq!(once, Vec3::new(0.3, 9.0, -FRAC_PI_2));
    }

    #[test]
    fn nan_pitch_is_recovered() {
        let (mut rig, enforcer) = rig_and_enforcer();
        let elbow = rig.elbow();
        rig.joint_mut(elbow).unwrap().local_rotation.z = f32::NAN;
        assert_eq!(enforcer.enforce(&mut rig), 1);
        assert_eq!(rig.joint(elbow).unwrap().local_rotation.z, 0.0);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let rig = ArmRig::new(&RigConfig::default());
        let err = JointConstraint::new(rig.elbow(), RotationAxis::Z, 1.0, -1.0).unwrap_err();
        assert!(err.to_string().contains("above max"));
    }

    #[test]
    fn pushing_same_axis_replaces_existing_limit() {
        let (rig, mut enforcer) = rig_and_enforcer();
        let tighter = JointConstraint::new(rig.elbow(), RotationAxis::Z, -0.5, 0.5).unwrap();
        enforcer.push(tighter);
        assert_eq!(enforcer.iter().count(), 2);
        assert_eq!(enforcer.limits_for(rig.elbow(), RotationAxis::Z), Some(&tighter));
    }
}
