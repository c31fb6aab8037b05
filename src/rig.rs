//! Two-joint kinematic hierarchy (shoulder -> elbow).
//!
//! Nodes only store local state. World transforms are derived on demand by walking the parent chain,
//! so rotating the shoulder is immediately visible in the elbow's world position.

use crate::config::RigConfig;
use glam::{EulerRot, Mat4, Quat, Vec3};
use smallvec::SmallVec;

/// Index of a joint inside an [`ArmRig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(usize);

impl JointId {
    pub fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointRole {
    Shoulder,
    Elbow,
}

impl JointRole {
    pub fn label(self) -> &'static str {
        match self {
            JointRole::Shoulder => "shoulder",
            JointRole::Elbow => "elbow",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JointNode {
    role: JointRole,
    /// Euler angles in radians (XYZ order) relative to the parent frame.
    pub local_rotation: Vec3,
    local_offset: Vec3,
    parent: Option<JointId>,
    children: SmallVec<[JointId; 2]>,
    pick_radius: f32,
}

impl JointNode {
    pub fn new(role: JointRole, local_offset: Vec3, pick_radius: f32) -> Self {
        Self {
            role,
            local_rotation: Vec3::ZERO,
            local_offset,
            parent: None,
            children: SmallVec::new(),
            pick_radius,
        }
    }

    pub fn role(&self) -> JointRole {
        self.role
    }

    pub fn local_offset(&self) -> Vec3 {
        self.local_offset
    }

    pub fn parent(&self) -> Option<JointId> {
        self.parent
    }

    pub fn children(&self) -> &[JointId] {
        &self.children
    }

    pub fn pick_radius(&self) -> f32 {
        self.pick_radius
    }

    pub fn local_quat(&self) -> Quat {
        let r = self.local_rotation;
        Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z)
    }

    /// Offset then rotation: `T(offset) * R(rotation)`.
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.local_quat(), self.local_offset)
    }
}

#[derive(Debug, Clone)]
pub struct ArmRig {
    joints: Vec<JointNode>,
    shoulder: JointId,
    elbow: JointId,
    arm_length: f32,
    arm_radius: f32,
}

impl ArmRig {
    pub fn new(config: &RigConfig) -> Self {
        let mut rig = Self {
            joints: Vec::with_capacity(2),
            shoulder: JointId(0),
            elbow: JointId(0),
            arm_length: config.arm_length,
            arm_radius: config.arm_radius,
        };
        let shoulder = rig.push_node(JointNode::new(
            JointRole::Shoulder,
            Vec3::from_array(config.mount),
            config.handle_radius,
        ));
        let elbow = rig.add_child(
            shoulder,
            JointNode::new(JointRole::Elbow, Vec3::new(0.0, config.arm_length, 0.0), config.handle_radius),
        );
        rig.shoulder = shoulder;
        rig.elbow = elbow;
        rig
    }

    fn push_node(&mut self, node: JointNode) -> JointId {
        let id = JointId(self.joints.len());
        self.joints.push(node);
        id
    }

    /// Appends `node` under `parent` and wires the back-reference. Construction-time only.
    pub(crate) fn add_child(&mut self, parent: JointId, mut node: JointNode) -> JointId {
        node.parent = Some(parent);
        let id = self.push_node(node);
        if let Some(parent_node) = self.joints.get_mut(parent.0) {
            parent_node.children.push(id);
        }
        id
    }

    pub fn shoulder(&self) -> JointId {
        self.shoulder
    }

    pub fn elbow(&self) -> JointId {
        self.elbow
    }

    pub fn arm_length(&self) -> f32 {
        self.arm_length
    }

    pub fn arm_radius(&self) -> f32 {
        self.arm_radius
    }

    pub fn contains(&self, id: JointId) -> bool {
        id.0 < self.joints.len()
    }

    pub fn joint(&self, id: JointId) -> Option<&JointNode> {
        self.joints.get(id.0)
    }

    pub fn joint_mut(&mut self, id: JointId) -> Option<&mut JointNode> {
        self.joints.get_mut(id.0)
    }

    pub fn joints(&self) -> impl Iterator<Item = (JointId, &JointNode)> + '_ {
        self.joints.iter().enumerate().map(|(index, node)| (JointId(index), node))
    }

    pub fn joint_ids(&self) -> SmallVec<[JointId; 2]> {
        (0..self.joints.len()).map(JointId).collect()
    }

    /// Composes `offset * rotation` for every ancestor from the root down to `id`.
    pub fn world_transform(&self, id: JointId) -> Option<Mat4> {
        let mut chain: SmallVec<[JointId; 4]> = SmallVec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if chain.len() > self.joints.len() {
                // parent cycle; topology is fixed so this only guards corrupted ids
                return None;
            }
            let node = self.joint(current)?;
            chain.push(current);
            cursor = node.parent;
        }
        let world = chain
            .iter()
            .rev()
            .filter_map(|joint| self.joint(*joint))
            .fold(Mat4::IDENTITY, |acc, node| acc * node.local_matrix());
        Some(world)
    }

    pub fn world_position(&self, id: JointId) -> Option<Vec3> {
        self.world_transform(id).map(|world| world.w_axis.truncate())
    }

    /// Transform of the limb hanging off `id`: a unit segment centred half an arm length along local +Y.
    pub fn segment_transform(&self, id: JointId) -> Option<Mat4> {
        let world = self.world_transform(id)?;
        Some(world * Mat4::from_translation(Vec3::new(0.0, self.arm_length * 0.5, 0.0)))
    }
}
