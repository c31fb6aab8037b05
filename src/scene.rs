use crate::config::PaletteConfig;
use crate::rig::{ArmRig, JointId, JointRole};
use anyhow::{bail, Context, Result};
use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKind {
    /// Unit cylinder (radius 1, height 1) centred on the origin along +Y.
    Limb,
    /// Unit sphere.
    Handle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneNode {
    pub mesh: MeshKind,
    pub model: Mat4,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLighting {
    pub ambient: f32,
    pub directional: f32,
    /// Unit vector pointing from the scene towards the light.
    pub light_dir: Vec3,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self { ambient: 0.5, directional: 0.8, light_dir: Vec3::ONE.normalize() }
    }
}

/// Linear-space colors resolved from the hex strings in [`PaletteConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub clear: [f32; 4],
    pub upper_arm: [f32; 4],
    pub lower_arm: [f32; 4],
    pub handle: [f32; 4],
    pub handle_highlight: [f32; 4],
    pub lighting: SceneLighting,
}

impl Palette {
    pub fn from_config(config: &PaletteConfig) -> Result<Self> {
        let light = Vec3::from_array(config.light_position);
        if light.length_squared() <= f32::EPSILON || !light.is_finite() {
            bail!("palette.light_position must be a non-zero finite vector, got {:?}", config.light_position);
        }
        Ok(Self {
            clear: parse_hex_color(&config.clear).context("palette.clear")?,
            upper_arm: parse_hex_color(&config.upper_arm).context("palette.upper_arm")?,
            lower_arm: parse_hex_color(&config.lower_arm).context("palette.lower_arm")?,
            handle: parse_hex_color(&config.handle).context("palette.handle")?,
            handle_highlight: parse_hex_color(&config.handle_highlight).context("palette.handle_highlight")?,
            lighting: SceneLighting {
                ambient: config.ambient_intensity,
                directional: config.directional_intensity,
                light_dir: light.normalize(),
            },
        })
    }
}

/// Parses `#rrggbb` (leading `#` optional) into a linear RGBA color.
pub fn parse_hex_color(value: &str) -> Result<[f32; 4]> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("Invalid color '{value}'. Expected #rrggbb.");
    }
    let channel = |range: std::ops::Range<usize>| -> Result<f32> {
        let byte = u8::from_str_radix(&hex[range], 16).with_context(|| format!("Invalid color '{value}'"))?;
        Ok(srgb_to_linear(byte as f32 / 255.0))
    };
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?, 1.0])
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Flat draw list for one frame; nodes are appended and drawn in insertion order per mesh kind.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    clear_color: [f32; 4],
    lighting: SceneLighting,
}

impl SceneGraph {
    pub fn new(clear_color: [f32; 4], lighting: SceneLighting) -> Self {
        Self { nodes: Vec::new(), clear_color, lighting }
    }

    pub fn add(&mut self, node: SceneNode) {
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn nodes_of(&self, mesh: MeshKind) -> impl Iterator<Item = &SceneNode> + '_ {
        self.nodes.iter().filter(move |node| node.mesh == mesh)
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn lighting(&self) -> SceneLighting {
        self.lighting
    }

    /// One limb segment and one handle per joint, reflecting the current pose.
    pub fn from_rig(rig: &ArmRig, highlighted: Option<JointId>, palette: &Palette) -> Self {
        let mut scene = Self::new(palette.clear, palette.lighting);
        let limb_scale = Vec3::new(rig.arm_radius(), rig.arm_length(), rig.arm_radius());
        for (id, node) in rig.joints() {
            if let Some(segment) = rig.segment_transform(id) {
                let color = match node.role() {
                    JointRole::Shoulder => palette.upper_arm,
                    JointRole::Elbow => palette.lower_arm,
                };
                scene.add(SceneNode {
                    mesh: MeshKind::Limb,
                    model: segment * Mat4::from_scale(limb_scale),
                    color,
                });
            }
            if let Some(center) = rig.world_position(id) {
                let color = if highlighted == Some(id) { palette.handle_highlight } else { palette.handle };
                scene.add(SceneNode {
                    mesh: MeshKind::Handle,
                    model: Mat4::from_scale_rotation_translation(
                        Vec3::splat(node.pick_radius()),
                        Quat::IDENTITY,
                        center,
                    ),
                    color,
                });
            }
        }
        scene
    }
}
