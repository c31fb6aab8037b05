use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::f32::consts::{FRAC_PI_2, PI};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub fullscreen: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "CameraConfig::default_fov_y_degrees")]
    pub fov_y_degrees: f32,
    #[serde(default = "CameraConfig::default_near")]
    pub near: f32,
    #[serde(default = "CameraConfig::default_far")]
    pub far: f32,
    #[serde(default = "CameraConfig::default_position")]
    pub position: [f32; 3],
    #[serde(default = "CameraConfig::default_target")]
    pub target: [f32; 3],
}

/// Angular range `[min, max]` in radians for a joint's constrained axis.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AngleRange {
    pub min: f32,
    pub max: f32,
}

impl AngleRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn symmetric(half_extent: f32) -> Self {
        Self { min: -half_extent, max: half_extent }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "LimitsConfig::default_shoulder_z")]
    pub shoulder_z: AngleRange,
    #[serde(default = "LimitsConfig::default_elbow_z")]
    pub elbow_z: AngleRange,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RigConfig {
    #[serde(default = "RigConfig::default_mount")]
    pub mount: [f32; 3],
    #[serde(default = "RigConfig::default_arm_length")]
    pub arm_length: f32,
    #[serde(default = "RigConfig::default_arm_radius")]
    pub arm_radius: f32,
    #[serde(default = "RigConfig::default_handle_radius")]
    pub handle_radius: f32,
    #[serde(default = "RigConfig::default_sensitivity")]
    pub sensitivity: f32,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaletteConfig {
    #[serde(default = "PaletteConfig::default_clear")]
    pub clear: String,
    #[serde(default = "PaletteConfig::default_upper_arm")]
    pub upper_arm: String,
    #[serde(default = "PaletteConfig::default_lower_arm")]
    pub lower_arm: String,
    #[serde(default = "PaletteConfig::default_handle")]
    pub handle: String,
    #[serde(default = "PaletteConfig::default_handle_highlight")]
    pub handle_highlight: String,
    #[serde(default = "PaletteConfig::default_ambient_intensity")]
    pub ambient_intensity: f32,
    #[serde(default = "PaletteConfig::default_directional_intensity")]
    pub directional_intensity: f32,
    #[serde(default = "PaletteConfig::default_light_position")]
    pub light_position: [f32; 3],
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub rig: RigConfig,
    #[serde(default)]
    pub palette: PaletteConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vsync: Option<bool>,
    pub sensitivity: Option<f32>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "Arm Rig".to_string(), width: 1280, height: 720, vsync: true, fullscreen: false }
    }
}

impl CameraConfig {
    const fn default_fov_y_degrees() -> f32 {
        75.0
    }

    const fn default_near() -> f32 {
        0.1
    }

    const fn default_far() -> f32 {
        1000.0
    }

    const fn default_position() -> [f32; 3] {
        [5.0, 2.0, 8.0]
    }

    const fn default_target() -> [f32; 3] {
        [0.0, 2.0, 0.0]
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: Self::default_fov_y_degrees(),
            near: Self::default_near(),
            far: Self::default_far(),
            position: Self::default_position(),
            target: Self::default_target(),
        }
    }
}

impl LimitsConfig {
    fn default_shoulder_z() -> AngleRange {
        AngleRange::symmetric(FRAC_PI_2)
    }

    fn default_elbow_z() -> AngleRange {
        AngleRange::symmetric(0.8 * PI)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { shoulder_z: Self::default_shoulder_z(), elbow_z: Self::default_elbow_z() }
    }
}

impl RigConfig {
    const fn default_mount() -> [f32; 3] {
        [0.0, 1.0, 0.0]
    }

    const fn default_arm_length() -> f32 {
        2.0
    }

    const fn default_arm_radius() -> f32 {
        0.2
    }

    const fn default_handle_radius() -> f32 {
        0.3
    }

    const fn default_sensitivity() -> f32 {
        0.01
    }
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            mount: Self::default_mount(),
            arm_length: Self::default_arm_length(),
            arm_radius: Self::default_arm_radius(),
            handle_radius: Self::default_handle_radius(),
            sensitivity: Self::default_sensitivity(),
            limits: LimitsConfig::default(),
        }
    }
}

impl PaletteConfig {
    fn default_clear() -> String {
        "#f5f5f5".to_string()
    }

    fn default_upper_arm() -> String {
        "#808080".to_string()
    }

    fn default_lower_arm() -> String {
        "#a9a9a9".to_string()
    }

    fn default_handle() -> String {
        "#4a90d9".to_string()
    }

    fn default_handle_highlight() -> String {
        "#ffb347".to_string()
    }

    const fn default_ambient_intensity() -> f32 {
        0.5
    }

    const fn default_directional_intensity() -> f32 {
        0.8
    }

    const fn default_light_position() -> [f32; 3] {
        [5.0, 5.0, 5.0]
    }
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            clear: Self::default_clear(),
            upper_arm: Self::default_upper_arm(),
            lower_arm: Self::default_lower_arm(),
            handle: Self::default_handle(),
            handle_highlight: Self::default_handle_highlight(),
            ambient_intensity: Self::default_ambient_intensity(),
            directional_intensity: Self::default_directional_intensity(),
            light_position: Self::default_light_position(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(vsync) = overrides.vsync {
            self.window.vsync = vsync;
        }
        if let Some(sensitivity) = overrides.sensitivity {
            self.rig.sensitivity = sensitivity;
        }
    }

    /// Rejects values the rig cannot be built from. Colors are checked when the palette is resolved.
    pub fn validate(&self) -> Result<()> {
        let rig = &self.rig;
        if !(rig.arm_length.is_finite() && rig.arm_length > 0.0) {
            bail!("rig.arm_length must be positive, got {}", rig.arm_length);
        }
        if !(rig.arm_radius.is_finite() && rig.arm_radius > 0.0) {
            bail!("rig.arm_radius must be positive, got {}", rig.arm_radius);
        }
        if !(rig.handle_radius.is_finite() && rig.handle_radius > 0.0) {
            bail!("rig.handle_radius must be positive, got {}", rig.handle_radius);
        }
        if !rig.sensitivity.is_finite() {
            bail!("rig.sensitivity must be finite, got {}", rig.sensitivity);
        }
        if rig.mount.iter().any(|v| !v.is_finite()) {
            bail!("rig.mount must be finite, got {:?}", rig.mount);
        }
        for (label, range) in [("shoulder_z", rig.limits.shoulder_z), ("elbow_z", rig.limits.elbow_z)] {
            if !(range.min.is_finite() && range.max.is_finite() && range.min <= range.max) {
                bail!("rig.limits.{label} must satisfy min <= max, got [{}, {}]", range.min, range.max);
            }
        }
        let camera = &self.camera;
        if !(camera.fov_y_degrees > 0.0 && camera.fov_y_degrees < 180.0) {
            bail!("camera.fov_y_degrees must be within (0, 180), got {}", camera.fov_y_degrees);
        }
        if !(camera.near > 0.0 && camera.far > camera.near) {
            bail!("camera clip planes must satisfy 0 < near < far, got {} / {}", camera.near, camera.far);
        }
        Ok(())
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.vsync.is_none() && self.sensitivity.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.vsync.is_some() {
            fields.push("vsync");
        }
        if self.sensitivity.is_some() {
            fields.push("sensitivity");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_rig_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"rig":{"arm_length":3.5}}"#).expect("parse partial config");
        assert_eq!(cfg.rig.arm_length, 3.5);
        assert_eq!(cfg.rig.sensitivity, 0.01);
        assert_eq!(cfg.rig.limits.shoulder_z, AngleRange::symmetric(FRAC_PI_2));
        assert_eq!(cfg.window.width, 1280);
        cfg.validate().expect("partial config is valid");
    }

    #[test]
    fn inverted_limits_fail_validation() {
        let mut cfg = AppConfig::default();
        cfg.rig.limits.elbow_z = AngleRange::new(1.0, -1.0);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("elbow_z"), "error should name the bad range: {err}");
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let mut cfg = AppConfig::default();
        let overrides = AppConfigOverrides { width: Some(800), sensitivity: Some(0.02), ..Default::default() };
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.window.width, 800);
        assert_eq!(cfg.window.height, 720);
        assert_eq!(cfg.rig.sensitivity, 0.02);
        assert_eq!(overrides.applied_fields(), vec!["width", "sensitivity"]);
    }
}
