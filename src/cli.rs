use crate::config::AppConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/app.json";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliOverrides {
    config_path: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    vsync: Option<bool>,
    sensitivity: Option<f32>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // program name
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Flags take the form --name <value>.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => {
                    if value.trim().is_empty() {
                        bail!("--config requires a non-empty path");
                    }
                    overrides.config_path = Some(PathBuf::from(value));
                }
                "width" => {
                    overrides.width =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid width '{value}'"))?);
                }
                "height" => {
                    overrides.height =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid height '{value}'"))?);
                }
                "vsync" => {
                    overrides.vsync = Some(parse_bool_flag("vsync", &value)?);
                }
                "sensitivity" => {
                    let parsed =
                        value.parse::<f32>().with_context(|| format!("Invalid sensitivity '{value}'"))?;
                    if !parsed.is_finite() {
                        bail!("Invalid sensitivity '{value}'. Expected a finite number.");
                    }
                    overrides.sensitivity = Some(parsed);
                }
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --width, --height, --vsync, --sensitivity."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> &Path {
        self.config_path.as_deref().unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH))
    }

    pub fn into_config_overrides(self) -> AppConfigOverrides {
        AppConfigOverrides {
            width: self.width,
            height: self.height,
            vsync: self.vsync,
            sensitivity: self.sensitivity,
        }
    }

    #[cfg(test)]
    pub fn as_tuple(&self) -> (Option<u32>, Option<u32>, Option<bool>, Option<f32>) {
        (self.width, self.height, self.vsync, self.sensitivity)
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}
