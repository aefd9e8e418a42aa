//! Logging configuration edited by the panel
//!
//! Mirrors the `settings` table of the host extension. Nothing here is
//! persisted locally; the host owns import/export.

use std::fmt;
use std::str::FromStr;

use bvsl_bridge::{Command, LegacyModule, SettingKey, VssCategory};
use serde::{Deserialize, Serialize};

/// Output format written by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Single structured VSS JSON document.
    #[serde(rename = "vss")]
    Vss,
    /// VSS signals, one JSON object per sample, organised by legacy module.
    #[default]
    #[serde(rename = "vss-jsonl")]
    VssJsonl,
    /// Legacy per-module output.
    #[serde(rename = "legacy")]
    Legacy,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Vss => "vss",
            OutputFormat::VssJsonl => "vss-jsonl",
            OutputFormat::Legacy => "legacy",
        }
    }

    /// Whether the host selects signals by VSS category rather than legacy module.
    /// Only the single-document `vss` format does.
    pub fn is_structured(self) -> bool {
        self == OutputFormat::Vss
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vss" => Ok(OutputFormat::Vss),
            "vss-jsonl" => Ok(OutputFormat::VssJsonl),
            "legacy" => Ok(OutputFormat::Legacy),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// Per-category inclusion flags for structured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFlags {
    pub speed: bool,
    pub powertrain: bool,
    pub chassis: bool,
    pub body: bool,
    pub location: bool,
    pub obd: bool,
}

impl Default for CategoryFlags {
    fn default() -> Self {
        Self {
            speed: true,
            powertrain: true,
            chassis: true,
            body: false,
            location: true,
            obd: false,
        }
    }
}

impl CategoryFlags {
    pub fn get(&self, category: VssCategory) -> bool {
        match category {
            VssCategory::Speed => self.speed,
            VssCategory::Powertrain => self.powertrain,
            VssCategory::Chassis => self.chassis,
            VssCategory::Body => self.body,
            VssCategory::CurrentLocation => self.location,
            VssCategory::Obd => self.obd,
        }
    }

    pub fn set(&mut self, category: VssCategory, enabled: bool) {
        let flag = match category {
            VssCategory::Speed => &mut self.speed,
            VssCategory::Powertrain => &mut self.powertrain,
            VssCategory::Chassis => &mut self.chassis,
            VssCategory::Body => &mut self.body,
            VssCategory::CurrentLocation => &mut self.location,
            VssCategory::Obd => &mut self.obd,
        };
        *flag = enabled;
    }
}

/// Per-module inclusion flags for legacy output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFlags {
    pub general: bool,
    pub wheels: bool,
    pub engine: bool,
    pub inputs: bool,
    pub powertrain: bool,
}

impl Default for ModuleFlags {
    fn default() -> Self {
        Self {
            general: true,
            wheels: true,
            engine: true,
            inputs: true,
            powertrain: true,
        }
    }
}

impl ModuleFlags {
    pub fn get(&self, module: LegacyModule) -> bool {
        match module {
            LegacyModule::General => self.general,
            LegacyModule::Wheels => self.wheels,
            LegacyModule::Engine => self.engine,
            LegacyModule::Inputs => self.inputs,
            LegacyModule::Powertrain => self.powertrain,
        }
    }

    pub fn set(&mut self, module: LegacyModule, enabled: bool) {
        let flag = match module {
            LegacyModule::General => &mut self.general,
            LegacyModule::Wheels => &mut self.wheels,
            LegacyModule::Engine => &mut self.engine,
            LegacyModule::Inputs => &mut self.inputs,
            LegacyModule::Powertrain => &mut self.powertrain,
        };
        *flag = enabled;
    }
}

/// Everything the user can edit before pressing start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Sampling period in seconds.
    pub update_period: f64,
    pub output_format: OutputFormat,
    pub vss_version: String,
    pub categories: CategoryFlags,
    pub modules: ModuleFlags,

    // Advanced options
    /// Only controls whether the advanced block is shown; never sent.
    pub show_advanced: bool,
    pub include_timestamp: bool,
    pub include_metadata: bool,
    pub compress_output: bool,
    /// Samples buffered by the host before each flush. Passed through as-is.
    pub buffer_size: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            update_period: 0.01,
            output_format: OutputFormat::VssJsonl,
            vss_version: "4.0".to_string(),
            categories: CategoryFlags::default(),
            modules: ModuleFlags::default(),

            show_advanced: false,
            include_timestamp: true,
            include_metadata: true,
            compress_output: false,
            buffer_size: 1024,
        }
    }
}

impl LoggingConfig {
    /// One `SetConfig` per field that applies to the selected format.
    ///
    /// The `vss` format sends the six category flags, every other format the
    /// five module flags, never both.
    pub fn commands(&self) -> Vec<Command> {
        let mut commands = vec![
            Command::set(SettingKey::UpdatePeriod, self.update_period),
            Command::set(SettingKey::Format, self.output_format.as_str()),
            Command::set(SettingKey::VssVersion, self.vss_version.as_str()),
        ];

        if self.output_format.is_structured() {
            commands.extend(VssCategory::ALL.into_iter().map(|category| {
                Command::set(SettingKey::Category(category), self.categories.get(category))
            }));
        } else {
            commands.extend(LegacyModule::ALL.into_iter().map(|module| {
                Command::set(SettingKey::Module(module), self.modules.get(module))
            }));
        }

        commands.extend([
            Command::set(SettingKey::IncludeTimestamp, self.include_timestamp),
            Command::set(SettingKey::IncludeMetadata, self.include_metadata),
            Command::set(SettingKey::CompressOutput, self.compress_output),
            Command::set(SettingKey::BufferSize, self.buffer_size),
        ]);

        commands
    }
}
