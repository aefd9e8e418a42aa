//! Typed commands understood by the `extensions.bettervsl` host extension.
//!
//! Every remote call the panel makes is one of these values. They travel to
//! the host as JSON, or are rendered to a Lua statement for hosts that only
//! evaluate script text (see [`Command::to_lua`]).

use std::fmt::{self, Write};

use serde::{Serialize, Serializer};

/// Lua table that owns the extension's functions.
const LUA_EXTENSION: &str = "extensions.bettervsl";

/// VSS signal branches that can be included in structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VssCategory {
    Speed,
    Powertrain,
    Chassis,
    Body,
    CurrentLocation,
    Obd,
}

impl VssCategory {
    pub const ALL: [VssCategory; 6] = [
        VssCategory::Speed,
        VssCategory::Powertrain,
        VssCategory::Chassis,
        VssCategory::Body,
        VssCategory::CurrentLocation,
        VssCategory::Obd,
    ];

    /// Fully qualified VSS branch name.
    pub fn signal(self) -> &'static str {
        match self {
            VssCategory::Speed => "Vehicle.Speed",
            VssCategory::Powertrain => "Vehicle.Powertrain",
            VssCategory::Chassis => "Vehicle.Chassis",
            VssCategory::Body => "Vehicle.Body",
            VssCategory::CurrentLocation => "Vehicle.CurrentLocation",
            VssCategory::Obd => "Vehicle.OBD",
        }
    }
}

/// Sensor modules of the legacy (pre-VSS) output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyModule {
    General,
    Wheels,
    Engine,
    Inputs,
    Powertrain,
}

impl LegacyModule {
    pub const ALL: [LegacyModule; 5] = [
        LegacyModule::General,
        LegacyModule::Wheels,
        LegacyModule::Engine,
        LegacyModule::Inputs,
        LegacyModule::Powertrain,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LegacyModule::General => "General",
            LegacyModule::Wheels => "Wheels",
            LegacyModule::Engine => "Engine",
            LegacyModule::Inputs => "Inputs",
            LegacyModule::Powertrain => "Powertrain",
        }
    }
}

/// A configuration key of the host extension's `settings` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Sampling period in seconds.
    UpdatePeriod,
    /// Output format selector.
    Format,
    /// VSS catalogue version used for structured output.
    VssVersion,
    Category(VssCategory),
    Module(LegacyModule),
    IncludeTimestamp,
    IncludeMetadata,
    CompressOutput,
    /// Number of samples held before the host flushes to disk.
    BufferSize,
}

impl SettingKey {
    /// Dotted path used on the wire, e.g. `useCategory.Vehicle.Speed`.
    pub fn path(&self) -> String {
        match self {
            SettingKey::Category(category) => format!("useCategory.{}", category.signal()),
            SettingKey::Module(module) => format!("useModule.{}", module.name()),
            other => other.scalar_name().to_string(),
        }
    }

    fn scalar_name(&self) -> &'static str {
        match self {
            SettingKey::UpdatePeriod => "updatePeriod",
            SettingKey::Format => "format",
            SettingKey::VssVersion => "vssVersion",
            SettingKey::IncludeTimestamp => "includeTimestamp",
            SettingKey::IncludeMetadata => "includeMetadata",
            SettingKey::CompressOutput => "compressOutput",
            SettingKey::BufferSize => "bufferSize",
            SettingKey::Category(_) => "useCategory",
            SettingKey::Module(_) => "useModule",
        }
    }

    /// Lua l-value addressing this key inside the extension's settings table.
    fn lua_target(&self) -> String {
        let mut target = format!("{LUA_EXTENSION}.settings.{}", self.scalar_name());
        match self {
            SettingKey::Category(category) => {
                let _ = write!(target, "[{}]", lua_string(category.signal()));
            }
            SettingKey::Module(module) => {
                let _ = write!(target, "[{}]", lua_string(module.name()));
            }
            _ => {}
        }
        target
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl Serialize for SettingKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path())
    }
}

/// Primitive value written to a setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl ConfigValue {
    fn to_lua(&self) -> String {
        match self {
            ConfigValue::Bool(b) => b.to_string(),
            ConfigValue::Integer(n) => n.to_string(),
            ConfigValue::Number(n) if n.is_nan() => "0/0".to_string(),
            ConfigValue::Number(n) if n.is_infinite() => {
                let huge = if *n > 0.0 { "math.huge" } else { "-math.huge" };
                huge.to_string()
            }
            ConfigValue::Number(n) => n.to_string(),
            ConfigValue::Text(s) => lua_string(s),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<u32> for ConfigValue {
    fn from(value: u32) -> Self {
        ConfigValue::Integer(i64::from(value))
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Number(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

/// A remote call on the logging extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    SetConfig { key: SettingKey, value: ConfigValue },
    BeginCapture,
    EndCapture,
    QueryStatus,
    ExportConfig { filename: String },
    ImportConfig { filename: String },
    RevealOutputLocation,
}

impl Command {
    pub fn set(key: SettingKey, value: impl Into<ConfigValue>) -> Self {
        Command::SetConfig {
            key,
            value: value.into(),
        }
    }

    /// Short operation name for logs and error messages.
    pub fn operation(&self) -> &'static str {
        match self {
            Command::SetConfig { .. } => "set_config",
            Command::BeginCapture => "begin_capture",
            Command::EndCapture => "end_capture",
            Command::QueryStatus => "query_status",
            Command::ExportConfig { .. } => "export_config",
            Command::ImportConfig { .. } => "import_config",
            Command::RevealOutputLocation => "reveal_output_location",
        }
    }

    /// Render as a single Lua statement against `extensions.bettervsl`.
    ///
    /// All text is emitted as escaped Lua string literals, so values can
    /// never break out of the statement.
    pub fn to_lua(&self) -> String {
        match self {
            Command::SetConfig { key, value } => {
                format!("{} = {}", key.lua_target(), value.to_lua())
            }
            Command::BeginCapture => format!("{LUA_EXTENSION}.startLogging()"),
            Command::EndCapture => format!("{LUA_EXTENSION}.stopLogging()"),
            Command::QueryStatus => format!("{LUA_EXTENSION}.getStatus()"),
            Command::ExportConfig { filename } => {
                format!("{LUA_EXTENSION}.writeSettingsToJSON({})", lua_string(filename))
            }
            Command::ImportConfig { filename } => {
                format!("{LUA_EXTENSION}.applySettingsFromJSON({})", lua_string(filename))
            }
            Command::RevealOutputLocation => format!("{LUA_EXTENSION}.openOutputFolder()"),
        }
    }
}

/// Quote `s` as a double-quoted Lua string literal.
fn lua_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() && (c as u32) < 0x80 => {
                // Decimal escapes are fixed at three digits so a following digit is not absorbed.
                let _ = write!(out, "\\{:03}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
