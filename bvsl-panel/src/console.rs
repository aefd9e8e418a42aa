//! Line-oriented front-end
//!
//! Parses typed commands into panel messages and renders the panel as text.

use std::fmt::Write;
use std::str::FromStr;

use bvsl_bridge::{LegacyModule, VssCategory};
use thiserror::Error;

use crate::app::{Message, Panel};
use crate::config::OutputFormat;

pub const HELP: &str = "\
Commands:
  set period <seconds>            sampling period
  set format <vss|vss-jsonl|legacy>
  set version <text>              VSS version
  set category <name> <on|off>    speed powertrain chassis body location obd
  set module <name> <on|off>      general wheels engine inputs powertrain
  set timestamp|metadata|compress <on|off>
  set buffer <samples>
  advanced <on|off>               show advanced options
  apply | start | stop | export | import | open
  show | dump | help | quit";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}' (try 'help')")]
    UnknownCommand(String),

    #[error("Missing {0}")]
    MissingArgument(&'static str),

    #[error("Invalid {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Panel(Message),
    Show,
    /// Print the form as JSON.
    Dump,
    Help,
    Quit,
}

impl FromStr for Input {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(ConsoleError::Empty)?;

        let input = match command {
            "apply" => Input::Panel(Message::ApplySettings),
            "start" => Input::Panel(Message::StartLogging),
            "stop" => Input::Panel(Message::StopLogging),
            "export" => Input::Panel(Message::ExportSettings),
            "import" => Input::Panel(Message::ImportSettings),
            "open" => Input::Panel(Message::OpenOutputFolder),
            "advanced" => Input::Panel(Message::ShowAdvancedToggled(switch(words.next())?)),
            "show" | "status" => Input::Show,
            "dump" => Input::Dump,
            "help" | "?" => Input::Help,
            "quit" | "exit" => Input::Quit,
            "set" => Input::Panel(parse_set(&mut words)?),
            other => return Err(ConsoleError::UnknownCommand(other.to_string())),
        };
        Ok(input)
    }
}

fn parse_set<'a>(words: &mut impl Iterator<Item = &'a str>) -> Result<Message, ConsoleError> {
    let field = words.next().ok_or(ConsoleError::MissingArgument("setting name"))?;
    let value = words.next();

    let message = match field {
        "period" => {
            let raw = value.ok_or(ConsoleError::MissingArgument("period"))?;
            let seconds: f64 = raw.parse().map_err(|_| invalid("period", raw))?;
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(invalid("period", raw));
            }
            Message::UpdatePeriodChanged(seconds)
        }
        "format" => {
            let raw = value.ok_or(ConsoleError::MissingArgument("format"))?;
            let format: OutputFormat = raw.parse().map_err(|_| invalid("format", raw))?;
            Message::OutputFormatChanged(format)
        }
        "version" => {
            let raw = value.ok_or(ConsoleError::MissingArgument("version"))?;
            Message::VssVersionChanged(raw.to_string())
        }
        "category" => {
            let raw = value.ok_or(ConsoleError::MissingArgument("category"))?;
            let category = category_by_name(raw).ok_or_else(|| invalid("category", raw))?;
            Message::CategoryToggled(category, switch(words.next())?)
        }
        "module" => {
            let raw = value.ok_or(ConsoleError::MissingArgument("module"))?;
            let module = module_by_name(raw).ok_or_else(|| invalid("module", raw))?;
            Message::ModuleToggled(module, switch(words.next())?)
        }
        "timestamp" => Message::IncludeTimestampToggled(switch(value)?),
        "metadata" => Message::IncludeMetadataToggled(switch(value)?),
        "compress" => Message::CompressOutputToggled(switch(value)?),
        "buffer" => {
            let raw = value.ok_or(ConsoleError::MissingArgument("buffer size"))?;
            let size: u32 = raw.parse().map_err(|_| invalid("buffer size", raw))?;
            Message::BufferSizeChanged(size)
        }
        other => return Err(invalid("setting", other)),
    };
    Ok(message)
}

fn switch(word: Option<&str>) -> Result<bool, ConsoleError> {
    match word {
        Some("on" | "true" | "yes") => Ok(true),
        Some("off" | "false" | "no") => Ok(false),
        Some(other) => Err(invalid("switch", other)),
        None => Err(ConsoleError::MissingArgument("on/off")),
    }
}

fn invalid(field: &'static str, value: &str) -> ConsoleError {
    ConsoleError::InvalidValue {
        field,
        value: value.to_string(),
    }
}

fn category_label(category: VssCategory) -> &'static str {
    match category {
        VssCategory::Speed => "speed",
        VssCategory::Powertrain => "powertrain",
        VssCategory::Chassis => "chassis",
        VssCategory::Body => "body",
        VssCategory::CurrentLocation => "location",
        VssCategory::Obd => "obd",
    }
}

fn category_by_name(name: &str) -> Option<VssCategory> {
    VssCategory::ALL
        .into_iter()
        .find(|c| category_label(*c) == name)
}

fn module_by_name(name: &str) -> Option<LegacyModule> {
    LegacyModule::ALL
        .into_iter()
        .find(|m| m.name().eq_ignore_ascii_case(name))
}

fn check(on: bool) -> &'static str {
    if on {
        "[x]"
    } else {
        "[ ]"
    }
}

/// Text view of the panel.
pub fn render(panel: &Panel) -> String {
    let config = panel.config();
    let mut out = String::new();

    let _ = writeln!(out, "BetterVSL");
    let _ = writeln!(out, "  Update period : {} s", config.update_period);
    let _ = writeln!(out, "  Output format : {}", config.output_format);
    let _ = writeln!(out, "  VSS version   : {}", config.vss_version);

    if config.output_format.is_structured() {
        let _ = write!(out, "  Categories    :");
        for category in VssCategory::ALL {
            let _ = write!(
                out,
                " {} {}",
                check(config.categories.get(category)),
                category_label(category)
            );
        }
    } else {
        let _ = write!(out, "  Modules       :");
        for module in LegacyModule::ALL {
            let _ = write!(
                out,
                " {} {}",
                check(config.modules.get(module)),
                module.name().to_ascii_lowercase()
            );
        }
    }
    out.push('\n');

    if config.show_advanced {
        let _ = writeln!(
            out,
            "  Advanced      : {} timestamp {} metadata {} compress, buffer {} samples",
            check(config.include_timestamp),
            check(config.include_metadata),
            check(config.compress_output),
            config.buffer_size
        );
    }

    let status = panel.status();
    let state = if panel.is_logging() { "logging" } else { "idle" };
    let _ = writeln!(out, "  State         : {}", state);
    let _ = writeln!(
        out,
        "  Time {} s, {} samples, file '{}'",
        status.logging_time, status.samples_collected, status.current_file
    );

    if let Some(error) = panel.last_error() {
        let _ = writeln!(out, "  Error         : {}", error);
    }

    out
}
