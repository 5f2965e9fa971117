// Library module containing testable functions from main.rs

use crate::action::Action;
use crate::config::EngineConfig;
use crate::engine::EngineState;
use crate::error::{ExplorerError, Result};
use crate::executor::Executor;
use crate::fixture;
use crate::ids::UuidV4Generator;
use crate::view::{ViewSnapshot, VisibleRow};
use serde::Serialize;
use std::fs;

/// One view with the rows a renderer would draw
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewReport {
    pub snapshot: ViewSnapshot,
    pub rows: Vec<VisibleRow>,
}

pub fn load_settings(settings_path: Option<&str>) -> Result<Option<EngineConfig>> {
    settings_path.map(EngineConfig::load_from_file).transpose()
}

/// Load a saved state, replacing its settings when some were supplied
pub fn load_state(config_path: &str, settings: Option<&EngineConfig>) -> Result<EngineState> {
    let mut state = fixture::load_state(config_path)?;
    if let Some(settings) = settings {
        state.config = settings.clone();
        state = state.rehydrated();
    }
    Ok(state)
}

pub fn execute_command(
    config_path: &str,
    command_str: &str,
    output_path: Option<&str>,
    settings: Option<&EngineConfig>,
) -> Result<()> {
    let state = load_state(config_path, settings)?;
    let action = Action::from_string(command_str)?;

    let result = Executor::execute(&state, action, &UuidV4Generator);
    if let Some(error) = result.error {
        eprintln!("Rejected: {}", error);
        return Err(error);
    }

    write_output(&fixture::to_json(&result.state)?, output_path, "Result saved to")?;

    if let Some(status) = result.status_message {
        eprintln!("Status: {}", status);
    }

    Ok(())
}

/// Apply a script line by line, stopping at the first failure.
/// Returns the number of actions applied.
pub fn run_script(
    config_path: &str,
    script_path: &str,
    output_path: Option<&str>,
    settings: Option<&EngineConfig>,
) -> Result<usize> {
    let mut state = load_state(config_path, settings)?;
    let script = fs::read_to_string(script_path)?;
    let mut applied = 0;

    for (line_number, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let action = Action::from_string(line).inspect_err(|e| {
            eprintln!("Line {}: {}", line_number + 1, e);
        })?;
        let result = Executor::execute(&state, action, &UuidV4Generator);
        if let Some(error) = result.error {
            eprintln!("Line {}: {}", line_number + 1, error);
            return Err(error);
        }
        if let Some(status) = &result.status_message {
            log::info!("Line {}: {}", line_number + 1, status);
        }

        state = result.state;
        applied += 1;
    }

    write_output(&fixture::to_json(&state)?, output_path, "Result saved to")?;
    eprintln!("Applied {} actions", applied);

    Ok(applied)
}

/// JSON for every view snapshot, or for a single view with its rows
pub fn views_json(state: &EngineState, view_id: Option<&str>) -> Result<String> {
    let json = match view_id {
        Some(view_id) => {
            let unknown = || {
                ExplorerError::InvalidCommand(format!(
                    "unknown view {} (known: {})",
                    view_id,
                    state.views.view_ids().join(", ")
                ))
            };
            let report = ViewReport {
                snapshot: state.snapshot(view_id).ok_or_else(unknown)?,
                rows: state.visible_rows(view_id).ok_or_else(unknown)?,
            };
            serde_json::to_string_pretty(&report)?
        }
        None => serde_json::to_string_pretty(&state.snapshots())?,
    };
    Ok(json)
}

pub fn print_views(
    config_path: &str,
    view_id: Option<&str>,
    settings: Option<&EngineConfig>,
) -> Result<()> {
    let state = load_state(config_path, settings)?;
    println!("{}", views_json(&state, view_id)?);
    Ok(())
}

pub fn save_sample_state(output_path: Option<&str>, settings: Option<&EngineConfig>) -> Result<()> {
    let state = fixture::sample_state_with(settings.cloned().unwrap_or_default());
    write_output(&fixture::to_json(&state)?, output_path, "Sample state saved to")
}

fn write_output(json: &str, output_path: Option<&str>, saved_message: &str) -> Result<()> {
    match output_path {
        Some(path) => {
            fs::write(path, json)?;
            println!("{}: {}", saved_message, path);
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}
