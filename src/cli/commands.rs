//! CLI command implementations
//!
//! Both commands build a real DAO over the in-memory driver, so a definition
//! that passes `check` prepares cleanly wherever the statement syntax matches.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::dao::{DaoConfig, EntityDao, TimeUuidGenerator};
use crate::driver::MemoryDriver;
use crate::observability::Logger;
use crate::schema::{read_definition, DefinitionLoader, EntityDefinition};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{error_line, write_line};

/// Dispatch a parsed command, writing results to stdout
pub fn run_command(command: Command) -> CliResult<()> {
    let mut stdout = io::stdout();
    match command {
        Command::Check { definition, config } => {
            check(&mut stdout, &definition, config.as_deref())
        }
        Command::Explain {
            definition,
            fields,
            config,
        } => explain(&mut stdout, &definition, &fields, config.as_deref()),
    }
}

/// Lints and compiles every definition under `definition`.
///
/// Writes one line per compiled statement, then a summary line.
pub fn check<W: Write>(out: &mut W, definition: &Path, config: Option<&Path>) -> CliResult<()> {
    let config = load_config(config)?;
    let definitions = load_definitions(definition)?;

    let mut statements = 0usize;
    for definition in &definitions {
        let dao = build(definition.clone(), &config)?;
        for (path, statement) in dao.statements().leaves() {
            write_line(
                out,
                &json!({
                    "kind": dao.kind(),
                    "path": path,
                    "query": statement.query,
                    "params": statement.params,
                }),
            )?;
            statements += 1;
        }
    }

    write_line(
        out,
        &json!({
            "status": "ok",
            "definitions": definitions.len(),
            "statements": statements,
        }),
    )
}

/// Resolves the predicate statement for `fields` against one definition.
///
/// A rejected field set is written as an error line and returned as an error.
pub fn explain<W: Write>(
    out: &mut W,
    definition: &Path,
    fields: &[String],
    config: Option<&Path>,
) -> CliResult<()> {
    let config = load_config(config)?;
    let dao = build(read_definition(definition)?, &config)?;

    let fields: Vec<&str> = fields
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect();

    match dao.resolve_predicate(&fields) {
        Ok(statement) => write_line(
            out,
            &json!({
                "status": "ok",
                "kind": dao.kind(),
                "fields": fields,
                "query": statement.query,
                "params": statement.params,
            }),
        ),
        Err(err) => {
            let details = err.field_errors().map(|errors| json!(errors));
            write_line(out, &error_line(err.code(), &err.to_string(), details.as_ref()))?;
            Err(CliError::from(err))
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<DaoConfig> {
    let Some(path) = path else {
        return Ok(DaoConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| {
        CliError::config_error(format!("cannot read config {}: {}", path.display(), e))
    })?;
    DaoConfig::from_json(&text).map_err(|e| CliError::config_error(e.to_string()))
}

fn load_definitions(path: &Path) -> CliResult<Vec<EntityDefinition>> {
    if path.is_dir() {
        let mut loader = DefinitionLoader::new();
        loader.load_dir(path)?;
        if loader.is_empty() {
            return Err(CliError::config_error(format!(
                "no definitions found in {}",
                path.display()
            )));
        }
        Ok(loader.definitions().cloned().collect())
    } else {
        Ok(vec![read_definition(path)?])
    }
}

fn build(definition: EntityDefinition, config: &DaoConfig) -> CliResult<EntityDao> {
    let dao = EntityDao::builder(
        definition,
        Arc::new(MemoryDriver::new()),
        Arc::new(TimeUuidGenerator::seeded()),
    )
    .config(config.clone())
    .build()?;
    Ok(dao)
}

/// Applies the requested log level before any command runs
pub fn init_logging(level: super::args::LogLevel) {
    Logger::set_min_severity(level.into());
}
