use std::fs;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::cli::ValidateArgs;
use crate::commands::extract::load_session;
use crate::model::{FieldDescriptor, FieldValue, ValidationReport};
use crate::session::FormSession;
use crate::util::{now_utc_string, read_source, write_json_pretty};

pub fn run(args: ValidateArgs) -> Result<()> {
    let raw = read_source(&args.input)?;
    let answers_raw = fs::read(&args.answers)
        .with_context(|| format!("failed to read {}", args.answers.display()))?;
    let answers: Map<String, Value> = serde_json::from_slice(&answers_raw)
        .with_context(|| format!("failed to parse {}", args.answers.display()))?;

    let mut session = load_session(&raw)?;
    let ignored_answers = apply_answers(&mut session, answers);
    let issues = session.validate();

    for issue in &issues {
        warn!(field = %issue.field, message = %issue.message, "validation issue");
    }

    let report = ValidationReport {
        generated_at: now_utc_string(),
        source: args.input.display().to_string(),
        answers: args.answers.display().to_string(),
        field_count: session.fields().len(),
        ignored_answers,
        issue_count: issues.len(),
        issues,
    };

    if let Some(path) = &args.report {
        write_json_pretty(path, &report)?;
        info!(path = %path.display(), "wrote validation report");
    }

    if report.issue_count > 0 {
        bail!("{} validation issue(s) found", report.issue_count);
    }

    info!(
        field_count = report.field_count,
        ignored = report.ignored_answers.len(),
        "answers are valid"
    );
    Ok(())
}

/// Stores each answer on its field and returns the names that matched none.
fn apply_answers(session: &mut FormSession, answers: Map<String, Value>) -> Vec<String> {
    let mut ignored = Vec::new();

    for (name, value) in answers {
        let Some(kind) = session.field(&name).map(FieldDescriptor::kind) else {
            warn!(field = %name, "ignoring answer for unknown field");
            ignored.push(name);
            continue;
        };

        if let Err(err) = session.set_value(&name, FieldValue::from_json(kind, value)) {
            warn!(field = %name, error = %err, "ignoring answer");
            ignored.push(name);
        }
    }

    ignored
}
