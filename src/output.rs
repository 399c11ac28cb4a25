//! Command output: a JSON envelope for `--json`, plain text otherwise.

use serde::Serialize;

use crate::error::{Error, Result, ValidationError};

pub const SCHEMA_VERSION: &str = "tb.v1";

/// Global flags that consume the following argument.
const VALUE_FLAGS: [&str; 2] = ["--data-dir", "--config"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Human-readable result of one command.
///
/// Warnings and hints are also carried into the JSON envelope.
#[derive(Debug, Clone)]
pub struct Report {
    title: String,
    fields: Vec<(String, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
    hints: Vec<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
            lines: Vec::new(),
            warnings: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub fn field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    pub fn line(&mut self, value: impl Into<String>) {
        self.lines.push(value.into());
    }

    pub fn warn(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn hint(&mut self, value: impl Into<String>) {
        self.hints.push(value.into());
    }

    pub fn render(&self) -> String {
        let mut out = vec![self.title.clone()];
        if !self.fields.is_empty() {
            out.push(String::new());
            for (key, value) in &self.fields {
                out.push(format!("  {key}: {value}"));
            }
        }
        if !self.lines.is_empty() {
            out.push(String::new());
            out.extend(self.lines.iter().map(|line| format!("  {line}")));
        }
        for warning in &self.warnings {
            out.push(format!("warning: {warning}"));
        }
        for hint in &self.hints {
            out.push(format!("next: {hint}"));
        }
        out.join("\n")
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    next_steps: &'a [String],
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    report: Option<&Report>,
) -> Result<()> {
    if options.json {
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data: Some(data),
            error: None,
            warnings: report.map(|r| r.warnings.as_slice()).unwrap_or_default(),
            next_steps: report.map(|r| r.hints.as_slice()).unwrap_or_default(),
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else if let Some(report) = report.filter(|_| !options.quiet) {
        println!("{}", report.render());
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hints = error_hints(err);
    if json {
        let envelope: Envelope<'_, ()> = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            data: None,
            error: Some(ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            }),
            warnings: &[],
            next_steps: &hints,
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hints.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// Command label for the envelope: `list`, `archive clear`, or `tb`.
///
/// `args` excludes the program name. Values of `--data-dir` and `--config`
/// are skipped so a path is never mistaken for the command.
pub fn command_name(args: &[String]) -> String {
    let mut words = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        words.push(arg.as_str());
        if words.len() == 2 || words[0] != "archive" {
            break;
        }
    }

    if words.is_empty() {
        "tb".to_string()
    } else {
        words.join(" ")
    }
}

fn is_empty(items: &&[String]) -> bool {
    items.is_empty()
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        2 => "user_error",
        3 => "validation_failed",
        _ => "operation_failed",
    }
}

fn error_hints(err: &Error) -> Vec<String> {
    let hint = match err {
        Error::TaskNotFound(_) => "tb list",
        Error::AmbiguousTaskId { .. } => "use a longer id prefix",
        Error::Validation(ValidationError::DeadlineRequired(_)) => "tb add \"...\" --in 2h",
        Error::InvalidConfig(_) => "fix config.toml then retry",
        Error::LockFailed(_) => "retry once the other tb process finishes",
        _ => return Vec::new(),
    };
    vec![hint.to_string()]
}
