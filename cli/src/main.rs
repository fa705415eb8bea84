//! frenum CLI: the guardrail lifecycle in three commands.
//!
//!   frenum lint   --config policy.yaml
//!   frenum test   --config policy.yaml --tests tests.yaml [--format html]
//!   frenum report --audit decisions.jsonl
//!   frenum init
//!
//! Exit codes: 0 success, 1 findings/failures, 2 load or usage errors.
//! Lint warnings never change the exit code.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use frenum_audit::read_records;
use frenum_contracts::LintSeverity;
use frenum_policy::{lint, load_policy_file, load_tests_file, Engine};
use frenum_report::{coverage, render_html, render_json, render_text, run_tests, AuditSummary, ReportData};

// ── CLI definition ────────────────────────────────────────────────────────────

/// frenum: deterministic guardrails for agent tool calls.
#[derive(Parser)]
#[command(
    name = "frenum",
    about = "Deterministic guardrails for agent tool calls",
    long_about = "Lints guardrail policies, runs regression tests with coverage\n\
                  over deterministic rules, and summarizes audit decision logs."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Static analysis of a policy document.
    Lint {
        /// Path to the policy YAML file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Run guardrail regression tests against a policy.
    Test {
        /// Path to the policy YAML file.
        #[arg(long)]
        config: PathBuf,
        /// Path to the test YAML file.
        #[arg(long)]
        tests: PathBuf,
        /// Report format.
        #[arg(long, value_enum, default_value = "text")]
        format: ReportFormat,
        /// Write the report to a file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Fail if coverage drops below this percentage (0-100).
        #[arg(long, value_name = "PCT")]
        min_coverage: Option<f64>,
    },
    /// Summarize an audit decision log.
    Report {
        /// Path to the JSONL audit log.
        #[arg(long)]
        audit: PathBuf,
        /// Summary format.
        #[arg(long, value_enum, default_value = "text")]
        format: SummaryFormat,
    },
    /// Scaffold a starter policy.yaml and tests.yaml.
    Init,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
    Html,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Structured logging; RUST_LOG=debug shows per-rule evaluation.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Command::Lint { config } => cmd_lint(&config),
        Command::Test {
            config,
            tests,
            format,
            output,
            min_coverage,
        } => cmd_test(&config, &tests, format, output.as_deref(), min_coverage),
        Command::Report { audit, format } => cmd_report(&audit, format),
        Command::Init => cmd_init(),
    };

    ExitCode::from(code)
}

// ── lint ──────────────────────────────────────────────────────────────────────

fn cmd_lint(config: &Path) -> u8 {
    let doc = match load_policy_file(config) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error loading policy: {e}");
            return 2;
        }
    };

    let findings = lint(&doc.rules);
    if findings.is_empty() {
        println!("No issues found.");
        return 0;
    }

    let mut errors = 0usize;
    let mut warnings = 0usize;
    for finding in &findings {
        let prefix = match finding.severity {
            LintSeverity::Error => {
                errors += 1;
                "ERROR"
            }
            LintSeverity::Warning => {
                warnings += 1;
                "WARN"
            }
        };
        let rule = finding
            .rule_name
            .as_deref()
            .map(|name| format!(" [{name}]"))
            .unwrap_or_default();
        println!("  {prefix} {}{rule}: {}", finding.code.as_str(), finding.message);
    }
    println!();
    println!("{errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        1
    } else {
        0
    }
}

// ── test ──────────────────────────────────────────────────────────────────────

fn cmd_test(
    config: &Path,
    tests: &Path,
    format: ReportFormat,
    output: Option<&Path>,
    min_coverage: Option<f64>,
) -> u8 {
    let doc = match load_policy_file(config) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error loading policy: {e}");
            return 2;
        }
    };
    let cases = match load_tests_file(tests) {
        Ok(cases) => cases,
        Err(e) => {
            eprintln!("Error loading tests: {e}");
            return 2;
        }
    };
    let engine = match Engine::from_specs(&doc.rules, doc.policy_version.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {e}");
            return 2;
        }
    };

    let outcomes = run_tests(&engine, &cases);
    let coverage_report = coverage(engine.policy(), &outcomes);
    let policy_content = fs::read_to_string(config).unwrap_or_default();
    let data = ReportData::build(&outcomes, &coverage_report, &policy_content, Utc::now());

    let rendered = match format {
        ReportFormat::Text => render_text(&data),
        ReportFormat::Json => render_json(&data),
        ReportFormat::Html => render_html(&data),
    };

    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, &rendered) {
                eprintln!("Error writing report to '{}': {e}", path.display());
                return 2;
            }
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    if outcomes.iter().any(|o| !o.passed) {
        return 1;
    }
    if let Some(threshold) = min_coverage {
        if coverage_report.coverage_pct < threshold {
            eprintln!(
                "Coverage {:.1}% below threshold {:.1}%",
                coverage_report.coverage_pct, threshold
            );
            return 1;
        }
    }
    0
}

// ── report ────────────────────────────────────────────────────────────────────

fn cmd_report(audit: &Path, format: SummaryFormat) -> u8 {
    let records = match read_records(audit) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error: {e}");
            return 2;
        }
    };

    let summary = AuditSummary::from_records(&records);
    match format {
        SummaryFormat::Text => println!("{}", summary.to_text()),
        SummaryFormat::Json => println!("{}", summary.to_json()),
    }
    0
}

// ── init ──────────────────────────────────────────────────────────────────────

const STARTER_POLICY: &str = r#"policy_version: "1.0.0"

rules:
  # Block dangerous SQL patterns
  - name: block_sql_injection
    type: regex_block
    applies_to: ["execute_sql"]
    params:
      fields: ["query"]
      patterns:
        - "(?i)(DROP|DELETE|TRUNCATE)\\s+TABLE"

  # Scan all tool calls for PII leakage
  - name: detect_pii
    type: pii_detect
    applies_to: ["*"]
    params:
      detectors: [email, phone_intl, credit_card, ssn]
      action: block

  # Only allow known tools
  - name: allowed_tools_only
    type: tool_allowlist
    applies_to: ["*"]
    params:
      allowed_tools: ["execute_sql", "search", "get_data"]
"#;

const STARTER_TESTS: &str = r#"tests:
  - description: SQL injection blocked
    tool_call:
      name: execute_sql
      args:
        query: "DROP TABLE users"
    expected: block
    expected_rule: block_sql_injection

  - description: Clean query allowed
    tool_call:
      name: execute_sql
      args:
        query: "SELECT * FROM users WHERE id = 1"
    expected: allow

  - description: PII in args blocked
    tool_call:
      name: search
      args:
        query: "Contact alice@example.com"
    expected: block
    expected_rule: detect_pii

  - description: Unknown tool blocked
    tool_call:
      name: delete_account
      args:
        user_id: "123"
    expected: block
    expected_rule: allowed_tools_only
"#;

fn cmd_init() -> u8 {
    let mut wrote_any = false;
    for (path, content) in [("policy.yaml", STARTER_POLICY), ("tests.yaml", STARTER_TESTS)] {
        if Path::new(path).exists() {
            eprintln!("  skip  {path} (already exists)");
            continue;
        }
        match fs::write(path, content) {
            Ok(()) => {
                println!("  wrote {path}");
                wrote_any = true;
            }
            Err(e) => {
                eprintln!("Error writing {path}: {e}");
                return 2;
            }
        }
    }

    if wrote_any {
        println!();
        println!("Run: frenum lint --config policy.yaml");
        println!("     frenum test --config policy.yaml --tests tests.yaml");
    } else {
        eprintln!("Nothing to write; both files already exist.");
    }
    0
}
