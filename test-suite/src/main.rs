//! Runner for the caret case files.
//!
//! Runs every case and reports one line per case file:
//! - completion/colors 2/2 PASS
//! - commit/parens 0/1 FAIL

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::Context;
use caret_config::CaretConfig;
use clap::Parser;
use rayon::prelude::*;
use test_suite::{
    Case, CaseResult, CollectCasesError, RunConfig, ScenarioResult, cases_dir, collect_cases_in,
    format_parse_error,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "test-suite", about = "Caret test suite runner")]
struct Args {
    /// Enable trace output for debugging
    #[arg(short, long)]
    trace: bool,

    /// Filter tests by name pattern (substring match)
    #[arg(short, long)]
    filter: Option<String>,

    /// Show short error summaries instead of detailed output
    #[arg(short, long)]
    short: bool,

    /// Treat unimplemented cases as failures instead of TODOs
    #[arg(short, long)]
    all: bool,

    /// Directory of case files (overrides `suite.cases-dir` in Caret.toml)
    #[arg(long)]
    cases: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

/// ANSI color codes
mod colors {
    pub const GREEN: &str = "\x1b[32m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RESET: &str = "\x1b[0m";
}

/// Detailed failure information
struct FailureDetail {
    /// Short one-line description
    short: String,
    /// Detailed multi-line description
    detailed: String,
}

/// Result of a single test case execution
struct CaseOutcome {
    case_name: String,
    result: CaseResult,
    status_info: String,
    unimplemented: Option<String>,
}

/// Result of a test file execution (may contain multiple cases)
enum TestFileOutcome {
    Ran {
        file_name: String,
        cases: Vec<CaseOutcome>,
    },
    ParseError { file_name: String, error: String },
}

impl TestFileOutcome {
    fn file_name(&self) -> &str {
        match self {
            TestFileOutcome::Ran { file_name, .. } | TestFileOutcome::ParseError { file_name, .. } => {
                file_name
            }
        }
    }
}

/// Running totals for the summary
#[derive(Default)]
struct Totals {
    passed: usize,
    failed: usize,
    scenarios_passed: usize,
    scenarios: usize,
    unimplemented: Vec<(String, bool)>,
    failures: Vec<(String, Vec<FailureDetail>)>,
}

/// Extract a friendly file name from the full path
fn file_name_from_path(path: &Path, cases_dir: &Path) -> String {
    path.strip_prefix(cases_dir)
        .unwrap_or(path)
        .with_extension("")
        .display()
        .to_string()
}

fn init_tracing(trace: bool) {
    let trace = trace || std::env::var_os("CARET_TEST_TRACE").is_some();
    let filter = if trace {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.trace);
    let exit_code = match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!(
                "{}{}Error:{} {:#}",
                colors::BOLD,
                colors::RED,
                colors::RESET,
                e
            );
            2
        }
    };
    std::process::exit(exit_code);
}

fn run(args: &Args) -> anyhow::Result<i32> {
    let current_dir = std::env::current_dir().context("failed to read the current directory")?;
    let (config_path, config) = match CaretConfig::load_from_dir(&current_dir)
        .context("failed to load Caret.toml")?
    {
        Some((path, config)) => (Some(path), config),
        None => (None, CaretConfig::default()),
    };
    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "loaded configuration");
    }

    let cases_base_dir = args
        .cases
        .clone()
        .or_else(|| {
            config_path
                .as_deref()
                .and_then(|path| config.cases_dir(path))
        })
        .unwrap_or_else(cases_dir);
    let filter = args.filter.as_ref().or(config.suite.filter.as_ref());
    if let Some(threads) = args.threads.or(config.suite.threads) {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure worker threads")?;
    }
    let run_config = RunConfig {
        verify: config.verify.clone(),
    };

    println!(
        "\n{}{}Caret Test Suite{}",
        colors::BOLD,
        colors::CYAN,
        colors::RESET
    );
    println!("{}{}", colors::DIM, "=".repeat(50));
    println!("{}\n", colors::RESET);

    let cases = collect_cases_in(&cases_base_dir).with_context(|| {
        format!(
            "failed to collect test cases from {}",
            cases_base_dir.display()
        )
    })?;

    // Filter cases by file name if a filter is set
    let cases: Vec<_> = match filter {
        Some(filter) => cases
            .into_iter()
            .filter(|case_result| {
                let path = match case_result {
                    Ok(parse_result) => &parse_result.path,
                    Err(error) => error.path(),
                };
                file_name_from_path(path, &cases_base_dir).contains(filter.as_str())
            })
            .collect(),
        None => cases,
    };

    if cases.is_empty() {
        println!(
            "{}{}Warning:{} No test cases found{}",
            colors::BOLD,
            colors::YELLOW,
            colors::RESET,
            if filter.is_some() {
                " matching filter"
            } else {
                ""
            }
        );
        return Ok(0);
    }

    let (tx, rx) = mpsc::channel();

    // Run tests in parallel
    let mut outcomes: Vec<TestFileOutcome> = std::thread::scope(|s| {
        s.spawn(|| {
            cases.par_iter().for_each_with(tx, |tx, case_result| {
                let outcome = match case_result {
                    Ok(parse_result) => {
                        let file_name = file_name_from_path(&parse_result.path, &cases_base_dir);
                        let case_outcomes = parse_result
                            .case_file
                            .all_cases()
                            .map(|(name, case_data)| {
                                let case =
                                    Case::new(parse_result.path.clone(), name.to_string(), case_data);
                                let preprocessed = case.preprocess(&run_config);
                                CaseOutcome {
                                    case_name: name.to_string(),
                                    result: preprocessed.run_all(),
                                    status_info: preprocessed.status_summary(),
                                    unimplemented: case.data.unimplemented.clone(),
                                }
                            })
                            .collect();
                        TestFileOutcome::Ran {
                            file_name,
                            cases: case_outcomes,
                        }
                    }
                    Err(collect_error) => {
                        let error = match collect_error {
                            CollectCasesError::IoError { error, .. } => {
                                format!("IO error: {}", error)
                            }
                            CollectCasesError::ParseError { path, error, input } => {
                                format_parse_error(error, input, path)
                            }
                        };
                        TestFileOutcome::ParseError {
                            file_name: file_name_from_path(collect_error.path(), &cases_base_dir),
                            error,
                        }
                    }
                };
                tx.send(outcome).unwrap();
            });
        });

        rx.iter().collect()
    });

    // Sort by file name for consistent output
    outcomes.sort_by(|a, b| a.file_name().cmp(b.file_name()));

    let mut totals = Totals::default();
    for outcome in &outcomes {
        match outcome {
            TestFileOutcome::Ran { file_name, cases } => {
                if cases.len() > 1 {
                    // Priority: FAIL > TODO > PASS
                    // In strict mode (--all), unimplemented cases are treated as regular cases
                    let has_fail = cases.iter().any(|c| {
                        let is_unimpl = !args.all && c.unimplemented.is_some();
                        !is_unimpl && !c.result.all_passed()
                    });
                    let has_todo = !args.all && cases.iter().any(|c| c.unimplemented.is_some());

                    let (header_status, header_color) = if has_fail {
                        ("FAIL", colors::RED)
                    } else if has_todo {
                        ("TODO", colors::YELLOW)
                    } else {
                        ("PASS", colors::GREEN)
                    };

                    println!(
                        "  {}{}{}{} {}",
                        colors::BOLD,
                        header_color,
                        header_status,
                        colors::RESET,
                        file_name
                    );

                    for case_outcome in cases {
                        display_case_outcome(case_outcome, file_name, true, args.all, &mut totals);
                    }
                } else if let Some(case_outcome) = cases.first() {
                    display_case_outcome(case_outcome, file_name, false, args.all, &mut totals);
                }
            }
            TestFileOutcome::ParseError { file_name, error } => {
                println!(
                    "  {}{}PARSE ERROR{} {}",
                    colors::BOLD,
                    colors::RED,
                    colors::RESET,
                    file_name
                );
                totals.failed += 1;
                totals.failures.push((
                    file_name.clone(),
                    vec![FailureDetail {
                        short: "Parse error".to_string(),
                        detailed: error.clone(),
                    }],
                ));
            }
        }
    }

    print_summary(&totals, args.short);

    println!();
    if totals.failed == 0 {
        println!(
            "{}{}All tests passed!{}",
            colors::BOLD,
            colors::GREEN,
            colors::RESET
        );
        Ok(0)
    } else {
        println!(
            "{}{}{} test(s) failed.{}",
            colors::BOLD,
            colors::RED,
            totals.failed,
            colors::RESET
        );
        Ok(1)
    }
}

fn print_summary(totals: &Totals, short: bool) {
    println!("\n{}{}Summary{}", colors::BOLD, colors::CYAN, colors::RESET);
    println!("{}{}", colors::DIM, "-".repeat(50));
    println!("{}", colors::RESET);

    println!(
        "  Cases:     {} passed, {} failed, {} unimplemented, {} total",
        totals.passed,
        totals.failed,
        totals.unimplemented.len(),
        totals.passed + totals.failed + totals.unimplemented.len()
    );
    println!(
        "  Scenarios: {} passed, {} failed, {} total",
        totals.scenarios_passed,
        totals.scenarios - totals.scenarios_passed,
        totals.scenarios
    );

    let fully_passing_unimpl = totals
        .unimplemented
        .iter()
        .filter(|(_, all_passed)| *all_passed)
        .count();
    if fully_passing_unimpl > 0 {
        println!(
            "\n{}Note:{} {} unimplemented case(s) have all scenarios passing",
            colors::BOLD,
            colors::RESET,
            fully_passing_unimpl
        );
    }

    if totals.failures.is_empty() {
        return;
    }
    println!("\n{}{}Failures{}", colors::BOLD, colors::RED, colors::RESET);
    println!("{}{}", colors::DIM, "-".repeat(50));
    println!("{}", colors::RESET);

    for (case_name, details) in &totals.failures {
        println!(
            "\n  {}{}{}{}",
            colors::BOLD,
            colors::RED,
            case_name,
            colors::RESET
        );
        for detail in details {
            let text = if short {
                &detail.short
            } else {
                &detail.detailed
            };
            for line in text.lines() {
                println!("    {}", line);
            }
        }
    }
}

fn display_case_outcome(
    case_outcome: &CaseOutcome,
    file_name: &str,
    nested: bool,
    strict_mode: bool,
    totals: &mut Totals,
) {
    let passed = case_outcome.result.passed_count();
    let total = case_outcome.result.total_count();
    totals.scenarios_passed += passed;
    totals.scenarios += total;

    let case_label = if case_outcome.case_name.is_empty() {
        "[root]".to_string()
    } else {
        format!("[{}]", case_outcome.case_name)
    };
    let (case_id, display_name) = if nested {
        (format!("{}{}", file_name, case_label), case_label)
    } else {
        (file_name.to_string(), file_name.to_string())
    };

    // In strict mode (--all), treat unimplemented cases as regular cases
    let effective_unimplemented = if strict_mode {
        None
    } else {
        case_outcome.unimplemented.as_ref()
    };

    let (status_text, color, unimpl_annotation) = if let Some(reason) = effective_unimplemented {
        let annotation = if reason.is_empty() {
            String::new()
        } else {
            format!(" (\"{}\")", reason)
        };
        ("TODO", colors::YELLOW, annotation)
    } else if case_outcome.result.all_passed() {
        ("PASS", colors::GREEN, String::new())
    } else {
        ("FAIL", colors::RED, String::new())
    };

    let indent = if nested { "    " } else { "  " };
    println!(
        "{}{}{}{}{} {} {}{}/{}{}{}",
        indent,
        colors::BOLD,
        color,
        status_text,
        colors::RESET,
        display_name,
        colors::DIM,
        passed,
        total,
        colors::RESET,
        unimpl_annotation
    );

    if effective_unimplemented.is_some() {
        totals
            .unimplemented
            .push((case_id, case_outcome.result.all_passed()));
    } else if case_outcome.result.all_passed() {
        totals.passed += 1;
    } else {
        totals.failed += 1;

        let failed_details: Vec<FailureDetail> = case_outcome
            .result
            .failed_scenarios()
            .iter()
            .filter_map(|s| match &s.result {
                ScenarioResult::Failed { error } => Some(FailureDetail {
                    short: format!("{}: {}", s.name, error.lines().next().unwrap_or_default()),
                    detailed: format!("{}\n\n{}: {}", case_outcome.status_info, s.name, error),
                }),
                ScenarioResult::Passed => None,
            })
            .collect();
        totals.failures.push((case_id, failed_details));
    }
}
