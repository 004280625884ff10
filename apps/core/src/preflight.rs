//! Startup checks
//!
//! Verifies the configuration and the data directories before the server
//! starts. The same report is printed by the `check` subcommand.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::fs_manager::DataLayout;
use crate::indexer::list_lessons;

/// Result of a single check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    pub all_passed: bool,
    pub checks: Vec<CheckResult>,
    /// Every critical check passed; the server can answer requests.
    pub ready_to_start: bool,
    pub summary: String,
}

impl PreflightReport {
    /// One line per check, for terminal output.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self
            .checks
            .iter()
            .map(|c| {
                let mark = if c.passed { "ok  " } else { "FAIL" };
                match &c.details {
                    Some(details) => format!("[{}] {}: {} ({})", mark, c.name, c.message, details),
                    None => format!("[{}] {}: {}", mark, c.name, c.message),
                }
            })
            .collect();
        lines.push(self.summary.clone());
        lines.join("\n")
    }
}

/// Runs every check and logs the outcome.
pub async fn run_preflight_checks(config: &AppConfig) -> PreflightReport {
    info!("Running preflight checks");

    let layout = DataLayout::new(&config.data_dir);
    let checks = vec![
        check_directories(&layout),
        check_api_key(config),
        check_transcripts(&layout),
        check_vectors_dir(&layout),
        check_session_db(config).await,
    ];

    let all_passed = checks.iter().all(|c| c.passed);
    let critical_passed = checks
        .iter()
        .filter(|c| is_critical_check(&c.name))
        .all(|c| c.passed);

    let summary = if all_passed {
        "All checks passed. System ready.".to_string()
    } else if critical_passed {
        "Some non-critical checks failed. System can start with warnings.".to_string()
    } else {
        "Critical checks failed. System cannot start.".to_string()
    };

    for check in &checks {
        if check.passed {
            info!("  {}: {}", check.name, check.message);
        } else {
            warn!("  {}: {}", check.name, check.message);
            if let Some(details) = &check.details {
                warn!("      Details: {}", details);
            }
        }
    }
    info!("Summary: {}", summary);

    PreflightReport {
        all_passed,
        checks,
        ready_to_start: critical_passed,
        summary,
    }
}

fn is_critical_check(name: &str) -> bool {
    matches!(name, "directories" | "session_db")
}

// --- Individual Checks ---

fn check_directories(layout: &DataLayout) -> CheckResult {
    match layout.init() {
        Ok(()) => CheckResult::pass("directories", &format!("Data directory ready at {:?}", layout.root())),
        Err(e) => CheckResult::fail("directories", "Failed to create directories", Some(e.to_string())),
    }
}

fn check_api_key(config: &AppConfig) -> CheckResult {
    if config.api_key.is_some() {
        CheckResult::pass("api_key", "OPENAI_API_KEY is set")
    } else {
        CheckResult::fail(
            "api_key",
            "OPENAI_API_KEY is not set",
            Some("Every call to the hosted model will fail".to_string()),
        )
    }
}

fn check_transcripts(layout: &DataLayout) -> CheckResult {
    let dir = layout.transcripts_dir();
    if !dir.is_dir() {
        return CheckResult::fail("transcripts", "Transcripts directory not found", Some(format!("Expected at: {:?}", dir)));
    }

    match list_lessons(&dir) {
        Ok(lessons) if lessons.is_empty() => CheckResult::fail(
            "transcripts",
            "No lesson transcripts found",
            Some(format!("Add .txt or .pdf files to {:?}", dir)),
        ),
        Ok(lessons) => CheckResult::pass("transcripts", &format!("{} lesson(s) found", lessons.len())),
        Err(e) => CheckResult::fail("transcripts", "Cannot read transcripts directory", Some(e.to_string())),
    }
}

fn check_vectors_dir(layout: &DataLayout) -> CheckResult {
    let vectors_dir = layout.vectors_dir();

    let has_lance_files = std::fs::read_dir(&vectors_dir)
        .map(|entries| entries.flatten().any(|e| e.path().is_dir()))
        .unwrap_or(false);

    if has_lance_files {
        CheckResult::pass("vectors_dir", "Lesson index found")
    } else {
        CheckResult::fail(
            "vectors_dir",
            "Lesson index is empty",
            Some("Run `lesson-tutor build-index` first".to_string()),
        )
    }
}

async fn check_session_db(config: &AppConfig) -> CheckResult {
    let Some(path) = &config.session_db else {
        return CheckResult::pass("session_db", "Sessions kept in memory");
    };

    match crate::database::init_db(path).await {
        Ok(pool) => {
            pool.close().await;
            CheckResult::pass("session_db", &format!("Session database OK at {:?}", path))
        }
        Err(e) => CheckResult::fail("session_db", "Cannot open session database", Some(e.to_string())),
    }
}
