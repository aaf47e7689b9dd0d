//! a11y-scan
//!
//! Workspace crawler and terminal front-end for the analyzer engine.
//! Walks a project root, groups HTML/JS/CSS sources into page bundles,
//! runs the engine across bundles in parallel and renders the findings.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use glob::Pattern;
use log::{debug, info};

use a11y_analyzer::analyzer::finding::kinds;
use a11y_analyzer::{
    AnalysisEngine, AnalysisReport, AnalyzerConfig, CancellationToken, Finding, Severity,
    SourceBundle, SourceText,
};

const MARKUP_EXTENSIONS: &[&str] = &["html", "htm", "jsx"];
const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts"];
const STYLE_EXTENSIONS: &[&str] = &["css"];

#[derive(Debug, Parser)]
#[command(
    name = "a11y-scan",
    about = "Static accessibility analysis for web front-end sources",
    version
)]
struct Cli {
    /// Project root (or a single file) to analyze
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Emit findings as JSON lines instead of text
    #[arg(long)]
    json: bool,

    /// Load analyzer configuration from a JSON file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only report findings at or above this severity
    #[arg(long, value_name = "LEVEL")]
    min_severity: Option<String>,

    /// Include only files matching these globs
    #[arg(long = "include", value_name = "GLOB")]
    include_patterns: Vec<String>,

    /// Exclude files matching these globs
    #[arg(long = "exclude", value_name = "GLOB")]
    exclude_patterns: Vec<String>,

    /// Cap on the number of files considered
    #[arg(long, value_name = "N")]
    max_files: Option<usize>,

    /// Also print validator/parser diagnostics
    #[arg(long)]
    diagnostics: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("a11y-scan: {:#}", err);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    apply_overrides(&cli, &mut config)?;

    let files = collect_files(&cli.root, &config)
        .with_context(|| format!("walking {}", cli.root.display()))?;
    info!("considering {} source files", files.len());

    let bundles = group_bundles(&files)?;
    if bundles.is_empty() {
        println!("no HTML/JS/CSS sources found under {}", cli.root.display());
        return Ok(ExitCode::SUCCESS);
    }
    debug!("built {} bundles", bundles.len());

    let engine = AnalysisEngine::new(config);
    let cancel = CancellationToken::new();
    let reports = engine.analyze_all(&bundles, &cancel);

    let mut worst = None;
    for report in &reports {
        render(report, &cli, &mut worst);
    }

    let total: usize = reports.iter().map(|r| r.findings.len()).sum();
    if !cli.json {
        println!();
        println!(
            "{} finding(s) across {} bundle(s)",
            total,
            reports.len()
        );
    }
    Ok(match worst {
        Some(Severity::Error) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn load_config(cli: &Cli) -> Result<AnalyzerConfig> {
    match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(AnalyzerConfig::default()),
    }
}

fn apply_overrides(cli: &Cli, config: &mut AnalyzerConfig) -> Result<()> {
    if let Some(level) = &cli.min_severity {
        config.min_severity = match level.to_lowercase().as_str() {
            "info" => Severity::Info,
            "warning" => Severity::Warning,
            "error" => Severity::Error,
            other => anyhow::bail!("unknown severity `{}`", other),
        };
    }
    if !cli.include_patterns.is_empty() {
        config.include_patterns = cli.include_patterns.clone();
    }
    if !cli.exclude_patterns.is_empty() {
        config.exclude_patterns = cli.exclude_patterns.clone();
    }
    if let Some(max) = cli.max_files {
        config.max_project_files = max;
    }
    Ok(())
}

fn collect_files(root: &Path, config: &AnalyzerConfig) -> Result<Vec<PathBuf>> {
    let include: Vec<Pattern> = compile_patterns(&config.include_patterns)?;
    let exclude: Vec<Pattern> = compile_patterns(&config.exclude_patterns)?;
    let mut files = Vec::new();
    if root.is_file() {
        files.push(root.to_path_buf());
        return Ok(files);
    }
    walk(root, &mut files)?;
    files.retain(|path| {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        let known = MARKUP_EXTENSIONS.contains(&ext.as_str())
            || SCRIPT_EXTENSIONS.contains(&ext.as_str())
            || STYLE_EXTENSIONS.contains(&ext.as_str());
        if !known {
            return false;
        }
        let included = include.is_empty() || include.iter().any(|p| p.matches_path(path));
        let excluded = exclude.iter().any(|p| p.matches_path(path));
        included && !excluded
    });
    files.sort();
    files.truncate(config.max_project_files);
    Ok(files)
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("invalid glob `{}`", p)))
        .collect()
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name == "node_modules" || name == "target" {
            continue;
        }
        if path.is_dir() {
            walk(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Group sources into bundles: every HTML file anchors a page bundle
/// together with the scripts and styles of its directory subtree;
/// scripts in directories without markup analyze file-scope.
fn group_bundles(files: &[PathBuf]) -> Result<Vec<SourceBundle>> {
    let mut by_dir: BTreeMap<PathBuf, (Vec<&PathBuf>, Vec<&PathBuf>, Vec<&PathBuf>)> =
        BTreeMap::new();
    for file in files {
        let dir = file.parent().unwrap_or(Path::new(".")).to_path_buf();
        let slot = by_dir.entry(dir).or_default();
        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if MARKUP_EXTENSIONS.contains(&ext.as_str()) {
            slot.0.push(file);
        } else if SCRIPT_EXTENSIONS.contains(&ext.as_str()) {
            slot.1.push(file);
        } else {
            slot.2.push(file);
        }
    }

    let mut bundles = Vec::new();
    for (_, (markup, scripts, styles)) in by_dir {
        let scripts: Vec<SourceText> = scripts
            .iter()
            .map(|p| read_source(p))
            .collect::<Result<_>>()?;
        let styles: Vec<SourceText> = styles
            .iter()
            .map(|p| read_source(p))
            .collect::<Result<_>>()?;
        if markup.is_empty() {
            if !scripts.is_empty() {
                let mut bundle = SourceBundle::file_scope();
                bundle.scripts = scripts;
                bundle.styles = styles;
                bundles.push(bundle);
            }
            continue;
        }
        for page in markup {
            let mut bundle = SourceBundle::page(read_source(page)?);
            bundle.scripts = scripts.clone();
            bundle.styles = styles.clone();
            bundles.push(bundle);
        }
    }
    Ok(bundles)
}

fn read_source(path: &Path) -> Result<SourceText> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(SourceText::new(path.display().to_string(), content))
}

fn render(report: &AnalysisReport, cli: &Cli, worst: &mut Option<Severity>) {
    for finding in &report.findings {
        bump(worst, finding.severity);
        print_finding(finding, cli.json);
    }
    if cli.diagnostics {
        for diagnostic in &report.diagnostics {
            if diagnostic.kind == kinds::VALIDATOR {
                print_finding(diagnostic, cli.json);
            }
        }
    }
}

fn print_finding(finding: &Finding, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(finding) {
            println!("{}", line);
        }
        return;
    }
    let severity = match finding.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
    };
    let wcag = if finding.wcag_criteria.is_empty() {
        String::new()
    } else {
        format!(" [WCAG {}]", finding.wcag_criteria.join(", "))
    };
    println!(
        "{}:{}:{}: {} {}: {}{}",
        finding.location.file,
        finding.location.line,
        finding.location.column,
        severity,
        finding.kind,
        finding.message,
        wcag
    );
    if let Some(fix) = &finding.fix {
        println!("    fix: {}", fix.description);
    }
}

fn bump(worst: &mut Option<Severity>, severity: Severity) {
    match worst {
        Some(current) if *current >= severity => {}
        _ => *worst = Some(severity),
    }
}
