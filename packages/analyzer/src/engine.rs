//! Analysis engine
//!
//! Owns configuration, the immutable parse caches and the findings sink.
//! One `DocumentModel` is built per bundle; independent bundles analyze
//! in parallel with no shared mutable state beyond the caches, whose
//! entries are immutable and replaced atomically.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use rayon::prelude::*;

use crate::action::lower_program;
use crate::analyzer::finding::{
    kinds, AnalysisScope, Confidence, ConfidenceLevel, Finding, Location, Severity,
};
use crate::analyzer::{run_rules, AnalyzerContext};
use crate::config::AnalyzerConfig;
use crate::css::parser::{CssParseResult, CssParser};
use crate::dom::parser::{MarkupParseResult, MarkupParser};
use crate::dom::validator;
use crate::model::document::DocumentModel;
use crate::model::handler::ActionLanguageModel;
use crate::parse_util::{ParseError, ParseErrorLevel, SourceFile};
use crate::script::Parser as ScriptParser;

/// Cooperative cancellation shared between the host and an analysis.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct SourceText {
    pub path: String,
    pub content: String,
}

impl SourceText {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        SourceText {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// The sources of one page: primary markup plus its scripts and styles.
#[derive(Debug, Clone)]
pub struct SourceBundle {
    pub primary: Option<SourceText>,
    pub scripts: Vec<SourceText>,
    pub styles: Vec<SourceText>,
    pub scope: AnalysisScope,
}

impl SourceBundle {
    pub fn page(primary: SourceText) -> Self {
        SourceBundle {
            primary: Some(primary),
            scripts: Vec::new(),
            styles: Vec::new(),
            scope: AnalysisScope::Page,
        }
    }

    pub fn file_scope() -> Self {
        SourceBundle {
            primary: None,
            scripts: Vec::new(),
            styles: Vec::new(),
            scope: AnalysisScope::File,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub findings: Vec<Finding>,
    /// Validator and parser diagnostics, same record shape as findings.
    pub diagnostics: Vec<Finding>,
}

type CacheKey = (String, u64);

struct ScriptArtifact {
    model: ActionLanguageModel,
    errors: Vec<ParseError>,
}

type PublishHook = Arc<dyn Fn(&Finding) + Send + Sync>;

pub struct AnalysisEngine {
    config: AnalyzerConfig,
    markup_cache: Mutex<HashMap<CacheKey, Arc<MarkupParseResult>>>,
    script_cache: Mutex<HashMap<CacheKey, Arc<ScriptArtifact>>>,
    style_cache: Mutex<HashMap<CacheKey, Arc<CssParseResult>>>,
    on_finding: Option<PublishHook>,
}

impl AnalysisEngine {
    pub fn new(config: AnalyzerConfig) -> Self {
        AnalysisEngine {
            config,
            markup_cache: Mutex::new(HashMap::new()),
            script_cache: Mutex::new(HashMap::new()),
            style_cache: Mutex::new(HashMap::new()),
            on_finding: None,
        }
    }

    /// Publish findings incrementally as detectors produce them.
    pub fn with_publish_hook(mut self, hook: PublishHook) -> Self {
        self.on_finding = Some(hook);
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze independent bundles in parallel. Each analysis owns its
    /// DocumentModel and produces an independent report.
    pub fn analyze_all(
        &self,
        bundles: &[SourceBundle],
        cancel: &CancellationToken,
    ) -> Vec<AnalysisReport> {
        bundles
            .par_iter()
            .map(|bundle| self.analyze_bundle(bundle, cancel))
            .collect()
    }

    pub fn analyze_bundle(
        &self,
        bundle: &SourceBundle,
        cancel: &CancellationToken,
    ) -> AnalysisReport {
        let mut report = AnalysisReport::default();

        // parse phase; everything is cached by (path, content hash)
        let markup = bundle.primary.as_ref().map(|source| {
            let parsed = self.parse_markup(source);
            push_parse_diagnostics(&parsed.errors, bundle.scope, &mut report.diagnostics);
            parsed
        });

        let mut scripts: Vec<Arc<ScriptArtifact>> = Vec::new();
        for source in &bundle.scripts {
            if cancel.is_cancelled() {
                return report;
            }
            let artifact = self.parse_script(source);
            push_parse_diagnostics(&artifact.errors, bundle.scope, &mut report.diagnostics);
            let unusable = artifact.model.tree.root.children.is_empty()
                && artifact
                    .errors
                    .iter()
                    .any(|e| e.level == ParseErrorLevel::Error);
            if unusable {
                debug!("skipping rules for unparsed script {}", source.path);
                continue;
            }
            for warning in &artifact.model.tree.warnings {
                report.diagnostics.push(transform_warning(
                    &source.path,
                    warning,
                    bundle.scope,
                ));
            }
            scripts.push(artifact);
        }

        let mut styles: Vec<Arc<CssParseResult>> = Vec::new();
        for source in &bundle.styles {
            if cancel.is_cancelled() {
                return report;
            }
            let parsed = self.parse_style(source);
            push_parse_diagnostics(&parsed.errors, bundle.scope, &mut report.diagnostics);
            styles.push(parsed);
        }

        // markup validation runs regardless of rule outcomes
        if let Some(markup) = &markup {
            for fragment in &markup.fragments {
                report
                    .diagnostics
                    .extend(validator::validate_fragment(fragment, bundle.scope));
            }
        }

        let publish: Option<&dyn Fn(&Finding)> = self
            .on_finding
            .as_ref()
            .map(|hook| hook.as_ref() as &dyn Fn(&Finding));
        if let Some(markup) = &markup {
            let mut model = DocumentModel::new(bundle.scope);
            model.fragments = markup.fragments.clone();
            model.scripts = scripts.iter().map(|a| a.model.clone()).collect();
            model.stylesheets = styles.iter().map(|s| s.model.clone()).collect();
            model.merge();
            for script in &model.scripts {
                for violation in script.tree.validate() {
                    report
                        .diagnostics
                        .push(model_violation(&violation, bundle.scope));
                    break; // one escalation per tree
                }
            }
            let ctx = AnalyzerContext {
                document_model: Some(&model),
                action_language_model: None,
                scope: bundle.scope,
                config: &self.config,
                cancel: cancel.clone(),
            };
            report.findings = run_rules(&ctx, publish);
        } else {
            for artifact in &scripts {
                if cancel.is_cancelled() {
                    break;
                }
                let ctx = AnalyzerContext {
                    document_model: None,
                    action_language_model: Some(&artifact.model),
                    scope: AnalysisScope::File,
                    config: &self.config,
                    cancel: cancel.clone(),
                };
                report.findings.extend(run_rules(&ctx, publish));
            }
        }

        report
            .findings
            .retain(|f| f.severity >= self.config.min_severity);
        crate::analyzer::finding::sort_findings(&mut report.findings);
        crate::analyzer::finding::sort_findings(&mut report.diagnostics);
        report
    }

    // ---- cached parsers ----

    fn parse_markup(&self, source: &SourceText) -> Arc<MarkupParseResult> {
        let key = cache_key(source);
        if let Some(found) = self.markup_cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
            return found;
        }
        debug!("parsing markup {}", source.path);
        let parsed = Arc::new(MarkupParser::new().parse(&source.content, &source.path));
        if let Ok(mut cache) = self.markup_cache.lock() {
            cache.insert(key, parsed.clone());
        }
        parsed
    }

    fn parse_script(&self, source: &SourceText) -> Arc<ScriptArtifact> {
        let key = cache_key(source);
        if let Some(found) = self.script_cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
            return found;
        }
        debug!("parsing script {}", source.path);
        let result = ScriptParser::new().parse(&source.content, &source.path);
        let file = SourceFile::new(&source.path, &source.content);
        let tree = lower_program(&result.program, file);
        let model = ActionLanguageModel::build(tree, &source.path);
        let artifact = Arc::new(ScriptArtifact {
            model,
            errors: result.errors,
        });
        if let Ok(mut cache) = self.script_cache.lock() {
            cache.insert(key, artifact.clone());
        }
        artifact
    }

    fn parse_style(&self, source: &SourceText) -> Arc<CssParseResult> {
        let key = cache_key(source);
        if let Some(found) = self.style_cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
            return found;
        }
        debug!("parsing stylesheet {}", source.path);
        let parsed = Arc::new(CssParser::new().parse(&source.content, &source.path));
        if let Ok(mut cache) = self.style_cache.lock() {
            cache.insert(key, parsed.clone());
        }
        parsed
    }
}

fn cache_key(source: &SourceText) -> CacheKey {
    let mut hasher = DefaultHasher::new();
    source.content.hash(&mut hasher);
    (source.path.clone(), hasher.finish())
}

fn push_parse_diagnostics(errors: &[ParseError], scope: AnalysisScope, out: &mut Vec<Finding>) {
    for error in errors {
        let severity = match error.level {
            ParseErrorLevel::Error => Severity::Error,
            ParseErrorLevel::Warning => Severity::Warning,
        };
        let (line, column) = error.span.start_line_col();
        out.push(Finding::new(
            kinds::VALIDATOR,
            severity,
            error.msg.clone(),
            Location::new(error.span.file.path.clone(), line, column),
            Confidence::new(ConfidenceLevel::High, "reported by the parser", scope),
        ));
    }
}

fn transform_warning(path: &str, warning: &str, scope: AnalysisScope) -> Finding {
    warn!("transform: {}", warning);
    Finding::new(
        kinds::VALIDATOR,
        Severity::Warning,
        warning.to_string(),
        Location::new(path, 1, 1),
        Confidence::new(ConfidenceLevel::High, "reported by the transformer", scope),
    )
}

fn model_violation(
    violation: &crate::action::ir::ModelViolation,
    scope: AnalysisScope,
) -> Finding {
    let location = violation
        .span
        .as_ref()
        .map(Location::from_span)
        .unwrap_or_else(|| Location::new("<model>", 1, 1));
    Finding::new(
        kinds::VALIDATOR,
        Severity::Warning,
        violation.message.clone(),
        location,
        Confidence::new(ConfidenceLevel::High, "model invariant check", scope),
    )
}
