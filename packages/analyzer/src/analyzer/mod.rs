//! Analyzer framework
//!
//! Detectors walk the merged model (document scope) or a single
//! action-language model (file scope) and emit findings. The pipeline
//! checks cancellation between detectors and publishes findings as soon
//! as a detector returns them.

pub mod finding;
pub mod rules;
pub mod walk;

use crate::analyzer::finding::{sort_findings, AnalysisScope, Confidence, Finding};
use crate::config::AnalyzerConfig;
use crate::engine::CancellationToken;
use crate::model::document::DocumentModel;
use crate::model::handler::ActionLanguageModel;

pub struct AnalyzerContext<'a> {
    pub document_model: Option<&'a DocumentModel>,
    pub action_language_model: Option<&'a ActionLanguageModel>,
    pub scope: AnalysisScope,
    pub config: &'a AnalyzerConfig,
    pub cancel: CancellationToken,
}

impl<'a> AnalyzerContext<'a> {
    /// Default confidence: document scope maps completeness to a level,
    /// file scope is a medium-confidence fallback.
    pub fn confidence(&self) -> Confidence {
        match self.document_model {
            Some(model) => Confidence::from_completeness(model.tree_completeness(), self.scope),
            None => Confidence::file_scope_fallback(),
        }
    }

    /// Every script model in play: the document's scripts, or the single
    /// file-scope model.
    pub fn scripts(&self) -> Vec<&'a ActionLanguageModel> {
        if let Some(model) = self.document_model {
            model.scripts.iter().collect()
        } else {
            self.action_language_model.into_iter().collect()
        }
    }
}

/// A concrete detector.
pub trait Rule {
    fn name(&self) -> &'static str;
    fn analyze(&self, ctx: &AnalyzerContext) -> Vec<Finding>;
}

pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(rules::keyboard::KeyboardRule),
        Box::new(rules::aria_state::AriaStateRule),
        Box::new(rules::reference::AriaReferenceRule),
        Box::new(rules::reference::OrphanedHandlerRule),
        Box::new(rules::live_region::LiveRegionRule),
        Box::new(rules::context_change::ContextChangeRule),
        Box::new(rules::timing::TimingRule),
        Box::new(rules::semantic::SemanticRule),
        Box::new(rules::focus::FocusRule),
        Box::new(rules::widget::WidgetPatternRule),
    ]
}

/// Run every detector, publishing findings incrementally, and return the
/// ordered list. Cancellation is honored between detectors; on
/// cancellation the partial list is returned as-is.
pub fn run_rules(ctx: &AnalyzerContext, on_finding: Option<&dyn Fn(&Finding)>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for rule in default_rules() {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let mut produced = rule.analyze(ctx);
        if let Some(publish) = on_finding {
            for finding in &produced {
                publish(finding);
            }
        }
        findings.append(&mut produced);
    }
    sort_findings(&mut findings);
    findings
}
