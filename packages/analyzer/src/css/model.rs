//! CSS rule model

use bitflags::bitflags;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use crate::dom::model::{ElementData, SimpleSelector};
use crate::parse_util::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    Style,
    Media,
    Keyframes,
    Import,
    FontFace,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Style => "style",
            RuleType::Media => "media",
            RuleType::Keyframes => "keyframes",
            RuleType::Import => "import",
            RuleType::FontFace => "font-face",
        }
    }
}

/// Pseudo-classes the analyzer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoClass {
    Hover,
    Focus,
    Active,
    FocusVisible,
    FocusWithin,
    Disabled,
    Checked,
}

impl PseudoClass {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hover" => Some(PseudoClass::Hover),
            "focus" => Some(PseudoClass::Focus),
            "active" => Some(PseudoClass::Active),
            "focus-visible" => Some(PseudoClass::FocusVisible),
            "focus-within" => Some(PseudoClass::FocusWithin),
            "disabled" => Some(PseudoClass::Disabled),
            "checked" => Some(PseudoClass::Checked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PseudoClass::Hover => "hover",
            PseudoClass::Focus => "focus",
            PseudoClass::Active => "active",
            PseudoClass::FocusVisible => "focus-visible",
            PseudoClass::FocusWithin => "focus-within",
            PseudoClass::Disabled => "disabled",
            PseudoClass::Checked => "checked",
        }
    }

    pub fn is_focus_related(&self) -> bool {
        matches!(
            self,
            PseudoClass::Focus | PseudoClass::FocusVisible | PseudoClass::FocusWithin
        )
    }
}

bitflags! {
    /// Derived accessibility impact of a rule; a pure function of its
    /// selector and properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RuleImpact: u8 {
        const AFFECTS_FOCUS       = 1 << 0;
        const AFFECTS_VISIBILITY  = 1 << 1;
        const AFFECTS_CONTRAST    = 1 << 2;
        const AFFECTS_INTERACTION = 1 << 3;
        const HAS_PSEUDO_CLASS    = 1 << 4;
    }
}

/// Cascade specificity `(inline, id, class, element)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Specificity {
    pub inline: u32,
    pub id: u32,
    pub class: u32,
    pub element: u32,
}

static SPECIFICITY_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(#[-\w]+)|(\.[-\w]+)|(\[[^\]]*\])|(::?[-\w]+(?:\([^)]*\))?)|([a-zA-Z][-\w]*)")
        .unwrap()
});

impl Specificity {
    /// Specificity of a stylesheet selector; the inline slot stays zero.
    pub fn of_selector(selector: &str) -> Self {
        let mut spec = Specificity::default();
        for cap in SPECIFICITY_TOKEN.captures_iter(selector) {
            if cap.get(1).is_some() {
                spec.id += 1;
            } else if cap.get(2).is_some() || cap.get(3).is_some() {
                spec.class += 1;
            } else if let Some(pseudo) = cap.get(4) {
                let text = pseudo.as_str();
                if text.starts_with("::") {
                    spec.element += 1;
                } else if !text.starts_with(":not") {
                    spec.class += 1;
                }
            } else if cap.get(5).is_some() {
                spec.element += 1;
            }
        }
        spec
    }
}

static PSEUDO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"::?[-\w]+(?:\([^)]*\))?").unwrap());

#[derive(Debug, Clone)]
pub struct CssRule {
    pub rule_type: RuleType,
    pub selector: String,
    pub properties: IndexMap<String, String>,
    pub specificity: Specificity,
    pub media_query: Option<String>,
    pub pseudo_class: Option<PseudoClass>,
    pub impact: RuleImpact,
    pub source_order: usize,
    pub span: Option<Span>,
}

impl CssRule {
    pub fn new(rule_type: RuleType, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        CssRule {
            specificity: Specificity::of_selector(&selector),
            pseudo_class: first_pseudo_class(&selector),
            rule_type,
            selector,
            properties: IndexMap::new(),
            media_query: None,
            impact: RuleImpact::empty(),
            source_order: 0,
            span: None,
        }
    }

    /// Recompute the derived impact flags from selector and properties.
    pub fn finalize(&mut self) {
        self.impact = compute_impact(&self.selector, &self.properties, self.pseudo_class);
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Selector with pseudo-classes and pseudo-elements stripped.
    pub fn base_selector(&self) -> String {
        PSEUDO_RE.replace_all(&self.selector, "").trim().to_string()
    }

    /// Whether the base selector matches the element. Descendant selectors
    /// match by their subject (rightmost) compound.
    pub fn matches_element(&self, el: &ElementData) -> bool {
        if self.rule_type == RuleType::Keyframes || self.rule_type == RuleType::Import {
            return false;
        }
        let base = self.base_selector();
        let subject = base
            .split(|c: char| c.is_whitespace() || c == '>' || c == '+' || c == '~')
            .filter(|part| !part.is_empty())
            .next_back();
        match subject.and_then(SimpleSelector::parse) {
            Some(sel) => sel.matches(el),
            None => false,
        }
    }

    pub fn to_css_text(&self) -> String {
        let props: String = self
            .properties
            .iter()
            .map(|(name, value)| format!("  {}: {};\n", name, value))
            .collect();
        match self.rule_type {
            RuleType::Import => format!("@import {};\n", self.selector),
            RuleType::Keyframes => format!("@keyframes {} {{}}\n", self.selector),
            RuleType::FontFace => format!("@font-face {{\n{}}}\n", props),
            RuleType::Media => {
                let query = self.media_query.as_deref().unwrap_or("all");
                format!(
                    "@media {} {{\n{} {{\n{}}}\n}}\n",
                    query, self.selector, props
                )
            }
            RuleType::Style => format!("{} {{\n{}}}\n", self.selector, props),
        }
    }
}

fn first_pseudo_class(selector: &str) -> Option<PseudoClass> {
    for m in PSEUDO_RE.find_iter(selector) {
        let text = m.as_str();
        if let Some(name) = text.strip_prefix(':') {
            let name = name.trim_start_matches(':');
            let name = name.split('(').next().unwrap_or(name);
            if let Some(pseudo) = PseudoClass::from_name(name) {
                return Some(pseudo);
            }
        }
    }
    None
}

const VISIBILITY_PROPS: &[&str] = &[
    "display",
    "visibility",
    "opacity",
    "clip",
    "clip-path",
    "position",
];

const CONTRAST_PROPS: &[&str] = &["color", "background", "background-color", "filter"];

const INTERACTION_PROPS: &[&str] = &["pointer-events", "cursor", "touch-action", "user-select"];

fn compute_impact(
    _selector: &str,
    properties: &IndexMap<String, String>,
    pseudo_class: Option<PseudoClass>,
) -> RuleImpact {
    let mut impact = RuleImpact::empty();
    if pseudo_class.is_some() {
        impact |= RuleImpact::HAS_PSEUDO_CLASS;
    }
    if pseudo_class.map(|p| p.is_focus_related()).unwrap_or(false)
        || properties.keys().any(|k| k.starts_with("outline"))
        || properties.contains_key("box-shadow")
    {
        impact |= RuleImpact::AFFECTS_FOCUS;
    }
    if properties.keys().any(|k| VISIBILITY_PROPS.contains(&k.as_str())) {
        impact |= RuleImpact::AFFECTS_VISIBILITY;
    }
    if properties.keys().any(|k| CONTRAST_PROPS.contains(&k.as_str())) {
        impact |= RuleImpact::AFFECTS_CONTRAST;
    }
    if properties.keys().any(|k| INTERACTION_PROPS.contains(&k.as_str())) {
        impact |= RuleImpact::AFFECTS_INTERACTION;
    }
    impact
}

/// Ordered rules from one stylesheet; source order is preserved for the
/// cascade.
#[derive(Debug, Clone, Default)]
pub struct CssModel {
    pub source_path: String,
    pub rules: Vec<CssRule>,
}

impl CssModel {
    pub fn new(source_path: impl Into<String>) -> Self {
        CssModel {
            source_path: source_path.into(),
            rules: Vec::new(),
        }
    }

    pub fn push(&mut self, mut rule: CssRule) {
        rule.source_order = self.rules.len();
        rule.finalize();
        self.rules.push(rule);
    }

    pub fn find_by_selector(&self, selector: &str) -> Vec<&CssRule> {
        self.rules
            .iter()
            .filter(|rule| rule.selector == selector || rule.base_selector() == selector)
            .collect()
    }

    pub fn find_focus_rules(&self) -> Vec<&CssRule> {
        self.rules
            .iter()
            .filter(|rule| rule.impact.contains(RuleImpact::AFFECTS_FOCUS))
            .collect()
    }

    pub fn find_visibility_rules(&self) -> Vec<&CssRule> {
        self.rules
            .iter()
            .filter(|rule| rule.impact.contains(RuleImpact::AFFECTS_VISIBILITY))
            .collect()
    }

    pub fn find_contrast_rules(&self) -> Vec<&CssRule> {
        self.rules
            .iter()
            .filter(|rule| rule.impact.contains(RuleImpact::AFFECTS_CONTRAST))
            .collect()
    }

    /// All rules whose base selector matches the element, sorted by
    /// specificity descending; ties keep source order.
    pub fn get_matching_rules(&self, el: &ElementData) -> Vec<&CssRule> {
        let mut matched: SmallVec<[&CssRule; 8]> = self
            .rules
            .iter()
            .filter(|rule| rule.matches_element(el))
            .collect();
        matched.sort_by(|a, b| {
            b.specificity
                .cmp(&a.specificity)
                .then(a.source_order.cmp(&b.source_order))
        });
        matched.into_vec()
    }

    /// Whether any matching rule hides the element: `display: none`,
    /// `visibility: hidden`, `opacity: 0`, clip-rect collapse, or
    /// offscreen absolute/fixed positioning.
    pub fn is_element_hidden(&self, el: &ElementData) -> bool {
        self.get_matching_rules(el).iter().any(|rule| {
            if rule.property("display").map(str::trim) == Some("none") {
                return true;
            }
            if rule.property("visibility").map(str::trim) == Some("hidden") {
                return true;
            }
            if rule
                .property("opacity")
                .and_then(|o| o.trim().parse::<f64>().ok())
                .map(|o| o == 0.0)
                .unwrap_or(false)
            {
                return true;
            }
            if rule
                .property("clip")
                .map(|c| c.replace(' ', "").contains("rect(0,0,0,0)"))
                .unwrap_or(false)
            {
                return true;
            }
            let offscreen = rule
                .property("left")
                .map(|l| l.trim() == "-9999px")
                .unwrap_or(false);
            let positioned = matches!(
                rule.property("position").map(str::trim),
                Some("absolute") | Some("fixed")
            );
            positioned && offscreen
        })
    }

    /// Whether a focus-related pseudo-class rule targets the element.
    pub fn has_focus_styles(&self, el: &ElementData) -> bool {
        self.rules.iter().any(|rule| {
            rule.pseudo_class.map(|p| p.is_focus_related()).unwrap_or(false)
                && rule.matches_element(el)
                && !rule.properties.is_empty()
        })
    }

    pub fn to_css_text(&self) -> String {
        self.rules.iter().map(CssRule::to_css_text).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_compute_specificity() {
        assert_eq!(
            Specificity::of_selector("#nav .item a"),
            Specificity { inline: 0, id: 1, class: 1, element: 1 }
        );
        assert_eq!(
            Specificity::of_selector("button:focus"),
            Specificity { inline: 0, id: 0, class: 1, element: 1 }
        );
        assert_eq!(
            Specificity::of_selector("input[type=\"text\"]"),
            Specificity { inline: 0, id: 0, class: 1, element: 1 }
        );
    }

    #[test]
    fn should_order_specificity_as_tuple() {
        let id = Specificity { inline: 0, id: 1, class: 0, element: 0 };
        let classes = Specificity { inline: 0, id: 0, class: 10, element: 0 };
        assert!(id > classes);
    }

    #[test]
    fn should_extract_pseudo_class() {
        let rule = CssRule::new(RuleType::Style, "button:focus-visible");
        assert_eq!(rule.pseudo_class, Some(PseudoClass::FocusVisible));
        assert_eq!(rule.base_selector(), "button");
    }

    #[test]
    fn should_derive_impact_flags() {
        let mut rule = CssRule::new(RuleType::Style, ".hidden");
        rule.properties.insert("display".to_string(), "none".to_string());
        rule.finalize();
        assert!(rule.impact.contains(RuleImpact::AFFECTS_VISIBILITY));
        assert!(!rule.impact.contains(RuleImpact::AFFECTS_FOCUS));
    }
}
