use crate::domain::Category;
use crate::extract::{FieldExtractor, Slice};

/// A category marker paired with the heuristic that extracts its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub category: Category,
    pub marker: &'static str,
    pub field: FieldExtractor,
}

impl Rule {
    pub const fn new(category: Category, marker: &'static str, field: FieldExtractor) -> Self {
        Self {
            category,
            marker,
            field,
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        line.contains(self.marker)
    }
}

pub const DEFAULT_RULES: [Rule; 11] = [
    Rule::new(
        Category::OnlineStatus,
        "action,presence",
        FieldExtractor::Literal(Slice::new("action", 16, b'"')),
    ),
    Rule::new(
        Category::ChatState,
        "action,chatstate",
        FieldExtractor::Literal(Slice::new("action", 17, b'"')),
    ),
    Rule::new(
        Category::MessageType,
        "action,message",
        FieldExtractor::Literal(Slice::new("action", 15, b',')),
    ),
    Rule::new(
        Category::MessageDeleted,
        "action,msgs",
        FieldExtractor::Literal(Slice::new("action", 12, b',')),
    ),
    Rule::new(
        Category::ContactBlocked,
        "action,block",
        FieldExtractor::BlockToggle(Slice::new("action", 13, b',')),
    ),
    Rule::new(
        Category::Battery,
        "action,battery",
        FieldExtractor::Literal(Slice::new("action", 15, b',')),
    ),
    Rule::new(
        Category::GroupAction,
        "action,group",
        FieldExtractor::GroupAction(Slice::new("action", 13, b'"')),
    ),
    Rule::new(
        Category::StatusAction,
        "action,status",
        FieldExtractor::StatusAction(Slice::new("action", 14, b'"')),
    ),
    Rule::new(Category::ReadAction, "action,chat,", FieldExtractor::ReadOrDelete),
    Rule::new(Category::MediaSent, "Media:sendToChat", FieldExtractor::SendMedia),
    Rule::new(Category::MediaReceived, "action,msg,relay", FieldExtractor::ReceiveMedia),
];

/// Tests a line against every rule independently; a line may match several.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    rules: Vec<Rule>,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::with_rules(DEFAULT_RULES.to_vec())
    }
}

impl LineClassifier {
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Matching rules, in table order.
    pub fn matching<'a>(&'a self, line: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |rule| rule.matches(line))
    }

    pub fn classify(&self, line: &str) -> Vec<Category> {
        self.matching(line).map(|rule| rule.category).collect()
    }
}
