pub mod lightning_parser;
pub mod minify;
pub mod regex_parser;
pub mod specificity;
pub mod stylesheet;

pub use lightning_parser::LightningRuleParser;
pub use regex_parser::RegexRuleParser;
pub use specificity::Specificity;
pub use stylesheet::{CssItem, Keyframes, MediaBlock, StyleRule, Stylesheet};

/// Turns CSS text into a [`Stylesheet`].
///
/// Implementations never fail: anything they cannot make sense of is
/// reported in [`Stylesheet::warnings`].
pub trait RuleParser: Send + Sync {
    fn parse(&self, css: &str) -> Stylesheet;
}
