//! # ReportingCategory: display/aggregation behaviour of one reporter node.

use std::borrow::Cow;

/// Named bucket in the reporter tree.
///
/// - `key`: path segment used to address the node (`report(&["recreate", "succeeded"], ..)`)
/// - `title`: label used when rendering (defaults to `key`)
/// - `show_count`: prefix the rendered line with the node's total count
/// - `indent_children`: render child nodes one level deeper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingCategory {
    pub key: Cow<'static, str>,
    pub title: Cow<'static, str>,
    pub show_count: bool,
    pub indent_children: bool,
}

impl ReportingCategory {
    /// Creates a category whose title equals its key, showing counts and indenting children.
    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        let key = key.into();
        Self {
            title: key.clone(),
            key,
            show_count: true,
            indent_children: true,
        }
    }

    /// Sets the rendered title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<Cow<'static, str>>) -> Self {
        self.title = title.into();
        self
    }

    /// Enables or disables the count prefix.
    #[must_use]
    pub fn with_show_count(mut self, show: bool) -> Self {
        self.show_count = show;
        self
    }

    /// Enables or disables indentation of child nodes.
    #[must_use]
    pub fn with_indent_children(mut self, indent: bool) -> Self {
        self.indent_children = indent;
        self
    }
}

impl From<&'static str> for ReportingCategory {
    fn from(key: &'static str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ReportingCategory {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}
