//! Specialization constants ("JIT constants")
//!
//! A [`JitConstants`] set is the ordered name→value binding handed to the
//! kernel template compiler. Binding every name the template references,
//! exactly once, is what lets a generic template compile down to a
//! branch-free unit for one operator instance.

use serde::{Deserialize, Serialize};

/// One literal or expression bound to a template constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantValue {
    /// Integer literal
    Int(i64),
    /// Floating-point literal
    Float(f64),
    /// Boolean, lowered to `1`/`0` in the rendered form
    Bool(bool),
    /// Expression token consumed verbatim by the template compiler
    Expr(String),
}

impl ConstantValue {
    /// Literal text a kernel template consumes for this value
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            ConstantValue::Int(v) => v.to_string(),
            // Debug formatting keeps a decimal point on round values.
            ConstantValue::Float(v) => format!("{v:?}"),
            ConstantValue::Bool(true) => "1".to_string(),
            ConstantValue::Bool(false) => "0".to_string(),
            ConstantValue::Expr(e) => e.clone(),
        }
    }
}

/// Ordered mapping from constant name to value, unique by construction
///
/// [`JitConstants::set`] replaces an existing binding in place instead of
/// appending, so a name can never be bound twice and insertion order is
/// what the template compiler sees.
///
/// # Examples
///
/// ```
/// use despachar::jit::{ConstantValue, JitConstants};
///
/// let mut constants = JitConstants::new();
/// constants.set("TILE_SIZE", ConstantValue::Int(16));
/// constants.set("ALPHA", ConstantValue::Float(1.0));
/// assert_eq!(constants.render("ALPHA").as_deref(), Some("1.0"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JitConstants {
    entries: Vec<(String, ConstantValue)>,
}

impl JitConstants {
    /// Empty constant set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, replacing any existing binding in place
    pub fn set(&mut self, name: impl Into<String>, value: ConstantValue) -> &mut Self {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
        self
    }

    /// Value bound to `name`, if any
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ConstantValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Rendered literal for `name`, if bound
    #[must_use]
    pub fn render(&self, name: &str) -> Option<String> {
        self.get(name).map(ConstantValue::render)
    }

    /// Bound names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Bindings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConstantValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of bindings
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no constants are bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut c = JitConstants::new();
        c.set("M", ConstantValue::Int(64));
        c.set("N", ConstantValue::Int(256));
        c.set("K", ConstantValue::Int(128));
        let names: Vec<_> = c.names().collect();
        assert_eq!(names, vec!["M", "N", "K"]);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut c = JitConstants::new();
        c.set("M", ConstantValue::Int(64));
        c.set("N", ConstantValue::Int(256));
        c.set("M", ConstantValue::Int(128));
        assert_eq!(c.len(), 2);
        assert_eq!(c.get("M"), Some(&ConstantValue::Int(128)));
        let names: Vec<_> = c.names().collect();
        assert_eq!(names, vec!["M", "N"]);
    }

    #[test]
    fn test_render_forms() {
        assert_eq!(ConstantValue::Int(-3).render(), "-3");
        assert_eq!(ConstantValue::Float(1.0).render(), "1.0");
        assert_eq!(ConstantValue::Float(0.5).render(), "0.5");
        assert_eq!(ConstantValue::Bool(true).render(), "1");
        assert_eq!(ConstantValue::Bool(false).render(), "0");
        assert_eq!(
            ConstantValue::Expr("half".to_string()).render(),
            "half"
        );
    }

    #[test]
    fn test_missing_name() {
        let c = JitConstants::new();
        assert!(c.get("ALPHA").is_none());
        assert!(c.render("ALPHA").is_none());
    }
}
