//! Scoped placeholder resolution.
//!
//! A [`Resolver`] holds a stack of name bindings. Bindings are introduced with
//! [`Resolver::declare`] or [`Resolver::declare_all`] and live exactly as long
//! as the returned [`ScopeGuard`]; dropping the guard removes the bindings it
//! introduced, on every exit path.
//!
//! Templates reference bindings as `[name]` or `[name.field.sub]`. Inner
//! declarations shadow outer ones. `[[name]]` is an escape and renders as the
//! literal `[name]`.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::trace;

use crate::error::{GenError, GenResult};
use crate::value::Value;

/// Substituted values may contain placeholders themselves; resolution is
/// repeated until nothing changes, at most this many times.
const MAX_PASSES: usize = 16;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[\[([A-Za-z0-9_.]*)\]\]|\[([A-Za-z0-9_.]+)\]")
            .expect("placeholder pattern is valid")
    })
}

fn escaped_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[\[([A-Za-z0-9_.]*)\]\]").expect("escape pattern is valid")
    })
}

/// Placeholder resolver with a scoped binding stack.
///
/// The resolver is private to one generation call and is not `Sync`.
pub struct Resolver {
    bindings: RefCell<HashMap<String, Vec<(u64, Value)>>>,
    next_scope: Cell<u64>,
    case_sensitive: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Create a case-sensitive resolver with no bindings.
    pub fn new() -> Self {
        Self::with_case_sensitivity(true)
    }

    pub fn with_case_sensitivity(case_sensitive: bool) -> Self {
        Self {
            bindings: RefCell::new(HashMap::new()),
            next_scope: Cell::new(0),
            case_sensitive,
        }
    }

    /// Bind `name` to `value` until the returned guard is dropped.
    pub fn declare(&self, name: impl Into<String>, value: impl Into<Value>) -> ScopeGuard<'_> {
        let scope = self.next_scope_id();
        let key = self.key(&name.into());
        self.push(&key, scope, value.into());
        ScopeGuard {
            resolver: self,
            scope,
            names: vec![key],
        }
    }

    /// Bind several names as one scope.
    ///
    /// Declaring the same name twice in one group is rejected with
    /// [`GenError::DuplicateBinding`]; nothing is bound in that case.
    pub fn declare_all<I, K, V>(&self, assignments: I) -> GenResult<ScopeGuard<'_>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for (name, value) in assignments {
            let key = self.key(&name.into());
            if !seen.insert(key.clone()) {
                return Err(GenError::DuplicateBinding(key));
            }
            pending.push((key, value.into()));
        }

        let scope = self.next_scope_id();
        let mut names = Vec::with_capacity(pending.len());
        for (key, value) in pending {
            self.push(&key, scope, value);
            names.push(key);
        }

        Ok(ScopeGuard {
            resolver: self,
            scope,
            names,
        })
    }

    /// Substitute every placeholder in `template`.
    ///
    /// Fails with [`GenError::MissingBinding`] when a placeholder is not bound
    /// at any active scope.
    pub fn resolve(&self, template: &str) -> GenResult<String> {
        self.resolve_impl(template, None)
    }

    /// Substitute placeholders, using `fallback` for unbound ones.
    pub fn resolve_with_fallback(&self, template: &str, fallback: &Value) -> GenResult<String> {
        self.resolve_impl(template, Some(fallback))
    }

    /// Look up a dotted path (`name` or `name.field`) in the active scopes.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.').filter(|s| !s.is_empty());
        let root = self.key(segments.next()?);
        let bindings = self.bindings.borrow();
        let (_, top) = bindings.get(&root)?.last()?;
        top.lookup(segments).cloned()
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(&self.key(name))
    }

    /// Number of live bindings, counting shadowed ones.
    pub fn active_bindings(&self) -> usize {
        self.bindings.borrow().values().map(Vec::len).sum()
    }

    /// Names with at least one live binding, sorted.
    pub fn bound_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve_impl(&self, template: &str, fallback: Option<&Value>) -> GenResult<String> {
        let mut current = template.to_string();
        let mut contains_escaped = false;

        for _ in 0..MAX_PASSES {
            let (next, replacements, escaped) = self.substitute(&current, template, fallback)?;
            contains_escaped |= escaped;
            current = next;

            if replacements == 0 {
                if contains_escaped {
                    current = escaped_pattern().replace_all(&current, "[$1]").into_owned();
                }
                return Ok(current);
            }
        }

        Err(GenError::RecursionLimit(template.to_string()))
    }

    /// One substitution pass. Returns the new text, the number of
    /// placeholders replaced and whether an escape sequence was seen.
    fn substitute(
        &self,
        text: &str,
        template: &str,
        fallback: Option<&Value>,
    ) -> GenResult<(String, usize, bool)> {
        let pattern = placeholder_pattern();
        let mut out = String::with_capacity(text.len() + 64);
        let mut last = 0;
        let mut replacements = 0;
        let mut escaped = false;

        for caps in pattern.captures_iter(text) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            out.push_str(&text[last..whole.start]);
            last = whole.end;

            if caps.get(1).is_some() {
                escaped = true;
                out.push_str(&text[whole]);
                continue;
            }

            let path = member_path(&caps);
            let value = match (self.lookup(path), fallback) {
                (Some(value), _) => value,
                (None, Some(fallback)) => fallback.clone(),
                (None, None) => {
                    return Err(GenError::MissingBinding {
                        name: path.to_string(),
                        template: template.to_string(),
                        available: self.describe_bindings(),
                    })
                }
            };

            trace!(placeholder = path, "resolved placeholder");
            out.push_str(&value.render(path)?);
            replacements += 1;
        }

        out.push_str(&text[last..]);
        Ok((out, replacements, escaped))
    }

    fn describe_bindings(&self) -> String {
        let names = self.bound_names();
        if names.is_empty() {
            "No parameters are bound".to_string()
        } else {
            format!("Bound parameters:\n- {}", names.join("\n- "))
        }
    }

    fn key(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    fn next_scope_id(&self) -> u64 {
        let id = self.next_scope.get();
        self.next_scope.set(id + 1);
        id
    }

    fn push(&self, key: &str, scope: u64, value: Value) {
        self.bindings
            .borrow_mut()
            .entry(key.to_string())
            .or_default()
            .push((scope, value));
    }

    fn release(&self, scope: u64, names: &[String]) {
        let mut bindings = self.bindings.borrow_mut();
        for name in names {
            let now_empty = match bindings.get_mut(name) {
                Some(stack) => {
                    if let Some(pos) = stack.iter().rposition(|(id, _)| *id == scope) {
                        stack.remove(pos);
                    }
                    stack.is_empty()
                }
                None => false,
            };
            if now_empty {
                bindings.remove(name);
            }
        }
    }
}

fn member_path<'t>(caps: &Captures<'t>) -> &'t str {
    caps.get(2).map(|m| m.as_str()).unwrap_or_default()
}

/// Keeps a group of bindings alive; dropping it releases them.
#[must_use = "bindings are released as soon as the guard is dropped"]
pub struct ScopeGuard<'r> {
    resolver: &'r Resolver,
    scope: u64,
    names: Vec<String>,
}

impl ScopeGuard<'_> {
    /// Names introduced by this scope.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.resolver.release(self.scope, &self.names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::OMIT_TAG;
    use std::collections::BTreeMap;

    #[test]
    fn test_resolve_simple() {
        let resolver = Resolver::new();
        let _name = resolver.declare("projectName", "engine");
        let _guid = resolver.declare("guid", "{1234}");

        let out = resolver
            .resolve("<Name>[projectName]</Name><Guid>[guid]</Guid>")
            .unwrap();
        assert_eq!(out, "<Name>engine</Name><Guid>{1234}</Guid>");
    }

    #[test]
    fn test_shadowing_and_release() {
        let resolver = Resolver::new();
        let _outer = resolver.declare("platform", "x64");
        {
            let _inner = resolver.declare("platform", "ARM64");
            assert_eq!(resolver.resolve("[platform]").unwrap(), "ARM64");
        }
        assert_eq!(resolver.resolve("[platform]").unwrap(), "x64");
        drop(_outer);
        assert!(matches!(
            resolver.resolve("[platform]"),
            Err(GenError::MissingBinding { name, .. }) if name == "platform"
        ));
        assert_eq!(resolver.active_bindings(), 0);
    }

    #[test]
    fn test_out_of_order_release() {
        let resolver = Resolver::new();
        let first = resolver.declare("a", "1");
        let second = resolver.declare("a", "2");
        drop(first);
        assert_eq!(resolver.resolve("[a]").unwrap(), "2");
        drop(second);
        assert!(!resolver.is_bound("a"));
    }

    #[test]
    fn test_dotted_lookup() {
        let resolver = Resolver::new();
        let mut conf = BTreeMap::new();
        conf.insert("name".to_string(), Value::from("Debug"));
        let mut options = BTreeMap::new();
        options.insert("OutputFile".to_string(), Value::from("app.apk"));
        conf.insert("options".to_string(), Value::Object(options));
        let _conf = resolver.declare("conf", Value::Object(conf));

        assert_eq!(
            resolver.resolve("[conf.name]:[conf.options.OutputFile]").unwrap(),
            "Debug:app.apk"
        );
        assert!(matches!(
            resolver.resolve("[conf.missing]"),
            Err(GenError::MissingBinding { name, .. }) if name == "conf.missing"
        ));
        assert!(matches!(
            resolver.resolve("[conf.options]"),
            Err(GenError::NotScalar(_))
        ));
    }

    #[test]
    fn test_omit_sentinel_substitution() {
        let resolver = Resolver::new();
        let _g = resolver.declare("scc", Value::Omit);
        assert_eq!(
            resolver.resolve("<Scc>[scc]</Scc>").unwrap(),
            format!("<Scc>{}</Scc>", OMIT_TAG)
        );
    }

    #[test]
    fn test_escape() {
        let resolver = Resolver::new();
        let _g = resolver.declare("a", "x");
        assert_eq!(resolver.resolve("[[a]] [a]").unwrap(), "[a] x");
    }

    #[test]
    fn test_non_member_brackets_are_literal() {
        let resolver = Resolver::new();
        assert_eq!(
            resolver.resolve("Condition=\"'$(A)' == '[ x ]'\"").unwrap(),
            "Condition=\"'$(A)' == '[ x ]'\""
        );
    }

    #[test]
    fn test_recursive_values() {
        let resolver = Resolver::new();
        let _a = resolver.declare("outDir", "[root]/bin");
        let _b = resolver.declare("root", "C:/build");
        assert_eq!(resolver.resolve("[outDir]").unwrap(), "C:/build/bin");

        let _loop = resolver.declare("self", "[self]");
        assert!(matches!(
            resolver.resolve("[self]"),
            Err(GenError::RecursionLimit(_))
        ));
    }

    #[test]
    fn test_fallback() {
        let resolver = Resolver::new();
        let out = resolver
            .resolve_with_fallback("[unknown]", &Value::from("none"))
            .unwrap();
        assert_eq!(out, "none");
    }

    #[test]
    fn test_declare_all_rejects_duplicates() {
        let resolver = Resolver::new();
        let result = resolver.declare_all([("a", "1"), ("a", "2")]);
        assert!(matches!(result, Err(GenError::DuplicateBinding(n)) if n == "a"));
        assert_eq!(resolver.active_bindings(), 0);

        let group = resolver.declare_all([("a", "1"), ("b", "2")]).unwrap();
        assert_eq!(resolver.resolve("[a][b]").unwrap(), "12");
        drop(group);
        assert_eq!(resolver.active_bindings(), 0);
    }

    #[test]
    fn test_case_insensitive() {
        let resolver = Resolver::with_case_sensitivity(false);
        let _g = resolver.declare("ProjectName", "core");
        assert_eq!(resolver.resolve("[projectname]").unwrap(), "core");
    }

    #[test]
    fn test_missing_binding_lists_bound_names() {
        let resolver = Resolver::new();
        let _g = resolver.declare("guid", "x");
        match resolver.resolve("[name]") {
            Err(GenError::MissingBinding { available, .. }) => {
                assert!(available.contains("guid"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
