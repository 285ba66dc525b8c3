//! Declarative option selection.
//!
//! Each option axis of a configuration (debug libraries, warning level,
//! output directory, ...) is resolved by one [`OptionSelector::select`] call
//! over an ordered list of [`OptionRule`]s. The first rule whose predicate
//! holds runs its effect; effects write into a fresh [`ExplicitOptions`] map
//! that belongs to exactly one configuration.

use std::collections::BTreeMap;

use tracing::trace;

use crate::error::{GenError, GenResult};
use crate::model::Configuration;
use crate::value::Value;

type Predicate<'a> = Box<dyn Fn(&Configuration) -> bool + 'a>;
type Effect<'a> = Box<dyn FnOnce(&mut AxisWriter<'_>) + 'a>;

/// One (predicate, effect) pair.
pub struct OptionRule<'a> {
    predicate: Predicate<'a>,
    effect: Effect<'a>,
}

impl<'a> OptionRule<'a> {
    /// A rule with an arbitrary predicate over the configuration.
    pub fn when<P, E>(predicate: P, effect: E) -> Self
    where
        P: Fn(&Configuration) -> bool + 'a,
        E: FnOnce(&mut AxisWriter<'_>) + 'a,
    {
        Self {
            predicate: Box::new(predicate),
            effect: Box::new(effect),
        }
    }

    /// Matches when the configuration chose `value` on `axis`.
    pub fn setting<E>(axis: &'a str, value: &'a str, effect: E) -> Self
    where
        E: FnOnce(&mut AxisWriter<'_>) + 'a,
    {
        Self::when(move |conf| conf.chosen(axis) == Some(value), effect)
    }

    /// Matches when the configuration chose `value` on `axis` or made no
    /// choice on it at all.
    pub fn default_setting<E>(axis: &'a str, value: &'a str, effect: E) -> Self
    where
        E: FnOnce(&mut AxisWriter<'_>) + 'a,
    {
        Self::when(
            move |conf| conf.chosen(axis).map_or(true, |chosen| chosen == value),
            effect,
        )
    }

    fn matches(&self, conf: &Configuration) -> bool {
        (self.predicate)(conf)
    }
}

/// Options computed for one configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplicitOptions {
    values: BTreeMap<String, Value>,
    owners: BTreeMap<String, String>,
}

impl ExplicitOptions {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Rendered value of `key`; unset keys read as the omit sentinel.
    pub fn get_or_omit(&self, key: &str) -> Value {
        self.values.get(key).cloned().unwrap_or(Value::Omit)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Axis that set `key`.
    pub fn owner(&self, key: &str) -> Option<&str> {
        self.owners.get(key).map(String::as_str)
    }

    /// The options as a structured value, for binding as a template parameter.
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

/// Write access to the options map for the duration of one axis.
pub struct AxisWriter<'o> {
    axis: &'o str,
    options: &'o mut ExplicitOptions,
    collision: Option<(String, String)>,
}

impl AxisWriter<'_> {
    /// Set `key`. A key already owned by another axis is a collision and is
    /// reported by the selector once the effect returns.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if let Some(owner) = self.options.owners.get(&key) {
            if owner != self.axis {
                if self.collision.is_none() {
                    self.collision = Some((key, owner.clone()));
                }
                return;
            }
        }
        self.options.owners.insert(key.clone(), self.axis.to_string());
        self.options.values.insert(key, value.into());
    }

    /// Set `key` to the omit sentinel.
    pub fn omit(&mut self, key: impl Into<String>) {
        self.set(key, Value::Omit);
    }

    pub fn axis(&self) -> &str {
        self.axis
    }
}

/// Evaluates option rules for a single configuration.
pub struct OptionSelector<'c> {
    conf: &'c Configuration,
    options: ExplicitOptions,
}

impl<'c> OptionSelector<'c> {
    /// Start with an empty options map for `conf`.
    pub fn new(conf: &'c Configuration) -> Self {
        Self {
            conf,
            options: ExplicitOptions::default(),
        }
    }

    pub fn configuration(&self) -> &Configuration {
        self.conf
    }

    /// Run the first matching rule of `axis`.
    ///
    /// Without a match the call fails with [`GenError::NoOptionMatch`]: a
    /// silently unset option would surface later as an unresolved
    /// placeholder far from its cause.
    pub fn select(&mut self, axis: &str, rules: Vec<OptionRule<'_>>) -> GenResult<()> {
        if self.run_first_match(axis, rules)? {
            return Ok(());
        }
        Err(GenError::NoOptionMatch {
            configuration: self.conf.to_string(),
            axis: axis.to_string(),
        })
    }

    /// Run the first matching rule of `axis`, or `fallback` exactly once when
    /// none matches.
    pub fn select_with_fallback<F>(
        &mut self,
        axis: &str,
        rules: Vec<OptionRule<'_>>,
        fallback: F,
    ) -> GenResult<()>
    where
        F: FnOnce(&mut AxisWriter<'_>),
    {
        if self.run_first_match(axis, rules)? {
            return Ok(());
        }
        trace!(axis, "no option rule matched, using fallback");
        self.apply(axis, fallback)
    }

    /// Set a single computed option; `key` doubles as its axis name.
    pub fn assign(&mut self, key: &str, value: impl Into<Value>) -> GenResult<()> {
        let value = value.into();
        self.apply(key, move |w| w.set(key, value))
    }

    /// Finish selection and hand out the options map.
    pub fn finish(self) -> ExplicitOptions {
        self.options
    }

    fn run_first_match(&mut self, axis: &str, rules: Vec<OptionRule<'_>>) -> GenResult<bool> {
        for rule in rules {
            if rule.matches(self.conf) {
                self.apply(axis, rule.effect)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn apply<F>(&mut self, axis: &str, effect: F) -> GenResult<()>
    where
        F: FnOnce(&mut AxisWriter<'_>),
    {
        let mut writer = AxisWriter {
            axis,
            options: &mut self.options,
            collision: None,
        };
        effect(&mut writer);

        match writer.collision {
            Some((key, owner)) => Err(GenError::OptionKeyCollision {
                configuration: self.conf.to_string(),
                key,
                axis: axis.to_string(),
                owner,
            }),
            None => Ok(()),
        }
    }
}

/// Value of `key` that must be identical in every options map.
///
/// Maps without the key contribute `fallback`. Differing values are a
/// [`GenError::ConfigurationConflict`] for `file`.
pub fn uniform_option<'a, I>(
    file: &std::path::Path,
    key: &str,
    options: I,
    fallback: Value,
) -> GenResult<Value>
where
    I: IntoIterator<Item = &'a ExplicitOptions>,
{
    let mut distinct: Vec<Value> = Vec::new();
    for opts in options {
        let value = opts.get(key).cloned().unwrap_or_else(|| fallback.clone());
        if !distinct.contains(&value) {
            distinct.push(value);
        }
    }

    match distinct.len() {
        0 => Ok(fallback),
        1 => Ok(distinct.remove(0)),
        _ => Err(GenError::ConfigurationConflict {
            file: file.to_path_buf(),
            message: format!(
                "option '{}' has conflicting values across configurations: {}",
                key,
                distinct
                    .iter()
                    .map(|v| format!("\"{}\"", v))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::Path;

    fn conf() -> Configuration {
        Configuration::new("app", "Debug", "x64").setting("DebugLibraries", "Enabled")
    }

    #[test]
    fn test_first_match_only() {
        let conf = conf();
        let ran = RefCell::new(Vec::new());
        let mut selector = OptionSelector::new(&conf);

        selector
            .select(
                "Test",
                vec![
                    OptionRule::when(|_| false, |_| ran.borrow_mut().push("A")),
                    OptionRule::when(|_| true, |_| ran.borrow_mut().push("B")),
                    OptionRule::when(|_| true, |_| ran.borrow_mut().push("C")),
                ],
            )
            .unwrap();

        assert_eq!(*ran.borrow(), vec!["B"]);
    }

    #[test]
    fn test_fallback_runs_once() {
        let conf = conf();
        let count = RefCell::new(0);
        let mut selector = OptionSelector::new(&conf);

        selector
            .select_with_fallback(
                "Test",
                vec![OptionRule::when(|_| false, |_| panic!("must not run"))],
                |w| {
                    *count.borrow_mut() += 1;
                    w.set("Fallback", "F");
                },
            )
            .unwrap();

        assert_eq!(*count.borrow(), 1);
        assert_eq!(selector.finish().get("Fallback"), Some(&Value::from("F")));
    }

    #[test]
    fn test_no_match_without_fallback_fails() {
        let conf = conf();
        let mut selector = OptionSelector::new(&conf);
        let result = selector.select(
            "Optimization",
            vec![OptionRule::setting("Optimization", "Full", |w| {
                w.set("Optimization", "Full")
            })],
        );
        assert!(matches!(
            result,
            Err(GenError::NoOptionMatch { axis, .. }) if axis == "Optimization"
        ));
    }

    #[test]
    fn test_setting_rules() {
        let conf = conf();
        let mut selector = OptionSelector::new(&conf);

        selector
            .select(
                "DebugLibraries",
                vec![
                    OptionRule::setting("DebugLibraries", "Disabled", |w| {
                        w.set("UseDebugLibraries", false)
                    }),
                    OptionRule::setting("DebugLibraries", "Enabled", |w| {
                        w.set("UseDebugLibraries", true)
                    }),
                ],
            )
            .unwrap();
        selector
            .select(
                "WarningLevel",
                vec![
                    OptionRule::default_setting("WarningLevel", "Level3", |w| {
                        w.set("WarningLevel", "Level3")
                    }),
                    OptionRule::setting("WarningLevel", "Level4", |w| {
                        w.set("WarningLevel", "Level4")
                    }),
                ],
            )
            .unwrap();

        let options = selector.finish();
        assert_eq!(options.get("UseDebugLibraries"), Some(&Value::Bool(true)));
        assert_eq!(options.get("WarningLevel"), Some(&Value::from("Level3")));
        assert_eq!(options.owner("WarningLevel"), Some("WarningLevel"));
    }

    #[test]
    fn test_key_collision_across_axes() {
        let conf = conf();
        let mut selector = OptionSelector::new(&conf);
        selector.assign("OutputFile", "a.apk").unwrap();

        let result = selector.select_with_fallback("Packaging", vec![], |w| {
            w.set("OutputFile", "b.apk")
        });
        assert!(matches!(
            result,
            Err(GenError::OptionKeyCollision { key, owner, .. })
                if key == "OutputFile" && owner == "OutputFile"
        ));
        assert_eq!(
            selector.finish().get("OutputFile"),
            Some(&Value::from("a.apk"))
        );
    }

    #[test]
    fn test_fresh_map_per_configuration() {
        let debug = conf();
        let release = Configuration::new("app", "Release", "x64");

        let mut first = OptionSelector::new(&debug);
        first.assign("Only", "debug").unwrap();
        let first = first.finish();

        let second = OptionSelector::new(&release).finish();
        assert!(first.contains("Only"));
        assert!(second.is_empty());
    }

    #[test]
    fn test_uniform_option() {
        let conf = conf();
        let mut a = OptionSelector::new(&conf);
        a.assign("AndroidTargetsPath", "sdk/").unwrap();
        let a = a.finish();
        let b = a.clone();
        let empty = ExplicitOptions::default();
        let file = Path::new("/w/pkg.androidproj");

        assert_eq!(
            uniform_option(file, "AndroidTargetsPath", [&a, &b], Value::Omit).unwrap(),
            Value::from("sdk/")
        );
        assert!(matches!(
            uniform_option(file, "AndroidTargetsPath", [&a, &empty], Value::Omit),
            Err(GenError::ConfigurationConflict { .. })
        ));
    }
}
