//! Option schemas and their coercion pipelines
//!
//! An [`OptionSchema`] is the ordered list of options a builder accepts. Each
//! option owns a pipeline that every incoming value flows through before it
//! is stored:
//!
//! ```text
//! incoming ──> default layer (newest) ──> ... ──> default layer (oldest) ──> base coercion ──> stored
//! ```
//!
//! A default layer only acts on an absent (`null`) value, substituting a
//! literal or the output of a generator. The base coercion is the identity
//! unless replaced with [`OptionSchema::coercion`].
//!
//! ```rust,ignore
//! use seedbed::builder::OptionSchema;
//!
//! let schema = OptionSchema::with_options(["name", "bday"])
//!     .default_for("name", "Jane")
//!     .default_with("bday", |_| serde_json::json!("1989-12-09"));
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::options::Options;
use crate::error::Result;

/// Produces a default from the options coerced so far.
pub type Generator = Arc<dyn Fn(&Options) -> Value + Send + Sync>;

/// Transforms or rejects an incoming value.
pub type CoercionFn = Arc<dyn Fn(Value, &Options) -> Result<Value> + Send + Sync>;

/// Default substituted for an absent option value.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    /// Evaluated on every construction that needs it, never at declaration.
    Generator(Generator),
}

impl DefaultValue {
    pub fn literal(value: impl Into<Value>) -> Self {
        DefaultValue::Literal(value.into())
    }

    pub fn generator<F>(f: F) -> Self
    where
        F: Fn(&Options) -> Value + Send + Sync + 'static,
    {
        DefaultValue::Generator(Arc::new(f))
    }

    fn produce(&self, context: &Options) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Generator(generator) => generator(context),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

#[derive(Clone)]
struct OptionDescriptor {
    name: String,
    /// Outermost first.
    defaults: Vec<DefaultValue>,
    base: Option<CoercionFn>,
}

impl OptionDescriptor {
    fn new(name: String) -> Self {
        Self {
            name,
            defaults: Vec::new(),
            base: None,
        }
    }

    fn coerce(&self, incoming: Value, context: &Options) -> Result<Value> {
        let mut value = incoming;
        for layer in &self.defaults {
            if value.is_null() {
                value = layer.produce(context);
            }
        }

        match &self.base {
            Some(base) => base(value, context),
            None => Ok(value),
        }
    }
}

/// Ordered set of option names with a coercion pipeline per option.
#[derive(Clone, Default)]
pub struct OptionSchema {
    options: Vec<OptionDescriptor>,
}

impl OptionSchema {
    /// Declare options in order. Every option starts with the identity
    /// coercion and no defaults. Repeated names are declared once.
    pub fn with_options<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut options: Vec<OptionDescriptor> = Vec::new();
        for name in names {
            let name = name.into();
            if !options.iter().any(|o| o.name == name) {
                options.push(OptionDescriptor::new(name));
            }
        }
        Self { options }
    }

    /// Add a literal default for `name` as the new outermost layer.
    pub fn default_for(self, name: &str, value: impl Into<Value>) -> Self {
        self.push_default(name, DefaultValue::literal(value))
    }

    /// Add a generated default for `name` as the new outermost layer.
    ///
    /// The generator sees the options declared before `name`, already
    /// coerced, which allows defaults derived from other options.
    pub fn default_with<F>(self, name: &str, generator: F) -> Self
    where
        F: Fn(&Options) -> Value + Send + Sync + 'static,
    {
        self.push_default(name, DefaultValue::generator(generator))
    }

    /// Replace the base coercion of `name`. Default layers still run first.
    pub fn coercion<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(Value, &Options) -> Result<Value> + Send + Sync + 'static,
    {
        match self.descriptor_mut(name) {
            Some(descriptor) => descriptor.base = Some(Arc::new(f)),
            None => warn!("ignoring coercion for undeclared option '{}'", name),
        }
        self
    }

    fn push_default(mut self, name: &str, default: DefaultValue) -> Self {
        match self.descriptor_mut(name) {
            Some(descriptor) => descriptor.defaults.insert(0, default),
            None => warn!("ignoring default for undeclared option '{}'", name),
        }
        self
    }

    fn descriptor_mut(&mut self, name: &str) -> Option<&mut OptionDescriptor> {
        self.options.iter_mut().find(|o| o.name == name)
    }

    /// Run `incoming` through the pipeline of `name`.
    ///
    /// Values for undeclared names pass through unchanged.
    pub fn coerce(&self, name: &str, incoming: Value, context: &Options) -> Result<Value> {
        match self.options.iter().find(|o| o.name == name) {
            Some(descriptor) => descriptor.coerce(incoming, context),
            None => Ok(incoming),
        }
    }

    pub fn declares(&self, name: &str) -> bool {
        self.options.iter().any(|o| o.name == name)
    }

    /// Declared option names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|o| o.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl fmt::Debug for OptionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for option in &self.options {
            map.entry(&option.name, &option.defaults);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_identity_by_default() {
        let schema = OptionSchema::with_options(["name", "bday", "name"]);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["name", "bday"]);

        let context = Options::default();
        assert_eq!(
            schema.coerce("name", json!("Bob"), &context).unwrap(),
            json!("Bob")
        );
        assert_eq!(
            schema.coerce("bday", Value::Null, &context).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_default_only_for_absent_value() {
        let schema = OptionSchema::with_options(["name"]).default_for("name", "Jane");
        let context = Options::default();

        assert_eq!(
            schema.coerce("name", json!("Bob"), &context).unwrap(),
            json!("Bob")
        );
        assert_eq!(
            schema.coerce("name", Value::Null, &context).unwrap(),
            json!("Jane")
        );
    }

    #[test]
    fn test_newest_default_is_outermost() {
        let schema = OptionSchema::with_options(["name"])
            .default_for("name", "Jane")
            .default_for("name", "Joan");
        let context = Options::default();

        assert_eq!(
            schema.coerce("name", Value::Null, &context).unwrap(),
            json!("Joan")
        );
    }

    #[test]
    fn test_default_flows_into_base_coercion() {
        let schema = OptionSchema::with_options(["name"])
            .coercion("name", |v, _| {
                Ok(match v {
                    Value::String(s) => Value::String(s.to_uppercase()),
                    other => other,
                })
            })
            .default_for("name", "jane");
        let context = Options::default();

        assert_eq!(
            schema.coerce("name", Value::Null, &context).unwrap(),
            json!("JANE")
        );
        assert_eq!(
            schema.coerce("name", json!("bob"), &context).unwrap(),
            json!("BOB")
        );
    }

    #[test]
    fn test_generator_is_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let schema = OptionSchema::with_options(["name"]).default_with("name", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            json!("Bob")
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let context = Options::default();
        schema.coerce("name", json!("Ann"), &context).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        schema.coerce("name", Value::Null, &context).unwrap();
        schema.coerce("name", Value::Null, &context).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_coercion_can_reject() {
        let schema = OptionSchema::with_options(["age"]).coercion("age", |v, _| match v {
            Value::Null | Value::Number(_) => Ok(v),
            _ => Err(Error::invalid_option("age", "expected a number")),
        });
        let context = Options::default();

        let err = schema.coerce("age", json!("old"), &context).unwrap_err();
        assert!(matches!(err, Error::InvalidOption { .. }));
    }

    #[test]
    fn test_undeclared_declarations_are_ignored() {
        let schema = OptionSchema::with_options(["name"]).default_for("other", 1);
        assert!(!schema.declares("other"));
        assert_eq!(schema.len(), 1);
    }
}
