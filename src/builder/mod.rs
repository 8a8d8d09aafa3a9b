//! Immutable builders
//!
//! A [`Builder`] is an immutable set of named options plus deferred build
//! logic. The options a builder accepts, and how incoming values are coerced,
//! come from an [`OptionSchema`]; the build logic comes from a [`Blueprint`].
//!
//! - **Construction** runs every declared option through its coercion
//!   pipeline, in schema order.
//! - **Refinement** ([`Builder::refine`], [`Builder::with`]) returns a new
//!   builder with some options replaced. The receiver never changes.
//! - **Building** ([`Builder::build`]) runs the blueprint every time it is
//!   called; [`Builder::result`] runs it at most once per instance and keeps
//!   the value.
//!
//! # Usage
//!
//! ```rust,ignore
//! use seedbed::builder::{Blueprint, Builder, OptionSchema};
//!
//! struct UserBlueprint {
//!     schema: OptionSchema,
//! }
//!
//! impl UserBlueprint {
//!     fn new() -> Self {
//!         Self {
//!             schema: OptionSchema::with_options(["name", "bday"]).default_for("name", "Jane"),
//!         }
//!     }
//! }
//!
//! impl Blueprint for UserBlueprint {
//!     type Output = User;
//!     type Memo = ();
//!
//!     fn schema(&self) -> &OptionSchema {
//!         &self.schema
//!     }
//!
//!     fn build(&self, builder: &Builder<Self>) -> seedbed::Result<User> {
//!         builder.options().to_struct()
//!     }
//! }
//!
//! let user = Builder::new(UserBlueprint::new())?
//!     .with("bday", "1989-12-09")?
//!     .result()?;
//! ```
//!
//! For one-off builders without a named blueprint see
//! [`Builder::create_with`].

mod adhoc;
mod options;
mod schema;

pub use adhoc::{AdHoc, BuildFn};
pub use options::Options;
pub use schema::{CoercionFn, DefaultValue, Generator, OptionSchema};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Build logic and option schema of a concrete builder.
pub trait Blueprint: Sized {
    /// What the builder produces.
    type Output;

    /// Per-instance scratch state, created fresh for every constructed or
    /// refined builder.
    type Memo: Default;

    fn schema(&self) -> &OptionSchema;

    /// Name used in error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Produce the output from the builder's current options.
    ///
    /// The default fails with [`Error::NotImplemented`]; concrete blueprints
    /// override it.
    fn build(&self, builder: &Builder<Self>) -> Result<Self::Output> {
        let _ = builder;
        Err(Error::NotImplemented(self.name().to_string()))
    }
}

/// Immutable option record with deferred, memoized build logic.
pub struct Builder<P: Blueprint> {
    blueprint: Arc<P>,
    options: Options,
    memo: P::Memo,
    result: OnceCell<P::Output>,
}

impl<P: Blueprint> Builder<P> {
    /// Construct with every option absent (defaults still apply).
    pub fn new(blueprint: P) -> Result<Self> {
        Self::construct(blueprint, Vec::<(String, Value)>::new())
    }

    /// Construct from raw option values.
    ///
    /// Fails with [`Error::UnknownOption`] for names the schema does not
    /// declare.
    pub fn construct<I, K, V>(blueprint: P, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let blueprint = Arc::new(blueprint);
        let mut incoming = known_values(blueprint.as_ref(), values)?;

        let schema = blueprint.schema();
        let mut options = Options::with_capacity(schema.len());
        for name in schema.names() {
            let raw = incoming.remove(name).unwrap_or(Value::Null);
            let value = schema.coerce(name, raw, &options)?;
            options.insert(name, value);
        }

        Ok(Self::assemble(blueprint, options))
    }

    pub(crate) fn assemble(blueprint: Arc<P>, options: Options) -> Self {
        Self {
            blueprint,
            options,
            memo: P::Memo::default(),
            result: OnceCell::new(),
        }
    }

    /// A new builder equal to this one except for `alterations`, which are
    /// coerced before being stored. `self` is left untouched.
    pub fn refine<I, K, V>(&self, alterations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut incoming = known_values(self.blueprint.as_ref(), alterations)?;

        let schema = self.blueprint.schema();
        let mut options = self.options.clone();
        for name in schema.names() {
            if let Some(raw) = incoming.remove(name) {
                let value = schema.coerce(name, raw, &options)?;
                options.insert(name, value);
            }
        }

        Ok(Self::assemble(Arc::clone(&self.blueprint), options))
    }

    /// Refine a single option.
    pub fn with(&self, name: &str, value: impl Into<Value>) -> Result<Self> {
        self.refine([(name, value.into())])
    }

    /// Refine a multi-value option.
    ///
    /// Several values are stored as one array; a single value is stored as
    /// itself.
    pub fn with_values<I, V>(&self, name: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        };
        self.with(name, value)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The raw value of `name`, `None` when absent.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Typed accessor for a declared option.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        if !self.blueprint.schema().declares(name) {
            return Err(self.unknown_option(name));
        }
        self.options.get_as(name)
    }

    pub fn blueprint(&self) -> &P {
        &self.blueprint
    }

    pub fn memo(&self) -> &P::Memo {
        &self.memo
    }

    /// Run the build logic. Not memoized; prefer [`Builder::result`].
    pub fn build(&self) -> Result<P::Output> {
        self.blueprint.build(self)
    }

    /// Alias of [`Builder::build`].
    pub fn call(&self) -> Result<P::Output> {
        self.build()
    }

    /// The built value, computed on first success and kept for the lifetime
    /// of this instance. Failures are not kept.
    pub fn result(&self) -> Result<&P::Output> {
        self.result.get_or_try_init(|| self.build())
    }

    fn unknown_option(&self, name: &str) -> Error {
        Error::UnknownOption {
            builder: self.blueprint.name().to_string(),
            option: name.to_string(),
        }
    }
}

impl<P: Blueprint> fmt::Debug for Builder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("blueprint", &self.blueprint.name())
            .field("options", &self.options)
            .field("built", &self.result.get().is_some())
            .finish()
    }
}

fn known_values<P, I, K, V>(blueprint: &P, values: I) -> Result<HashMap<String, Value>>
where
    P: Blueprint,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    let schema = blueprint.schema();
    let mut known = HashMap::new();
    for (name, value) in values {
        let name = name.into();
        if !schema.declares(&name) {
            return Err(Error::UnknownOption {
                builder: blueprint.name().to_string(),
                option: name,
            });
        }
        known.insert(name, value.into());
    }
    Ok(known)
}
