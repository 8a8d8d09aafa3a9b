//! Builders declared inline, without a named blueprint

use std::sync::Arc;

use serde_json::Value;

use super::{Blueprint, Builder, OptionSchema, Options};
use crate::error::Result;

/// Inline build logic of an ad-hoc builder.
pub type BuildFn<T> = Arc<dyn Fn(&Options) -> anyhow::Result<T> + Send + Sync>;

/// Blueprint created by [`Builder::create_with`].
pub struct AdHoc<T> {
    schema: OptionSchema,
    build: BuildFn<T>,
}

impl<T> Blueprint for AdHoc<T> {
    type Output = T;
    type Memo = ();

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn name(&self) -> &str {
        "ad-hoc builder"
    }

    fn build(&self, builder: &Builder<Self>) -> Result<T> {
        Ok((self.build)(builder.options())?)
    }
}

impl<T> Builder<AdHoc<T>> {
    /// Create a builder whose options are the keys of `spec`, initialized to
    /// its values, with `build` as the build logic.
    ///
    /// ```rust,ignore
    /// let b = Builder::create_with([("name", json!("Bob"))], |opts| {
    ///     Ok(format!("hello {}", opts.get("name").and_then(|v| v.as_str()).unwrap_or("?")))
    /// })?;
    /// assert_eq!(b.build()?, "hello Bob");
    /// ```
    pub fn create_with<I, K, V, F>(spec: I, build: F) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
        F: Fn(&Options) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let spec: Vec<(String, Value)> = spec
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        let schema = OptionSchema::with_options(spec.iter().map(|(name, _)| name.as_str()));

        Builder::construct(
            AdHoc {
                schema,
                build: Arc::new(build),
            },
            spec,
        )
    }

    /// A copy of this builder with the same options and new build logic.
    pub fn with_build<F>(&self, build: F) -> Self
    where
        F: Fn(&Options) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let blueprint = AdHoc {
            schema: self.blueprint().schema.clone(),
            build: Arc::new(build),
        };
        Builder::assemble(Arc::new(blueprint), self.options().clone())
    }
}
