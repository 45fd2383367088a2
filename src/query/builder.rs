//! Query coordinator
//!
//! [`Query`] is a chainable builder. Every modifier validates its input
//! against the model's catalog; the first failure is kept as the query's
//! sticky error, later modifiers leave the state untouched, and every
//! finisher returns that first error.

use super::filter::Filter;
use super::order::{rank_window, Order};
use super::plan::{Anchor, QueryPlan, Strategy};
use crate::error::{Error, ValidationError};
use crate::schema::{ModelSchema, Registry};
use crate::store::IndexStore;
use crate::types::Value;

use std::fmt;
use std::sync::Arc;

/// A query over one model
pub struct Query<S: ?Sized> {
    pub(super) store: Arc<S>,
    pub(super) model: String,
    pub(super) schema: Option<Arc<ModelSchema>>,
    pub(super) filters: Vec<Filter>,
    pub(super) order: Option<Order>,
    pub(super) limit: usize,
    pub(super) offset: usize,
    pub(super) includes: Vec<String>,
    pub(super) excludes: Vec<String>,
    pub(super) log_plans: bool,
    pub(super) error: Option<ValidationError>,
}

impl<S: IndexStore + ?Sized> Query<S> {
    /// Start a query on a registered model
    ///
    /// An unregistered model becomes the query's sticky error.
    pub fn new(store: Arc<S>, registry: &Registry, model: &str) -> Self {
        let schema = registry.get(model);
        let error = match schema {
            Some(_) => None,
            None => Some(ValidationError::UnknownModel(model.to_string())),
        };
        Self {
            store,
            model: model.to_string(),
            schema,
            filters: Vec::new(),
            order: None,
            limit: 0,
            offset: 0,
            includes: Vec::new(),
            excludes: Vec::new(),
            log_plans: false,
            error,
        }
    }

    /// Emit the evaluation plan at debug level before each evaluation
    pub fn log_plans(mut self, enabled: bool) -> Self {
        self.log_plans = enabled;
        self
    }

    /// Sort by a field; a leading `-` sorts descending
    ///
    /// Only one order is allowed per query.
    pub fn order(mut self, spec: &str) -> Self {
        let Some(schema) = self.usable_schema() else {
            return self;
        };
        if self.order.is_some() {
            return self.fail(ValidationError::DuplicateOrder);
        }
        match Order::parse(&schema, spec) {
            Ok(order) => {
                self.order = Some(order);
                self
            },
            Err(e) => self.fail(e),
        }
    }

    /// Maximum number of ids; `0` means no limit
    pub fn limit(mut self, n: usize) -> Self {
        if self.error.is_none() {
            self.limit = n;
        }
        self
    }

    /// Number of leading ids to skip; requires an order at evaluation
    pub fn offset(mut self, n: usize) -> Self {
        if self.error.is_none() {
            self.offset = n;
        }
        self
    }

    /// Hydrate only these fields
    pub fn include<I>(self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.select_fields(fields, true)
    }

    /// Hydrate every field except these
    pub fn exclude<I>(self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.select_fields(fields, false)
    }

    /// Add a filter `"<field> <op>"` with a typed value
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use kuba_query::query::Query;
    /// use kuba_query::schema::{FieldSpec, ModelSchema, Registry};
    /// use kuba_query::store::MemoryStore;
    /// use kuba_query::types::FieldType;
    ///
    /// let registry = Registry::new();
    /// registry
    ///     .register(ModelSchema::new("Person", vec![FieldSpec::new("Age", FieldType::I32).indexed()]).unwrap())
    ///     .unwrap();
    ///
    /// let q = Query::new(Arc::new(MemoryStore::new()), &registry, "Person").filter("Age >=", 21i32);
    /// assert!(q.error().is_none());
    ///
    /// let q = q.filter("Age >=", 21i64);
    /// assert!(q.error().is_some());
    /// ```
    pub fn filter(mut self, expr: &str, value: impl Into<Value>) -> Self {
        let Some(schema) = self.usable_schema() else {
            return self;
        };
        match Filter::parse(&schema, expr, value.into()) {
            Ok(filter) => {
                self.filters.push(filter);
                self
            },
            Err(e) => self.fail(e),
        }
    }

    /// Sticky error, if any modifier failed
    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    /// Model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Filters in declaration order
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Order, if set
    pub fn ordering(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    /// Describe how the query will be evaluated
    pub fn plan(&self) -> Result<QueryPlan, Error> {
        self.checked_schema()?;
        if self.offset > 0 && self.order.is_none() {
            return Err(Error::OffsetWithoutOrder);
        }

        let strategy = if self.filters.is_empty() {
            match &self.order {
                None if self.limit == 0 => Strategy::AllIds,
                None => Strategy::RandomSample { limit: self.limit },
                Some(order) => {
                    let (start, stop) = rank_window(self.offset, self.limit);
                    Strategy::OrderedRange {
                        field: order.field_name.clone(),
                        start,
                        stop,
                        reverse: order.is_reverse(),
                    }
                },
            }
        } else {
            let anchor = match &self.order {
                Some(order) => self
                    .filters
                    .iter()
                    .position(|f| f.field_name == order.field_name)
                    .map(Anchor::OrderFilter)
                    .unwrap_or_else(|| Anchor::OrderIndex(order.field_name.clone())),
                None => Anchor::SmallestFilter,
            };
            Strategy::Filtered { anchor }
        };

        Ok(QueryPlan {
            model: self.model.clone(),
            strategy,
            filters: self.filters.iter().map(ToString::to_string).collect(),
            offset: self.offset,
            limit: self.limit,
            hydrate_fields: self.hydrate_fields(),
        })
    }

    /// Fields handed to hydration: the include list, or every field not excluded
    pub(super) fn hydrate_fields(&self) -> Option<Vec<String>> {
        if !self.includes.is_empty() {
            return Some(self.includes.clone());
        }
        if self.excludes.is_empty() {
            return None;
        }
        let schema = self.schema.as_ref()?;
        Some(
            schema
                .field_names()
                .filter(|name| !self.excludes.iter().any(|e| e == name))
                .map(str::to_string)
                .collect(),
        )
    }

    /// Schema of a query without a sticky error
    pub(super) fn checked_schema(&self) -> Result<&Arc<ModelSchema>, Error> {
        if let Some(e) = &self.error {
            return Err(Error::Validation(e.clone()));
        }
        self.schema
            .as_ref()
            .ok_or_else(|| ValidationError::UnknownModel(self.model.clone()).into())
    }

    fn usable_schema(&self) -> Option<Arc<ModelSchema>> {
        if self.error.is_some() {
            return None;
        }
        self.schema.clone()
    }

    fn select_fields<I>(mut self, fields: I, include: bool) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let Some(schema) = self.usable_schema() else {
            return self;
        };
        let other = if include { &self.excludes } else { &self.includes };
        if !other.is_empty() {
            return self.fail(ValidationError::IncludeExcludeConflict);
        }

        let mut names = Vec::new();
        for field in fields {
            let field = field.into();
            if !schema.field_exists(&field) {
                return self.fail(ValidationError::UnknownField {
                    model: schema.name().to_string(),
                    field,
                });
            }
            names.push(field);
        }
        if include {
            self.includes.extend(names);
        } else {
            self.excludes.extend(names);
        }
        self
    }

    fn fail(mut self, error: ValidationError) -> Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }
}

impl<S: ?Sized> fmt::Display for Query<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.model)?;
        for filter in &self.filters {
            write!(f, " {}", filter)?;
        }
        if let Some(order) = &self.order {
            write!(f, " {}", order)?;
        }
        if self.limit != 0 {
            write!(f, " (limit {})", self.limit)?;
        }
        if self.offset != 0 {
            write!(f, " (offset {})", self.offset)?;
        }
        if !self.includes.is_empty() {
            write!(f, " (include [{}])", self.includes.join(", "))?;
        }
        if !self.excludes.is_empty() {
            write!(f, " (exclude [{}])", self.excludes.join(", "))?;
        }
        Ok(())
    }
}
