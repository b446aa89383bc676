//! The textual query parser and prepared statements.
//!
//! [`QueryParser`] classifies a query text into one of select, delete,
//! insert or update, builds the corresponding query or entity object and
//! dispatches it to a [`Manager`]. Queries containing `@name` placeholders
//! go through [`QueryParser::prepare`] instead, which defers execution until
//! every placeholder has been bound.
//!
//! # Example
//!
//! ```ignore
//! use entitylayer_core::parser::ManagerQueryExt;
//!
//! let gods = manager.query("select * from God").await?;
//!
//! let mut statement = manager.prepare("delete from God where age = @age")?;
//! statement.bind("age", 12)?;
//! statement.get_result().await?;
//! # Ok::<(), entitylayer_core::error::EntityStoreError>(())
//! ```

mod grammar;
mod lexer;

use async_trait::async_trait;
use bson::Bson;
use futures::stream::StreamExt;

use crate::{
    entity::Entity,
    error::{EntityStoreError, EntityStoreResult},
    manager::Manager,
    observer::{IdentityObserver, QueryObserver},
    value::Param,
};

use grammar::Statement;

/// Parses query texts and dispatches them to a manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParser;

impl QueryParser {
    /// Creates a parser.
    pub fn new() -> Self {
        Self
    }

    /// Parses and immediately executes a query text.
    ///
    /// Selects resolve to their matching entities, deletes to an empty list,
    /// inserts and updates to the stored entity. The observer is applied to
    /// every parsed entity and field name before dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::Syntax`] for text outside the grammar and
    /// for queries that declare parameters (those must go through
    /// [`QueryParser::prepare`]), plus whatever the manager operation
    /// surfaces.
    pub async fn query<M: Manager + ?Sized>(
        &self,
        text: &str,
        manager: &M,
        observer: &dyn QueryObserver,
    ) -> EntityStoreResult<Vec<Entity>> {
        let output = grammar::parse(text, observer)?;

        if let Some(param) = output.params.first() {
            return Err(EntityStoreError::Syntax(format!(
                "the query declares parameter @{}; use prepare and bind",
                param.name()
            )));
        }

        match output.statement {
            Statement::Select(query) => {
                let stream = manager.select(query).await?;
                Ok(stream.collect().await)
            }
            Statement::Delete(query) => {
                manager.delete(query).await?;
                Ok(Vec::new())
            }
            Statement::Insert { entity, ttl } => {
                let stored = match ttl {
                    Some(ttl) => manager.insert_with_ttl(entity, ttl).await?,
                    None => manager.insert(entity).await?,
                };
                Ok(vec![stored])
            }
            Statement::Update(entity) => Ok(vec![manager.update(entity).await?]),
        }
    }

    /// Parses a query text into a prepared statement bound to the manager.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::Syntax`] for text outside the grammar.
    pub fn prepare<'m, M: Manager + ?Sized>(
        &self,
        text: &str,
        manager: &'m M,
        observer: &dyn QueryObserver,
    ) -> EntityStoreResult<PreparedStatement<'m, M>> {
        let output = grammar::parse(text, observer)?;

        Ok(PreparedStatement {
            statement: output.statement,
            params: Params::new(output.params),
            manager,
        })
    }
}

/// The named-parameter binding table of a prepared statement.
///
/// Every `@name` placeholder in the query text shares one parameter cell per
/// occurrence site; binding a name sets every cell carrying it.
#[derive(Debug, Clone)]
pub struct Params {
    params: Vec<Param>,
}

impl Params {
    fn new(params: Vec<Param>) -> Self {
        Self { params }
    }

    /// Returns the declared parameter names in source order, duplicates
    /// included.
    pub fn names(&self) -> Vec<&str> {
        self.params
            .iter()
            .map(Param::name)
            .collect()
    }

    /// Binds a value to every parameter with the given name, overwriting
    /// any prior binding.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::InvalidArgument`] when the query declares
    /// no parameter with that name.
    pub fn bind(&self, name: &str, value: impl Into<Bson>) -> EntityStoreResult<()> {
        let value = value.into();
        let mut matched = false;

        for param in &self.params {
            if param.name() == name {
                param.bind(value.clone());
                matched = true;
            }
        }

        if !matched {
            return Err(EntityStoreError::InvalidArgument(format!(
                "the query declares no parameter @{name}"
            )));
        }

        Ok(())
    }

    /// Returns the name of the first parameter without a binding, if any.
    pub fn first_unbound(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|param| !param.is_bound())
            .map(Param::name)
    }
}

/// A parsed query awaiting parameter bindings, bound to the manager it will
/// execute against.
#[derive(Debug)]
pub struct PreparedStatement<'m, M: Manager + ?Sized> {
    statement: Statement,
    params: Params,
    manager: &'m M,
}

impl<M: Manager + ?Sized> PreparedStatement<'_, M> {
    /// Binds a value to a named parameter, overwriting any prior binding.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::InvalidArgument`] when the query declares
    /// no parameter with that name.
    pub fn bind(&mut self, name: &str, value: impl Into<Bson>) -> EntityStoreResult<&mut Self> {
        self.params.bind(name, value)?;
        Ok(self)
    }

    /// Returns the binding table.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Executes the statement against the captured manager.
    ///
    /// Selects resolve to their matching entities, deletes to an empty list,
    /// inserts and updates to the stored entity. Inserts and updates are
    /// snapshot-resolved before dispatch, so re-binding after execution
    /// cannot mutate stored data.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::UnboundParameter`] if any declared
    /// parameter is still unbound, plus whatever the manager operation
    /// surfaces.
    pub async fn get_result(&self) -> EntityStoreResult<Vec<Entity>> {
        if let Some(name) = self.params.first_unbound() {
            return Err(EntityStoreError::UnboundParameter(name.to_string()));
        }

        match &self.statement {
            Statement::Select(query) => {
                let stream = self.manager.select(query.clone()).await?;
                Ok(stream.collect().await)
            }
            Statement::Delete(query) => {
                self.manager.delete(query.clone()).await?;
                Ok(Vec::new())
            }
            Statement::Insert { entity, ttl } => {
                let entity = entity.resolved()?;
                let stored = match ttl {
                    Some(ttl) => self.manager.insert_with_ttl(entity, *ttl).await?,
                    None => self.manager.insert(entity).await?,
                };
                Ok(vec![stored])
            }
            Statement::Update(entity) => {
                Ok(vec![self.manager.update(entity.resolved()?).await?])
            }
        }
    }

    /// Executes the statement and returns at most one entity.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`PreparedStatement::get_result`], plus
    /// [`EntityStoreError::NonUniqueResult`] when more than one entity
    /// matches.
    pub async fn get_single_result(&self) -> EntityStoreResult<Option<Entity>> {
        if let Some(name) = self.params.first_unbound() {
            return Err(EntityStoreError::UnboundParameter(name.to_string()));
        }

        if let Statement::Select(query) = &self.statement {
            return self.manager.single_result(query.clone()).await;
        }

        let mut results = self.get_result().await?;
        match results.len() {
            0 => Ok(None),
            1 => Ok(results.pop()),
            _ => Err(EntityStoreError::NonUniqueResult(
                self.family().to_string(),
            )),
        }
    }

    fn family(&self) -> &str {
        match &self.statement {
            Statement::Select(query) => query.family(),
            Statement::Delete(query) => query.family(),
            Statement::Insert { entity, .. } => entity.name(),
            Statement::Update(entity) => entity.name(),
        }
    }
}

/// Textual query convenience methods available on every manager.
///
/// These replace the original system's dynamic parser lookup with a direct
/// call into [`QueryParser`] using the identity observer.
#[async_trait]
pub trait ManagerQueryExt: Manager {
    /// Parses and immediately executes a query text against this manager.
    async fn query(&self, text: &str) -> EntityStoreResult<Vec<Entity>>
    where
        Self: Sized,
    {
        QueryParser::new()
            .query(text, self, &IdentityObserver)
            .await
    }

    /// Parses a query text into a prepared statement bound to this manager.
    fn prepare(&self, text: &str) -> EntityStoreResult<PreparedStatement<'_, Self>>
    where
        Self: Sized,
    {
        QueryParser::new().prepare(text, self, &IdentityObserver)
    }
}

#[async_trait]
impl<M: Manager> ManagerQueryExt for M {}
