//! Eager loader - resolves an inclusion set over a batch of documents
//!
//! Each direct inclusion is planned, its batched lookups run (concurrently
//! when enabled), and the children assigned back before the next inclusion
//! starts. Lookups materialize through [`Criteria`], so nested inclusions
//! recurse through the same path one level deeper.

use futures::future::try_join_all;
use tracing::Instrument;

use super::inclusion::{Inclusion, InclusionSet};
use super::plan::{LookupPlan, NodePlan};
use crate::database::Database;
use crate::document::Document;
use crate::error::{ModelError, ModelResult};
use crate::query::Criteria;

/// Executes inclusion sets against a database
pub struct EagerLoader<'a> {
    db: &'a Database,
}

impl<'a> EagerLoader<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Populate the loaded-association cache of `documents`
    ///
    /// `anchor` is the model the inclusions were declared against. Slots of
    /// inclusions processed before a failure stay assigned.
    pub async fn load(
        &self,
        anchor: &str,
        documents: &mut [Document],
        inclusions: &InclusionSet,
        depth: usize,
    ) -> ModelResult<()> {
        if inclusions.is_empty() || documents.is_empty() {
            return Ok(());
        }

        let max_depth = self.db.config().eager_load.max_depth;
        if depth >= max_depth {
            return Err(ModelError::Relationship(format!(
                "Maximum eager loading depth of {} exceeded at '{}'",
                max_depth, anchor
            )));
        }

        let span = tracing::debug_span!("eager_load", model = %anchor, depth);
        async {
            for node in inclusions.direct() {
                let from_nodes: Vec<&Inclusion> = inclusions.through(node.name()).collect();
                self.load_inclusion(anchor, documents, node, &from_nodes, depth)
                    .await?;
            }
            Ok::<(), ModelError>(())
        }
        .instrument(span)
        .await
    }

    async fn load_inclusion(
        &self,
        anchor: &str,
        documents: &mut [Document],
        node: &Inclusion,
        from_nodes: &[&Inclusion],
        depth: usize,
    ) -> ModelResult<()> {
        let plan = NodePlan::build(self.db.registry(), anchor, documents, node)?;

        if plan.lookups.is_empty() {
            tracing::debug!(
                association = %node.name(),
                parents = plan.declaring.len(),
                "no lookup keys, skipping query"
            );
        }

        let results = if self.db.config().eager_load.parallel_lookups && plan.lookups.len() > 1 {
            try_join_all(
                plan.lookups
                    .iter()
                    .map(|lookup| self.run_lookup(node, lookup, from_nodes, depth)),
            )
            .await?
        } else {
            let mut results = Vec::with_capacity(plan.lookups.len());
            for lookup in &plan.lookups {
                results.push(self.run_lookup(node, lookup, from_nodes, depth).await?);
            }
            results
        };

        plan.assign(documents, node.name(), &results);
        Ok(())
    }

    /// One batched query for one concrete target
    async fn run_lookup(
        &self,
        node: &Inclusion,
        lookup: &LookupPlan,
        from_nodes: &[&Inclusion],
        depth: usize,
    ) -> ModelResult<Vec<Document>> {
        let registry = self.db.registry();
        let target = &lookup.target;

        tracing::debug!(
            association = %node.name(),
            model = %target.model,
            field = %target.lookup_field,
            keys = lookup.keys.len(),
            "batched lookup"
        );

        let mut criteria = Criteria::new(registry.clone(), &target.model)
            .where_in(&target.lookup_field, lookup.values());
        if let Some((field, value)) = &target.discriminator {
            criteria = criteria.where_eq(field, value.as_str());
        }
        if let Some(modifier) = node.modifier() {
            criteria = modifier(criteria)?;
        }

        let mut nested = node.children().clone();
        nested.merge(criteria.take_inclusions());
        for from_node in from_nodes {
            let owner = from_node.owner_model();
            if registry.is_kind_of(&target.model, owner) || registry.is_kind_of(owner, &target.model) {
                nested.add(from_node.rehomed());
            }
        }

        criteria.with_inclusions(nested).load(self.db, depth + 1).await
    }
}
