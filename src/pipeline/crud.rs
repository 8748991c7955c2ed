// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Diff-based steps.
//!
//! A CRUD step reports the current and desired state of what it manages and
//! turns the two into a [`Patch`]. The [`CrudResource`] adapter drives the
//! cycle and applies whichever sub-changes of the patch are set, so the
//! pipeline can treat CRUD steps like any other [`Resource`].
//!
//! The cycle stops early when a phase cancels the pass.

use super::{PassKind, Resource};
use crate::context::{ContextField, ScratchContext, TenantCluster};
use crate::errors::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::debug;

/// Changes to apply for one CRUD cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patch<T> {
    /// State to create
    pub create: Option<T>,
    /// State to update to
    pub update: Option<T>,
    /// State to delete
    pub delete: Option<T>,
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self {
            create: None,
            update: None,
            delete: None,
        }
    }
}

impl<T> Patch<T> {
    /// Patch creating `state`.
    pub fn create(state: T) -> Self {
        Self {
            create: Some(state),
            ..Self::default()
        }
    }

    /// Patch updating to `state`.
    pub fn update(state: T) -> Self {
        Self {
            update: Some(state),
            ..Self::default()
        }
    }

    /// Patch deleting `state`.
    pub fn delete(state: T) -> Self {
        Self {
            delete: Some(state),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.create.is_none() && self.update.is_none() && self.delete.is_none()
    }
}

/// Operations of a diff-based step.
#[async_trait]
pub trait CrudOperations: Send + Sync {
    /// State managed by the step.
    type State: Clone + Debug + Send + Sync;

    /// Stable step name.
    fn name(&self) -> &'static str;

    /// What exists in the cloud. `None` when nothing exists.
    async fn get_current_state(
        &self,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
    ) -> Result<Option<Self::State>>;

    /// What should exist. `None` when nothing should.
    async fn get_desired_state(
        &self,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
    ) -> Result<Option<Self::State>>;

    /// Patch for a create/update pass.
    fn new_update_patch(
        &self,
        current: Option<&Self::State>,
        desired: Option<&Self::State>,
    ) -> Result<Patch<Self::State>>;

    /// Patch for a delete pass.
    fn new_delete_patch(
        &self,
        current: Option<&Self::State>,
        desired: Option<&Self::State>,
    ) -> Result<Patch<Self::State>>;

    /// Create `state`.
    async fn apply_create_change(
        &self,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
        state: &Self::State,
    ) -> Result<()>;

    /// Update to `state`.
    async fn apply_update_change(
        &self,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
        state: &Self::State,
    ) -> Result<()>;

    /// Delete `state`.
    async fn apply_delete_change(
        &self,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
        state: &Self::State,
    ) -> Result<()>;

    /// Context fields read during a pass of `kind`.
    fn reads(&self, _kind: PassKind) -> &'static [ContextField] {
        &[]
    }

    /// Context fields written during a pass of `kind`.
    fn writes(&self, _kind: PassKind) -> &'static [ContextField] {
        &[]
    }
}

/// Adapts a [`CrudOperations`] step to the [`Resource`] shape.
pub struct CrudResource<T> {
    inner: T,
}

impl<T: CrudOperations> CrudResource<T> {
    /// Wrap a CRUD step.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// The wrapped step.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn cycle(
        &self,
        kind: PassKind,
        cluster: &TenantCluster,
        ctx: &mut ScratchContext,
    ) -> Result<()> {
        let current = self.inner.get_current_state(cluster, ctx).await?;
        if ctx.is_cancelled() {
            return Ok(());
        }

        let desired = self.inner.get_desired_state(cluster, ctx).await?;
        if ctx.is_cancelled() {
            return Ok(());
        }

        let patch = match kind {
            PassKind::Create => self
                .inner
                .new_update_patch(current.as_ref(), desired.as_ref())?,
            PassKind::Delete => self
                .inner
                .new_delete_patch(current.as_ref(), desired.as_ref())?,
        };

        if patch.is_empty() {
            debug!(cluster = %cluster.id(), step = self.inner.name(), "Nothing to change");
            return Ok(());
        }

        if let Some(state) = &patch.create {
            self.inner.apply_create_change(cluster, ctx, state).await?;
        }
        if let Some(state) = &patch.update {
            self.inner.apply_update_change(cluster, ctx, state).await?;
        }
        if let Some(state) = &patch.delete {
            self.inner.apply_delete_change(cluster, ctx, state).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl<T: CrudOperations> Resource for CrudResource<T> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn ensure_created(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        self.cycle(PassKind::Create, cluster, ctx).await
    }

    async fn ensure_deleted(&self, cluster: &TenantCluster, ctx: &mut ScratchContext) -> Result<()> {
        self.cycle(PassKind::Delete, cluster, ctx).await
    }

    fn reads(&self, kind: PassKind) -> &'static [ContextField] {
        self.inner.reads(kind)
    }

    fn writes(&self, kind: PassKind) -> &'static [ContextField] {
        self.inner.writes(kind)
    }
}

#[cfg(test)]
#[path = "crud_tests.rs"]
mod crud_tests;
