// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `HetznerCluster` controller.
//!
//! The controller receives an `Arc<Context>` that contains:
//! - Kubernetes client for the finalizer and status writes
//! - The [`Reconciler`] with its credential source and Hetzner Cloud client factory
//!
//! Nothing in here is process-wide: every collaborator is constructed in `main`
//! and passed in, so tests can build a reconciler around fakes.

use crate::reconcilers::Reconciler;
use kube::Client;

/// Shared context passed to the controller.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Hetzner Cloud reconciler
    pub reconciler: Reconciler,
}

impl Context {
    #[must_use]
    pub fn new(client: Client, reconciler: Reconciler) -> Self {
        Self { client, reconciler }
    }
}
