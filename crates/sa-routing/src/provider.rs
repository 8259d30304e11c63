//! Route provider trait and the local adapters.
//!
//! # Pluggability
//!
//! The movement simulator calls routing via the [`RouteProvider`] trait, so
//! applications can swap in an HTTP directions service, a local graph
//! router, or a scripted test double without touching the simulator.
//!
//! # Thread safety
//!
//! Route requests run on Tokio worker tasks, so implementations must be
//! `Send + Sync`.

use std::sync::Arc;

use async_trait::async_trait;
use sa_core::{Coordinate, TravelProfile, distance};

use crate::RoutingError;

// ── RouteProvider trait ───────────────────────────────────────────────────────

/// Pluggable routing engine.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Compute an ordered path of waypoints from `start` to `end`.
    ///
    /// An `Ok` empty vector means "the provider answered but has no path";
    /// callers treat it the same as no route.
    async fn route(
        &self,
        start: Coordinate,
        end: Coordinate,
        profile: TravelProfile,
    ) -> Result<Vec<Coordinate>, RoutingError>;
}

#[async_trait]
impl<P: RouteProvider + ?Sized> RouteProvider for Box<P> {
    async fn route(
        &self,
        start: Coordinate,
        end: Coordinate,
        profile: TravelProfile,
    ) -> Result<Vec<Coordinate>, RoutingError> {
        (**self).route(start, end, profile).await
    }
}

#[async_trait]
impl<P: RouteProvider + ?Sized> RouteProvider for Arc<P> {
    async fn route(
        &self,
        start: Coordinate,
        end: Coordinate,
        profile: TravelProfile,
    ) -> Result<Vec<Coordinate>, RoutingError> {
        (**self).route(start, end, profile).await
    }
}

/// Call `provider` and convert any failure into an empty route.
///
/// This is the production boundary: nothing past it ever sees a
/// [`RoutingError`].
pub async fn fetch_route_or_empty<P: RouteProvider + ?Sized>(
    provider: &P,
    start: Coordinate,
    end: Coordinate,
    profile: TravelProfile,
) -> Vec<Coordinate> {
    match provider.route(start, end, profile).await {
        Ok(route) => route,
        Err(e) => {
            log::warn!("route {start} -> {end} ({profile}) failed: {e}");
            Vec::new()
        }
    }
}

/// Total polyline length of `route` in metres.
pub fn route_length_m(route: &[Coordinate]) -> f64 {
    route.windows(2).map(|w| distance(w[0], w[1])).sum()
}

// ── StraightLineRouter ────────────────────────────────────────────────────────

/// Always answers with the two-point path `[start, end]`.
///
/// Used when no external directions service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineRouter;

#[async_trait]
impl RouteProvider for StraightLineRouter {
    async fn route(
        &self,
        start: Coordinate,
        end: Coordinate,
        _profile: TravelProfile,
    ) -> Result<Vec<Coordinate>, RoutingError> {
        Ok(vec![start, end])
    }
}

// ── FallbackRouter ────────────────────────────────────────────────────────────

/// Wraps an external provider and substitutes the straight two-point path
/// whenever the inner provider errors or answers with an empty route.
#[derive(Debug, Clone)]
pub struct FallbackRouter<P> {
    inner: P,
}

impl<P: RouteProvider> FallbackRouter<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: RouteProvider> RouteProvider for FallbackRouter<P> {
    async fn route(
        &self,
        start: Coordinate,
        end: Coordinate,
        profile: TravelProfile,
    ) -> Result<Vec<Coordinate>, RoutingError> {
        match self.inner.route(start, end, profile).await {
            Ok(route) if !route.is_empty() => Ok(route),
            Ok(_) => {
                log::debug!("empty route {start} -> {end}; using straight line");
                Ok(vec![start, end])
            }
            Err(e) => {
                log::warn!("route provider failed ({e}); using straight line");
                Ok(vec![start, end])
            }
        }
    }
}
