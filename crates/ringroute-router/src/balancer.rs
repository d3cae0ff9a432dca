//! Request balancing and failover.
//!
//! [`Balancer`] is the heart of the router: it owns the hash ring and the
//! connection pool, picks the preferred backend for each request, and walks
//! the failover plan when that backend does not answer.

use std::time::Duration;

use tracing::{info, warn};

use ringroute_common::{BalanceResponse, ClientRequest, Result, RingRouteError};

use crate::pool::ChannelPool;
use crate::registry::NodeRegistry;
use crate::ring::HashRing;

/// Configuration for the failover policy.
#[derive(Debug, Clone)]
pub struct FailoverConfig {
    /// Maximum total attempts per request, the first one included.
    ///
    /// Default: 3
    pub max_attempts: usize,
    /// Deadline for each individual backend call.
    ///
    /// Default: 3 seconds. A request can therefore occupy the router for up
    /// to `max_attempts * call_deadline` before the client hears back.
    pub call_deadline: Duration,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            call_deadline: Duration::from_secs(3),
        }
    }
}

/// Routes each client request to a backend and answers in all cases.
///
/// # Request flow
///
/// 1. Hash the request's routing key and look up the owning backend on the
///    ring.
/// 2. Call that backend with a bounded deadline.
/// 3. On failure, sweep the backends not yet tried, in configuration order,
///    until one answers or [`FailoverConfig::max_attempts`] calls have been
///    spent.
/// 4. Fold the outcome into a [`BalanceResponse`]: attempt failures never
///    escape as errors, only as `forwarded = false`.
///
/// # Failover policy
///
/// Failover candidates are the backends the request has not tried yet. With
/// a single configured backend there is exactly one attempt; retrying the
/// same dead backend buys nothing within one request's lifetime.
///
/// # Sharing
///
/// Ring and pool are built once here and never mutated, so the balancer can
/// sit behind an `Arc` and serve concurrent requests without locking.
pub struct Balancer {
    ring: HashRing,
    pool: ChannelPool,
    /// Backend identities in configuration order; drives failover candidate
    /// selection.
    order: Vec<String>,
    failover: FailoverConfig,
}

impl Balancer {
    /// Creates a balancer with the default failover policy.
    pub fn new(registry: &NodeRegistry) -> Result<Self> {
        Self::with_config(registry, FailoverConfig::default())
    }

    /// Creates a balancer with an explicit failover policy.
    ///
    /// Builds the ring and opens the pool, then cross-checks them: a ring
    /// owner missing from the pool is a construction bug and refuses
    /// startup, not something to discover mid-request.
    pub fn with_config(registry: &NodeRegistry, failover: FailoverConfig) -> Result<Self> {
        let ring = HashRing::build(registry);
        let pool = ChannelPool::connect(registry);

        for owner in ring.owners() {
            if pool.resolve(owner).is_none() {
                return Err(RingRouteError::PoolInconsistency(owner.to_string()));
            }
        }

        info!(
            "balancer ready: {} backends, {} ring positions",
            pool.len(),
            ring.len()
        );

        Ok(Self {
            ring,
            pool,
            order: registry.identities(),
            failover,
        })
    }

    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    pub fn pool(&self) -> &ChannelPool {
        &self.pool
    }

    /// Routes one request. Always produces a response; per-attempt failures
    /// are logged and folded into the failover loop.
    ///
    /// The only error this returns is a ring/pool inconsistency, which the
    /// startup cross-check makes unreachable in a correctly built balancer.
    pub async fn balance(&self, request: &ClientRequest) -> Result<BalanceResponse> {
        let preferred = self.preferred(request)?;

        for (attempt, identity) in self.attempt_plan(&preferred).enumerate() {
            let stub = self
                .pool
                .resolve(identity)
                .ok_or_else(|| RingRouteError::PoolInconsistency(identity.to_string()))?;

            info!(
                "request {}: attempt {}/{} against {}",
                request.request_id,
                attempt + 1,
                self.failover.max_attempts,
                identity
            );

            match stub.handle_request(request, self.failover.call_deadline).await {
                Ok(response) => {
                    info!(
                        "request {}: served by {} on attempt {}",
                        request.request_id,
                        identity,
                        attempt + 1
                    );
                    return Ok(BalanceResponse::forwarded(response.msg, response.payload));
                }
                Err(e) => {
                    warn!(
                        "request {}: backend {} failed: {}",
                        request.request_id, identity, e
                    );
                }
            }
        }

        warn!("request {}: no backend reachable", request.request_id);
        Ok(BalanceResponse::unreachable())
    }

    /// The backend the ring assigns to this request.
    fn preferred(&self, request: &ClientRequest) -> Result<String> {
        self.ring
            .lookup(&request.routing_key())
            .map(|vnode| vnode.owner.clone())
            .ok_or_else(|| RingRouteError::InvalidConfig("hash ring is empty".to_string()))
    }

    /// Attempt order for a request: the preferred backend first, then the
    /// remaining backends in configuration order, capped at
    /// `max_attempts` total.
    fn attempt_plan<'a>(&'a self, preferred: &'a str) -> impl Iterator<Item = &'a str> {
        std::iter::once(preferred)
            .chain(
                self.order
                    .iter()
                    .map(String::as_str)
                    .filter(move |identity| *identity != preferred),
            )
            .take(self.failover.max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Node;

    // Forwarding against live backends is covered by the integration tests;
    // these exercise construction and the failover plan.

    fn balancer_for(ports: &[u16]) -> Balancer {
        let registry = NodeRegistry::new(
            ports
                .iter()
                .map(|&port| Node::new("127.0.0.1", port))
                .collect(),
        )
        .unwrap();
        Balancer::new(&registry).unwrap()
    }

    #[test]
    fn test_failover_config_default() {
        let config = FailoverConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.call_deadline, Duration::from_secs(3));
    }

    #[test]
    fn test_balancer_creation() {
        let balancer = balancer_for(&[9001, 9002]);
        assert_eq!(balancer.pool().len(), 2);
        assert_eq!(balancer.ring().len(), 20);
    }

    #[test]
    fn test_attempt_plan_prefers_ring_choice_then_sweeps() {
        let balancer = balancer_for(&[9001, 9002, 9003]);

        let plan: Vec<&str> = balancer.attempt_plan("127.0.0.1:9002").collect();
        assert_eq!(
            plan,
            vec!["127.0.0.1:9002", "127.0.0.1:9001", "127.0.0.1:9003"]
        );
    }

    #[test]
    fn test_attempt_plan_caps_total_attempts() {
        let balancer = balancer_for(&[9001, 9002, 9003, 9004, 9005]);

        let plan: Vec<&str> = balancer.attempt_plan("127.0.0.1:9004").collect();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0], "127.0.0.1:9004");
    }

    #[test]
    fn test_attempt_plan_never_repeats_a_backend() {
        let balancer = balancer_for(&[9001]);

        let plan: Vec<&str> = balancer.attempt_plan("127.0.0.1:9001").collect();
        assert_eq!(plan, vec!["127.0.0.1:9001"]);
    }

    #[tokio::test]
    async fn test_balance_total_failure_returns_unreachable() {
        // Reserve two ports and close them so every attempt is refused.
        let l1 = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let l2 = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let (p1, p2) = (
            l1.local_addr().unwrap().port(),
            l2.local_addr().unwrap().port(),
        );
        drop(l1);
        drop(l2);

        let balancer = balancer_for(&[p1, p2]);
        let request = ClientRequest::new("1.2.3.4", "req-7");

        let response = balancer.balance(&request).await.unwrap();
        assert!(!response.forwarded);
        assert_eq!(response.msg, ringroute_common::UNREACHABLE_MSG);
        assert!(response.payload.is_empty());
    }
}
