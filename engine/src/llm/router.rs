//! Model Router
//!
//! Routes each generation call to the provider chain configured for its role.
//! Planning, writing, and grading can run on different models; within a role
//! the chain is tried in order with automatic failover.

use super::{Completion, LLMProvider, Message};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Role a generation call runs under
///
/// Each role maps to its own provider chain so that, for example, section
/// planning can use a stronger model than per-document relevance grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelRole {
    /// Proposal section planning
    Planner,

    /// Query generation and section drafting
    Writer,

    /// Document relevance and section quality grading
    Grader,
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRole::Planner => write!(f, "planner"),
            ModelRole::Writer => write!(f, "writer"),
            ModelRole::Grader => write!(f, "grader"),
        }
    }
}

/// Router that owns one provider chain per model role
///
/// Providers are shared via `Arc` so the same configured provider can back
/// several roles without duplicating HTTP clients.
pub struct ModelRouter {
    planner: Vec<Arc<dyn LLMProvider>>,
    writer: Vec<Arc<dyn LLMProvider>>,
    grader: Vec<Arc<dyn LLMProvider>>,
}

impl ModelRouter {
    /// Create a new model router
    ///
    /// # Arguments
    /// * `planner` - Provider chain for section planning, primary first
    /// * `writer` - Provider chain for query generation and drafting
    /// * `grader` - Provider chain for relevance and quality grading
    pub fn new(
        planner: Vec<Arc<dyn LLMProvider>>,
        writer: Vec<Arc<dyn LLMProvider>>,
        grader: Vec<Arc<dyn LLMProvider>>,
    ) -> Self {
        Self {
            planner,
            writer,
            grader,
        }
    }

    fn chain(&self, role: ModelRole) -> &[Arc<dyn LLMProvider>] {
        match role {
            ModelRole::Planner => &self.planner,
            ModelRole::Writer => &self.writer,
            ModelRole::Grader => &self.grader,
        }
    }

    /// Generate a completion under the given role with automatic failover
    ///
    /// Attempts each provider in the role's chain in order. Local providers
    /// get 120 seconds for model loading plus generation, cloud providers
    /// get 30 seconds. Returns `ProviderUnavailable` once the chain is
    /// exhausted.
    pub async fn generate(
        &self,
        role: ModelRole,
        messages: &[Message],
    ) -> super::Result<Completion> {
        use super::LLMError;

        let chain = self.chain(role);
        if chain.is_empty() {
            return Err(LLMError::ProviderUnavailable(format!(
                "No providers configured for role {}",
                role
            )));
        }

        for provider in chain {
            let timeout_secs = if provider.is_local() { 120 } else { 30 };
            tracing::debug!(
                "Attempting provider {} for role {} (timeout: {}s)",
                provider.name(),
                role,
                timeout_secs
            );

            let result = tokio::time::timeout(
                Duration::from_secs(timeout_secs),
                provider.generate(messages),
            )
            .await;

            match result {
                Ok(Ok(completion)) => {
                    tracing::debug!("Provider {} succeeded for role {}", provider.name(), role);
                    return Ok(completion);
                }
                Ok(Err(e)) => {
                    tracing::warn!("Provider {} failed for role {}: {}", provider.name(), role, e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Provider {} timed out after {}s for role {}",
                        provider.name(),
                        timeout_secs,
                        role
                    );
                }
            }
        }

        tracing::error!("All providers exhausted for role {}", role);
        Err(LLMError::ProviderUnavailable(format!(
            "All providers failed for role {}",
            role
        )))
    }

    /// Check the health of all registered providers
    ///
    /// Providers appearing in several role chains are checked once.
    /// Returns a list of (provider_name, is_healthy).
    pub async fn check_health(&self) -> Vec<(String, bool)> {
        let mut seen = std::collections::HashSet::new();
        let mut providers = Vec::new();
        for provider in self
            .planner
            .iter()
            .chain(self.writer.iter())
            .chain(self.grader.iter())
        {
            if seen.insert(provider.name().to_string()) {
                providers.push(provider);
            }
        }

        let checks = providers.iter().map(|p| p.check_health());
        let results = futures::future::join_all(checks).await;

        providers
            .iter()
            .zip(results)
            .map(|(p, healthy)| (p.name().to_string(), healthy))
            .collect()
    }
}
