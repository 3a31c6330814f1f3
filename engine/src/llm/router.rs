//! LLM Router
//!
//! Turns an ordered list of providers into a single [`ReasoningEngine`].
//! Providers are tried in order (default first, then fallback); each attempt
//! is bounded by the configured timeout. The first reply wins. If every
//! provider fails the caller sees `EngineUnavailable`.

use async_trait::async_trait;
use scribe_sdk::errors::EngineError;
use std::time::Duration;

use super::{LLMError, LLMProvider, Message, ReasoningEngine};

/// Health of one routed provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderHealth<'a> {
    pub name: &'a str,
    /// Runs on this machine
    pub local: bool,
    pub healthy: bool,
}

/// Router with automatic failover between providers
pub struct LLMRouter {
    providers: Vec<Box<dyn LLMProvider>>,
    timeout: Duration,
}

impl LLMRouter {
    /// Create a new router
    ///
    /// `providers` are tried in the given order.
    pub fn new(providers: Vec<Box<dyn LLMProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// Names of the registered providers, in order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Call providers with automatic failover
    ///
    /// Returns the reply text and the name of the provider that produced it.
    pub async fn call(
        &self,
        messages: &[Message],
        temperature: f32,
    ) -> super::Result<(String, String)> {
        if self.providers.is_empty() {
            return Err(LLMError::ProviderUnavailable(
                "No LLM providers configured".to_string(),
            ));
        }

        let mut last_error = None;

        for provider in &self.providers {
            tracing::debug!(
                "Attempting provider: {} (timeout: {}s)",
                provider.name(),
                self.timeout.as_secs_f64()
            );

            let result =
                tokio::time::timeout(self.timeout, provider.generate(messages, temperature)).await;

            match result {
                Ok(Ok(text)) => {
                    tracing::debug!("Provider {} succeeded", provider.name());
                    return Ok((text, provider.name().to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!("Provider {} failed: {}", provider.name(), e);
                    last_error = Some(e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Provider {} timed out after {:.1}s",
                        provider.name(),
                        self.timeout.as_secs_f64()
                    );
                    last_error = Some(LLMError::Timeout);
                }
            }
        }

        tracing::error!("All LLM providers exhausted");
        Err(match last_error {
            Some(e) if self.providers.len() == 1 => e,
            Some(e) => LLMError::ProviderUnavailable(format!("All LLM providers failed, last: {}", e)),
            None => LLMError::ProviderUnavailable("All LLM providers failed".to_string()),
        })
    }

    /// Check the health of all registered providers, in routing order
    pub async fn check_health(&self) -> Vec<ProviderHealth<'_>> {
        let mut results = Vec::new();
        for provider in &self.providers {
            results.push(ProviderHealth {
                name: provider.name(),
                local: provider.is_local(),
                healthy: provider.check_health().await,
            });
        }
        results
    }
}

#[async_trait]
impl ReasoningEngine for LLMRouter {
    async fn invoke(&self, prompt: &[Message], temperature: f32) -> Result<String, EngineError> {
        let (text, _provider) = self.call(prompt, temperature).await?;
        Ok(text)
    }
}
