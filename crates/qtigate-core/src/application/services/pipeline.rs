//! Pipeline Orchestrator - main application entry point.
//!
//! One run:
//! 1. Check the context itself
//! 2. Run every synchronous content rule, each isolated
//! 3. Await every asynchronous pass, one after another, each isolated
//! 4. Return all collected errors with the untouched document
//!
//! [`ValidationPipeline::run`] is total: rule errors and panics alike end
//! up in the returned [`ValidationResult`].

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{Instrument, debug, info, trace, warn};

use crate::{
    application::{
        ports::{AssetFetcher, ContentService},
        services::{
            ground_truth::{GroundTruthValidator, ItemStrategy},
            reachability::{ReachabilityOptions, ReachabilityValidator},
        },
    },
    domain::{
        entities::{ValidationContext, ValidationResult},
        error::ValidationError,
        rules::{CONTENT_RULES, ContentRule},
    },
};

/// A network-bound validation pass.
#[async_trait]
pub trait AsyncValidator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn validate(&self, xml: &str, ctx: &ValidationContext) -> Result<(), ValidationError>;
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panicked".to_string())
}

/// The validation pipeline.
///
/// Built once with its ports and reused for any number of runs.
pub struct ValidationPipeline {
    rules: Vec<ContentRule>,
    passes: Vec<Box<dyn AsyncValidator>>,
}

impl ValidationPipeline {
    pub fn builder() -> ValidationPipelineBuilder {
        ValidationPipelineBuilder::default()
    }

    /// Content rules only; no network passes.
    pub fn offline() -> Self {
        Self::builder().build()
    }

    pub fn rules(&self) -> &[ContentRule] {
        &self.rules
    }

    /// Names of the asynchronous passes, in execution order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Validate one document. Never fails; every problem is in the result.
    pub async fn run(&self, xml: &str, ctx: &ValidationContext) -> ValidationResult {
        let span = ctx.span().clone();
        async move {
            let mut errors = Vec::new();

            let context_ok = match ctx.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "invalid validation context; network passes skipped");
                    errors.push(e);
                    false
                }
            };

            for rule in &self.rules {
                match std::panic::catch_unwind(AssertUnwindSafe(|| rule.apply(xml, ctx))) {
                    Ok(Ok(())) => trace!(rule = rule.name, "rule passed"),
                    Ok(Err(e)) => {
                        debug!(rule = rule.name, error = %e, "rule failed");
                        errors.push(e);
                    }
                    Err(payload) => {
                        let reason = panic_reason(payload.as_ref());
                        warn!(rule = rule.name, %reason, "rule panicked");
                        errors.push(ValidationError::RuleFailure {
                            rule: rule.name,
                            reason,
                        });
                    }
                }
            }

            if context_ok {
                for pass in &self.passes {
                    let name = pass.name();
                    match AssertUnwindSafe(pass.validate(xml, ctx)).catch_unwind().await {
                        Ok(Ok(())) => trace!(pass = name, "pass succeeded"),
                        Ok(Err(e)) => {
                            debug!(pass = name, error = %e, "pass failed");
                            errors.push(e);
                        }
                        Err(payload) => {
                            let reason = panic_reason(payload.as_ref());
                            warn!(pass = name, %reason, "pass panicked");
                            errors.push(ValidationError::RuleFailure { rule: name, reason });
                        }
                    }
                }
            }

            info!(errors = errors.len(), "validation finished");
            ValidationResult::new(errors, xml)
        }
        .instrument(span)
        .await
    }
}

/// Assembles a [`ValidationPipeline`].
///
/// Passes always run reachability first, then ground truth, then any extra
/// passes in the order they were added.
pub struct ValidationPipelineBuilder {
    rules: Vec<ContentRule>,
    reachability: Option<ReachabilityValidator>,
    ground_truth: Option<GroundTruthValidator>,
    extra: Vec<Box<dyn AsyncValidator>>,
}

impl Default for ValidationPipelineBuilder {
    fn default() -> Self {
        Self {
            rules: CONTENT_RULES.to_vec(),
            reachability: None,
            ground_truth: None,
            extra: Vec::new(),
        }
    }
}

impl ValidationPipelineBuilder {
    pub fn with_reachability(
        mut self,
        fetcher: Arc<dyn AssetFetcher>,
        options: ReachabilityOptions,
    ) -> Self {
        self.reachability = Some(ReachabilityValidator::new(fetcher, options));
        self
    }

    pub fn with_ground_truth(
        mut self,
        service: Arc<dyn ContentService>,
        strategy: ItemStrategy,
    ) -> Self {
        self.ground_truth = Some(GroundTruthValidator::new(service, strategy));
        self
    }

    /// Append a content rule after the built-in ones.
    pub fn with_rule(mut self, rule: ContentRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append an asynchronous pass after the built-in ones.
    pub fn with_pass(mut self, pass: impl AsyncValidator + 'static) -> Self {
        self.extra.push(Box::new(pass));
        self
    }

    pub fn build(self) -> ValidationPipeline {
        let mut passes: Vec<Box<dyn AsyncValidator>> = Vec::new();
        if let Some(r) = self.reachability {
            passes.push(Box::new(r));
        }
        if let Some(g) = self.ground_truth {
            passes.push(Box::new(g));
        }
        passes.extend(self.extra);
        ValidationPipeline {
            rules: self.rules,
            passes,
        }
    }
}
