//! Ground-Truth Validator - the content service is the final judge.
//!
//! - Items and tests go to the service's opaque oracle, keyed by the
//!   identifier the document declares.
//! - Stimuli make an upsert-then-delete round trip under the context id:
//!   update, create on `NotFound`, then always delete. A failed delete is
//!   logged and otherwise ignored.
//! - Items may optionally use the same round trip (see [`ItemStrategy`]).

use std::{fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::{
    application::{error::ServiceError, ports::ContentService, services::pipeline::AsyncValidator},
    domain::{
        entities::ValidationContext,
        error::ValidationError,
        markup::{element_inner, root_attribute, static_regex},
        value_objects::RootTag,
    },
};

/// How items are checked against the content service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemStrategy {
    /// Submit to the validation oracle under the declared identifier.
    #[default]
    Oracle,
    /// Upsert under the temporary context id, then delete.
    RoundTrip,
}

impl ItemStrategy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Oracle => "oracle",
            Self::RoundTrip => "round-trip",
        }
    }
}

impl fmt::Display for ItemStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oracle" => Ok(Self::Oracle),
            "round-trip" | "roundtrip" => Ok(Self::RoundTrip),
            other => Err(format!("unknown item strategy '{other}' (expected oracle or round-trip)")),
        }
    }
}

/// Replace the `identifier` attribute on the root opening tag.
pub fn rewrite_root_identifier(xml: &str, root: &str, identifier: &str) -> Option<String> {
    let open = static_regex!(r"<qti-assessment-(?:item|test|stimulus)\b[^>]*>");
    let tag = open
        .find_iter(xml)
        .find(|m| m.as_str()[1..].starts_with(root))?;
    let attr = static_regex!(r#"(\s)identifier\s*=\s*(?:"[^"]*"|'[^']*')"#);
    let caps = attr.captures(tag.as_str())?;
    let whole = caps.get(0)?;

    let mut out = String::with_capacity(xml.len() + identifier.len());
    out.push_str(&xml[..tag.start() + whole.start()]);
    out.push_str(&caps[1]);
    out.push_str(&format!(r#"identifier="{identifier}""#));
    out.push_str(&xml[tag.start() + whole.end()..]);
    Some(out)
}

pub struct GroundTruthValidator {
    service: Arc<dyn ContentService>,
    strategy: ItemStrategy,
}

impl GroundTruthValidator {
    pub fn new(service: Arc<dyn ContentService>, strategy: ItemStrategy) -> Self {
        Self { service, strategy }
    }

    pub fn strategy(&self) -> ItemStrategy {
        self.strategy
    }

    #[instrument(skip_all, fields(id = %ctx.id(), root = %ctx.root_tag()))]
    pub async fn check(&self, xml: &str, ctx: &ValidationContext) -> Result<(), ValidationError> {
        match (ctx.root_tag(), self.strategy) {
            (RootTag::Stimulus, _) => self.stimulus_round_trip(xml, ctx).await,
            (RootTag::Item, ItemStrategy::RoundTrip) => self.item_round_trip(xml, ctx).await,
            (root, _) => self.oracle(xml, root).await,
        }
    }

    async fn oracle(&self, xml: &str, root: RootTag) -> Result<(), ValidationError> {
        let element = root.element_name();
        let identifier = root_attribute(xml, element, "identifier")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ValidationError::MissingIdentifier { root: element })?;

        debug!(identifier, "submitting to validation oracle");
        let verdict = match root {
            RootTag::Test => self.service.validate_test(xml, identifier).await,
            _ => self.service.validate_item(xml, identifier).await,
        };
        verdict.map_err(|e| ValidationError::GroundTruthRejected {
            kind: root.as_str(),
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })
    }

    async fn stimulus_round_trip(
        &self,
        xml: &str,
        ctx: &ValidationContext,
    ) -> Result<(), ValidationError> {
        let (_, body) =
            element_inner(xml, "qti-stimulus-body").ok_or(ValidationError::MissingStimulusBody)?;
        let (id, title, content) = (ctx.id(), ctx.title(), body.trim());

        let outcome = match self.service.update_stimulus(id, title, content).await {
            Err(e) if e.is_not_found() => {
                debug!(identifier = id, "stimulus not found, creating");
                self.service.create_stimulus(id, title, content).await
            }
            other => other,
        };

        if let Err(e) = self.service.delete_stimulus(id).await {
            warn!(identifier = id, error = %e, "failed to delete temporary stimulus");
        }

        Self::verdict(outcome, "stimulus", id)
    }

    async fn item_round_trip(&self, xml: &str, ctx: &ValidationContext) -> Result<(), ValidationError> {
        let element = RootTag::Item.element_name();
        let id = ctx.id();
        let staged = rewrite_root_identifier(xml, element, id)
            .ok_or(ValidationError::MissingIdentifier { root: element })?;

        let outcome = match self.service.update_item(id, &staged).await {
            Err(e) if e.is_not_found() => {
                debug!(identifier = id, "item not found, creating");
                self.service.create_item(&staged).await
            }
            other => other,
        };

        if let Err(e) = self.service.delete_item(id).await {
            warn!(identifier = id, error = %e, "failed to delete temporary item");
        }

        Self::verdict(outcome, "item", id)
    }

    fn verdict(
        outcome: Result<(), ServiceError>,
        kind: &'static str,
        identifier: &str,
    ) -> Result<(), ValidationError> {
        match outcome {
            Ok(()) => {
                info!(kind, identifier, "accepted by content service");
                Ok(())
            }
            Err(e) => Err(ValidationError::GroundTruthRejected {
                kind,
                identifier: identifier.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl AsyncValidator for GroundTruthValidator {
    fn name(&self) -> &'static str {
        "ground-truth"
    }

    async fn validate(&self, xml: &str, ctx: &ValidationContext) -> Result<(), ValidationError> {
        self.check(xml, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;

    use super::*;
    use crate::application::ports::MockContentService;

    const STIMULUS: &str = r#"<?xml version="1.0"?>
<qti-assessment-stimulus identifier="stim-orig" title="Passage">
<qti-stimulus-body>
  <p>Once upon a time.</p>
</qti-stimulus-body>
</qti-assessment-stimulus>"#;

    const ITEM: &str = r#"<?xml version="1.0"?>
<qti-assessment-item identifier="item-orig" title="Q"><qti-item-body><p>x</p></qti-item-body></qti-assessment-item>"#;

    fn stimulus_ctx() -> ValidationContext {
        ValidationContext::new("tmp-stim", RootTag::Stimulus, "Passage")
    }

    fn not_found() -> ServiceError {
        ServiceError::NotFound {
            resource: "stimulus".into(),
        }
    }

    #[tokio::test]
    async fn stimulus_update_then_delete() {
        let mut service = MockContentService::new();
        let mut seq = Sequence::new();
        service
            .expect_update_stimulus()
            .withf(|id, title, content| {
                id == "tmp-stim" && title == "Passage" && content == "<p>Once upon a time.</p>"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        service
            .expect_delete_stimulus()
            .withf(|id| id == "tmp-stim")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        service.expect_create_stimulus().never();

        let validator = GroundTruthValidator::new(Arc::new(service), ItemStrategy::Oracle);
        assert!(validator.check(STIMULUS, &stimulus_ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn stimulus_not_found_falls_back_to_create() {
        let mut service = MockContentService::new();
        let mut seq = Sequence::new();
        service
            .expect_update_stimulus()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(not_found()));
        service
            .expect_create_stimulus()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        service
            .expect_delete_stimulus()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let validator = GroundTruthValidator::new(Arc::new(service), ItemStrategy::Oracle);
        assert!(validator.check(STIMULUS, &stimulus_ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn other_update_failures_are_hard_errors_but_still_clean_up() {
        let mut service = MockContentService::new();
        service.expect_update_stimulus().returning(|_, _, _| {
            Err(ServiceError::Rejected {
                status: Some(422),
                message: "body must be HTML".into(),
            })
        });
        service.expect_create_stimulus().never();
        service
            .expect_delete_stimulus()
            .times(1)
            .returning(|_| Ok(()));

        let validator = GroundTruthValidator::new(Arc::new(service), ItemStrategy::Oracle);
        let err = validator.check(STIMULUS, &stimulus_ctx()).await.unwrap_err();
        assert!(matches!(err, ValidationError::GroundTruthRejected { kind: "stimulus", .. }));
        assert!(err.to_string().contains("body must be HTML"));
    }

    #[tokio::test]
    async fn cleanup_failure_does_not_fail_validation() {
        let mut service = MockContentService::new();
        service.expect_update_stimulus().returning(|_, _, _| Ok(()));
        service.expect_delete_stimulus().returning(|_| {
            Err(ServiceError::Transport {
                message: "connection reset".into(),
            })
        });

        let validator = GroundTruthValidator::new(Arc::new(service), ItemStrategy::Oracle);
        assert!(validator.check(STIMULUS, &stimulus_ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn create_failure_after_fallback_is_reported() {
        let mut service = MockContentService::new();
        service.expect_update_stimulus().returning(|_, _, _| Err(not_found()));
        service.expect_create_stimulus().returning(|_, _, _| {
            Err(ServiceError::Rejected {
                status: Some(400),
                message: "title too long".into(),
            })
        });
        service.expect_delete_stimulus().returning(|_| Err(not_found()));

        let validator = GroundTruthValidator::new(Arc::new(service), ItemStrategy::Oracle);
        assert!(validator.check(STIMULUS, &stimulus_ctx()).await.is_err());
    }

    #[tokio::test]
    async fn stimulus_without_body_is_reported() {
        let service = MockContentService::new();
        let validator = GroundTruthValidator::new(Arc::new(service), ItemStrategy::Oracle);
        let xml = r#"<qti-assessment-stimulus identifier="s" title="t"></qti-assessment-stimulus>"#;
        assert_eq!(
            validator.check(xml, &stimulus_ctx()).await,
            Err(ValidationError::MissingStimulusBody)
        );
    }

    #[tokio::test]
    async fn items_use_the_oracle_with_declared_identifier() {
        let mut service = MockContentService::new();
        service
            .expect_validate_item()
            .withf(|_, id| id == "item-orig")
            .times(1)
            .returning(|_, _| {
                Err(ServiceError::Rejected {
                    status: Some(400),
                    message: "unknown element qti-foo".into(),
                })
            });

        let validator = GroundTruthValidator::new(Arc::new(service), ItemStrategy::Oracle);
        let ctx = ValidationContext::new("tmp-item", RootTag::Item, "Q");
        match validator.check(ITEM, &ctx).await {
            Err(ValidationError::GroundTruthRejected {
                kind, identifier, ..
            }) => {
                assert_eq!(kind, "item");
                assert_eq!(identifier, "item-orig");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn tests_use_the_test_oracle() {
        let mut service = MockContentService::new();
        service
            .expect_validate_test()
            .times(1)
            .returning(|_, _| Ok(()));
        let validator = GroundTruthValidator::new(Arc::new(service), ItemStrategy::Oracle);
        let xml = r#"<qti-assessment-test identifier="t-1" title="Unit test"></qti-assessment-test>"#;
        let ctx = ValidationContext::new("tmp", RootTag::Test, "Unit test");
        assert!(validator.check(xml, &ctx).await.is_ok());
    }

    #[tokio::test]
    async fn oracle_needs_an_identifier() {
        let service = MockContentService::new();
        let validator = GroundTruthValidator::new(Arc::new(service), ItemStrategy::Oracle);
        let xml = r#"<qti-assessment-test title="Unit test"></qti-assessment-test>"#;
        let ctx = ValidationContext::new("tmp", RootTag::Test, "Unit test");
        assert_eq!(
            validator.check(xml, &ctx).await,
            Err(ValidationError::MissingIdentifier {
                root: "qti-assessment-test"
            })
        );
    }

    #[tokio::test]
    async fn item_round_trip_stages_under_context_id() {
        let mut service = MockContentService::new();
        service
            .expect_update_item()
            .withf(|id, xml| id == "tmp-item" && xml.contains(r#"identifier="tmp-item""#))
            .times(1)
            .returning(|_, _| {
                Err(ServiceError::NotFound {
                    resource: "item".into(),
                })
            });
        service
            .expect_create_item()
            .withf(|xml| !xml.contains("item-orig"))
            .times(1)
            .returning(|_| Ok(()));
        service
            .expect_delete_item()
            .withf(|id| id == "tmp-item")
            .times(1)
            .returning(|_| Ok(()));

        let validator = GroundTruthValidator::new(Arc::new(service), ItemStrategy::RoundTrip);
        let ctx = ValidationContext::new("tmp-item", RootTag::Item, "Q");
        assert!(validator.check(ITEM, &ctx).await.is_ok());
    }

    #[test]
    fn rewrites_only_the_root_identifier() {
        let xml = r#"<qti-assessment-item identifier='a' title="t"><qti-response-declaration identifier="RESPONSE"/></qti-assessment-item>"#;
        let out = rewrite_root_identifier(xml, "qti-assessment-item", "tmp").unwrap();
        assert!(out.starts_with(r#"<qti-assessment-item identifier="tmp" title="t">"#));
        assert!(out.contains(r#"identifier="RESPONSE""#));
    }

    #[test]
    fn item_strategy_parses() {
        assert_eq!("round-trip".parse::<ItemStrategy>(), Ok(ItemStrategy::RoundTrip));
        assert_eq!("Oracle".parse::<ItemStrategy>(), Ok(ItemStrategy::Oracle));
        assert!("sometimes".parse::<ItemStrategy>().is_err());
    }
}
