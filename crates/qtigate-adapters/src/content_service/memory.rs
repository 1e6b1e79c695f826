//! In-memory content service for testing and dry runs.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use qtigate_core::{
    application::{ServiceError, ports::ContentService},
    domain::{RootTag, markup::root_attribute},
};

/// Thread-safe in-memory content service.
///
/// Behaves like the real service: updates of unknown records are
/// `NotFound`, creates of existing records are rejected. Every call is
/// recorded so tests can assert on the exact sequence.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContentService {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    items: HashMap<String, String>,
    stimuli: HashMap<String, (String, String)>,
    calls: Vec<String>,
    rejection: Option<String>,
    fail_deletes: bool,
}

fn lock_error() -> ServiceError {
    ServiceError::Transport {
        message: "content store lock poisoned".into(),
    }
}

impl InMemoryContentService {
    /// Create a new empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write and oracle call with `reason`.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        let service = Self::new();
        if let Ok(mut inner) = service.inner.write() {
            inner.rejection = Some(reason.into());
        }
        service
    }

    /// Make every delete fail with a transport error.
    pub fn with_failing_deletes(self) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.fail_deletes = true;
        }
        self
    }

    /// Pre-populate a stimulus record.
    pub fn with_stimulus(self, identifier: &str, title: &str, content: &str) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner
                .stimuli
                .insert(identifier.into(), (title.into(), content.into()));
        }
        self
    }

    /// Calls received so far, as `operation:identifier`.
    pub fn calls(&self) -> Vec<String> {
        self.inner.read().map(|i| i.calls.clone()).unwrap_or_default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .map(|i| i.items.len() + i.stimuli.len())
            .unwrap_or(0)
    }

    /// Check if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, call: String) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, ServiceError> {
        let mut inner = self.inner.write().map_err(|_| lock_error())?;
        inner.calls.push(call);
        Ok(inner)
    }
}

fn reject_if_configured(inner: &Inner) -> Result<(), ServiceError> {
    match &inner.rejection {
        Some(reason) => Err(ServiceError::Rejected {
            status: Some(422),
            message: reason.clone(),
        }),
        None => Ok(()),
    }
}

fn declared_identifier(xml: &str) -> String {
    root_attribute(xml, RootTag::Item.element_name(), "identifier")
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl ContentService for InMemoryContentService {
    async fn update_item(&self, identifier: &str, xml: &str) -> Result<(), ServiceError> {
        let mut inner = self.record(format!("update_item:{identifier}"))?;
        reject_if_configured(&inner)?;
        match inner.items.get_mut(identifier) {
            Some(stored) => {
                *stored = xml.to_string();
                Ok(())
            }
            None => Err(ServiceError::NotFound {
                resource: format!("item '{identifier}'"),
            }),
        }
    }

    async fn create_item(&self, xml: &str) -> Result<(), ServiceError> {
        let identifier = declared_identifier(xml);
        let mut inner = self.record(format!("create_item:{identifier}"))?;
        reject_if_configured(&inner)?;
        if inner.items.contains_key(&identifier) {
            return Err(ServiceError::Rejected {
                status: Some(409),
                message: format!("item '{identifier}' already exists"),
            });
        }
        inner.items.insert(identifier, xml.to_string());
        Ok(())
    }

    async fn delete_item(&self, identifier: &str) -> Result<(), ServiceError> {
        let mut inner = self.record(format!("delete_item:{identifier}"))?;
        if inner.fail_deletes {
            return Err(ServiceError::Transport {
                message: "delete unavailable".into(),
            });
        }
        inner
            .items
            .remove(identifier)
            .map(drop)
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("item '{identifier}'"),
            })
    }

    async fn update_stimulus(
        &self,
        identifier: &str,
        title: &str,
        content: &str,
    ) -> Result<(), ServiceError> {
        let mut inner = self.record(format!("update_stimulus:{identifier}"))?;
        reject_if_configured(&inner)?;
        match inner.stimuli.get_mut(identifier) {
            Some(stored) => {
                *stored = (title.to_string(), content.to_string());
                Ok(())
            }
            None => Err(ServiceError::NotFound {
                resource: format!("stimulus '{identifier}'"),
            }),
        }
    }

    async fn create_stimulus(
        &self,
        identifier: &str,
        title: &str,
        content: &str,
    ) -> Result<(), ServiceError> {
        let mut inner = self.record(format!("create_stimulus:{identifier}"))?;
        reject_if_configured(&inner)?;
        if inner.stimuli.contains_key(identifier) {
            return Err(ServiceError::Rejected {
                status: Some(409),
                message: format!("stimulus '{identifier}' already exists"),
            });
        }
        inner
            .stimuli
            .insert(identifier.to_string(), (title.to_string(), content.to_string()));
        Ok(())
    }

    async fn delete_stimulus(&self, identifier: &str) -> Result<(), ServiceError> {
        let mut inner = self.record(format!("delete_stimulus:{identifier}"))?;
        if inner.fail_deletes {
            return Err(ServiceError::Transport {
                message: "delete unavailable".into(),
            });
        }
        inner
            .stimuli
            .remove(identifier)
            .map(drop)
            .ok_or_else(|| ServiceError::NotFound {
                resource: format!("stimulus '{identifier}'"),
            })
    }

    async fn validate_item(&self, _xml: &str, identifier: &str) -> Result<(), ServiceError> {
        let inner = self.record(format!("validate_item:{identifier}"))?;
        reject_if_configured(&inner)
    }

    async fn validate_test(&self, _xml: &str, identifier: &str) -> Result<(), ServiceError> {
        let inner = self.record(format!("validate_test:{identifier}"))?;
        reject_if_configured(&inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_of_unknown_stimulus_is_not_found() {
        let service = InMemoryContentService::new();
        let err = service.update_stimulus("s", "t", "<p/>").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(service.calls(), vec!["update_stimulus:s"]);
    }

    #[tokio::test]
    async fn create_then_delete_leaves_nothing_behind() {
        let service = InMemoryContentService::new();
        service.create_stimulus("s", "t", "<p/>").await.unwrap();
        assert_eq!(service.len(), 1);
        service.delete_stimulus("s").await.unwrap();
        assert!(service.is_empty());
    }

    #[tokio::test]
    async fn items_are_keyed_by_declared_identifier() {
        let service = InMemoryContentService::new();
        service
            .create_item(r#"<qti-assessment-item identifier="tmp" title="t"></qti-assessment-item>"#)
            .await
            .unwrap();
        service.update_item("tmp", "<x/>").await.unwrap();
        service.delete_item("tmp").await.unwrap();
        assert!(service.is_empty());
    }

    #[tokio::test]
    async fn configured_rejection_applies_to_oracle() {
        let service = InMemoryContentService::rejecting("schema violation");
        let err = service.validate_item("<x/>", "q").await.unwrap_err();
        assert!(err.to_string().contains("schema violation"));
    }
}
