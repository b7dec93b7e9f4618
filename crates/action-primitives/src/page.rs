//! The interaction handle
//!
//! [`Page`] is the only surface the sequencer touches. One instance maps to one
//! isolated browser context and is owned by a single participant run.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{
    errors::ActionError,
    types::{AnchorDescriptor, ElementRef, FormField},
};

#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate and wait for the DOM to be ready.
    async fn goto(&self, url: &str) -> Result<(), ActionError>;

    /// Reload the current document and wait for the DOM to be ready.
    async fn reload(&self) -> Result<(), ActionError>;

    /// Find the first visible element satisfying `anchor`, waiting up to
    /// `timeout`. `Ok(None)` means nothing matched in time.
    async fn locate(
        &self,
        anchor: &AnchorDescriptor,
        timeout: Duration,
    ) -> Result<Option<ElementRef>, ActionError>;

    async fn click(&self, element: &ElementRef) -> Result<(), ActionError>;

    /// Replace the element's value.
    async fn fill(&self, element: &ElementRef, value: &str) -> Result<(), ActionError>;

    /// Choose the option whose visible label matches `label`.
    async fn select_option(&self, element: &ElementRef, label: &str) -> Result<(), ActionError>;

    /// All inputs, selects and textareas in document order.
    async fn form_fields(&self) -> Result<Vec<FormField>, ActionError>;

    async fn evaluate(&self, script: &str) -> Result<Value, ActionError>;

    /// Register a page-callable function; every call delivers its payload on
    /// the returned channel.
    async fn expose_binding(
        &self,
        name: &str,
    ) -> Result<mpsc::UnboundedReceiver<String>, ActionError>;

    /// Run `source` in every future document before page scripts.
    async fn add_init_script(&self, source: &str) -> Result<(), ActionError>;
}
