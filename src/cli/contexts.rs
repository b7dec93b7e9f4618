use std::sync::Arc;

use action_flow::{ContextFactory, FlowError, IsolatedContext};
use action_primitives::Page;
use async_trait::async_trait;
use cdp_adapter::{ChromiumBrowser, ChromiumContext};
use slotwatch_core_types::Participant;

/// Opens one fresh browser context per participant on a shared Chromium
/// process.
pub struct ChromiumContexts {
    browser: Arc<ChromiumBrowser>,
}

impl ChromiumContexts {
    pub fn new(browser: Arc<ChromiumBrowser>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl ContextFactory for ChromiumContexts {
    async fn open(&self, participant: &Participant) -> Result<Box<dyn IsolatedContext>, FlowError> {
        let context = self.browser.new_context().await.map_err(|err| {
            FlowError::Context(format!("{}: {}", participant.label(), err))
        })?;
        Ok(Box::new(ChromiumIsolated { context }))
    }
}

struct ChromiumIsolated {
    context: ChromiumContext,
}

#[async_trait]
impl IsolatedContext for ChromiumIsolated {
    fn page(&self) -> Arc<dyn Page> {
        self.context.page()
    }

    async fn close(self: Box<Self>) -> Result<(), FlowError> {
        self.context
            .close()
            .await
            .map_err(|err| FlowError::Context(err.to_string()))
    }
}
