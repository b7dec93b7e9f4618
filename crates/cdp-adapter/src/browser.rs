//! Browser process and isolated contexts.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{BrowserContextId, CloseParams};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::page::ChromiumPage;

pub struct ChromiumBrowser {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
    config: CdpConfig,
}

impl ChromiumBrowser {
    pub async fn launch(config: CdpConfig) -> Result<Self, AdapterError> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.window_width, config.window_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.executable {
            builder = builder.chrome_executable(path);
        }
        if let Some(dir) = &config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        let browser_config = builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::LaunchFailed).with_hint(err)
        })?;

        info!(headless = config.headless, "launching browser");
        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::LaunchFailed).with_hint(err.to_string())
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "browser handler error");
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            handler,
            config,
        })
    }

    /// Open a fresh context (no shared cookies or storage) with one blank page.
    pub async fn new_context(&self) -> Result<ChromiumContext, AdapterError> {
        let id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await?
            .result
            .browser_context_id;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(id.clone())
            .build()
            .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err))?;
        let page = match self.browser.new_page(target).await {
            Ok(page) => page,
            Err(err) => {
                dispose(&self.browser, id).await;
                return Err(err.into());
            }
        };

        Ok(ChromiumContext {
            id,
            page: Arc::new(ChromiumPage::new(page, &self.config)),
            browser: Arc::clone(&self.browser),
        })
    }

    pub async fn close(self) -> Result<(), AdapterError> {
        let result = self.browser.execute(CloseParams::default()).await;
        self.handler.abort();
        info!("browser closed");
        result.map(|_| ()).map_err(AdapterError::from)
    }
}

/// One isolated browser context and its page.
pub struct ChromiumContext {
    id: BrowserContextId,
    page: Arc<ChromiumPage>,
    browser: Arc<Browser>,
}

impl ChromiumContext {
    pub fn page(&self) -> Arc<ChromiumPage> {
        Arc::clone(&self.page)
    }

    /// Close the page and dispose of the context.
    pub async fn close(self) -> Result<(), AdapterError> {
        let Self { id, page, browser } = self;
        match Arc::try_unwrap(page) {
            Ok(page) => {
                if let Err(err) = page.into_inner().close().await {
                    warn!(error = %err, "page close failed");
                }
            }
            Err(_) => debug!("page still shared; disposing context directly"),
        }
        browser
            .execute(DisposeBrowserContextParams::new(id))
            .await
            .map(|_| ())
            .map_err(AdapterError::from)
    }
}

async fn dispose(browser: &Browser, id: BrowserContextId) {
    if let Err(err) = browser.execute(DisposeBrowserContextParams::new(id)).await {
        warn!(error = %err, "context dispose failed");
    }
}
