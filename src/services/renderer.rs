// src/services/renderer.rs

//! Rendering capability for script-heavy listing pages.
//!
//! A [`PageRenderer`] is a stateful session: the first render acquires it
//! (for Chromium, launches the browser), later renders reuse it, and
//! [`PageRenderer::shutdown`] releases it. Renders take `&mut self`, so a
//! session is driven by one site at a time.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Renders a URL to its post-script HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Load `url`, wait `settle` for scripts to run, and return the DOM.
    async fn render(&mut self, url: &str, settle: Duration) -> Result<String>;

    /// Release the session. Rendering again acquires a new one.
    async fn shutdown(&mut self) -> Result<()>;
}

#[cfg(feature = "render")]
pub use chrome::ChromeRenderer;

#[cfg(feature = "render")]
mod chrome {
    use std::path::PathBuf;
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use tokio::task::JoinHandle;

    use super::PageRenderer;
    use crate::error::{AppError, Result};
    use crate::utils::http::USER_AGENTS;

    /// Headless Chromium driven over the DevTools protocol.
    pub struct ChromeRenderer {
        session: Option<ChromeSession>,
        navigation_timeout: Duration,
    }

    struct ChromeSession {
        browser: Browser,
        handler: JoinHandle<()>,
    }

    impl ChromeRenderer {
        /// The browser is not launched until the first render.
        pub fn new(navigation_timeout: Duration) -> Self {
            Self {
                session: None,
                navigation_timeout,
            }
        }

        async fn browser(&mut self) -> Result<&Browser> {
            let session = match reuse_session(self.session.take(), ChromeSession::is_alive) {
                Some(session) => session,
                None => Self::launch().await?,
            };
            Ok(&self.session.insert(session).browser)
        }

        async fn launch() -> Result<ChromeSession> {
            let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();
            if let Some(bin) = find_chrome_binary() {
                log::info!("Using Chrome binary: {}", bin.display());
                builder = builder.chrome_executable(bin);
            }

            let config = builder
                .arg("--headless=new")
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--window-size=1920,1080")
                .arg(format!("--user-agent={}", USER_AGENTS[0]))
                .build()
                .map_err(|e| AppError::render(format!("browser config: {e}")))?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| AppError::render(format!("failed to launch browser: {e}")))?;

            // The CDP connection only makes progress while its handler is polled.
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        log::warn!("Browser CDP handler error: {e}");
                        break;
                    }
                }
            });

            log::info!("Headless browser session started");
            Ok(ChromeSession { browser, handler })
        }

        /// Navigate an open page and read its DOM once scripts have settled.
        async fn read_page(page: &Page, url: &str, settle: Duration) -> Result<String> {
            page.goto(url)
                .await
                .map_err(|e| AppError::render(format!("failed to open {url}: {e}")))?;

            tokio::time::sleep(settle).await;

            page.content()
                .await
                .map_err(|e| AppError::render(format!("failed to read {url}: {e}")))
        }
    }

    impl ChromeSession {
        /// The CDP handler stops when the browser process goes away.
        fn is_alive(&self) -> bool {
            !self.handler.is_finished()
        }
    }

    /// Keep `session` only while `alive` holds for it.
    fn reuse_session<S>(session: Option<S>, alive: impl FnOnce(&S) -> bool) -> Option<S> {
        match session {
            Some(session) if alive(&session) => Some(session),
            Some(_) => {
                log::warn!("Browser session has exited; launching a new one");
                None
            }
            None => None,
        }
    }

    #[async_trait]
    impl PageRenderer for ChromeRenderer {
        async fn render(&mut self, url: &str, settle: Duration) -> Result<String> {
            let deadline = self.navigation_timeout + settle;
            let browser = self.browser().await?;

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| AppError::render(format!("failed to open a tab for {url}: {e}")))?;

            let rendered = tokio::time::timeout(deadline, Self::read_page(&page, url, settle)).await;

            if let Err(e) = page.close().await {
                log::debug!("Closing the tab for {url} failed: {e}");
            }

            match rendered {
                Ok(result) => result,
                Err(_) => Err(AppError::render(format!(
                    "rendering {url} exceeded {}s",
                    deadline.as_secs()
                ))),
            }
        }

        async fn shutdown(&mut self) -> Result<()> {
            let Some(mut session) = self.session.take() else {
                return Ok(());
            };

            let closed = session
                .browser
                .close()
                .await
                .map_err(|e| AppError::render(format!("failed to close browser: {e}")));
            let _ = session.browser.wait().await;
            session.handler.abort();
            log::info!("Headless browser session closed");
            closed.map(|_| ())
        }
    }

    /// Locate a Chrome/Chromium binary, honouring `CHROME_BIN`.
    ///
    /// Returns `None` to let chromiumoxide do its own lookup.
    fn find_chrome_binary() -> Option<PathBuf> {
        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(p);
            if path.exists() {
                return Some(path);
            }
        }

        [
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        ]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_finished_handler_session_is_dropped() {
            let handler = tokio::spawn(async {});
            while !handler.is_finished() {
                tokio::task::yield_now().await;
            }

            let session = reuse_session(Some(handler), |h: &JoinHandle<()>| !h.is_finished());
            assert!(session.is_none());
        }

        #[tokio::test]
        async fn test_running_handler_session_is_kept() {
            let handler = tokio::spawn(std::future::pending::<()>());

            let session = reuse_session(Some(handler), |h: &JoinHandle<()>| !h.is_finished());
            let handler = session.expect("live session is reused");
            handler.abort();
        }

        #[test]
        fn test_no_session_stays_empty() {
            assert!(reuse_session(None::<()>, |_| true).is_none());
        }
    }
}
