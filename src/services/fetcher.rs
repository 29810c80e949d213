// src/services/fetcher.rs

//! Retrieval of listing page HTML.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use crate::error::{AppError, Result};
use crate::models::{SiteTarget, TaskConfig};
use crate::services::PageRenderer;
use crate::utils::http::{ACCEPT_HTML, create_async_client, random_delay, random_user_agent};

/// Retrieves the raw HTML of a site's listing page.
#[async_trait]
pub trait PageFetcher: Send {
    /// Fetch the listing page of `target`.
    async fn fetch(&mut self, target: &SiteTarget) -> Result<String>;

    /// Release any session held by the fetcher.
    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Plain HTTP fetcher with an optional renderer for script-heavy sites.
pub struct HttpFetcher {
    client: reqwest::Client,
    task: TaskConfig,
    renderer: Option<Box<dyn PageRenderer>>,
}

impl HttpFetcher {
    /// Create a fetcher without rendering support.
    pub fn new(task: &TaskConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(task)?,
            task: task.clone(),
            renderer: None,
        })
    }

    /// Attach the renderer used for targets that require rendering.
    pub fn with_renderer(mut self, renderer: Box<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Create a fetcher with the default renderer of this build.
    pub fn from_config(task: &TaskConfig) -> Result<Self> {
        let fetcher = Self::new(task)?;

        #[cfg(feature = "render")]
        let fetcher = fetcher.with_renderer(Box::new(crate::services::ChromeRenderer::new(
            task.request_timeout(),
        )));

        Ok(fetcher)
    }

    async fn fetch_plain(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, random_user_agent())
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| AppError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| AppError::fetch(url, e))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&mut self, target: &SiteTarget) -> Result<String> {
        let pause = random_delay(self.task.min_delay_ms, self.task.max_delay_ms);
        log::debug!("Waiting {}ms before fetching {}", pause.as_millis(), target.url);
        tokio::time::sleep(pause).await;

        if !target.requires_rendering {
            return self.fetch_plain(&target.url).await;
        }

        let settle = self.task.render_settle();
        let Some(renderer) = self.renderer.as_mut() else {
            return Err(AppError::render(format!(
                "{} requires rendering but no renderer is available",
                target.key
            )));
        };
        log::info!("Rendering {} with headless browser", target.url);
        renderer.render(&target.url, settle).await
    }

    async fn shutdown(&mut self) -> Result<()> {
        match self.renderer.as_mut() {
            Some(renderer) => renderer.shutdown().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::utils::http::USER_AGENTS;

    struct StaticRenderer {
        renders: usize,
        shutdowns: usize,
    }

    #[async_trait]
    impl PageRenderer for StaticRenderer {
        async fn render(&mut self, url: &str, settle: Duration) -> Result<String> {
            self.renders += 1;
            Ok(format!("<html><!-- {url} after {}s --></html>", settle.as_secs()))
        }

        async fn shutdown(&mut self) -> Result<()> {
            self.shutdowns += 1;
            Ok(())
        }
    }

    fn quiet_task() -> TaskConfig {
        TaskConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
            request_timeout_secs: 5,
            ..TaskConfig::default()
        }
    }

    /// Fetcher whose client ignores proxy settings of the environment.
    fn local_fetcher() -> HttpFetcher {
        let task = quiet_task();
        HttpFetcher {
            client: reqwest::Client::builder()
                .timeout(task.request_timeout())
                .no_proxy()
                .build()
                .unwrap(),
            task,
            renderer: None,
        }
    }

    /// Answer one request with `response` and hand back the raw request.
    async fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{addr}/blog"), server)
    }

    fn header<'r>(request: &'r str, name: &str) -> Option<&'r str> {
        request.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_fetcher_can_be_shared_across_tasks() {
        assert_send_sync::<HttpFetcher>();
        assert_send_sync::<Box<dyn PageRenderer>>();
    }

    #[tokio::test]
    async fn test_plain_fetch_returns_body() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 30\r\nConnection: close\r\n\r\n<html><h2>CNC news</h2></html>",
        )
        .await;
        let mut fetcher = local_fetcher();
        let target = SiteTarget::new("3erp", "3ERP", &url);

        let html = fetcher.fetch(&target).await.unwrap();
        assert_eq!(html, "<html><h2>CNC news</h2></html>");

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /blog HTTP/1.1"));
        let agent = header(&request, "user-agent").unwrap();
        assert!(USER_AGENTS.contains(&agent), "unexpected user agent {agent}");
        assert_eq!(header(&request, "accept"), Some(ACCEPT_HTML));
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_status_error() {
        let (url, server) = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let mut fetcher = local_fetcher();
        let target = SiteTarget::new("wayken", "Wayken", &url);

        let err = fetcher.fetch(&target).await.unwrap_err();
        match err {
            AppError::HttpStatus { url: failed, status } => {
                assert_eq!(status, 503);
                assert_eq!(failed, url);
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_failure_is_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut fetcher = local_fetcher();
        let target = SiteTarget::new("hubs", "Hubs", &format!("http://{addr}/blog"));

        let err = fetcher.fetch(&target).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }), "got {err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_politeness_delay_within_bounds_once_per_fetch() {
        let task = TaskConfig {
            min_delay_ms: 1_500,
            max_delay_ms: 2_500,
            ..TaskConfig::default()
        };
        let mut fetcher = HttpFetcher::new(&task)
            .unwrap()
            .with_renderer(Box::new(StaticRenderer {
                renders: 0,
                shutdowns: 0,
            }));
        let target = SiteTarget::new("jlccnc", "JLCCNC", "https://jlccnc.com/blog").rendered();

        for _ in 0..3 {
            let started = tokio::time::Instant::now();
            fetcher.fetch(&target).await.unwrap();
            let waited = started.elapsed();
            assert!(waited >= Duration::from_millis(1_500), "waited {waited:?}");
            assert!(waited <= Duration::from_millis(2_500), "waited {waited:?}");
        }
    }

    #[tokio::test]
    async fn test_rendering_target_without_renderer_fails() {
        let mut fetcher = HttpFetcher::new(&quiet_task()).unwrap();
        let target = SiteTarget::new("jlccnc", "JLCCNC", "https://jlccnc.com/blog").rendered();

        let err = fetcher.fetch(&target).await.unwrap_err();
        assert!(matches!(err, AppError::Render(_)));
    }

    #[tokio::test]
    async fn test_rendering_target_uses_renderer() {
        let mut fetcher = HttpFetcher::new(&quiet_task())
            .unwrap()
            .with_renderer(Box::new(StaticRenderer {
                renders: 0,
                shutdowns: 0,
            }));
        let target = SiteTarget::new("jlccnc", "JLCCNC", "https://jlccnc.com/blog").rendered();

        let html = fetcher.fetch(&target).await.unwrap();
        assert!(html.contains("https://jlccnc.com/blog after 5s"));
        fetcher.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_without_renderer_is_noop() {
        let mut fetcher = HttpFetcher::new(&quiet_task()).unwrap();
        assert!(fetcher.shutdown().await.is_ok());
    }
}
