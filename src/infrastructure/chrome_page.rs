//! chromiumoxide 页面驱动 - 基础设施层
//!
//! 所有 DOM 操作都通过 `page.evaluate()` 执行一小段 JS 完成，
//! 等待类操作按固定间隔轮询，直到条件满足或超时。

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, Page};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::browser;
use crate::config::Config;
use crate::infrastructure::page_driver::{DriverError, DriverFactory, PageDriver};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

impl From<CdpError> for DriverError {
    fn from(err: CdpError) -> Self {
        match err {
            CdpError::Timeout => DriverError::Timeout {
                locator: "<cdp>".to_string(),
                waited: Duration::ZERO,
            },
            CdpError::NotFound => DriverError::ElementNotFound(err.to_string()),
            other => DriverError::Fault(other.to_string()),
        }
    }
}

/// 元素状态探测结果（JS 返回值）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Missing,
    Hidden,
    Disabled,
    Ready,
}

impl Probe {
    fn parse(raw: &str) -> Self {
        match raw {
            "hidden" => Probe::Hidden,
            "disabled" => Probe::Disabled,
            "ready" => Probe::Ready,
            _ => Probe::Missing,
        }
    }
}

/// 基于 CDP 的页面驱动
pub struct ChromePage {
    page: Page,
    browser: Browser,
    /// 浏览器是否由我们启动；连接模式下浏览器属于用户，只关闭页面
    launched: bool,
}

impl ChromePage {
    pub fn new(page: Page, browser: Browser, launched: bool) -> Self {
        Self {
            page,
            browser,
            launched,
        }
    }

    /// 执行 JS 并反序列化结果
    async fn eval_as<T: DeserializeOwned>(&self, js_code: String) -> Result<T, DriverError> {
        let result = self.page.evaluate(js_code).await?;
        result.into_value::<T>().map_err(DriverError::fault)
    }

    async fn probe(&self, locator: &str) -> Result<Probe, DriverError> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({selector});
                if (!el) return "missing";
                const style = window.getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                if (style.visibility === "hidden" || style.display === "none" || (rect.width === 0 && rect.height === 0)) {{
                    return "hidden";
                }}
                if (el.disabled) return "disabled";
                return "ready";
            }})()
            "#,
            selector = js_string(locator)?
        );
        let raw: String = self.eval_as(js_code).await?;
        Ok(Probe::parse(&raw))
    }

    /// 轮询直到条件满足
    async fn poll_until<F>(&self, locator: &str, timeout: Duration, accept: F) -> Result<(), DriverError>
    where
        F: Fn(Probe) -> bool + Send + Sync,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let probe = self.probe(locator).await?;
            if accept(probe) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                debug!("等待 {} 超时，最后状态: {:?}", locator, probe);
                return Err(DriverError::Timeout {
                    locator: locator.to_string(),
                    waited: timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// 执行一段针对单个元素的 JS，返回 "ok" 或 "missing"
    async fn act(&self, locator: &str, body: &str) -> Result<(), DriverError> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({selector});
                if (!el) return "missing";
                {body}
                return "ok";
            }})()
            "#,
            selector = js_string(locator)?,
            body = body
        );
        let raw: String = self.eval_as(js_code).await?;
        if raw == "ok" {
            Ok(())
        } else {
            Err(DriverError::ElementNotFound(locator.to_string()))
        }
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn wait_visible(&self, locator: &str, timeout: Duration) -> Result<(), DriverError> {
        self.poll_until(locator, timeout, |p| matches!(p, Probe::Ready | Probe::Disabled))
            .await
    }

    async fn wait_clickable(&self, locator: &str, timeout: Duration) -> Result<(), DriverError> {
        self.poll_until(locator, timeout, |p| p == Probe::Ready).await
    }

    async fn wait_present(&self, locator: &str, timeout: Duration) -> Result<(), DriverError> {
        self.poll_until(locator, timeout, |p| p != Probe::Missing).await
    }

    async fn is_present(&self, locator: &str) -> Result<bool, DriverError> {
        Ok(self.probe(locator).await? != Probe::Missing)
    }

    async fn fill(&self, locator: &str, text: &str) -> Result<(), DriverError> {
        let body = format!(
            r#"
                el.focus();
                el.value = "";
                el.value = {text};
                el.dispatchEvent(new Event("input", {{ bubbles: true }}));
                el.dispatchEvent(new Event("change", {{ bubbles: true }}));
            "#,
            text = js_string(text)?
        );
        self.act(locator, &body).await
    }

    async fn click(&self, locator: &str) -> Result<(), DriverError> {
        self.act(locator, "el.click();").await
    }

    async fn text_of(&self, locator: &str) -> Result<String, DriverError> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({selector});
                return el ? el.innerText : null;
            }})()
            "#,
            selector = js_string(locator)?
        );
        let text: Option<String> = self.eval_as(js_code).await?;
        text.ok_or_else(|| DriverError::ElementNotFound(locator.to_string()))
    }

    async fn reload(&self) -> Result<(), DriverError> {
        self.page.reload().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if let Err(e) = self.page.clone().close().await {
            warn!("关闭页面失败: {}", e);
        }
        if self.launched {
            self.browser.close().await?;
            self.browser.wait().await.map_err(DriverError::fault)?;
        }
        Ok(())
    }
}

/// 把任意字符串安全地嵌进 JS 源码
fn js_string(raw: &str) -> Result<String, DriverError> {
    serde_json::to_string(raw).map_err(DriverError::fault)
}

/// 按配置连接或启动浏览器，并打开核验表单
pub struct ChromeDriverFactory {
    config: Config,
}

impl ChromeDriverFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl DriverFactory for ChromeDriverFactory {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        let driver = if self.config.headless {
            let (browser, page) = browser::launch_headless_browser(
                &self.config.target_url,
                self.config.chrome_executable.as_deref(),
            )
            .await
            .map_err(DriverError::fault)?;
            ChromePage::new(page, browser, true)
        } else {
            let (browser, page) = browser::connect_to_browser_and_page(
                self.config.browser_debug_port,
                &self.config.target_url,
            )
            .await
            .map_err(DriverError::fault)?;
            ChromePage::new(page, browser, false)
        };
        Ok(Box::new(driver))
    }
}
