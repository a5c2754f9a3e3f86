//! 核验会话 - 流程层
//!
//! 核心职责：把一个证件号完整地走一遍表单
//!
//! 状态流转：
//! ```text
//! FormReady → Filled → Submitted → AwaitingResponse → ResponseReceived → Resetting → FormReady
//!     任何一步失败 → Stuck（下一次 run 前先恢复）
//! ```
//!
//! `run` 返回时页面绝不会停在 Submitted / AwaitingResponse：
//! 等待响应超时会强制整页刷新后再返回。

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{Config, FormSelectors};
use crate::infrastructure::{DriverError, PageDriver};
use crate::models::{Outcome, SessionState, TransientReason};
use crate::services::{Classification, ExtractedResponse, ResponseClassifier};
use crate::workflow::verify_ctx::VerifyCtx;

const PANEL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 表单交互参数
#[derive(Debug, Clone)]
pub struct FormSettings {
    pub url: String,
    pub selectors: FormSelectors,
    /// 填写 / 提交 / 重置时等待元素的上限
    pub element_timeout: Duration,
    /// 提交后等待响应标记的上限
    pub response_timeout: Duration,
    /// 响应标记出现后等待结果面板渲染的上限
    pub panel_timeout: Duration,
}

impl FormSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.target_url.clone(),
            selectors: config.selectors.clone(),
            element_timeout: config.element_timeout(),
            response_timeout: config.response_timeout(),
            panel_timeout: config.panel_timeout(),
        }
    }
}

/// 核验会话
///
/// - 独占一个页面驱动
/// - 每次只处理一个证件号
/// - 失败以 `Outcome` 变体返回，不抛错
pub struct VerifySession {
    driver: Box<dyn PageDriver>,
    settings: FormSettings,
    classifier: ResponseClassifier,
    state: SessionState,
}

impl VerifySession {
    /// 打开表单页并等待输入框可见
    ///
    /// 失败时会先关闭驱动再返回错误。
    pub async fn open(
        mut driver: Box<dyn PageDriver>,
        settings: FormSettings,
        classifier: ResponseClassifier,
    ) -> Result<Self, DriverError> {
        info!("正在打开核验表单: {}", settings.url);

        let ready = async {
            driver.navigate(&settings.url).await?;
            driver
                .wait_visible(&settings.selectors.input, settings.element_timeout)
                .await
        }
        .await;

        if let Err(e) = ready {
            error!("表单页面未就绪: {}", e);
            if let Err(close_err) = driver.close().await {
                warn!("关闭页面驱动失败: {}", close_err);
            }
            return Err(e);
        }

        info!("✓ 表单页面已就绪");
        Ok(Self {
            driver,
            settings,
            classifier,
            state: SessionState::FormReady,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 处理一个证件号
    pub async fn run(&mut self, ctx: &VerifyCtx) -> Outcome {
        if self.state != SessionState::FormReady {
            warn!("{} 上一次结束于 {:?}，先恢复表单", ctx, self.state);
            if let Err(e) = self.reload_form().await {
                error!("{} 表单恢复失败: {}", ctx, e);
                return self.step_failure(e);
            }
        }

        // ========== 填写 ==========
        let selectors = self.settings.selectors.clone();
        debug!("{} 等待输入框", ctx);
        if let Err(e) = self.fill(&selectors.input, ctx).await {
            error!("{} 填写失败: {}", ctx, e);
            return self.step_failure(e);
        }
        self.state = SessionState::Filled;

        // ========== 提交 ==========
        if let Err(e) = self.submit(&selectors.submit).await {
            error!("{} 提交失败: {}", ctx, e);
            return self.step_failure(e);
        }
        self.state = SessionState::Submitted;
        debug!("{} 已点击提交按钮", ctx);

        // ========== 等待响应 ==========
        self.state = SessionState::AwaitingResponse;
        match self
            .driver
            .wait_present(&selectors.result_marker, self.settings.response_timeout)
            .await
        {
            Ok(()) => {}
            Err(DriverError::Fault(msg)) => {
                error!("{} 等待响应时驱动出错: {}", ctx, msg);
                self.state = SessionState::Stuck;
                return Outcome::fatal(msg);
            }
            Err(e) => {
                error!("{} 等待响应超时: {}", ctx, e);
                return self.recover_after_timeout(ctx).await;
            }
        }
        self.state = SessionState::ResponseReceived;
        debug!("{} 响应区域已出现", ctx);

        // ========== 分类 ==========
        let response = match self.extract_response().await {
            Ok(response) => response,
            Err(e) => {
                error!("{} 读取响应失败: {}", ctx, e);
                return self.step_failure(e);
            }
        };

        let outcome = match self.classifier.classify(&ctx.identifier, &response) {
            Classification::Resolved(resolution) => {
                info!("{} 核验结果: {} ({})", ctx, resolution.category, resolution.detail);
                Outcome::Resolved {
                    category: resolution.category,
                    detail: resolution.detail,
                }
            }
            Classification::NoResultRegion => {
                warn!("{} ⚠️ 响应中没有可识别的结果面板", ctx);
                Outcome::transient(TransientReason::ResponseNotFound)
            }
        };

        // ========== 重置 ==========
        self.reset(ctx).await;
        outcome
    }

    /// 释放页面驱动
    pub async fn close(mut self) -> Result<(), DriverError> {
        info!("正在关闭核验会话");
        self.driver.close().await
    }

    async fn fill(&self, input: &str, ctx: &VerifyCtx) -> Result<(), DriverError> {
        self.driver
            .wait_visible(input, self.settings.element_timeout)
            .await?;
        self.driver.fill(input, ctx.identifier.as_str()).await
    }

    async fn submit(&self, submit: &str) -> Result<(), DriverError> {
        self.driver
            .wait_clickable(submit, self.settings.element_timeout)
            .await?;
        self.driver.click(submit).await
    }

    /// 读取两个结果面板，等到其中之一出现或超出面板等待上限
    async fn extract_response(&self) -> Result<ExtractedResponse, DriverError> {
        let selectors = &self.settings.selectors;
        let deadline = Instant::now() + self.settings.panel_timeout;

        loop {
            if self.driver.is_present(&selectors.negative_panel).await? {
                let text = self.read_text(&selectors.negative_panel).await?;
                return Ok(ExtractedResponse {
                    negative: Some(text),
                    positive: None,
                });
            }
            if self.driver.is_present(&selectors.positive_panel).await? {
                let text = self.read_text(&selectors.positive_panel).await?;
                return Ok(ExtractedResponse {
                    negative: None,
                    positive: Some(text),
                });
            }
            if Instant::now() >= deadline {
                return Ok(ExtractedResponse::default());
            }
            sleep(PANEL_POLL_INTERVAL).await;
        }
    }

    /// 面板在检查和读取之间消失时按空文本处理
    async fn read_text(&self, locator: &str) -> Result<String, DriverError> {
        match self.driver.text_of(locator).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) if e.is_fault() => Err(e),
            Err(_) => Ok(String::new()),
        }
    }

    /// 点击 "Do another search" 回到表单；失败则整页刷新
    async fn reset(&mut self, ctx: &VerifyCtx) {
        self.state = SessionState::Resetting;
        let selectors = self.settings.selectors.clone();
        let timeout = self.settings.element_timeout;

        let result = async {
            self.driver.wait_clickable(&selectors.reset, timeout).await?;
            self.driver.click(&selectors.reset).await?;
            self.driver.wait_visible(&selectors.input, timeout).await
        }
        .await;

        match result {
            Ok(()) => {
                self.state = SessionState::FormReady;
                debug!("{} 表单已重置", ctx);
            }
            Err(DriverError::Fault(msg)) => {
                // 结论已经拿到，驱动问题留给下一次 run 暴露
                error!("{} 重置时驱动出错: {}", ctx, msg);
                self.state = SessionState::Stuck;
            }
            Err(e) => {
                warn!("{} 重置按钮不可用 ({})，改为整页刷新", ctx, e);
                if let Err(e) = self.reload_form().await {
                    warn!("{} 刷新后表单仍未就绪: {}", ctx, e);
                }
            }
        }
    }

    /// 等待响应超时：页面停在提交中途，必须整页刷新后才能返回
    async fn recover_after_timeout(&mut self, ctx: &VerifyCtx) -> Outcome {
        warn!("{} 正在刷新页面...", ctx);
        match self.reload_form().await {
            Ok(()) => Outcome::transient(TransientReason::Timeout),
            Err(DriverError::Fault(msg)) => Outcome::fatal(msg),
            Err(e) => {
                warn!("{} 刷新后表单仍未就绪: {}", ctx, e);
                Outcome::transient(TransientReason::Timeout)
            }
        }
    }

    /// 整页刷新并等待输入框；刷新不够时重新导航到表单地址
    ///
    /// 成功后状态为 FormReady，失败则为 Stuck。
    async fn reload_form(&mut self) -> Result<(), DriverError> {
        let input = self.settings.selectors.input.clone();
        let timeout = self.settings.element_timeout;

        let reloaded = async {
            self.driver.reload().await?;
            self.driver.wait_visible(&input, timeout).await
        }
        .await;

        let result = match reloaded {
            Ok(()) => Ok(()),
            Err(e) if e.is_fault() => Err(e),
            Err(e) => {
                debug!("刷新后输入框未出现 ({})，重新导航", e);
                async {
                    self.driver.navigate(&self.settings.url).await?;
                    self.driver.wait_visible(&input, timeout).await
                }
                .await
            }
        };

        self.state = if result.is_ok() {
            SessionState::FormReady
        } else {
            SessionState::Stuck
        };
        result
    }

    /// 填写 / 提交 / 恢复阶段的失败：驱动故障为 Fatal，其余为 ElementNotFound
    fn step_failure(&mut self, err: DriverError) -> Outcome {
        self.state = SessionState::Stuck;
        match err {
            DriverError::Fault(msg) => Outcome::fatal(msg),
            DriverError::Timeout { .. } | DriverError::ElementNotFound(_) => {
                Outcome::transient(TransientReason::ElementNotFound)
            }
        }
    }
}
