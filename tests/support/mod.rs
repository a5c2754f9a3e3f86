//! 测试用的脚本化页面与内存实现
//!
//! `FakeSite` 模拟核验表单：每个证件号提交时按脚本依次给出一种响应，
//! 脚本用完后默认返回否定面板。

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ps_verify::config::FormSelectors;
use ps_verify::infrastructure::{DriverError, DriverFactory, PageDriver};
use ps_verify::models::loaders::IdentifierSource;
use ps_verify::models::{CheckpointRecord, Identifier, Resolution};
use ps_verify::services::{CheckpointTracker, PersistenceSink, ResponseClassifier};
use ps_verify::workflow::FormSettings;

pub const FORM_URL: &str = "https://example.test/psverification/";
pub const NO_MATCH: &str = "Not a Public Servant";

pub fn id(raw: &str) -> Identifier {
    Identifier::new(raw).unwrap()
}

pub fn ids(raws: &[&str]) -> Vec<Identifier> {
    raws.iter().map(|raw| id(raw)).collect()
}

pub fn form_settings() -> FormSettings {
    FormSettings {
        url: FORM_URL.to_string(),
        selectors: FormSelectors::default(),
        element_timeout: Duration::from_millis(50),
        response_timeout: Duration::from_millis(50),
        panel_timeout: Duration::ZERO,
    }
}

pub fn classifier() -> ResponseClassifier {
    ResponseClassifier::new(NO_MATCH).unwrap()
}

/// 提交某个证件号后页面的反应
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Negative,
    Positive(String),
    /// 响应区域出现了，但没有任何结果面板
    NoPanel,
    /// 响应一直不来
    Timeout,
    /// 点击提交时浏览器崩溃
    Crash,
}

/// 各页面共享的站点脚本与计数
#[derive(Default)]
pub struct FakeSite {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    /// 为 true 时输入框永远不出现
    pub form_missing: AtomicBool,
    /// 为 true 时结果页上没有 "Do another search" 按钮
    pub reset_missing: AtomicBool,
    /// 为 true 时点击重置按钮会让浏览器崩溃
    pub crash_on_reset: AtomicBool,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub reloads: AtomicUsize,
    pub submissions: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, identifier: &str, replies: Vec<Reply>) {
        self.replies
            .lock()
            .unwrap()
            .insert(identifier.to_string(), replies.into());
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submissions.lock().unwrap().clone()
    }

    fn next_reply(&self, identifier: &str) -> Reply {
        self.replies
            .lock()
            .unwrap()
            .get_mut(identifier)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Reply::Negative)
    }
}

#[derive(Default)]
struct PageState {
    form_visible: bool,
    filled: Option<String>,
    /// 已出现的响应（Timeout 时为 None）
    shown: Option<Reply>,
    crashed: bool,
}

/// 脚本化页面驱动
pub struct FakePage {
    site: Arc<FakeSite>,
    selectors: FormSelectors,
    state: Mutex<PageState>,
}

impl FakePage {
    pub fn new(site: Arc<FakeSite>) -> Self {
        site.opened.fetch_add(1, Ordering::SeqCst);
        Self {
            site,
            selectors: FormSelectors::default(),
            state: Mutex::new(PageState::default()),
        }
    }

    fn check_alive(&self) -> Result<(), DriverError> {
        if self.state.lock().unwrap().crashed {
            return Err(DriverError::fault("target crashed"));
        }
        Ok(())
    }

    fn show_form(&self) {
        let mut state = self.state.lock().unwrap();
        state.form_visible = !self.site.form_missing.load(Ordering::SeqCst);
        state.filled = None;
        state.shown = None;
    }

    fn present(&self, locator: &str) -> bool {
        let state = self.state.lock().unwrap();
        let s = &self.selectors;
        if locator == s.input || locator == s.submit {
            state.form_visible && !self.site.form_missing.load(Ordering::SeqCst)
        } else if locator == s.result_marker {
            state.shown.is_some()
        } else if locator == s.reset {
            state.shown.is_some() && !self.site.reset_missing.load(Ordering::SeqCst)
        } else if locator == s.negative_panel {
            state.shown == Some(Reply::Negative)
        } else if locator == s.positive_panel {
            matches!(state.shown, Some(Reply::Positive(_)))
        } else {
            false
        }
    }

    fn wait_for(&self, locator: &str, timeout: Duration) -> Result<(), DriverError> {
        self.check_alive()?;
        if self.present(locator) {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                locator: locator.to_string(),
                waited: timeout,
            })
        }
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&self, _url: &str) -> Result<(), DriverError> {
        self.check_alive()?;
        self.show_form();
        Ok(())
    }

    async fn wait_visible(&self, locator: &str, timeout: Duration) -> Result<(), DriverError> {
        self.wait_for(locator, timeout)
    }

    async fn wait_clickable(&self, locator: &str, timeout: Duration) -> Result<(), DriverError> {
        self.wait_for(locator, timeout)
    }

    async fn wait_present(&self, locator: &str, timeout: Duration) -> Result<(), DriverError> {
        self.wait_for(locator, timeout)
    }

    async fn is_present(&self, locator: &str) -> Result<bool, DriverError> {
        self.check_alive()?;
        Ok(self.present(locator))
    }

    async fn fill(&self, locator: &str, text: &str) -> Result<(), DriverError> {
        self.check_alive()?;
        if !self.present(locator) {
            return Err(DriverError::ElementNotFound(locator.to_string()));
        }
        self.state.lock().unwrap().filled = Some(text.to_string());
        Ok(())
    }

    async fn click(&self, locator: &str) -> Result<(), DriverError> {
        self.check_alive()?;
        if !self.present(locator) {
            return Err(DriverError::ElementNotFound(locator.to_string()));
        }

        if locator == self.selectors.reset {
            if self.site.crash_on_reset.load(Ordering::SeqCst) {
                self.state.lock().unwrap().crashed = true;
                return Err(DriverError::fault("target crashed"));
            }
            self.show_form();
            return Ok(());
        }

        let filled = self.state.lock().unwrap().filled.clone().unwrap_or_default();
        self.site.submissions.lock().unwrap().push(filled.clone());

        let mut state = self.state.lock().unwrap();
        state.form_visible = false;
        match self.site.next_reply(&filled) {
            Reply::Crash => {
                state.crashed = true;
                Err(DriverError::fault("target crashed"))
            }
            Reply::Timeout => {
                state.shown = None;
                Ok(())
            }
            reply => {
                state.shown = Some(reply);
                Ok(())
            }
        }
    }

    async fn text_of(&self, locator: &str) -> Result<String, DriverError> {
        self.check_alive()?;
        let state = self.state.lock().unwrap();
        match &state.shown {
            Some(Reply::Negative) if locator == self.selectors.negative_panel => {
                Ok(format!("  {}  ", NO_MATCH))
            }
            Some(Reply::Positive(text)) if locator == self.selectors.positive_panel => {
                Ok(text.clone())
            }
            _ => Err(DriverError::ElementNotFound(locator.to_string())),
        }
    }

    async fn reload(&self) -> Result<(), DriverError> {
        self.check_alive()?;
        self.site.reloads.fetch_add(1, Ordering::SeqCst);
        self.show_form();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.site.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 每次 open 都在同一个站点上开一个新页面
pub struct FakeFactory {
    pub site: Arc<FakeSite>,
    /// 前 N 次 open 直接失败
    pub failing_opens: AtomicUsize,
}

impl FakeFactory {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self {
            site,
            failing_opens: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DriverFactory for FakeFactory {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        let remaining = self.failing_opens.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_opens.store(remaining - 1, Ordering::SeqCst);
            return Err(DriverError::fault("cannot reach debugging port"));
        }
        Ok(Box::new(FakePage::new(self.site.clone())))
    }
}

/// 固定列表来源
pub struct VecSource(pub Vec<Identifier>);

#[async_trait]
impl IdentifierSource for VecSource {
    async fn load(&self) -> Result<Vec<Identifier>> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        format!("内存列表 ({} 个)", self.0.len())
    }
}

/// 内存结果落地
#[derive(Default)]
pub struct MemorySink {
    pub records: Mutex<Vec<(Identifier, Resolution)>>,
    pub finished: AtomicUsize,
}

impl MemorySink {
    pub fn recorded_ids(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.to_string())
            .collect()
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn record(&self, identifier: &Identifier, resolution: &Resolution, _at: DateTime<Local>) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .push((identifier.clone(), resolution.clone()));
        Ok(())
    }

    async fn finish(&self) -> Result<()> {
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "内存".to_string()
    }
}

/// 内存检查点
#[derive(Default)]
pub struct MemoryTracker {
    pub records: Mutex<Vec<CheckpointRecord>>,
}

impl MemoryTracker {
    pub fn terminal_count(&self) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.is_terminal())
            .count()
    }
}

#[async_trait]
impl CheckpointTracker for MemoryTracker {
    async fn completed(&self) -> Result<HashSet<Identifier>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.is_terminal())
            .map(|r| r.identifier.clone())
            .collect())
    }

    async fn record(&self, record: &CheckpointRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "内存检查点".to_string()
    }
}
