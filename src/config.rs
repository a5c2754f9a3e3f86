use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// 证件号来源 / 结果落地方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// SQLite 数据库：读 updated = 0 的行，结果按主键回写
    Sqlite,
    /// CSV 表格：读取一列证件号，结果追加写入另一个 CSV
    Csv,
}

impl FromStr for InputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Ok(InputKind::Sqlite),
            "csv" => Ok(InputKind::Csv),
            other => Err(format!("未知的输入类型: {}", other)),
        }
    }
}

/// 断点续跑依据
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointStrategy {
    /// 数据库里的 updated 标志
    Store,
    /// 扫描追加写入的检查点日志
    Log,
}

impl FromStr for CheckpointStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "store" => Ok(CheckpointStrategy::Store),
            "log" => Ok(CheckpointStrategy::Log),
            other => Err(format!("未知的检查点策略: {}", other)),
        }
    }
}

/// 表单上各元素的选择器
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FormSelectors {
    pub input: String,
    pub submit: String,
    /// 任一响应面板出现前的公共标记
    pub result_marker: String,
    pub negative_panel: String,
    pub positive_panel: String,
    /// "Do another search" 按钮
    pub reset: String,
}

impl Default for FormSelectors {
    fn default() -> Self {
        Self {
            input: "#idNumber".to_string(),
            submit: "#Inputfield_submit".to_string(),
            result_marker: ".uk-text-center".to_string(),
            negative_panel: ".uk-text-danger.uk-panel.uk-primary".to_string(),
            positive_panel: ".uk-text-success.uk-panel.uk-primary".to_string(),
            reset: "a.uk-button.uk-button-primary.uk-grid-margin".to_string(),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 核验表单地址
    pub target_url: String,
    /// 浏览器调试端口（连接已打开的浏览器）
    pub browser_debug_port: u16,
    /// 为 true 时自行启动无头浏览器，而不是连接调试端口
    pub headless: bool,
    /// 无头模式下的浏览器可执行文件，留空则自动查找
    pub chrome_executable: Option<PathBuf>,
    pub selectors: FormSelectors,
    /// 查询不到时页面显示的固定文案
    pub no_match_message: String,

    // --- 输入 / 输出 ---
    pub input_kind: InputKind,
    pub database_path: PathBuf,
    pub input_csv: PathBuf,
    /// CSV 中证件号所在列名
    pub id_column: String,
    pub output_csv: PathBuf,

    // --- 断点续跑 ---
    /// 未指定时：SQLite 输入用 store，CSV 输入用 log
    pub checkpoint_strategy: Option<CheckpointStrategy>,
    pub checkpoint_log: PathBuf,

    // --- 节奏与超时 ---
    pub response_timeout_secs: u64,
    pub element_timeout_secs: u64,
    /// 响应标记出现后等待结果面板的秒数
    pub panel_timeout_secs: u64,
    pub pacing_millis: u64,
    /// 单个证件号遇到驱动崩溃时最多重建会话次数
    pub max_session_recreations: usize,
    /// 最多处理多少个证件号，None 为不限
    pub limit: Option<usize>,

    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: "https://www.dpsa.gov.za/resource_centre/psverification/".to_string(),
            browser_debug_port: 9222,
            headless: false,
            chrome_executable: None,
            selectors: FormSelectors::default(),
            no_match_message: "Not a Public Servant".to_string(),
            input_kind: InputKind::Sqlite,
            database_path: PathBuf::from("gov_employees.db"),
            input_csv: PathBuf::from("ids.csv"),
            id_column: "ID_Number".to_string(),
            output_csv: PathBuf::from("results.csv"),
            checkpoint_strategy: None,
            checkpoint_log: PathBuf::from("scraping.log"),
            response_timeout_secs: 60,
            element_timeout_secs: 60,
            panel_timeout_secs: 5,
            pacing_millis: 2000,
            max_session_recreations: 1,
            limit: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 读取配置文件（可选），再用环境变量覆盖
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::InvalidFile { message, .. } => ConfigError::InvalidFile {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFile {
            path: String::new(),
            message: e.to_string(),
        })
    }

    /// 只用默认值 + 环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Ok(Self {
            target_url: std::env::var("TARGET_URL").unwrap_or(self.target_url),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT", "u16")?.unwrap_or(self.browser_debug_port),
            headless: env_parse("HEADLESS", "bool")?.unwrap_or(self.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().map(PathBuf::from).or(self.chrome_executable),
            input_kind: env_parse("INPUT_KIND", "sqlite|csv")?.unwrap_or(self.input_kind),
            database_path: std::env::var("DATABASE_PATH").map(PathBuf::from).unwrap_or(self.database_path),
            input_csv: std::env::var("INPUT_CSV").map(PathBuf::from).unwrap_or(self.input_csv),
            output_csv: std::env::var("OUTPUT_CSV").map(PathBuf::from).unwrap_or(self.output_csv),
            checkpoint_strategy: env_parse("CHECKPOINT_STRATEGY", "store|log")?.or(self.checkpoint_strategy),
            checkpoint_log: std::env::var("CHECKPOINT_LOG").map(PathBuf::from).unwrap_or(self.checkpoint_log),
            response_timeout_secs: env_parse("RESPONSE_TIMEOUT_SECS", "u64")?.unwrap_or(self.response_timeout_secs),
            element_timeout_secs: env_parse("ELEMENT_TIMEOUT_SECS", "u64")?.unwrap_or(self.element_timeout_secs),
            panel_timeout_secs: env_parse("PANEL_TIMEOUT_SECS", "u64")?.unwrap_or(self.panel_timeout_secs),
            pacing_millis: env_parse("PACING_MILLIS", "u64")?.unwrap_or(self.pacing_millis),
            max_session_recreations: env_parse("MAX_SESSION_RECREATIONS", "usize")?.unwrap_or(self.max_session_recreations),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool")?.unwrap_or(self.verbose_logging),
            ..self
        })
    }

    /// 检查配置项组合
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_kind == InputKind::Csv && self.checkpoint_strategy() == CheckpointStrategy::Store {
            return Err(ConfigError::Invalid(
                "CSV 输入没有数据库标志位，检查点策略必须为 log".to_string(),
            ));
        }
        if self.response_timeout_secs == 0 || self.element_timeout_secs == 0 {
            return Err(ConfigError::Invalid("等待超时必须大于 0 秒".to_string()));
        }
        if self.target_url.trim().is_empty() {
            return Err(ConfigError::Invalid("目标URL不能为空".to_string()));
        }
        Ok(())
    }

    /// 实际使用的检查点策略
    pub fn checkpoint_strategy(&self) -> CheckpointStrategy {
        match (self.checkpoint_strategy, self.input_kind) {
            (Some(strategy), _) => strategy,
            (None, InputKind::Sqlite) => CheckpointStrategy::Store,
            (None, InputKind::Csv) => CheckpointStrategy::Log,
        }
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn panel_timeout(&self) -> Duration {
        Duration::from_secs(self.panel_timeout_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_millis)
    }
}

/// 读取并解析环境变量，不存在时返回 None
fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
