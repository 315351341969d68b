//! # Logging モジュール
//!
//! 決闘エージェントのログ出力を初期化します。
//!
//! コンソールには人が読むコンパクト形式、ファイルにはJSON形式で出力します。
//! ファイル出力はtracing-appenderの非同期ライターを使うため、
//! 戻り値の`WorkerGuard`を`main`の終了まで保持してください。
//!
//! ## 出力先
//!
//! - `Console`: コンソールのみ
//! - `File`: ファイルのみ（logs/archerbot.YYYY-MM-DD）
//! - `Both`: コンソールとファイルの両方
//!
//! 環境変数`RUST_LOG`が設定されている場合はそちらを優先します。

use std::str::FromStr;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// ログ出力先
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    Console,
    File,
    Both,
}

impl LogOutput {
    fn to_console(self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn to_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            _ => Err(format!("無効な出力先: {}. 利用可能: console, file, both", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub output: LogOutput,
    /// ログファイルのディレクトリ（File / Bothの場合）
    pub log_dir: String,
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            output: LogOutput::Console,
            log_dir: "logs".to_string(),
            file_prefix: "archerbot".to_string(),
        }
    }
}

/// ログシステムを初期化
///
/// ファイル出力を含む場合は非同期ライターのガードを返します。
/// ガードを破棄すると未書き込みのログがフラッシュされて出力が止まります。
///
/// ```ignore
/// let config = LogConfig { level: Level::DEBUG, ..LogConfig::default() };
/// let _guard = init_logging(&config)?;
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_string()))?;

    let console_layer = config.output.to_console().then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
    });

    let (file_layer, guard) = if config.output.to_file() {
        ensure_log_directory(&config.log_dir)?;
        let appender = rolling::daily(&config.log_dir, &config.file_prefix);
        let (writer, guard) = non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .json();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// ログレベルを文字列から解析（無効な場合はINFO）
pub fn parse_log_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("警告: 無効なログレベル '{}'. INFOを使用します", level_str);
            Level::INFO
        }
    }
}

/// `-v`の回数からログレベルを決める
pub fn level_for_verbosity(verbose_level: u8) -> Level {
    match verbose_level {
        0 => Level::INFO,
        1 | 2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn ensure_log_directory(log_dir: &str) -> Result<(), std::io::Error> {
    std::fs::create_dir_all(log_dir)
}
