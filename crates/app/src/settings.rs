use candela_core::config::{AppConfig, LogConfig};
use config::{Config, ConfigError, Environment, File};
use std::collections::HashMap;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// 默认配置文件，不存在时全部使用默认值
pub const CONFIG_FILE: &str = "candela.toml";
/// 环境变量前缀，例如 `CANDELA__RENDER__BASE_URL`
pub const ENV_PREFIX: &str = "CANDELA";

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 读取可选的 TOML 文件。
/// 2. 叠加 `CANDELA__SECTION__KEY` 形式的环境变量，优先级高于文件。
/// 3. 未出现的字段使用 `AppConfig` 默认值。
///
/// # Arguments
/// * `path`: 配置文件路径。
/// * `env`: 指定时代替进程环境变量，供测试使用。
pub fn load_config(
    path: &Path,
    env: Option<HashMap<String, String>>,
) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()?
        .try_deserialize()
}

/// # Summary
/// 初始化全局日志。
///
/// # Logic
/// 1. `RUST_LOG` 存在时以其为准，否则使用配置中的级别。
/// 2. 始终输出到标准错误。
/// 3. 配置了目录时额外按天滚动写入 `candela.log`。
///
/// # Returns
/// 文件写入器的 guard，需持有到进程结束以保证日志落盘。
pub fn init_logging(config: &LogConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "candela.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}
