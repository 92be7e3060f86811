use std::sync::OnceLock;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "marduk_context=trace,wgpu=warn"). Without it, `RUST_LOG` is read, then
/// `default_level` applies.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: log::LevelFilter,
    pub write_style: env_logger::WriteStyle,
    /// Print the emitting module path; useful when tracing state calls.
    pub module_path: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: log::LevelFilter::Info,
            write_style: env_logger::WriteStyle::Auto,
            module_path: false,
        }
    }
}

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Initializes the global logger once.
///
/// Idempotent. Returns `false` if another logger was already installed by
/// someone else (a test harness, an embedding application); later calls
/// report the outcome of the first one.
pub fn init_logging(config: LoggingConfig) -> bool {
    *INSTALLED.get_or_init(|| {
        let mut builder = env_logger::Builder::new();

        match config.env_filter {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => match std::env::var("RUST_LOG") {
                Ok(filter) => {
                    builder.parse_filters(&filter);
                }
                Err(_) => {
                    builder.filter_level(config.default_level);
                }
            },
        }

        builder
            .write_style(config.write_style)
            .format_module_path(config.module_path);

        let installed = builder.try_init().is_ok();
        if installed {
            log::debug!("logging initialized");
        }
        installed
    })
}
