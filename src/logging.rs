use std::io::Write;

use log::LevelFilter;

/// Initialize the global logger.
///
/// Lines are written as `<local time> - <LEVEL> - <message>`. The default
/// level is info; `RUST_LOG` is applied on top of the configured level.
/// Calling this more than once keeps the first logger.
pub fn init(level: Option<&str>) {
    let level = level
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    let result = env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .parse_default_env()
        .try_init();

    if result.is_err() {
        log::debug!("Logger already initialized");
    }
}
