use crate::error::Error;

/// Installs a `fern` dispatcher writing `[level][target] message` lines to
/// stderr. Each `-v` raises the level: warn, info, debug, then trace.
pub fn init(verbosity: u8) -> Result<(), Error> {
    let level = match verbosity {
    | 0 => log::LevelFilter::Warn,
    | 1 => log::LevelFilter::Info,
    | 2 => log::LevelFilter::Debug,
    | _ => log::LevelFilter::Trace,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.level(),
                record.target(),
                message,
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
