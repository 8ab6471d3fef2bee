use std::ffi::OsString;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Parses positional arguments, or returns the usage line of `T`.
pub fn try_parse_from<T, I, S>(args: I) -> Result<T, String>
where
    T: Parser,
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    T::try_parse_from(args).map_err(|_| T::command().render_usage().to_string())
}

/// Parses the process arguments. Prints the usage on stdout and exits with status 1 on mismatch.
pub fn parse_args<T: Parser>() -> T {
    match try_parse_from(std::env::args_os()) {
        Ok(args) => args,
        Err(usage) => {
            println!("{usage}");
            std::process::exit(1);
        }
    }
}

/// Logs go to stdout, `info` unless `RUST_LOG` says otherwise.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
