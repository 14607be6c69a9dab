//! Logging setup: Monarch's own modules only ever call into the [`log`]
//! facade; this module is the one place a hosting binary needs to wire a
//! backend in.

use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Installs an `env_logger`-style formatter reading `RUST_LOG` (or
/// `MONARCH_LOG` if set), defaulting to `info`. Safe to call more than
/// once; only the first call takes effect.
pub fn log_init() {
    INIT.call_once(|| {
        let env = env_logger::Env::new()
            .filter_or("MONARCH_LOG", "info")
            .write_style_or("MONARCH_LOG_STYLE", "auto");
        env_logger::Builder::from_env(env)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{} {} {}] {}",
                    buf.timestamp_millis(),
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}
