//! Embedded template text for every generated artifact.
//!
//! Templates are compiled into the binary with `include_str!` and rendered
//! with minijinja. Rendering is strict: a variable missing from the context
//! is an error rather than an empty string.

use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value};

use crate::error::Result;

/// Standalone zope.conf with a local FileStorage main database.
pub const ZOPE_CONF: &str = "zope.conf";
/// zope.conf for ZEO client mode.
pub const ZEO_CONF: &str = "zeo.conf";
/// One `<zodb_db>` block per additional ZEO database.
pub const ZEO_DB: &str = "zeo_db.conf";
/// daemontools `run` script at the instance root.
pub const RUN_SCRIPT: &str = "run.sh";
/// daemontools `log/run` script.
pub const LOG_RUN_SCRIPT: &str = "log_run.sh";
/// `bin/repozo` backup helper.
pub const REPOZO_SCRIPT: &str = "repozo.sh";
/// Control script placed in the bin directory.
pub const CTL_SCRIPT: &str = "ctl.sh";

static SOURCES: [(&str, &str); 7] = [
    (ZOPE_CONF, include_str!("templates/zope.conf.j2")),
    (ZEO_CONF, include_str!("templates/zeo.conf.j2")),
    (ZEO_DB, include_str!("templates/zeo_db.conf.j2")),
    (RUN_SCRIPT, include_str!("templates/run.sh.j2")),
    (LOG_RUN_SCRIPT, include_str!("templates/log_run.sh.j2")),
    (REPOZO_SCRIPT, include_str!("templates/repozo.sh.j2")),
    (CTL_SCRIPT, include_str!("templates/ctl.sh.j2")),
];

/// Build the template environment with every embedded template registered.
pub fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::None);

    for (name, source) in SOURCES {
        env.add_template(name, source)?;
    }
    Ok(env)
}

/// Render one embedded template against `ctx`.
pub fn render(name: &str, ctx: Value) -> Result<String> {
    let env = environment()?;
    let template = env.get_template(name)?;
    Ok(template.render(ctx)?)
}
