use anyhow::Context;
use clap::ValueEnum;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "kebab_case")]
pub enum DiagnosticFormat {
    Pretty,
    Full,
    Compact,
    Json,
}

/// Diagnostic logging goes to stderr so that it doesn't interleave
/// with the progress lines written to stdout.
pub struct LoggingConfig<'a> {
    pub filter_env_var: &'a str,
    pub default_filter: &'a str,
    pub diag_format: DiagnosticFormat,
}

impl<'a> LoggingConfig<'a> {
    pub fn init(&self) -> anyhow::Result<()> {
        let layer = fmt::layer().with_writer(std::io::stderr);
        let layer = match self.diag_format {
            DiagnosticFormat::Pretty => layer.pretty().boxed(),
            DiagnosticFormat::Full => layer.boxed(),
            DiagnosticFormat::Compact => layer.compact().boxed(),
            DiagnosticFormat::Json => layer.json().boxed(),
        };

        let filter = std::env::var(self.filter_env_var);
        let filter = filter.as_deref().unwrap_or(self.default_filter);
        let env_filter = EnvFilter::try_new(filter)
            .with_context(|| format!("parsing log filter '{filter}'"))?;

        tracing_subscriber::registry()
            .with(layer.with_filter(env_filter))
            .try_init()
            .context("installing diagnostic logger")?;
        Ok(())
    }
}
