use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub fn build_reduced_logger_text<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    if cfg!(debug_assertions) {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_line_number(false)
                .with_thread_names(false)
                .with_timer(tracing_subscriber::fmt::time::SystemTime)
                .with_target(true)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NONE)
                .event_format(tracing_subscriber::fmt::format().compact()),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_timer(tracing_subscriber::fmt::time::SystemTime)
                .with_target(true),
        )
    }
}

/// `RUST_LOG` wins; `debug` lowers the default from `warn` to `debug`.
pub fn build_loglevel_filter_layer(debug: bool) -> EnvFilter {
    let default_level = if debug { "debug" } else { "warn" };
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default_level),
    }
}

pub fn init_tracing(debug: bool) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(build_loglevel_filter_layer(debug))
        .with(build_reduced_logger_text())
        .try_init()?;
    Ok(())
}
