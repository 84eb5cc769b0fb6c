use std::io::{self, Write};
use std::process;

use socialcache::{
    application::{
        error::AppError,
        soak::{self, SoakPlan},
    },
    cache::{self, CacheConfig},
    config,
    infra::{error::InfraError, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let messages = error.messages();

    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?messages, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?messages, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        InfraError::configuration(format!("failed to load configuration: {err}"))
    })?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Soak(config::SoakArgs::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Soak(args) => run_soak(&settings, args),
        config::Command::PrintConfig(_) => run_print_config(&settings),
    }
}

fn run_soak(settings: &config::Settings, args: config::SoakArgs) -> Result<(), AppError> {
    if args.threads == 0 || args.rounds == 0 {
        return Err(AppError::validation(
            "soak requires at least one thread and one round",
        ));
    }
    if !(1..=soak::MAX_POST_SPAN).contains(&args.post_span) {
        return Err(AppError::validation(format!(
            "--post-span must be between 1 and {}",
            soak::MAX_POST_SPAN
        )));
    }

    let handle = cache::build(&CacheConfig::from(&settings.cache));
    let plan = SoakPlan {
        threads: args.threads.clamp(1, 256),
        rounds: args.rounds,
        post_span: args.post_span,
    };

    let report = soak::run(handle.service.as_ref(), plan);
    if report.stray_reads > 0 {
        return Err(AppError::unexpected(format!(
            "{} reads returned comments filed under the wrong post",
            report.stray_reads
        )));
    }

    if let Some(store) = handle.store {
        store.verify_coherence()?;
        let stats = store.stats();
        info!(
            posts = stats.posts,
            comments = stats.comments,
            comment_groups = stats.comment_groups,
            sessions = stats.sessions,
            "cache indexes coherent"
        );
    }

    Ok(())
}

fn run_print_config(settings: &config::Settings) -> Result<(), AppError> {
    let rendered = settings
        .to_json()
        .map_err(|err| AppError::unexpected(format!("failed to render settings: {err}")))?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").map_err(InfraError::from)?;
    Ok(())
}
