use std::{process, sync::Arc};

use site_revalidator::{
    application::{
        error::AppError,
        trigger::{RevalidationService, TriggerRequest},
    },
    config,
    infra::{http::ReqwestTransport, telemetry},
    revalidation::{CancelSignal, DispatchSummary},
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let transport = ReqwestTransport::from_settings(&settings.http)?;
    let service = RevalidationService::from_settings(&settings, Arc::new(transport));
    let request = TriggerRequest::from(cli_args.command.trigger());

    match cli_args.command {
        config::Command::Plan(_) => run_plan(&service, &request).await,
        config::Command::Dispatch(_) => run_dispatch(&service, &request).await,
    }
}

async fn run_plan(service: &RevalidationService, request: &TriggerRequest) -> Result<(), AppError> {
    let payload = service.payload(request).await?;
    for path in service.plan(&payload) {
        println!("{path}");
    }
    Ok(())
}

async fn run_dispatch(
    service: &RevalidationService,
    request: &TriggerRequest,
) -> Result<(), AppError> {
    let payload = service.payload(request).await?;

    let (handle, signal) = CancelSignal::pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling revalidation");
            handle.cancel();
        }
    });

    let summary = service.dispatch(&payload, signal).await;
    print_summary(&summary);

    if !summary.revalidated() {
        info!(
            record = %request.record_id,
            "No site confirmed revalidation"
        );
    }
    Ok(())
}

fn print_summary(summary: &DispatchSummary) {
    println!("paths:       {}", summary.paths);
    println!("attempted:   {}", summary.attempted);
    println!("succeeded:   {}", summary.succeeded);
    println!("failed:      {}", summary.failed);
    println!("skipped:     {}", summary.skipped);
    if summary.cancelled {
        println!("cancelled:   true");
    }
    println!("revalidated: {}", summary.revalidated());
}
