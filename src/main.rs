use chrono::Utc;
use clap::Parser;
use std::collections::HashSet;
use subscription_relay::config::Command;
use subscription_relay::core::events::KNOWN_EVENTS;
use subscription_relay::core::renewal::RenewalRequest;
use subscription_relay::core::usage::usage_metrics;
use subscription_relay::domain::model::ConnectionState;
use subscription_relay::domain::ports::SubscriptionSource;
use subscription_relay::utils::error::ErrorSeverity;
use subscription_relay::utils::format::{format_date, format_inr};
use subscription_relay::utils::{logger, validation::Validate};
use subscription_relay::{
    calculate_estimate, determine_plan_for_counts, CliConfig, HttpSubscriptionSource,
    NotificationRelay, RefreshCoordinator, RelayConfig, RelayError, SubscriptionSnapshot,
    WebSocketTransport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let outcome = match cli.command.clone() {
        Command::Estimate {
            plan,
            cycle,
            students,
            teachers,
        } => {
            logger::init_cli_logger(cli.verbose);
            run_estimate(&plan, &cycle, &students, &teachers)
        }
        Command::Status { config } => match load_config(&config) {
            Ok(relay_config) => {
                logger::init_cli_logger(cli.verbose || relay_config.verbose());
                run_status(&relay_config).await
            }
            Err(e) => Err(e),
        },
        Command::Watch { config, json_logs } => match load_config(&config) {
            Ok(relay_config) => {
                let verbose = cli.verbose || relay_config.verbose();
                if json_logs.unwrap_or_else(|| relay_config.json_logs()) {
                    logger::init_json_logger(verbose);
                } else {
                    logger::init_cli_logger(verbose);
                }
                run_watch(&relay_config).await
            }
            Err(e) => Err(e),
        },
    };

    if let Err(e) = outcome {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn load_config(path: &str) -> Result<RelayConfig, RelayError> {
    let config = RelayConfig::from_file(path)?;
    config.validate()?;
    Ok(config)
}

fn run_estimate(
    plan: &str,
    cycle: &str,
    students: &str,
    teachers: &str,
) -> Result<(), RelayError> {
    let request = RenewalRequest::from_form(students, teachers)?;
    let by_headcount = determine_plan_for_counts(request.students, request.teachers);
    let estimate = calculate_estimate(plan, cycle, request.students, request.teachers);

    println!(
        "Headcount {} students / {} teachers fits: {} ({})",
        request.students,
        request.teachers,
        by_headcount.display_label(),
        by_headcount
    );
    println!("Estimated amount for '{}': {}", plan, format_inr(estimate.amount));
    if estimate.has_overage() {
        println!(
            "Includes {} extra students and {} extra teachers",
            estimate.extra_students, estimate.extra_teachers
        );
    }
    Ok(())
}

async fn run_status(config: &RelayConfig) -> Result<(), RelayError> {
    let credentials = config.credentials()?;
    let source = HttpSubscriptionSource::new(
        &config.server.base_url,
        &credentials.token,
        config.request_timeout(),
    )?;

    tracing::info!("📡 Fetching subscription from {}", source.url());
    let snapshot = source.fetch().await?;
    print_summary(&snapshot);

    if let Some(record) = &snapshot.subscription {
        if !record.invoices.is_empty() {
            println!("Invoices:");
            for invoice in &record.invoices {
                println!(
                    "  {}  {:>12}  {:?}  {}",
                    invoice.invoice_id,
                    format_inr(invoice.amount),
                    invoice.status,
                    format_date(invoice.paid_at)
                );
            }
        }
    }
    Ok(())
}

async fn run_watch(config: &RelayConfig) -> Result<(), RelayError> {
    let credentials = config.credentials()?;
    let source = HttpSubscriptionSource::new(
        &config.server.base_url,
        &credentials.token,
        config.request_timeout(),
    )?;

    let relay = NotificationRelay::new(
        WebSocketTransport::new(config.request_timeout()),
        config.relay_options(),
    );

    let refresh_options = config.refresh_options();
    let mut watched: HashSet<String> = KNOWN_EVENTS.iter().map(|e| e.to_string()).collect();
    watched.extend(refresh_options.events.iter().cloned());
    let _listeners: Vec<_> = watched
        .iter()
        .map(|event| {
            let pattern = event.clone();
            relay.subscribe(event, move |payload| {
                tracing::info!(event = %pattern, payload = %payload, "📨 Event received");
            })
        })
        .collect();

    let refresh = RefreshCoordinator::spawn(source, &relay.handle(), refresh_options);
    let mut snapshots = refresh.snapshots();
    let mut states = relay.state_changes();

    if !relay.start(credentials).await {
        tracing::warn!("⚠️ Real-time updates unavailable, falling back to polling only");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("🛑 Interrupted, shutting down");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = snapshots.borrow_and_update().clone();
                if let Some(snapshot) = latest {
                    print_summary(&snapshot);
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                if state == ConnectionState::Disconnected {
                    tracing::warn!("🔌 Real-time channel disconnected, updates arrive by polling only");
                } else {
                    tracing::info!("🔌 Real-time channel {}", state);
                }
            }
        }
    }

    drop(refresh);
    relay.teardown().await;
    Ok(())
}

fn print_summary(snapshot: &SubscriptionSnapshot) {
    let now = Utc::now();
    let record = snapshot.subscription.as_ref();
    let label = record.map(|r| r.plan_label()).unwrap_or("Free Plan");
    let end_date = record
        .and_then(|r| r.end_date)
        .or_else(|| snapshot.enhanced_details.as_ref().and_then(|d| d.next_billing_date));

    println!("Plan: {}", label);
    println!("Status: {}", snapshot.actual_status(now));
    println!("Expires: {}", format_date(end_date));

    for metric in usage_metrics(snapshot) {
        println!(
            "  {:<9} {:>6} / {:<6} ({:.0}%)",
            metric.kind.title(),
            metric.created,
            metric.limit,
            metric.percentage
        );
    }

    if snapshot.can_renew(now) {
        let request = RenewalRequest::prefilled(snapshot);
        match snapshot.renewal_quote(&request) {
            Some(quote) => println!(
                "Renewal: {} for {} students / {} teachers, {}",
                quote.plan.display_label(),
                quote.students,
                quote.teachers,
                format_inr(quote.estimate.amount)
            ),
            None => println!("Renewal: available"),
        }
    }
}
