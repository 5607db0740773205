use clap::Parser;
use colored::*;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use internship_notifier::{
    cli::{Cli, Commands, CriteriaArgs},
    config::Config,
    eligibility::{filter_roster, EligibilityChecker, FilterOutcome},
    error,
    notify::{load_blocking, NotificationPipeline, NotifySummary, SmtpMailer},
    roster::FileRoster,
    server,
    storage::{self, NotificationRun},
    utils,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("internship_notifier=debug,info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve { host, port } => {
            info!("Starting notification service...");
            serve(config, host, port).await
        }

        Commands::Notify {
            criteria,
            yes,
            dry_run,
        } => notify(&config, &criteria, yes, dry_run).await,

        Commands::Preview { criteria, verbose } => preview(&config, &criteria, verbose).await,

        Commands::History { limit, format } => show_history(&config, limit, &format),

        Commands::Stats { format } => show_stats(&config, &format),

        Commands::Init => initialize(&config),
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

async fn serve(mut config: Config, host: Option<String>, port: Option<u16>) -> error::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    server::start(config).await
}

fn roster_for(config: &Config, args: &CriteriaArgs) -> FileRoster {
    let path = args
        .roster
        .clone()
        .unwrap_or_else(|| config.roster.path.clone());
    FileRoster::new(path, config.roster.sheet.clone())
}

fn print_outcome(outcome: &FilterOutcome) {
    println!("\n{}", "=== Eligibility Results ===".cyan().bold());
    println!("Students Evaluated:  {}", outcome.evaluated);
    println!("Eligible Recipients: {} ✓", utils::format_count(outcome.recipients.len()));
    println!("Below CGPA:          {}", outcome.below_threshold);
    println!("Missing Skills:      {}", outcome.missing_skills);
    println!("No Email:            {}", outcome.missing_email);
}

async fn notify(
    config: &Config,
    args: &CriteriaArgs,
    yes: bool,
    dry_run: bool,
) -> error::Result<()> {
    let criteria = args.criteria();
    criteria.validate()?;

    let roster = roster_for(config, args);
    println!(
        "{}",
        format!("Checking {} for '{}'...", roster.path().display(), criteria.internship_name).cyan()
    );

    let roster = Arc::new(roster);
    let outcome = filter_roster(&load_blocking(roster.clone()).await?, &criteria);
    print_outcome(&outcome);

    if dry_run {
        println!("\n{}", "DRY RUN: No email will be sent".yellow());
        for email in &outcome.recipients {
            println!("  {}", email);
        }
        storage::record_run(&config.database.path, &NotificationRun::dry_run(&criteria, &outcome));
        return Ok(());
    }

    if outcome.recipients.is_empty() {
        let summary = NotifySummary::nobody_eligible(&criteria, outcome.evaluated);
        storage::record_run(
            &config.database.path,
            &NotificationRun::completed(&criteria, &summary),
        );
        println!("No eligible students, nothing to send");
        println!("✓ {}", summary.message().green());
        return Ok(());
    }

    if !yes
        && !utils::confirm_action(&format!(
            "Email {} students about '{}'?",
            outcome.recipients.len(),
            criteria.internship_name
        ))
    {
        println!("Cancelled");
        return Ok(());
    }

    let mailer = SmtpMailer::new(config.smtp.clone())?;
    let pipeline = NotificationPipeline::new(roster, Arc::new(mailer));

    // Send exactly the recipients that were shown and confirmed
    match pipeline.deliver(&criteria, outcome).await {
        Ok(summary) => {
            storage::record_run(
                &config.database.path,
                &NotificationRun::completed(&criteria, &summary),
            );
            println!("✓ {}", summary.message().green());
            Ok(())
        }
        Err(failure) => {
            storage::record_run(
                &config.database.path,
                &NotificationRun::failed(&criteria, &failure),
            );
            Err(failure.into())
        }
    }
}

async fn preview(config: &Config, args: &CriteriaArgs, verbose: bool) -> error::Result<()> {
    let criteria = args.criteria();
    criteria.validate()?;

    let records = load_blocking(Arc::new(roster_for(config, args))).await?;
    let outcome = filter_roster(&records, &criteria);
    print_outcome(&outcome);

    if verbose && !records.is_empty() {
        let checker = EligibilityChecker::new(&criteria);
        println!("\n{}", "Students:".yellow());
        utils::print_table_border(90);
        utils::print_table_row(&["Email", "CGPA", "Result"], &[36, 6, 44]);
        utils::print_table_border(90);

        for record in &records {
            utils::print_table_row(
                &[
                    &utils::truncate(record.email.as_deref().unwrap_or("-"), 36),
                    &format!("{:.2}", record.cgpa),
                    &checker.eligibility_reason(record),
                ],
                &[36, 6, 44],
            );
        }
        utils::print_table_border(90);
    } else if !outcome.recipients.is_empty() {
        println!("\n{}", "Recipients:".yellow());
        for email in &outcome.recipients {
            println!("  {}", email);
        }
    }

    Ok(())
}

fn show_history(config: &Config, limit: usize, format: &str) -> error::Result<()> {
    let db = storage::Database::new(&config.database.path)?;
    let history = db.get_run_history(Some(limit))?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("No notification runs recorded yet");
        return Ok(());
    }

    println!("{}", "=== Recent Notification Runs ===".cyan().bold());
    utils::print_table_border(100);
    utils::print_table_row(
        &["Timestamp", "Internship", "Min CGPA", "Notified", "Status"],
        &[24, 30, 9, 9, 20],
    );
    utils::print_table_border(100);

    for run in history {
        utils::print_table_row(
            &[
                &utils::format_timestamp(&run.created_at),
                &utils::truncate(&run.internship_name, 30),
                &format!("{:.2}", run.min_cgpa),
                &run.notified_count.to_string(),
                &run.status.to_string(),
            ],
            &[24, 30, 9, 9, 20],
        );
        if let Some(err) = &run.error {
            println!("    {}", err.red());
        }
    }
    utils::print_table_border(100);

    Ok(())
}

fn show_stats(config: &Config, format: &str) -> error::Result<()> {
    let db = storage::Database::new(&config.database.path)?;
    let stats = db.get_stats()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "=== Notification Statistics ===".cyan().bold());
    println!("\nRuns:");
    println!("  Total:      {}", stats.total_runs);
    println!("  Completed:  {}", stats.completed_runs.to_string().green());
    println!("  Failed:     {}", stats.failed_runs.to_string().red());
    println!("  Dry Runs:   {}", stats.dry_runs.to_string().yellow());
    println!("\nStudents Notified: {}", utils::format_count(stats.total_notified));

    Ok(())
}

fn initialize(config: &Config) -> error::Result<()> {
    println!("{}", "Initializing internship notifier...".green());
    let _db = storage::Database::new(&config.database.path)?;
    println!("{}", "✓ History database initialized".green());
    println!("{}", "✓ Configuration loaded".green());

    let shown = config.redacted();
    println!("\n{}", "Configuration:".cyan());
    println!("  Listen:        {}:{}", shown.server.host, shown.server.port);
    println!("  Roster:        {}", shown.roster.path.display());
    println!("  SMTP Host:     {}:{}", shown.smtp.host, shown.smtp.port);
    println!("  Sender:        {}", shown.smtp.sender);
    println!("  Password:      {}", shown.smtp.password);
    println!("  History DB:    {}", shown.database.path);

    if let Err(e) = config.validate() {
        println!("\n{} {}", "⚠".yellow(), e.to_string().yellow());
    }

    println!("\n{}", "Ready to use! Try running:".cyan());
    println!(
        "  {} to check who matches",
        "internship-notify preview -i \"Data Intern\" -m 7 -s python".yellow()
    );
    println!("  {} to start the HTTP service", "internship-notify serve".yellow());
    Ok(())
}
