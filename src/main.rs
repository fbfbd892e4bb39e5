//! Personal task manager server.

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tarefas::cli::{Cli, Command, OVERDUE_DAYS, TasksArgs};
use tarefas::config::AppConfig;
use tarefas::db::{Database, now_ms};
use tarefas::mailer::LogMailer;
use tarefas::types::TaskStatus;
use tarefas::web::{AppState, start_server};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new().create(true).append(true).open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let mut config = AppConfig::load(cli.config.as_deref().map(Path::new))?;

    // CLI arguments override the config file
    if let Some(db_path) = &cli.database {
        config.database = db_path.into();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    match cli.command {
        Some(Command::Tasks(args)) => {
            let db = Database::open(&config.database)?;
            run_tasks_report(&db, &args)?;
        }
        Some(Command::Serve) | None => {
            run_server(config).await?;
        }
    }

    Ok(())
}

/// Run the HTTP server until interrupted.
async fn run_server(config: AppConfig) -> Result<()> {
    let db = Arc::new(Database::open(&config.database)?);

    let purged = db.purge_expired_sessions(now_ms())?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    let port = config.port;
    let state = AppState::new(db, Arc::new(LogMailer), Arc::new(config));
    let (shutdown_tx, addr) = start_server(state, port).await?;

    info!("Ready at http://{}", addr);

    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(());
    info!("Interrupted, shutting down");

    Ok(())
}

/// Print a task listing to stdout, optionally restricted to tasks overdue by
/// more than [`OVERDUE_DAYS`] days.
fn run_tasks_report(db: &Database, args: &TasksArgs) -> Result<()> {
    let today = chrono::Local::now().date_naive();

    let tasks = if args.overdue {
        println!("\n=== TAREFAS COM MAIS DE {} DIAS DE ATRASO ===\n", OVERDUE_DAYS);
        db.list_overdue_tasks(today, OVERDUE_DAYS)?
    } else {
        println!("\n=== LISTAGEM GERAL DE TAREFAS ===\n");
        db.list_all_tasks()?
    };

    if tasks.is_empty() {
        println!("Nenhuma tarefa encontrada para os critérios selecionados.");
        return Ok(());
    }

    for task in tasks {
        println!("Título: {}", task.title);
        println!(
            "Descrição: {}",
            task.description.as_deref().unwrap_or("Sem descrição")
        );
        match task.due_date {
            Some(due) => println!("Data de Conclusão Prevista: {}", due.format("%d/%m/%Y")),
            None => println!("Data de Conclusão Prevista: -"),
        }
        println!("Status: {}", task.status.label());

        if let Some(due) = task.due_date {
            if task.status != TaskStatus::Done {
                let days_late = (today - due).num_days();
                if days_late > 0 {
                    println!("Duração do Atraso: {} dias", days_late);
                }
            }
        }

        println!("{}", "-".repeat(50));
    }

    Ok(())
}
