use clap::CommandFactory;
use colored::*;
use env_logger::{Builder, Env, Target};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::fs;
use std::time::{Duration, Instant};
use tocfilter::output_formats::OutputFormatter;
use tocfilter::{
    CacheAction, Cli, Commands, Config, Parser, Result as TocResult, TocError, apply_overrides,
    open_session,
};

fn main() -> TocResult<()> {
    let cli = Cli::parse();
    setup_logging(&cli)?;

    let start_time = Instant::now();
    info!("Application started with command: {:?}", cli.command);
    let mut config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Search {
            catalog,
            terms,
            backtrack,
            format,
            limit,
            metrics,
            filter,
        } => {
            apply_overrides(&mut config, filter);
            let mut session = open_session(catalog, &config)?;

            let pb = ProgressBar::new_spinner().with_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .map_err(|e| TocError::Other(e.to_string()))?
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb.set_message(format!("Filtering {} records...", session.len()));

            let outcome = session.traverse(terms).and_then(|_| match backtrack {
                Some(n) => session.backtrack(*n),
                None => Ok(()),
            });
            pb.finish_and_clear();
            outcome?;

            println!(
                "{}",
                OutputFormatter::new(*format)
                    .with_limit(*limit)
                    .format_session(&session)
            );
            if *metrics {
                println!("{}", session.metrics().gather());
            }
        }

        Commands::Relevant {
            catalog,
            terms,
            count,
            format,
            filter,
        } => {
            apply_overrides(&mut config, filter);
            let mut session = open_session(catalog, &config)?;
            session.traverse(terms)?;
            println!(
                "{}",
                OutputFormatter::new(*format).format_keywords(&session.relevant(*count))
            );
        }

        Commands::Interactive { catalog, filter } => {
            use tocfilter::interactive::InteractiveSearch;

            apply_overrides(&mut config, filter);
            let session = open_session(catalog, &config)?;
            println!("{}", "Starting interactive filter mode...".green().bold());
            println!("Records: {}", session.len());
            println!("Searchable columns: {}", session.relevant_columns().join(", "));

            InteractiveSearch::new(session).run()?;
        }

        Commands::Cache { action, cache_dir } => {
            if let Some(dir) = cache_dir {
                config.cache.root = Some(dir.clone());
            }
            let root = config.cache.resolved_root();
            let cache = config.cache.build();

            match action {
                CacheAction::Clear => {
                    cache.clear_all()?;
                    println!("{} {}", "Removed search cache at".green(), root.display());
                }
                CacheAction::Path => println!("{}", root.display()),
                CacheAction::Stats => {
                    let stats = cache.stats();
                    println!("{}: {}", "Cache directory".cyan(), root.display());
                    println!("{}: {}", "Stored results".cyan(), stats.disk_entries);
                }
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "tocfilter", &mut std::io::stdout());
        }
    }

    info!(
        "Application finished. Total elapsed time: {:.2?}",
        start_time.elapsed()
    );
    Ok(())
}

fn setup_logging(cli: &Cli) -> TocResult<()> {
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });

    if let Some(log_path) = &cli.log {
        if let Some(parent_dir) = log_path.parent()
            && !parent_dir.as_os_str().is_empty()
            && !parent_dir.exists()
        {
            fs::create_dir_all(parent_dir).map_err(TocError::Io)?;
        }
        let log_file = fs::File::create(log_path).map_err(TocError::Io)?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| TocError::Other(e.to_string()))?;
    Ok(())
}
