//! NBA win probability CLI
//!
//! Point-in-time features, model training and prediction serving.

use std::io::Write;

use clap::{Parser, Subcommand};
use nba::{Config, Result};

#[derive(Parser)]
#[command(name = "nba")]
#[command(about = "Leakage-safe NBA home win probabilities", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create data directories
    Init,
    /// Game history management
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Feature table commands
    Features {
        #[command(subcommand)]
        action: FeatureCommands,
    },
    /// Train candidate classifiers and keep the best one
    Train {
        /// Models to compare (defaults to training.models from config)
        #[arg(long, num_args = 1..)]
        models: Vec<String>,
    },
    /// Predict the home win probability for a matchup
    Predict {
        /// Home team (code, nickname or full name)
        home: String,
        /// Away team
        away: String,
        /// Evaluate as of this date (YYYY-MM-DD); only earlier games are used
        #[arg(long)]
        date: Option<String>,
    },
    /// Run the HTTP prediction service
    Serve {
        /// Listen address, overrides server.addr
        #[arg(long)]
        addr: Option<String>,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import games from a CSV file into the database
    Import {
        /// Path to the games CSV
        csv: String,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum FeatureCommands {
    /// Assemble the feature table from the games database
    Build,
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level));
    builder.format_timestamp(None);

    if std::env::var("APP_ENV").is_ok_and(|env| env == "prod") {
        builder.format(|buf, record| {
            let line = serde_json::json!({
                "level": record.level().as_str(),
                "target": record.target(),
                "message": record.args().to_string(),
            });
            writeln!(buf, "{}", line)
        });
    }

    builder.init();
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    }
    .with_env_overrides();

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Data { action } => match action {
            DataCommands::Import { csv } => commands::data_import(&config, &csv),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Features { action } => match action {
            FeatureCommands::Build => commands::features_build(&config),
        },
        Commands::Train { models } => commands::train(&config, models),
        Commands::Predict { home, away, date } => {
            commands::predict(&config, &home, &away, date.as_deref())
        }
        Commands::Serve { addr } => commands::serve(config, addr),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use chrono::NaiveDate;
    use nba::data::{read_games_csv, Database};
    use nba::features::build_feature_table;
    use nba::predict::Predictor;
    use nba::training::Trainer;
    use nba::PredictorError;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.data_dir)?;
        std::fs::create_dir_all(&config.data.artifacts_dir)?;
        println!(
            "Created {} and {} directories",
            config.data.data_dir.display(),
            config.data.artifacts_dir.display()
        );

        println!("\nNext steps:");
        println!("  1. Run 'nba data import games.csv' to load game results");
        println!("  2. Run 'nba features build' to assemble the feature table");
        println!("  3. Run 'nba train' to train and select a model");
        println!("  4. Run 'nba predict NYK BOS' to make a prediction");

        Ok(())
    }

    pub fn data_import(config: &Config, csv: &str) -> Result<()> {
        let games = read_games_csv(csv)?;
        println!("Read {} games from {}", games.len(), csv);

        let mut db = Database::open(config.data.database_path())?;
        let count = db.upsert_games(&games)?;
        println!("Stored {} games in database", count);

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let path = config.data.database_path();
        let db = Database::open(&path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:        {}", path.display());
        println!("  Teams:       {}", stats.team_count);
        println!("  Games:       {}", stats.game_count);
        println!("  Predictions: {}", stats.prediction_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:       {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn features_build(config: &Config) -> Result<()> {
        let db = Database::open(config.data.database_path())?;
        let games = db.get_all_games()?;
        if games.is_empty() {
            return Err(PredictorError::Validation(
                "no games in database; run `nba data import` first".into(),
            ));
        }

        let table = build_feature_table(&games, &config.feature_config())?;
        let path = config.data.features_path();
        table.write_csv(&path)?;
        println!(
            "Wrote {} feature rows from {} games to {}",
            table.len(),
            games.len(),
            path.display()
        );

        Ok(())
    }

    pub fn train(config: &Config, models: Vec<String>) -> Result<()> {
        let models = if models.is_empty() {
            config.training.models.clone()
        } else {
            models
        };

        println!("Training {}...", models.join(", "));
        let trainer = Trainer::new(config);
        let report = trainer.run(&models)?;

        println!("\n=== Training Complete ===");
        println!("  Train rows:     {}", report.n_train);
        println!("  Test rows:      {}", report.n_test);
        println!("  Features:       {}", report.features_used.join(", "));
        for (name, metrics) in &report.runs {
            println!("  {:<15} {}", format!("{}:", name), metrics);
        }
        println!(
            "  Home baseline:  rate {:.3}, acc {:.3}",
            report.baseline_home_rate, report.baseline_home_acc
        );
        println!("  Best model:     {}", report.best_model);
        println!("  Saved to:       {}", trainer.artifacts_dir().display());

        Ok(())
    }

    pub fn predict(config: &Config, home: &str, away: &str, date: Option<&str>) -> Result<()> {
        let as_of = date
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| {
                    PredictorError::Validation(format!("invalid date {:?}, expected YYYY-MM-DD", d))
                })
            })
            .transpose()?;

        let mut predictor = Predictor::new(config);
        let prediction = predictor.predict(home, away, as_of)?;
        let model = predictor.model_name()?;

        let db = Database::open(config.data.database_path())?;
        db.log_prediction(&prediction, model)?;

        println!(
            "{} vs {}{}",
            prediction.home_team,
            prediction.away_team,
            prediction
                .as_of
                .map(|d| format!(" on {}", d))
                .unwrap_or_default()
        );
        println!("───────────────────────────────");
        println!("  P(home win): {:.1}%", prediction.prob_home_win * 100.0);
        println!("  Favourite:   {}", prediction.predicted_winner());
        println!("  Model:       {}", model);
        println!("{}", serde_json::to_string_pretty(&prediction.features)?);

        Ok(())
    }

    pub fn serve(mut config: Config, addr: Option<String>) -> Result<()> {
        if let Some(addr) = addr {
            config.server.addr = addr;
        }
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(nba::service::serve(&config))
    }
}
