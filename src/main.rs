use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tidalrec::model::{Model, PlayMatrix};
use tidalrec::{
    Config, PlaylistDescriptor, PlaylistRecommender, ProcessOptions, RecommendationReport,
    Recommendations, TidalClient, TrainingSet,
};

const RESULTS_DIR: &str = "recommendation_results";

#[derive(Parser)]
#[command(name = "tidalrec")]
#[command(about = "Artist and playlist recommendations from Tidal playlists")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the persisted model (or set MODEL_DIR env var)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend artists and playlists from a Tidal playlist URL
    Recommend {
        /// Tidal playlist URL
        url: String,

        /// Register the playlist under this id instead of its uuid
        #[arg(long)]
        id: Option<String>,

        /// Do not register the playlist in the model
        #[arg(long)]
        no_update: bool,

        /// Skip artist recommendations
        #[arg(long)]
        no_recommend: bool,
    },

    /// Recommend from a playlist descriptor JSON file (no network)
    ProcessFile {
        /// Path to a playlist descriptor JSON file
        path: PathBuf,

        /// Register the playlist under this id
        #[arg(long)]
        id: Option<String>,

        /// Do not register the playlist in the model
        #[arg(long)]
        no_update: bool,

        /// Skip artist recommendations
        #[arg(long)]
        no_recommend: bool,
    },

    /// Train the model from a plays dataset
    Fit {
        /// Path to a training set JSON file
        dataset: PathBuf,
    },

    /// Clear the playlist side of the model
    Reset,

    /// List artists known to the model
    ListArtists,

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let config = Config::from_env().context("Failed to load configuration")?;
    let model_dir = cli.model_dir.unwrap_or_else(|| config.model_dir.clone());

    match cli.command {
        Commands::Recommend {
            url,
            id,
            no_update,
            no_recommend,
        } => {
            recommend(&config, &model_dir, &url, id, no_update, no_recommend).await?;
        }
        Commands::ProcessFile {
            path,
            id,
            no_update,
            no_recommend,
        } => {
            process_file(&model_dir, &path, id, no_update, no_recommend).await?;
        }
        Commands::Fit { dataset } => {
            fit(&model_dir, &dataset).await?;
        }
        Commands::Reset => {
            reset(&model_dir).await?;
        }
        Commands::ListArtists => {
            list_artists(&model_dir).await?;
        }
        Commands::Setup => {
            show_setup_guide();
        }
    }

    Ok(())
}

async fn recommend(
    config: &Config,
    model_dir: &Path,
    url: &str,
    id: Option<String>,
    no_update: bool,
    no_recommend: bool,
) -> Result<()> {
    println!("{}", "Tidal Playlist Recommender".cyan().bold());
    println!("{}", "=".repeat(50));

    let missing = config.get_missing_config();
    if !missing.is_empty() {
        println!("{}", "Missing configuration:".red());
        for item in &missing {
            println!("   - {}", item);
        }
        println!(
            "\n{}",
            "Set TIDAL_CLIENT_ID and TIDAL_CLIENT_SECRET in your environment or .env file."
                .yellow()
        );
        std::process::exit(1);
    }

    let recommender = PlaylistRecommender::new(model_dir);
    recommender.load().await.context("Failed to load model")?;

    let client = TidalClient::new(&config.tidal_client_id, &config.tidal_client_secret)
        .await
        .context("Failed to authenticate with Tidal")?;

    let progress = spinner("Fetching playlist...");
    let playlist = client
        .get_playlist(url)
        .await
        .context("Failed to fetch playlist")?;
    progress.finish_and_clear();

    println!(
        "Playlist: {} ({} tracks)",
        playlist.title.green(),
        playlist.tracks.len()
    );

    let mut descriptor = playlist.to_descriptor();
    if id.is_some() {
        descriptor.id = id;
    }

    let options = ProcessOptions {
        update: !no_update,
        recommend: !no_recommend,
    };
    let recommendations = recommender.process_playlist(&descriptor, &options).await?;

    print_recommendations(&recommendations);

    let report = RecommendationReport::new(
        descriptor.id.clone(),
        url.to_string(),
        descriptor.tracks.len(),
        recommendations,
    );
    report.save(Path::new(RESULTS_DIR))?;

    recommender
        .save_model()
        .await
        .context("Failed to save model")?;

    println!("\n{}", "Done".green());
    Ok(())
}

async fn process_file(
    model_dir: &Path,
    path: &Path,
    id: Option<String>,
    no_update: bool,
    no_recommend: bool,
) -> Result<()> {
    println!("{}", "Tidal Playlist Recommender".cyan().bold());
    println!("{}", "=".repeat(50));

    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut descriptor: PlaylistDescriptor =
        serde_json::from_str(&data).context("Failed to parse playlist descriptor")?;
    if id.is_some() {
        descriptor.id = id;
    }

    println!(
        "Playlist: {} ({} tracks)",
        descriptor.url.green(),
        descriptor.tracks.len()
    );

    let recommender = PlaylistRecommender::new(model_dir);
    recommender.load().await.context("Failed to load model")?;

    let options = ProcessOptions {
        update: !no_update,
        recommend: !no_recommend,
    };
    let recommendations = recommender.process_playlist(&descriptor, &options).await?;

    print_recommendations(&recommendations);

    let report = RecommendationReport::new(
        descriptor.id.clone(),
        descriptor.url.clone(),
        descriptor.tracks.len(),
        recommendations,
    );
    report.save(Path::new(RESULTS_DIR))?;

    recommender
        .save_model()
        .await
        .context("Failed to save model")?;

    Ok(())
}

async fn fit(model_dir: &Path, dataset: &Path) -> Result<()> {
    println!("{}", "Tidal Playlist Recommender".cyan().bold());
    println!("{}", "=".repeat(50));

    let data = std::fs::read_to_string(dataset)
        .with_context(|| format!("Failed to read {}", dataset.display()))?;
    let training: TrainingSet =
        serde_json::from_str(&data).context("Failed to parse training set")?;

    println!(
        "Training on {} artists x {} playlists ({} play counts)",
        training.artists.len(),
        training.playlists.len(),
        training.plays.len()
    );

    let progress = spinner("Fitting model...");
    let model = tokio::task::spawn_blocking(move || -> Result<Model> {
        let plays = PlayMatrix::from_triplets(
            training.artists.len(),
            training.playlists.len(),
            &training.plays,
        );
        let mut model = Model::new();
        model.fit(&plays, training.playlists, training.artists)?;
        Ok(model)
    })
    .await
    .context("Training task failed")??;
    progress.finish_with_message("Model fitted");

    let recommender = PlaylistRecommender::from_model(model, model_dir);
    recommender
        .save_model()
        .await
        .context("Failed to save model")?;

    println!(
        "{}",
        format!("Model saved to {}", model_dir.display()).green()
    );
    Ok(())
}

async fn reset(model_dir: &Path) -> Result<()> {
    let recommender = PlaylistRecommender::new(model_dir);
    recommender.load().await.context("Failed to load model")?;

    recommender.reset().await;
    recommender
        .save_model()
        .await
        .context("Failed to save model")?;

    println!("{}", "Playlist side of the model cleared".yellow());
    Ok(())
}

async fn list_artists(model_dir: &Path) -> Result<()> {
    println!("{}", "Known Artists".cyan().bold());
    println!("{}", "=".repeat(50));

    let recommender = PlaylistRecommender::new(model_dir);
    recommender.load().await.context("Failed to load model")?;

    let names = recommender.artist_names().await;
    if names.is_empty() {
        println!("{}", "No artists in the model - run 'tidalrec fit' first".yellow());
        return Ok(());
    }

    for (i, name) in names.iter().enumerate() {
        println!("{:4}. {}", i + 1, name.green());
    }

    println!("\n{}", format!("Total: {} artists", names.len()).cyan());
    Ok(())
}

fn print_recommendations(recommendations: &Recommendations) {
    if recommendations.is_empty() {
        println!(
            "\n{}",
            "No known artists in this playlist - fit the model first".yellow()
        );
        return;
    }

    if !recommendations.artists.is_empty() {
        println!("\n{}", "Recommended artists".bold());
        for (i, artist) in recommendations.artists.iter().enumerate() {
            println!("{:2}. {} ({:.3})", i + 1, artist.name.green(), artist.score);
        }
    }

    if !recommendations.playlists.is_empty() {
        println!("\n{}", "Related playlists".bold());
        for (i, playlist) in recommendations.playlists.iter().enumerate() {
            println!("{:2}. {} ({:.3})", i + 1, playlist.id.cyan(), playlist.score);
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn show_setup_guide() {
    println!("{}", "Tidal Playlist Recommender Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Tidal API Setup".yellow());
    println!("   - Go to https://developer.tidal.com/");
    println!("   - Create a new application");
    println!("   - Copy your Client ID and Client Secret");

    println!("\n{}", "2. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     TIDAL_CLIENT_ID=your_tidal_client_id");
    println!("     TIDAL_CLIENT_SECRET=your_tidal_client_secret");
    println!("     MODEL_DIR=model");

    println!("\n{}", "3. Training".yellow());
    println!("   - Prepare a training set JSON file:");
    println!("     {{\"artists\": [..], \"playlists\": [..], \"plays\": [[artist, playlist, count], ..]}}");
    println!("   - tidalrec fit plays.json");

    println!("\n{}", "4. Usage".yellow());
    println!("   - tidalrec list-artists                   (to inspect the model)");
    println!("   - tidalrec recommend <PLAYLIST_URL>       (to get recommendations)");
    println!("   - tidalrec recommend <URL> --no-update    (to leave the model untouched)");
    println!("   - tidalrec process-file playlist.json     (to process a local descriptor)");

    println!("\n{}", "Ready to start recommending!".green());
}
