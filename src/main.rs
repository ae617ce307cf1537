//! VoxOver - AI Narration Studio
//!
//! Command-line entry point: loads configuration and credentials once, then
//! drives a narration session through its stages.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use voxover::cli::{Args, Commands};
use voxover::config::{Config, Credentials};
use voxover::delivery::default_destination;
use voxover::error::VoxoverError;
use voxover::ingest::VideoFormat;
use voxover::media::MediaProcessorFactory;
use voxover::speech::{Voice, VoiceConfig};
use voxover::workflow::{PipelineRequest, Session};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads credentials
    dotenv::dotenv().ok();

    let args = Args::parse();

    setup_logging(args.verbose)?;
    info!("Starting VoxOver - AI Narration Studio");

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("voxover.toml").exists() {
                info!("Found voxover.toml in current directory, loading...");
                Config::from_file("voxover.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Voices => {
            println!("\nAvailable Voices:");
            println!("{:<5} {:<10}", "Id", "Name");
            println!("{}", "-".repeat(16));
            for voice in Voice::ALL {
                let marker = if voice == config.speech.default_voice { " (default)" } else { "" };
                println!("{:<5} {:<10}{}", voice.id(), voice.name(), marker);
            }
        }
        Commands::InitConfig { output } => {
            config.save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
        Commands::Probe { input } => {
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            media.check_availability()?;
            let asset = voxover::ingest::inspect(&input, media.as_ref()).await?;

            println!("File:       {}", asset.source_path.display());
            println!("Format:     {}", asset.format);
            println!("Duration:   {:.2}s", asset.duration);
            println!("Resolution: {}", asset.resolution());
            println!("Audio:      {}", if asset.has_audio { "yes" } else { "no" });
        }
        Commands::Script { input, instructions, output } => {
            let credentials = load_credentials(&config)?;
            let mut session = Session::new(&config, &credentials)?;

            with_spinner("Analyzing video", session.ingest(&input)).await?;
            with_spinner("Generating narration script", session.generate_script(&instructions)).await?;
            let text = session.script().map(|s| s.text().to_string()).unwrap_or_default();

            match output {
                Some(path) => {
                    tokio::fs::write(&path, &text).await?;
                    println!("Draft written to {}", path.display());
                }
                None => println!("{}", text),
            }
        }
        Commands::Narrate { input, instructions, script_file, voice, speed, mix, output, interactive } => {
            let credentials = load_credentials(&config)?;

            let voice: Voice = match voice {
                Some(v) => v.parse()?,
                None => config.speech.default_voice,
            };
            let voice_config = VoiceConfig::new(
                voice,
                speed.unwrap_or(config.speech.default_speed),
                mix.unwrap_or(config.mix.default_ratio),
            )?;
            let script_override = match script_file {
                Some(path) => Some(tokio::fs::read_to_string(&path).await?),
                None => None,
            };
            let format = VideoFormat::from_path(&input)?;
            let destination = output.unwrap_or_else(|| default_destination(&input, format));

            let mut session = Session::new(&config, &credentials)?;
            let request = PipelineRequest {
                input,
                instructions,
                script_override,
                voice: voice_config,
                destination,
            };

            let delivered = if interactive {
                run_interactive(&mut session, &request).await?
            } else {
                with_spinner("Creating narrated video", session.run_pipeline(&request)).await?
            };
            println!("Narrated video saved to {}", delivered.display());
        }
    }

    info!("VoxOver completed successfully");
    Ok(())
}

/// Credentials are required before any session starts; a missing one ends the process.
fn load_credentials(config: &Config) -> Result<Credentials> {
    Credentials::from_env(config).map_err(|e| {
        error!("{}", e);
        e.into()
    })
}

/// Drive the pipeline with a review loop between drafting and synthesis
async fn run_interactive(session: &mut Session, request: &PipelineRequest) -> Result<PathBuf> {
    with_spinner("Analyzing video", session.ingest(&request.input)).await?;
    if let Some(asset) = session.asset() {
        println!("Loaded {} ({}, {:.1}s)", asset.source_path.display(), asset.resolution(), asset.duration);
    }

    let mut instructions = request.instructions.clone();
    match &request.script_override {
        Some(text) => session.edit_script(text.clone())?,
        None => {
            if let Err(e) = with_spinner("Generating narration script", session.generate_script(&instructions)).await {
                report(&e)?;
                session.edit_script(String::new())?;
            }
        }
    }

    loop {
        let script = session.script().map(|s| s.text().to_string()).unwrap_or_default();
        println!("\n----- Narration draft ({} words) -----\n{}\n--------------------------------------",
                 script.split_whitespace().count(), script);

        match prompt("[a]ccept, [e]dit, [r]egenerate, [q]uit: ")?.as_str() {
            "a" | "accept" => match session.finalize_script() {
                Ok(()) => {}
                Err(e) => {
                    report(&e)?;
                    continue;
                }
            },
            "e" | "edit" => {
                match edit_in_editor(&editor_command(), session.workdir(), &script) {
                    Ok(edited) => {
                        if let Err(e) = session.edit_script(edited) {
                            report(&e)?;
                        }
                    }
                    Err(e) => {
                        error!("Editing failed: {}", e);
                        eprintln!("Error: {} (the draft is unchanged)", e);
                    }
                }
                continue;
            }
            "r" | "regenerate" => {
                let new_instructions = prompt_line("Instructions (empty keeps the previous ones): ")?
                    .unwrap_or_default();
                if !new_instructions.is_empty() {
                    instructions = new_instructions;
                }
                if let Err(e) = with_spinner("Generating narration script", session.generate_script(&instructions)).await {
                    report(&e)?;
                }
                continue;
            }
            "q" | "quit" => return Err(anyhow::anyhow!("Aborted by user")),
            _ => continue,
        }

        match with_spinner("Synthesizing voiceover", session.synthesize(request.voice)).await {
            Ok(audio) => println!("Voiceover ready: {:.1}s with voice {}", audio.duration, audio.voice),
            Err(e) => {
                report(&e)?;
                continue;
            }
        }

        loop {
            match with_spinner("Mixing audio and video", session.mix()).await {
                Ok(_) => break,
                Err(e) => {
                    report(&e)?;
                    if prompt("Retry mixing? [y/N]: ")? != "y" {
                        return Err(e.into());
                    }
                }
            }
        }

        let mut destination = request.destination.clone();
        loop {
            match session.deliver(&destination).await {
                Ok(path) => return Ok(path),
                Err(e) => {
                    report(&e)?;
                    match prompt_line("Save to another path (empty aborts): ")? {
                        Some(path) if !path.is_empty() => destination = PathBuf::from(path),
                        _ => return Err(e.into()),
                    }
                }
            }
        }
    }
}

/// Print a stage error; fatal errors are passed back up
fn report(e: &VoxoverError) -> Result<()> {
    if !e.is_recoverable() {
        return Err(anyhow::anyhow!("{}", e));
    }
    error!("{}", e);
    eprintln!("Error: {}", e);
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    Ok(prompt_line(message)?
        .map(|line| line.to_lowercase())
        .unwrap_or_else(|| "q".to_string()))
}

/// Read one trimmed line; `None` at end of input
fn prompt_line(message: &str) -> Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn editor_command() -> String {
    std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .unwrap_or_else(|_| "vi".to_string())
}

/// Open the draft in `editor` and return the saved text. The scratch file is removed either way.
fn edit_in_editor(editor: &str, workdir: &Path, text: &str) -> Result<String> {
    let path = workdir.join(format!("script_{}.txt", uuid::Uuid::new_v4().simple()));
    std::fs::write(&path, text)?;

    let result = run_editor(editor, &path);
    if let Err(e) = std::fs::remove_file(&path) {
        debug!("Could not remove {}: {}", path.display(), e);
    }
    result
}

fn run_editor(editor: &str, path: &Path) -> Result<String> {
    let status = std::process::Command::new(editor)
        .arg(path)
        .status()
        .map_err(|e| anyhow::anyhow!("cannot start editor {}: {}", editor, e))?;
    if !status.success() {
        anyhow::bail!("{} exited with {}", editor, status);
    }
    Ok(std::fs::read_to_string(path)?)
}

async fn with_spinner<T, F>(message: &str, future: F) -> std::result::Result<T, VoxoverError>
where
    F: Future<Output = std::result::Result<T, VoxoverError>>,
{
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = future.await;
    spinner.finish_and_clear();
    result
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".voxover").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "voxover.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("voxover.log").display());

    Ok(())
}
