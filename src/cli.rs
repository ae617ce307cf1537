use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a narration for a video and mix it in
    Narrate {
        /// Input video file (mp4, mov, avi, mkv)
        #[arg(short, long)]
        input: PathBuf,

        /// Style and content instructions for the narration
        #[arg(short = 'n', long, default_value = "")]
        instructions: String,

        /// Use the script in this file instead of generating one
        #[arg(long)]
        script_file: Option<PathBuf>,

        /// Voice name or id (1-10), see `voxover voices`
        #[arg(long)]
        voice: Option<String>,

        /// Speaking speed multiplier (0.5 - 2.0)
        #[arg(long)]
        speed: Option<f64>,

        /// Narration weight in the mix (0 = original only, 1 = narration only)
        #[arg(long)]
        mix: Option<f64>,

        /// Output video file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Review the draft before synthesis (accept, edit, regenerate)
        #[arg(long)]
        interactive: bool,
    },

    /// Generate a draft narration script only
    Script {
        /// Input video file (mp4, mov, avi, mkv)
        #[arg(short, long)]
        input: PathBuf,

        /// Style and content instructions for the narration
        #[arg(short = 'n', long, default_value = "")]
        instructions: String,

        /// Write the draft here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show duration, resolution and format of a video
    Probe {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List the available voices
    Voices,

    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "voxover.toml")]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_narrate() {
        let args = Args::parse_from([
            "voxover", "-v", "narrate", "-i", "demo.mp4", "-n", "cheerful tone",
            "--voice", "3", "--speed", "1.0", "--mix", "0.7", "--interactive",
        ]);
        assert!(args.verbose);
        match args.command {
            Commands::Narrate { input, instructions, voice, speed, mix, interactive, output, script_file } => {
                assert_eq!(input, PathBuf::from("demo.mp4"));
                assert_eq!(instructions, "cheerful tone");
                assert_eq!(voice.as_deref(), Some("3"));
                assert_eq!(speed, Some(1.0));
                assert_eq!(mix, Some(0.7));
                assert!(interactive);
                assert!(output.is_none());
                assert!(script_file.is_none());
            }
            _ => panic!("expected narrate"),
        }
    }

    #[test]
    fn test_parse_init_config_default() {
        let args = Args::parse_from(["voxover", "init-config"]);
        match args.command {
            Commands::InitConfig { output } => assert_eq!(output, PathBuf::from("voxover.toml")),
            _ => panic!("expected init-config"),
        }
    }
}
