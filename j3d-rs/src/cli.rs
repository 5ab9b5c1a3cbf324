//! Root CLI structure for j3d-rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "j3d-rs")]
#[command(about = "Command-line tools for J3D (BMD/BDL) models", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display container, tag and model information
    Info {
        /// Path to the BMD/BDL file
        file: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display the scene hierarchy as a tree
    Tree {
        /// Path to the BMD/BDL file
        file: PathBuf,

        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Generate GLSL shaders for the model's materials
    Shaders {
        /// Path to the BMD/BDL file
        file: PathBuf,

        /// Output directory for the .vert/.frag files
        #[arg(short, long)]
        out: PathBuf,

        /// Only generate the named material
        #[arg(short, long)]
        material: Option<String>,

        /// Skin vertices in the vertex shader
        #[arg(long)]
        gpu_skinning: bool,
    },

    /// Display skinning information for each shape
    Skin {
        /// Path to the BMD/BDL file
        file: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
