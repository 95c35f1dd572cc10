use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ruidai", about = "Semantic problem bank", version)]
pub struct Args {
    /// Path to the config file
    #[arg(long, default_value = "config.yaml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP daemon
    Daemon {},

    /// Suggest labels for a problem text
    Classify {
        #[arg(long)]
        text: String,
    },

    /// Store a problem with confirmed labels
    Store {
        #[arg(long)]
        text: String,

        /// Comma-separated label list, e.g. "数学 - 1次方程式"
        #[arg(long)]
        labels: String,
    },

    /// Search similar problems within a label set
    Search {
        #[arg(long)]
        text: String,

        /// Comma-separated label list to filter on
        #[arg(long)]
        labels: String,
    },
}
