use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "wp-clean-uploads")]
#[command(
    about = "Cleans the uploads folder from files no longer referenced in the database",
    long_about = None
)]
pub struct Cli {
    /// Config file name, without extension
    #[arg(long, default_value = "Config")]
    pub config: String,

    /// Print every deleted file and removed folder
    #[arg(short, long)]
    pub verbose: bool,
}
