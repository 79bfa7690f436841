use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "subscription-relay")]
#[command(about = "School subscription estimator and real-time notification relay")]
pub struct CliConfig {
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Estimate the renewal cost for a plan and headcount
    Estimate {
        /// Plan name, e.g. free or student_premium
        #[arg(long, default_value = "free")]
        plan: String,

        #[arg(long, default_value = "yearly")]
        cycle: String,

        #[arg(long, default_value = "0")]
        students: String,

        #[arg(long, default_value = "0")]
        teachers: String,
    },

    /// Fetch the current subscription once and print a summary
    Status {
        /// Path to TOML configuration file
        #[arg(short, long, default_value = "relay.toml")]
        config: String,
    },

    /// Stay connected and print pushed events and refreshed subscription state
    Watch {
        /// Path to TOML configuration file
        #[arg(short, long, default_value = "relay.toml")]
        config: String,

        /// Override the JSON logging setting from config
        #[arg(long)]
        json_logs: Option<bool>,
    },
}
