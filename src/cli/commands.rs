use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::eligibility::EligibilityCriteria;

#[derive(Parser)]
#[command(name = "internship-notify")]
#[command(about = "Match students against internship criteria and email the eligible ones")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP notification service
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Notify eligible students once from the command line
    Notify {
        #[command(flatten)]
        criteria: CriteriaArgs,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Dry run mode (list recipients without sending)
        #[arg(long)]
        dry_run: bool,
    },

    /// Show which students match without sending anything
    Preview {
        #[command(flatten)]
        criteria: CriteriaArgs,

        /// Print the reason for every student
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show recent notification runs
    History {
        /// Number of runs to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show totals across recorded runs
    Stats {
        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Initialize the history database and show configuration
    Init,
}

#[derive(Args, Debug, Clone)]
pub struct CriteriaArgs {
    /// Internship name used in the email subject and body
    #[arg(short, long)]
    pub internship: String,

    /// Minimum CGPA (inclusive)
    #[arg(short, long)]
    pub min_cgpa: f64,

    /// Required skill; repeat for several
    #[arg(short, long = "skill")]
    pub skills: Vec<String>,

    /// Roster file overriding the configured one
    #[arg(short, long)]
    pub roster: Option<PathBuf>,
}

impl CriteriaArgs {
    pub fn criteria(&self) -> EligibilityCriteria {
        EligibilityCriteria::new(self.internship.clone(), self.min_cgpa, self.skills.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notify() {
        let cli = Cli::try_parse_from([
            "internship-notify",
            "notify",
            "--internship",
            "Data Intern",
            "--min-cgpa",
            "7.5",
            "--skill",
            "Python",
            "--skill",
            "SQL",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Commands::Notify {
                criteria,
                yes,
                dry_run,
            } => {
                let criteria = criteria.criteria();
                assert_eq!(criteria.internship_name, "Data Intern");
                assert_eq!(criteria.min_cgpa, 7.5);
                assert_eq!(criteria.required_skills, vec!["Python", "SQL"]);
                assert!(dry_run);
                assert!(!yes);
            }
            _ => panic!("expected notify command"),
        }
        assert_eq!(cli.config, "config/default.toml");
    }

    #[test]
    fn test_skills_optional() {
        let cli = Cli::try_parse_from([
            "internship-notify",
            "preview",
            "-i",
            "Ops Intern",
            "-m",
            "6",
        ])
        .unwrap();

        match cli.command {
            Commands::Preview { criteria, .. } => assert!(criteria.skills.is_empty()),
            _ => panic!("expected preview command"),
        }
    }
}
