//! CLI definition for the mcmafia command-line interface.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::config::StoreFormat;

/// McMafia - chain-of-command bookkeeping
///
/// Reads and rewrites a flat member store, keeping each organization's
/// hierarchy intact as members are jailed and released.
#[derive(Parser, Debug)]
#[command(name = "mcmafia")]
#[command(version)]
#[command(about = "Chain-of-command bookkeeping for criminal organizations")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file (defaults to mcmafia.{toml,yaml,json} in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Member store file
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    /// Member store format
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<StoreFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List stored members
    List {
        /// Only the organization of this member
        #[arg(long, conflicts_with = "organization")]
        group_of: Option<String>,
        /// Only the organization with this name
        #[arg(long)]
        organization: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Count everyone under a member
    Subordinates {
        /// Member id
        id: String,
    },
    /// Show how far below the boss a member sits
    Level {
        /// Member id
        id: String,
    },
    /// Compare two members of the same organization
    Rank {
        /// First member id
        first: String,
        /// Second member id
        second: String,
    },
    /// Send a member to jail and promote a replacement
    Imprison {
        /// Member id
        id: String,
    },
    /// Release a jailed member back into the chain of command
    Release {
        /// Member id
        id: String,
    },
    /// Draw a member's organization as an indented tree
    Draw {
        /// Any member of the organization
        id: String,
        /// Payload field to label members with (defaults to the configured label)
        #[arg(long)]
        label: Option<String>,
        /// Read members from this JSON or YAML file instead of the store
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,
    },
    /// Upsert members from a JSON or YAML file
    ///
    /// The file holds a list of member records, or a document with a
    /// `members` list. Every organization the file touches must still form a
    /// valid chain of command afterwards, otherwise nothing is written.
    Import {
        /// Member file
        file: PathBuf,
    },
    /// Add a new member under a boss
    Enlist {
        /// Boss id
        boss: String,
        /// Display name of the new member
        name: String,
        /// Seniority timestamp (RFC 3339)
        #[arg(long)]
        started_at: Option<DateTime<Utc>>,
        /// Extra payload field, repeatable
        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

/// Parse a `key=value` pair
pub fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_with_globals() {
        let cli = Cli::parse_from(["mcmafia", "list", "--debug", "--format", "yaml", "--json"]);
        assert!(cli.debug);
        assert_eq!(cli.format, Some(StoreFormat::Yaml));
        assert!(matches!(
            cli.command,
            Commands::List {
                group_of: None,
                organization: None,
                json: true
            }
        ));
    }

    #[test]
    fn test_parse_rank() {
        let cli = Cli::parse_from(["mcmafia", "rank", "a", "b"]);
        assert!(matches!(
            cli.command,
            Commands::Rank { ref first, ref second } if first == "a" && second == "b"
        ));
    }

    #[test]
    fn test_parse_enlist_fields() {
        let cli = Cli::parse_from([
            "mcmafia",
            "enlist",
            "boss",
            "Popeye",
            "--started-at",
            "1985-06-05T14:48:00Z",
            "--field",
            "role=sicario",
            "--field",
            "age=30",
        ]);
        match cli.command {
            Commands::Enlist {
                boss,
                name,
                started_at,
                fields,
            } => {
                assert_eq!(boss, "boss");
                assert_eq!(name, "Popeye");
                assert!(started_at.is_some());
                assert_eq!(
                    fields,
                    vec![
                        ("role".to_string(), "sicario".to_string()),
                        ("age".to_string(), "30".to_string()),
                    ]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_field_rejects_missing_key() {
        assert!(parse_field("=x").is_err());
        assert!(parse_field("novalue").is_err());
        assert_eq!(
            parse_field("motto=plata=plomo").unwrap(),
            ("motto".to_string(), "plata=plomo".to_string())
        );
    }

    #[test]
    fn test_list_filters_conflict() {
        let cli = Cli::parse_from(["mcmafia", "list", "--organization", "Cartel de Cali"]);
        assert!(matches!(
            cli.command,
            Commands::List {
                organization: Some(ref name),
                group_of: None,
                ..
            } if name == "Cartel de Cali"
        ));

        assert!(Cli::try_parse_from([
            "mcmafia",
            "list",
            "--organization",
            "cali",
            "--group-of",
            "miguel"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_import_and_draw_from_file() {
        let cli = Cli::parse_from(["mcmafia", "import", "seed.yaml"]);
        assert!(matches!(
            cli.command,
            Commands::Import { ref file } if file == &PathBuf::from("seed.yaml")
        ));

        let cli = Cli::parse_from(["mcmafia", "draw", "boss", "--from", "snapshot.json"]);
        assert!(matches!(
            cli.command,
            Commands::Draw { from: Some(_), label: None, .. }
        ));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["mcmafia"]).is_err());
    }
}
