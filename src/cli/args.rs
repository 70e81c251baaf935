//! CLI argument definitions using clap
//!
//! Commands:
//! - docstore get <collection> <id>
//! - docstore list <collection> [--where f=v]... [--sort-by f] [--desc] [--offset n] [--limit n]
//! - docstore create <collection> <json>
//! - docstore update <collection> <id> <json>
//! - docstore delete <collection> <id>
//! - docstore count <collection> [--where f=v]...

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// docstore - a file-backed JSON record store
#[derive(Parser, Debug)]
#[command(name = "docstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Data directory (default: $DATA_DIR or ./data)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Primary-key field of the collection
    #[arg(long, global = true, default_value = "id")]
    pub primary_key: String,

    /// Write compact JSON files and output
    #[arg(long, global = true)]
    pub compact: bool,

    /// Emit logs on stderr as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print one record by primary key
    Get {
        collection: String,
        id: String,
    },

    /// Print matching records, sorted and paged
    List {
        collection: String,

        #[command(flatten)]
        filter: Filter,

        /// Field path to sort by
        #[arg(long)]
        sort_by: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Insert a record given as a JSON object
    Create {
        collection: String,
        record: String,
    },

    /// Merge a JSON object into an existing record
    Update {
        collection: String,
        id: String,
        patch: String,
    },

    /// Delete a record by primary key
    Delete {
        collection: String,
        id: String,
    },

    /// Print the number of matching records
    Count {
        collection: String,

        #[command(flatten)]
        filter: Filter,
    },
}

/// Equality conditions shared by `list` and `count`
#[derive(Args, Debug, Default)]
pub struct Filter {
    /// Condition as field=value; value is JSON, or a bare string
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    pub conditions: Vec<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from([
            "docstore", "--data-dir", "/tmp/db", "list", "posts", "--where", "author=ann", "--where",
            "meta.draft=false", "--sort-by", "createdAt", "--desc", "--limit", "5",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/db")));
        match cli.command {
            Command::List {
                collection,
                filter,
                sort_by,
                desc,
                offset,
                limit,
            } => {
                assert_eq!(collection, "posts");
                assert_eq!(filter.conditions, vec!["author=ann", "meta.draft=false"]);
                assert_eq!(sort_by.as_deref(), Some("createdAt"));
                assert!(desc);
                assert_eq!(offset, 0);
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["docstore", "get", "pages", "home", "--primary-key", "slug"]).unwrap();
        assert_eq!(cli.primary_key, "slug");
        assert!(cli.data_dir.is_none());
    }

    #[test]
    fn test_update_requires_patch() {
        assert!(Cli::try_parse_from(["docstore", "update", "users", "u1"]).is_err());
    }

    #[test]
    fn test_log_json_flag() {
        let cli = Cli::try_parse_from(["docstore", "count", "users"]).unwrap();
        assert!(!cli.log_json);

        let cli = Cli::try_parse_from(["docstore", "count", "users", "--log-json"]).unwrap();
        assert!(cli.log_json);
    }
}
