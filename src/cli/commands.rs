//! CLI command implementations
//!
//! Each command opens the collection through a `Database`, performs one
//! operation, and yields the JSON document to print. Record ids given on
//! the command line are always strings.

use serde_json::{json, Value};

use super::args::{Cli, Command};
use super::errors::CliResult;
use super::io::{parse_conditions, parse_record, write_response};
use crate::collection::{CollectionOptions, FindOptions, SortDir, StoreError};
use crate::database::{Database, DatabaseConfig};

/// Run an already-parsed command line
pub async fn run_cli(cli: Cli) -> CliResult<()> {
    let mut config = match cli.data_dir {
        Some(dir) => DatabaseConfig::with_data_dir(dir),
        None => DatabaseConfig::from_env(),
    };
    if cli.compact {
        config = config.compact();
    }
    let pretty = config.pretty;

    let db = Database::open(config);
    let options = CollectionOptions::new().primary_key(cli.primary_key);
    let output = execute(&db, options, cli.command).await;
    db.close().await;

    write_response(&output?, pretty)
}

/// Run one command against `db`
pub async fn execute(db: &Database, options: CollectionOptions, command: Command) -> CliResult<Value> {
    match command {
        Command::Get { collection, id } => {
            let store = db.collection(&collection, options)?;
            match store.read(id.as_str()).await? {
                Some(record) => Ok(Value::Object(record)),
                None => Err(StoreError::NotFound { collection, key: id }.into()),
            }
        }

        Command::List {
            collection,
            filter,
            sort_by,
            desc,
            offset,
            limit,
        } => {
            let store = db.collection(&collection, options)?;
            let query = parse_conditions(&filter.conditions)?;
            let find = FindOptions {
                sort_by,
                sort_dir: if desc { SortDir::Desc } else { SortDir::Asc },
                offset,
                limit,
            };
            let page = store.find_many(&query, &find).await?;
            Ok(serde_json::to_value(page)?)
        }

        Command::Create { collection, record } => {
            let store = db.collection(&collection, options)?;
            let created = store.create(parse_record(&record)?).await?;
            Ok(Value::Object(created))
        }

        Command::Update { collection, id, patch } => {
            let store = db.collection(&collection, options)?;
            let updated = store.update(id, parse_record(&patch)?).await?;
            Ok(Value::Object(updated))
        }

        Command::Delete { collection, id } => {
            let store = db.collection(&collection, options)?;
            let deleted = store.remove(id.as_str()).await?;
            tracing::info!(collection = %collection, id = %id, deleted, "delete");
            Ok(json!({ "deleted": deleted }))
        }

        Command::Count { collection, filter } => {
            let store = db.collection(&collection, options)?;
            let query = parse_conditions(&filter.conditions)?;
            Ok(json!({ "count": store.count(&query).await? }))
        }
    }
}
