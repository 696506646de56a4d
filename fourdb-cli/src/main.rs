use clap::{Parser, Subcommand, ValueEnum};
use fourdb::schema::{parse_raw_schema_str, parse_schema};
use fourdb::{sql, Crud, Document, Store};
use std::path::{Path, PathBuf};
use std::process;

/// FourDB CLI: define collections and run CRUD against a FourDB backing file
#[derive(Parser)]
#[command(name = "fourdb", version, about)]
struct Cli {
    /// Path to the backing JSON file
    #[arg(long, env = "FOURDB_FILE", default_value = "fourdb.json")]
    file: PathBuf,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Create a collection or replace its schema
    Define {
        /// Collection name
        collection: String,
        /// Schema file (YAML or JSON)
        #[arg(long)]
        schema: PathBuf,
    },

    /// List every document in a collection
    All {
        /// Collection name
        collection: String,
    },

    /// List documents matching all conditions
    Find {
        /// Collection name
        collection: String,
        /// Equality conditions (e.g. --where status=published)
        #[arg(long = "where", value_parser = parse_key_value)]
        conditions: Vec<(String, String)>,
    },

    /// Show the first document matching all conditions
    FindOne {
        /// Collection name
        collection: String,
        /// Equality conditions (e.g. --where id=p1)
        #[arg(long = "where", value_parser = parse_key_value)]
        conditions: Vec<(String, String)>,
    },

    /// Insert a new document
    Create {
        /// Collection name
        collection: String,
        /// Field values (e.g. --field title="Hello")
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Patch the first matching document
    Update {
        /// Collection name
        collection: String,
        /// Equality conditions selecting the document
        #[arg(long = "where", value_parser = parse_key_value)]
        conditions: Vec<(String, String)>,
        /// Field values to set
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Delete the first matching document
    Delete {
        /// Collection name
        collection: String,
        /// Equality conditions selecting the document
        #[arg(long = "where", value_parser = parse_key_value)]
        conditions: Vec<(String, String)>,
    },

    /// Print the CREATE TABLE statement for a schema file
    Ddl {
        /// Table name
        table: String,
        /// Schema file (YAML or JSON)
        #[arg(long)]
        schema: PathBuf,
    },

    /// Print the INSERT statement for a set of fields
    InsertSql {
        /// Table name
        table: String,
        /// Field values (e.g. --field id=1)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("Invalid key=value pair: no '=' found in '{s}'"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    log::debug!("Backing file: {}", cli.file.display());
    match cli.command {
        Command::Define { collection, schema } => {
            let raw = parse_raw_schema_str(&read_file(&schema)?)?;
            let mut store = Store::open_or_create(&cli.file)?;
            store.define_collection(&collection, &raw)?;
            print_output(
                &serde_json::json!({ "ok": true, "defined": collection }),
                &cli.format,
            )?;
        }

        Command::All { collection } => {
            let mut store = Store::open(&cli.file)?;
            let docs = store.collection(&collection)?.get_all()?;
            print_output(&serde_json::to_value(docs)?, &cli.format)?;
        }

        Command::Find {
            collection,
            conditions,
        } => {
            let mut store = Store::open(&cli.file)?;
            let docs = store
                .collection(&collection)?
                .find_many(&fields_to_document(&conditions))?;
            print_output(&serde_json::to_value(docs)?, &cli.format)?;
        }

        Command::FindOne {
            collection,
            conditions,
        } => {
            let mut store = Store::open(&cli.file)?;
            let doc = store
                .collection(&collection)?
                .find_one(&fields_to_document(&conditions))?;
            print_output(&serde_json::to_value(doc)?, &cli.format)?;
        }

        Command::Create { collection, fields } => {
            let mut store = Store::open(&cli.file)?;
            let doc = store
                .collection(&collection)?
                .create(fields_to_document(&fields))?;
            print_output(&serde_json::Value::Object(doc), &cli.format)?;
        }

        Command::Update {
            collection,
            conditions,
            fields,
        } => {
            let mut store = Store::open(&cli.file)?;
            let doc = store
                .collection(&collection)?
                .update(&fields_to_document(&conditions), &fields_to_document(&fields))?;
            print_output(&serde_json::to_value(doc)?, &cli.format)?;
        }

        Command::Delete {
            collection,
            conditions,
        } => {
            let mut store = Store::open(&cli.file)?;
            let doc = store
                .collection(&collection)?
                .delete(&fields_to_document(&conditions))?;
            print_output(&serde_json::to_value(doc)?, &cli.format)?;
        }

        Command::Ddl { table, schema } => {
            let schema = parse_schema(&schema)?;
            println!("{}", sql::render_create_table(&table, &schema)?);
        }

        Command::InsertSql { table, fields } => {
            println!("{}", sql::render_insert(&table, &fields_to_document(&fields))?);
        }
    }

    Ok(())
}

fn read_file(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {e}", path.display()).into())
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

/// Values parse as JSON when they can (numbers, booleans, arrays), else stay strings.
fn fields_to_document(fields: &[(String, String)]) -> Document {
    let mut map = Document::new();
    for (key, val) in fields {
        let json_val =
            serde_json::from_str(val).unwrap_or_else(|_| serde_json::Value::String(val.clone()));
        map.insert(key.clone(), json_val);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("title=a=b").unwrap(),
            ("title".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("title").is_err());
    }

    #[test]
    fn test_fields_parse_as_json_when_possible() {
        let doc = fields_to_document(&[
            ("views".into(), "3".into()),
            ("draft".into(), "true".into()),
            ("title".into(), "Hello world".into()),
            ("tags".into(), "[\"a\"]".into()),
        ]);
        assert_eq!(doc["views"], json!(3));
        assert_eq!(doc["draft"], json!(true));
        assert_eq!(doc["title"], json!("Hello world"));
        assert_eq!(doc["tags"], json!(["a"]));
    }
}
