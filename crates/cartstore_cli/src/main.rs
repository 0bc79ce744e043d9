//! Command-line driver for a SQLite-backed cart.
//!
//! # Responsibility
//! - Apply one cart command per invocation against a cart database file.
//! - Print the resulting cart in a stable, line-oriented format.
//! - Exit nonzero when the change could not be saved.

use anyhow::{bail, Context, Result};
use cartstore_core::db::open_db;
use cartstore_core::{
    default_log_level, init_logging, CartItem, CartStore, ItemId, KeyValueStore,
    SqliteKeyValueStore,
};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "cartstore", version, about = "Inspect and edit a persisted shopping cart")]
struct Cli {
    /// Cart database file.
    #[arg(long, env = "CARTSTORE_DB_PATH", default_value = "cartstore.sqlite3", global = true)]
    db: PathBuf,

    /// Absolute directory for rolling logs; logging stays off when unset.
    #[arg(long, env = "CARTSTORE_LOG_DIR", global = true)]
    log_dir: Option<String>,

    /// Log level used with --log-dir.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the cart.
    Show,
    /// Add one unit of an item.
    Add {
        #[command(flatten)]
        target: Target,
        /// Unit price.
        #[arg(long)]
        price: f64,
        /// Descriptive field as key=value; value is parsed as JSON when possible.
        #[arg(long = "attr", value_name = "KEY=VALUE")]
        attrs: Vec<String>,
    },
    /// Remove one unit of an item.
    Remove {
        #[command(flatten)]
        target: Target,
    },
    /// Remove an item whatever its quantity.
    RemoveItem {
        #[command(flatten)]
        target: Target,
    },
    /// Empty the cart.
    Clear,
    /// Print core version.
    Version,
}

#[derive(Debug, Args)]
struct Target {
    /// Item id; integers are numeric ids unless --text-id is given.
    id: String,
    /// Treat the id as a string even when it looks numeric.
    #[arg(long)]
    text_id: bool,
}

impl Target {
    fn item_id(&self) -> ItemId {
        parse_item_id(&self.id, self.text_id)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            bail!("logging init failed: {err}");
        }
    }

    if let Command::Version = cli.command {
        println!("cartstore_core version={}", cartstore_core::core_version());
        return Ok(());
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open cart database `{}`", cli.db.display()))?;
    let kv = SqliteKeyValueStore::try_new(&conn).context("cart database is not usable")?;
    let mut store = CartStore::open(kv);

    let outcome = apply(&mut store, &cli.command);
    let stdout = io::stdout();
    render(&mut stdout.lock(), &store)?;
    outcome
}

/// Runs one command against `store` and fails if its result was not saved.
fn apply<S: KeyValueStore>(store: &mut CartStore<S>, command: &Command) -> Result<()> {
    match command {
        Command::Show | Command::Version => return Ok(()),
        Command::Add {
            target,
            price,
            attrs,
        } => {
            let item = build_item(target.item_id(), *price, attrs)?;
            store.add_to_cart(&item);
        }
        Command::Remove { target } => {
            store.remove_from_cart(&target.item_id());
        }
        Command::RemoveItem { target } => {
            store.remove_item_from_cart(&target.item_id());
        }
        Command::Clear => {
            store.clear_cart();
        }
    }

    if let Some(err) = store.last_persist_error() {
        bail!("cart change was not saved: {err}");
    }
    Ok(())
}

fn parse_item_id(raw: &str, force_text: bool) -> ItemId {
    if !force_text {
        if let Ok(id) = raw.trim().parse::<i64>() {
            return ItemId::Int(id);
        }
    }
    ItemId::Text(raw.to_string())
}

fn build_item(id: ItemId, price: f64, attrs: &[String]) -> Result<CartItem> {
    let mut item = CartItem::new(id, price);
    if !item.has_finite_price() {
        bail!("price `{price}` is not a finite number");
    }
    for raw in attrs {
        let (key, value) = parse_attr(raw)?;
        item = item.with_attribute(key, value);
    }
    Ok(item)
}

fn parse_attr(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("attribute `{raw}` must look like key=value");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("attribute `{raw}` has an empty key");
    }
    let value =
        serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn render<S: KeyValueStore>(out: &mut impl Write, store: &CartStore<S>) -> io::Result<()> {
    for item in store.items() {
        writeln!(
            out,
            "{}\tx{}\t{:.2}\t{:.2}",
            item.id,
            item.quantity,
            item.price,
            item.line_total()
        )?;
    }
    writeln!(
        out,
        "items={} total={:.2}",
        store.cart_items_count(),
        store.cart_total()
    )?;

    let notification = store.notification();
    if notification.visible {
        writeln!(out, "notice={}", notification.kind.message())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply, build_item, parse_attr, parse_item_id, render, Cli, Command, Target};
    use cartstore_core::db::open_db_in_memory;
    use cartstore_core::{CartItem, CartStore, ItemId, SqliteKeyValueStore};
    use clap::Parser;
    use serde_json::json;

    #[test]
    fn numeric_ids_parse_as_integers_unless_forced() {
        assert_eq!(parse_item_id("42", false), ItemId::Int(42));
        assert_eq!(parse_item_id("42", true), ItemId::Text("42".to_string()));
        assert_eq!(parse_item_id("sku-9", false), ItemId::Text("sku-9".to_string()));
    }

    #[test]
    fn attributes_prefer_json_values() {
        assert_eq!(parse_attr("stock=3").unwrap(), ("stock".to_string(), json!(3)));
        assert_eq!(
            parse_attr("name=Blue Mug").unwrap(),
            ("name".to_string(), json!("Blue Mug"))
        );
        assert!(parse_attr("novalue").is_err());
        assert!(parse_attr("=x").is_err());
    }

    #[test]
    fn build_item_skips_reserved_attributes() {
        let item = build_item(
            ItemId::Int(1),
            2.0,
            &["quantity=5".to_string(), "name=Pen".to_string()],
        )
        .unwrap();

        assert_eq!(item.quantity, 1);
        assert_eq!(item.attribute("name"), Some(&json!("Pen")));
    }

    #[test]
    fn build_item_rejects_non_finite_price() {
        let err = build_item(ItemId::Int(1), f64::INFINITY, &[]).unwrap_err();
        assert!(err.to_string().contains("not a finite number"));
    }

    #[test]
    fn apply_fails_when_change_is_not_saved() {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TRIGGER kv_entries_read_only BEFORE INSERT ON kv_entries
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();
        let kv = SqliteKeyValueStore::try_new(&conn).unwrap();
        let mut store = CartStore::open(kv);
        let command = Command::Add {
            target: Target {
                id: "pen".to_string(),
                text_id: false,
            },
            price: 1.5,
            attrs: Vec::new(),
        };

        let err = apply(&mut store, &command).unwrap_err();

        assert!(err.to_string().contains("not saved"), "{err}");
        assert_eq!(store.cart_items_count(), 1);
    }

    #[test]
    fn apply_succeeds_when_change_is_saved() {
        let conn = open_db_in_memory().unwrap();
        let kv = SqliteKeyValueStore::try_new(&conn).unwrap();
        let mut store = CartStore::open(kv);

        assert!(apply(&mut store, &Command::Clear).is_ok());
        assert!(apply(&mut store, &Command::Show).is_ok());
    }

    #[test]
    fn add_command_parses_price_and_repeated_attrs() {
        let cli = Cli::try_parse_from([
            "cartstore",
            "--db",
            "/tmp/c.db",
            "add",
            "7",
            "--price",
            "3.5",
            "--attr",
            "a=1",
            "--attr",
            "b=2",
        ])
        .unwrap();

        match cli.command {
            Command::Add {
                target,
                price,
                attrs,
            } => {
                assert_eq!(target.item_id(), ItemId::Int(7));
                assert_eq!(price, 3.5);
                assert_eq!(attrs.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn render_prints_lines_total_and_notice() {
        let conn = open_db_in_memory().unwrap();
        let kv = SqliteKeyValueStore::try_new(&conn).unwrap();
        let mut store = CartStore::open(kv);
        store.add_to_cart(&CartItem::new("pen", 1.5));
        store.add_to_cart(&CartItem::new("pen", 1.5));

        let mut out = Vec::new();
        render(&mut out, &store).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "pen\tx2\t1.50\t3.00\nitems=1 total=3.00\nnotice=Item added to cart\n"
        );
    }
}
