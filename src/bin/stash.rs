use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::sync::Arc;
use webstash::config::format_size;
use webstash::{Backends, EntryStore, FileBackend, MemoryBackend, StashConfig, StoreOptions};

#[derive(Parser)]
#[command(name = "stash", about = "Namespaced key-value storage with expiry", version)]
struct Args {
  #[arg(short, long, env = "STASH_CONFIG")]
  config: Option<String>,
  /// Data file of the persistent backend
  #[arg(long, env = "STASH_DATA")]
  data: Option<String>,
  #[arg(long)]
  log_level: Option<String>,
  #[command(flatten)]
  scope: Scope,
  #[command(subcommand)]
  command: Command,
}

#[derive(clap::Args)]
struct Scope {
  /// Backend alias: local/l for the data file, anything else for the session
  #[arg(long = "use", global = true)]
  backend: Option<String>,
  #[arg(short, long, global = true)]
  namespace: Option<String>,
  /// Expire after this many milliseconds
  #[arg(short, long, global = true, allow_negative_numbers = true)]
  expire: Option<i64>,
  /// Delete the entry once it has been read
  #[arg(long, global = true)]
  once: bool,
  /// Store without the type envelope
  #[arg(long, global = true)]
  loose: bool,
}

impl Scope {
  fn options(&self) -> StoreOptions {
    let mut opts = StoreOptions::new();
    if let Some(alias) = &self.backend {
      opts = opts.use_backend(alias);
    }
    if let Some(namespace) = &self.namespace {
      opts = opts.namespace(namespace.clone());
    }
    if let Some(ms) = self.expire {
      opts = opts.expire(ms);
    }
    if self.once {
      opts = opts.once();
    }
    if self.loose {
      opts = opts.loose();
    }
    opts
  }
}

#[derive(Subcommand)]
enum Command {
  /// Print a value as JSON
  Get { key: String },
  /// Store a value (parsed as JSON, otherwise kept as text)
  Set { key: String, value: String },
  /// Delete one or more keys
  Remove {
    #[arg(required = true)]
    keys: Vec<String>,
  },
  /// Delete every key in the namespace, or everything without one
  Clear,
  /// List keys in the namespace
  Keys,
}

fn main() -> Result<(), anyhow::Error> {
  let args = Args::parse();

  // Config: explicit path > auto-detect > defaults
  let mut config = match &args.config {
    Some(path) => StashConfig::from_file(path)?,
    None => StashConfig::find_and_load()?.unwrap_or_default(),
  };

  if let Some(path) = args.data {
    config.storage.path = path;
  }
  if let Some(level) = args.log_level {
    config.logging.level = level;
  }

  webstash::logging::init(&config.logging);

  let mut persistent = FileBackend::open(&config.storage.path)
    .with_context(|| format!("opening data file {}", config.storage.path))?;
  if let Some(quota) = config.storage.quota_bytes() {
    tracing::debug!("Persistent quota {}", format_size(quota));
    persistent = persistent.with_quota(quota);
  }

  let mut session = MemoryBackend::new("session");
  if let Some(quota) = config.storage.session_quota_bytes() {
    session = session.with_quota(quota);
  }

  let store = EntryStore::with_defaults(
    Backends::new(Arc::new(persistent), Arc::new(session)),
    config.defaults.clone(),
  );
  let opts = args.scope.options();

  match args.command {
    Command::Get { key } => match store.get(&key, &opts) {
      Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
      None => println!("(nil)"),
    },
    Command::Set { key, value } => {
      let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
      store.set(&key, Some(value), &opts)?;
      println!("OK");
    }
    Command::Remove { keys } => {
      store.remove_many(&keys, &opts);
      println!("OK");
    }
    Command::Clear => {
      store.clear(&opts);
      println!("OK");
    }
    Command::Keys => {
      for key in store.keys(&opts) {
        println!("{}", key);
      }
    }
  }

  Ok(())
}
