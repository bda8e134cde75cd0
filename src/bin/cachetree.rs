use cachetree::{
  Cachetree, CompoundKey, FieldReply, FieldValue, FieldWrites, KeyNode, KeyPattern, Segment,
  TreeConfig,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cachetree", about = "Hierarchical cache key shell", version)]
struct Args {
  #[arg(short, long, env = "CACHETREE_CONFIG")]
  config: Option<String>,
  #[arg(long)]
  prefix: Option<String>,
  #[arg(long)]
  delimiter: Option<String>,
  #[arg(long)]
  log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
  let args = Args::parse();

  // Load config: explicit path > auto-detect > defaults
  let mut config = if let Some(path) = &args.config {
    TreeConfig::from_file(path)?
  } else {
    TreeConfig::find_and_load()?.unwrap_or_default()
  };

  if let Some(prefix) = args.prefix {
    config.prefix = Segment::from(prefix);
  }
  if let Some(delimiter) = args.delimiter.filter(|d| !d.is_empty()) {
    config.delimiter = delimiter;
  }
  if let Some(level) = args.log_level {
    config.log_level = level;
  }

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_level.clone().into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let tree = Cachetree::with_config(config)?;
  tracing::info!("Tree ready at {:?}", tree.cache_key());

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  while let Some(line) = lines.next_line().await? {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((command, rest)) = words.split_first() else {
      continue;
    };
    if *command == "quit" || *command == "exit" {
      break;
    }
    match run(&tree, command, rest).await {
      Ok(reply) => println!("{}", reply),
      Err(e) => println!("ERR {}", e),
    }
  }

  Ok(())
}

async fn run(tree: &Cachetree, command: &str, args: &[&str]) -> anyhow::Result<String> {
  let delimiter = tree.tree().delimiter();
  let key = |i: usize| -> anyhow::Result<CompoundKey> {
    let raw = args
      .get(i)
      .ok_or_else(|| anyhow::anyhow!("{} needs a key", command))?;
    Ok(CompoundKey::split(raw, delimiter))
  };
  let store = tree.store();

  let reply = match command {
    "get" => {
      let fields = &args[1.min(args.len())..];
      render_reply(store.get(&key(0)?, fields).await?)
    }
    "set" => {
      let items = args
        .get(1..)
        .unwrap_or_default()
        .iter()
        .map(|s| FieldValue::parse_text(s))
        .collect();
      let writes = FieldWrites::from_flat(items)?;
      store.set(&key(0)?, writes).await?.to_string()
    }
    "del" => {
      let fields = args.get(1..).unwrap_or_default();
      store.del(&key(0)?, fields).await?.to_string()
    }
    "exists" => store
      .exists(&key(0)?, args.get(1).copied())
      .await?
      .to_string(),
    "fields" => store.fields(&key(0)?).await?.join(" "),
    "keys" => {
      let pattern = args
        .first()
        .ok_or_else(|| anyhow::anyhow!("keys needs a pattern"))?;
      store.keys(&KeyPattern::from(*pattern)).await?.join(" ")
    }
    "flush" => flush_node(tree, key(0)?).await?.to_string(),
    "walk" => {
      let node = walk(tree, args)?;
      node.cache_key().unwrap_or_default()
    }
    other => anyhow::bail!("unknown command '{}'", other),
  };
  Ok(reply)
}

/// Follow `child[=value]` steps from the root
fn walk(tree: &Cachetree, steps: &[&str]) -> anyhow::Result<KeyNode> {
  let mut node = tree.node().clone();
  for step in steps {
    let (name, value) = match step.split_once('=') {
      Some((name, value)) => (name, Some(segment(value))),
      None => (*step, None),
    };
    node = node.child(name, value)?;
  }
  Ok(node)
}

async fn flush_node(tree: &Cachetree, key: CompoundKey) -> anyhow::Result<usize> {
  let node = if key.len() == 1 {
    KeyNode::root(key, tree.tree())?
  } else {
    KeyNode::new(key, tree.tree())?
  };
  Ok(node.flush().await?)
}

fn segment(text: &str) -> Segment {
  match text.parse::<i64>() {
    Ok(i) => Segment::Int(i),
    Err(_) => Segment::from(text),
  }
}

fn render_reply(reply: FieldReply) -> String {
  match reply {
    FieldReply::Value(Some(v)) => v.to_plain_string(),
    FieldReply::Value(None) => "(nil)".to_string(),
    FieldReply::All(map) => map
      .iter()
      .map(|(f, v)| format!("{}={}", f, v.to_plain_string()))
      .collect::<Vec<_>>()
      .join(" "),
    FieldReply::Fields(map) => map
      .iter()
      .map(|(f, v)| match v {
        Some(v) => format!("{}={}", f, v.to_plain_string()),
        None => format!("{}=(nil)", f),
      })
      .collect::<Vec<_>>()
      .join(" "),
  }
}
