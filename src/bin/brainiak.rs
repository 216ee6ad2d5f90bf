//! Brainiak CLI
//!
//! Runs gateway operations against a SPARQL endpoint and prints the resulting
//! JSON documents on stdout. Logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use brainiak::{ApiError, Gateway, QueryParams, Route, Settings};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "brainiak")]
#[command(about = "Hypermedia JSON views over an RDF/OWL knowledge base")]
#[command(version)]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SPARQL endpoint URL (overrides the settings file)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the named graphs of the knowledge base
    Contexts {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// List the classes of a context
    Classes {
        context: String,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Print the JSON Schema of a class
    Schema {
        context: String,
        class: String,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// List instances of a class
    List {
        context: String,
        class: String,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Print one instance
    Get {
        context: String,
        class: String,
        id: String,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Create an instance from a JSON file
    Create {
        context: String,
        class: String,
        /// Instance document
        #[arg(long)]
        body: PathBuf,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Replace an instance with the contents of a JSON file
    Edit {
        context: String,
        class: String,
        id: String,
        /// Instance document
        #[arg(long)]
        body: PathBuf,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Apply a list of patch operations to an instance
    Patch {
        context: String,
        class: String,
        id: String,
        /// JSON array of {op, path, value} operations
        #[arg(long)]
        ops: PathBuf,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Delete an instance
    Delete {
        context: String,
        class: String,
        id: String,
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Language of labels and literals (e.g. pt, en)
    #[arg(long)]
    lang: Option<String>,

    /// Page number, starting at 0
    #[arg(long)]
    page: Option<u64>,

    /// Items per page
    #[arg(long)]
    per_page: Option<u64>,

    /// Include item_count (runs an extra COUNT query)
    #[arg(long)]
    count: bool,

    /// Predicate to sort instances by
    #[arg(long)]
    sort_by: Option<String>,

    /// asc or desc
    #[arg(long)]
    sort_order: Option<String>,

    /// Only instances having this predicate
    #[arg(short = 'p', long)]
    predicate: Option<String>,

    /// Only instances having this object (URI, CURIE or literal)
    #[arg(short = 'o', long)]
    object: Option<String>,

    /// Extra query parameter, e.g. --param class_prefix=http://example.org/
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    params: Vec<(String, String)>,
}

impl QueryArgs {
    fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                pairs.push((key.to_string(), value));
            }
        };
        push("lang", self.lang.clone());
        push("page", self.page.map(|p| p.to_string()));
        push("per_page", self.per_page.map(|p| p.to_string()));
        push("do_item_count", self.count.then(|| "1".to_string()));
        push("sort_by", self.sort_by.clone());
        push("sort_order", self.sort_order.clone());
        push("p", self.predicate.clone());
        push("o", self.object.clone());
        pairs.extend(self.params.iter().cloned());
        pairs
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got \"{}\"", s))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "brainiak=info".into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = run(&cli).and_then(|doc| print_json(&doc, cli.pretty));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<Value, ApiError> {
    let gateway = connect(cli)?;

    match &cli.command {
        Commands::Contexts { query } => {
            let params = gateway.params(Route::default(), &query.pairs())?;
            gateway.catalog().list_contexts(&params)
        }
        Commands::Classes { context, query } => {
            let route = Route::new(Some(context.as_str()), None, None);
            let params = resolve(&gateway, route, query)?;
            gateway.catalog().list_classes(&params)
        }
        Commands::Schema {
            context,
            class,
            query,
        } => {
            let params = class_params(&gateway, context, class, query)?;
            gateway.class_schemas().get(&params)
        }
        Commands::List {
            context,
            class,
            query,
        } => {
            let params = class_params(&gateway, context, class, query)?;
            gateway.instances().list(&params)
        }
        Commands::Get {
            context,
            class,
            id,
            query,
        } => {
            let params = instance_params(&gateway, context, class, id, query)?;
            gateway.instances().get(&params)
        }
        Commands::Create {
            context,
            class,
            body,
            query,
        } => {
            let params = class_params(&gateway, context, class, query)?;
            gateway.instances().create(&params, &read_json(body)?)
        }
        Commands::Edit {
            context,
            class,
            id,
            body,
            query,
        } => {
            let params = instance_params(&gateway, context, class, id, query)?;
            gateway.instances().edit(&params, &read_json(body)?)
        }
        Commands::Patch {
            context,
            class,
            id,
            ops,
            query,
        } => {
            let params = instance_params(&gateway, context, class, id, query)?;
            gateway.instances().patch(&params, &read_json(ops)?)
        }
        Commands::Delete {
            context,
            class,
            id,
            query,
        } => {
            let params = instance_params(&gateway, context, class, id, query)?;
            gateway.instances().delete(&params)?;
            Ok(json!({"@id": params.require_instance()?.as_str(), "deleted": true}))
        }
    }
}

fn connect(cli: &Cli) -> Result<Gateway, ApiError> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(endpoint) = &cli.endpoint {
        settings.endpoint = endpoint.clone();
    }
    Gateway::connect(settings)
}

fn resolve(gateway: &Gateway, route: Route, query: &QueryArgs) -> Result<QueryParams, ApiError> {
    gateway.params(route, &query.pairs())
}

fn class_params(
    gateway: &Gateway,
    context: &str,
    class: &str,
    query: &QueryArgs,
) -> Result<QueryParams, ApiError> {
    resolve(gateway, Route::new(Some(context), Some(class), None), query)
}

fn instance_params(
    gateway: &Gateway,
    context: &str,
    class: &str,
    id: &str,
    query: &QueryArgs,
) -> Result<QueryParams, ApiError> {
    resolve(gateway, Route::new(Some(context), Some(class), Some(id)), query)
}

fn read_json(path: &Path) -> Result<Value, ApiError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ApiError::bad_request(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        ApiError::bad_request(format!("invalid JSON in {}: {}", path.display(), e))
    })
}

fn print_json(doc: &Value, pretty: bool) -> Result<(), ApiError> {
    let output = if pretty {
        serde_json::to_string_pretty(doc)
    } else {
        serde_json::to_string(doc)
    }
    .map_err(|source| ApiError::InvalidResponse { source })?;
    println!("{}", output);
    Ok(())
}

fn report(error: &ApiError) {
    let mut body = json!({
        "status": error.status_code(),
        "error": error.to_string()
    });
    if let ApiError::Invalid { errors } = error {
        body["errors"] = json!(errors);
    }
    eprintln!("{}", body);
}
