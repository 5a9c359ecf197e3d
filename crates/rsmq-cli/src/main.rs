use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use rsmq_core::{
    ChangeMessageVisibility, CreateQueue, DeleteMessage, MaxSize, QueueAttributes, QueueMessage,
    ReceiveMessage, Rsmq, RsmqConfig, RsmqError, SendMessage, SetQueueAttributes,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

const CONFIG_PATHS: [&str; 2] = ["rsmq.toml", "/etc/rsmq/rsmq.toml"];

#[derive(Parser)]
#[command(name = "rsmq", about = "Redis simple message queue CLI")]
struct Cli {
    /// Redis server URL (overrides the config file)
    #[arg(long, env = "RSMQ_REDIS_URL", global = true)]
    url: Option<String>,

    /// Key namespace (overrides the config file)
    #[arg(long, env = "RSMQ_NS", global = true)]
    ns: Option<String>,

    /// Config file to load instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage queues
    #[command(subcommand)]
    Queue(QueueCommands),

    /// Send a message
    Send {
        /// Queue name
        qname: String,

        /// Message body
        message: String,

        /// Seconds before the message becomes visible (default: queue delay)
        #[arg(long)]
        delay: Option<u32>,
    },

    /// Receive a message and hide it for the visibility timeout
    Receive {
        /// Queue name
        qname: String,

        /// Visibility timeout in seconds (default: queue vt)
        #[arg(long)]
        vt: Option<u32>,
    },

    /// Receive and delete a message in one step
    Pop {
        /// Queue name
        qname: String,
    },

    /// Delete a message
    DeleteMessage {
        /// Queue name
        qname: String,

        /// Message id
        id: String,
    },

    /// Change when a message becomes visible again
    Visibility {
        /// Queue name
        qname: String,

        /// Message id
        id: String,

        /// Seconds from now until the message is visible
        vt: u32,
    },
}

#[derive(Subcommand)]
enum QueueCommands {
    /// Create a new queue
    Create {
        /// Queue name
        name: String,

        #[command(flatten)]
        attrs: AttributeArgs,
    },

    /// Delete a queue and all of its messages
    Delete {
        /// Queue name
        name: String,
    },

    /// List all queues
    List,

    /// Show queue attributes and message counts
    Attrs {
        /// Queue name
        name: String,
    },

    /// Change queue attributes
    Set {
        /// Queue name
        name: String,

        #[command(flatten)]
        attrs: AttributeArgs,
    },
}

#[derive(Args)]
struct AttributeArgs {
    /// Visibility timeout in seconds
    #[arg(long)]
    vt: Option<u32>,

    /// Delivery delay in seconds
    #[arg(long)]
    delay: Option<u32>,

    /// Maximum message size in bytes, or -1 for unlimited
    #[arg(long, allow_negative_numbers = true)]
    maxsize: Option<MaxSize>,
}

/// Load the first config file that exists, or the defaults if none does.
fn load_config(paths: &[&Path]) -> Result<RsmqConfig, String> {
    for path in paths {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| format!("error reading {}: {e}", path.display()))?;
            let config = toml::from_str(&contents)
                .map_err(|e| format!("error parsing {}: {e}", path.display()))?;
            info!(path = %path.display(), "loaded configuration");
            return Ok(config);
        }
    }
    Ok(RsmqConfig::default())
}

fn resolve_config(cli: &Cli) -> Result<RsmqConfig, String> {
    let mut config = match &cli.config {
        Some(path) if !path.exists() => {
            return Err(format!("config file {} does not exist", path.display()))
        }
        Some(path) => load_config(&[path.as_path()])?,
        None => {
            let paths: Vec<&Path> = CONFIG_PATHS.iter().map(Path::new).collect();
            load_config(&paths)?
        }
    };
    if let Some(url) = &cli.url {
        config.redis.url = url.clone();
    }
    if let Some(ns) = &cli.ns {
        config.ns = ns.clone();
    }
    Ok(config)
}

fn format_error(err: &RsmqError) -> String {
    match err {
        RsmqError::QueueNotFound(name) => format!("Error: queue \"{name}\" does not exist"),
        RsmqError::QueueAlreadyExists(name) => format!("Error: queue \"{name}\" already exists"),
        RsmqError::Validation(e) => format!("Error: {e}"),
        RsmqError::Store(e) => format!("Error: {e}"),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(out) => println!("{out}"),
        Err(e) => {
            eprintln!("Error: cannot encode output: {e}");
            process::exit(1);
        }
    }
}

fn print_attributes(name: &str, attrs: &QueueAttributes) {
    println!("Queue: {name}");
    println!("  Visibility timeout: {}s", attrs.vt);
    println!("  Delay:              {}s", attrs.delay);
    println!("  Max size:           {}", attrs.maxsize);
    println!("  Messages:           {}", attrs.msgs);
    println!("  Hidden:             {}", attrs.hiddenmsgs);
    println!("  Total sent:         {}", attrs.totalsent);
    println!("  Total received:     {}", attrs.totalrecv);
    println!("  Created:            {}", attrs.created);
    println!("  Modified:           {}", attrs.modified);
}

fn print_message(message: Option<&QueueMessage>, json: bool) {
    match (message, json) {
        (msg, true) => print_json(&msg),
        (None, false) => println!("No message available."),
        (Some(msg), false) => {
            println!("Id:            {}", msg.id);
            println!("Receive count: {}", msg.rc);
            println!("First receive: {}", msg.fr);
            println!("Sent:          {}", msg.sent);
            println!();
            println!("{}", msg.message);
        }
    }
}

fn cmd_queue_create(
    rsmq: &Rsmq,
    name: String,
    attrs: AttributeArgs,
    json: bool,
) -> rsmq_core::Result<()> {
    let mut params = CreateQueue::new(name.clone());
    if let Some(vt) = attrs.vt {
        params.vt = vt;
    }
    if let Some(delay) = attrs.delay {
        params.delay = delay;
    }
    if let Some(maxsize) = attrs.maxsize {
        params.maxsize = maxsize;
    }
    rsmq.create_queue(&params)?;
    if json {
        print_json(&json!({ "created": name }));
    } else {
        println!("Created queue \"{name}\"");
    }
    Ok(())
}

fn cmd_queue_delete(rsmq: &Rsmq, name: String, json: bool) -> rsmq_core::Result<()> {
    rsmq.delete_queue(&name)?;
    if json {
        print_json(&json!({ "deleted": name }));
    } else {
        println!("Deleted queue \"{name}\"");
    }
    Ok(())
}

fn cmd_queue_list(rsmq: &Rsmq, json: bool) -> rsmq_core::Result<()> {
    let queues = rsmq.list_queues()?;
    if json {
        print_json(&queues);
    } else if queues.is_empty() {
        println!("No queues found.");
    } else {
        for name in &queues {
            println!("{name}");
        }
    }
    Ok(())
}

fn cmd_queue_attrs(rsmq: &Rsmq, name: String, json: bool) -> rsmq_core::Result<()> {
    let attrs = rsmq.get_queue_attributes(&name)?;
    if json {
        print_json(&attrs);
    } else {
        print_attributes(&name, &attrs);
    }
    Ok(())
}

fn cmd_queue_set(
    rsmq: &Rsmq,
    name: String,
    attrs: AttributeArgs,
    json: bool,
) -> rsmq_core::Result<()> {
    let params = SetQueueAttributes {
        qname: name.clone(),
        vt: attrs.vt,
        delay: attrs.delay,
        maxsize: attrs.maxsize,
    };
    let updated = rsmq.set_queue_attributes(&params)?;
    if json {
        print_json(&updated);
    } else {
        print_attributes(&name, &updated);
    }
    Ok(())
}

fn cmd_send(rsmq: &Rsmq, params: SendMessage, json: bool) -> rsmq_core::Result<()> {
    let id = rsmq.send_message(&params)?;
    if json {
        print_json(&json!({ "id": id }));
    } else {
        println!("{id}");
    }
    Ok(())
}

fn cmd_delete_message(rsmq: &Rsmq, params: DeleteMessage, json: bool) -> rsmq_core::Result<()> {
    let deleted = rsmq.delete_message(&params)?;
    if json {
        print_json(&json!({ "deleted": deleted }));
    } else if deleted {
        println!("Deleted message {}", params.id);
    } else {
        println!("Message {} not found", params.id);
    }
    Ok(())
}

fn cmd_visibility(
    rsmq: &Rsmq,
    params: ChangeMessageVisibility,
    json: bool,
) -> rsmq_core::Result<()> {
    let changed = rsmq.change_message_visibility(&params)?;
    if json {
        print_json(&json!({ "changed": changed }));
    } else if changed {
        println!("Message {} visible in {}s", params.id, params.vt);
    } else {
        println!("Message {} not found", params.id);
    }
    Ok(())
}

fn run(rsmq: &Rsmq, command: Commands, json: bool) -> rsmq_core::Result<()> {
    match command {
        Commands::Queue(cmd) => match cmd {
            QueueCommands::Create { name, attrs } => cmd_queue_create(rsmq, name, attrs, json),
            QueueCommands::Delete { name } => cmd_queue_delete(rsmq, name, json),
            QueueCommands::List => cmd_queue_list(rsmq, json),
            QueueCommands::Attrs { name } => cmd_queue_attrs(rsmq, name, json),
            QueueCommands::Set { name, attrs } => cmd_queue_set(rsmq, name, attrs, json),
        },
        Commands::Send {
            qname,
            message,
            delay,
        } => {
            let params = SendMessage {
                qname,
                message,
                delay,
            };
            cmd_send(rsmq, params, json)
        }
        Commands::Receive { qname, vt } => {
            let message = rsmq.receive_message(&ReceiveMessage { qname, vt })?;
            print_message(message.as_ref(), json);
            Ok(())
        }
        Commands::Pop { qname } => {
            let message = rsmq.pop_message(&qname)?;
            print_message(message.as_ref(), json);
            Ok(())
        }
        Commands::DeleteMessage { qname, id } => {
            cmd_delete_message(rsmq, DeleteMessage::new(qname, id), json)
        }
        Commands::Visibility { qname, id, vt } => {
            cmd_visibility(rsmq, ChangeMessageVisibility::new(qname, id, vt), json)
        }
    }
}

fn main() {
    rsmq_core::telemetry::init_tracing("warn");
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let rsmq = match Rsmq::from_config(&config) {
        Ok(rsmq) => rsmq,
        Err(e) => {
            eprintln!("{}", format_error(&e));
            process::exit(1);
        }
    };

    if let Err(e) = run(&rsmq, cli.command, cli.json) {
        eprintln!("{}", format_error(&e));
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rsmq_core::ValidationError;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_queue_create_with_unlimited_maxsize() {
        let cli = Cli::try_parse_from([
            "rsmq", "queue", "create", "jobs", "--vt", "60", "--maxsize", "-1",
        ])
        .unwrap();
        match cli.command {
            Commands::Queue(QueueCommands::Create { name, attrs }) => {
                assert_eq!(name, "jobs");
                assert_eq!(attrs.vt, Some(60));
                assert_eq!(attrs.delay, None);
                assert_eq!(attrs.maxsize, Some(MaxSize::Unlimited));
            }
            _ => panic!("expected queue create"),
        }
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "rsmq",
            "send",
            "jobs",
            "hello",
            "--delay",
            "5",
            "--json",
            "--url",
            "redis://example:6379",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.url.as_deref(), Some("redis://example:6379"));
        match cli.command {
            Commands::Send {
                qname,
                message,
                delay,
            } => {
                assert_eq!(qname, "jobs");
                assert_eq!(message, "hello");
                assert_eq!(delay, Some(5));
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn rejects_malformed_maxsize() {
        assert!(Cli::try_parse_from(["rsmq", "queue", "set", "jobs", "--maxsize", "big"]).is_err());
    }

    #[test]
    fn load_config_uses_first_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        std::fs::write(&first, "ns = \"first\"\n").unwrap();
        std::fs::write(&second, "ns = \"second\"\n").unwrap();

        let config = load_config(&[missing.as_path(), first.as_path(), second.as_path()]).unwrap();
        assert_eq!(config.ns, "first");
    }

    #[test]
    fn load_config_defaults_when_nothing_exists() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&[dir.path().join("nope.toml").as_path()]).unwrap();
        assert_eq!(config.ns, "rsmq");
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
    }

    #[test]
    fn load_config_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "ns = [").unwrap();
        let err = load_config(&[path.as_path()]).unwrap_err();
        assert!(err.contains("error parsing"));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsmq.toml");
        std::fs::write(
            &path,
            "ns = \"file\"\n[redis]\nurl = \"redis://file:6379\"\n",
        )
        .unwrap();

        let path_arg = path.to_string_lossy().to_string();
        let cli = Cli::try_parse_from([
            "rsmq",
            "--config",
            path_arg.as_str(),
            "--ns",
            "flag",
            "queue",
            "list",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.ns, "flag");
        if std::env::var_os("RSMQ_REDIS_URL").is_none() {
            assert_eq!(config.redis.url, "redis://file:6379");
        }
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let cli =
            Cli::try_parse_from(["rsmq", "--config", "/nonexistent/rsmq.toml", "queue", "list"])
                .unwrap();
        assert!(resolve_config(&cli).is_err());
    }

    #[test]
    fn errors_are_formatted_for_humans() {
        assert_eq!(
            format_error(&RsmqError::QueueNotFound("jobs".to_string())),
            "Error: queue \"jobs\" does not exist"
        );
        assert_eq!(
            format_error(&RsmqError::QueueAlreadyExists("jobs".to_string())),
            "Error: queue \"jobs\" already exists"
        );
        assert_eq!(
            format_error(&RsmqError::Validation(ValidationError::NoAttributes)),
            "Error: no attribute was supplied"
        );
    }
}
