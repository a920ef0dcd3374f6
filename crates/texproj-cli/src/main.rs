//! texproj - provision a project against in-memory collaborators and print it as JSON

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use texproj_core::memory::{
    InMemoryEntityStore, InMemoryHistoryService, InMemoryUserDirectory, RecordingAnalytics,
};
use texproj_core::{
    BlankProject, Collaborators, HistoryRef, ProjectAttributes, ProjectProvisioner,
    ProvisioningConfig, UserId, UserProfile,
};
use texproj_template::split_lines;
use tracing_subscriber::EnvFilter;

fn owner_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("owner")
            .long("owner")
            .required(true)
            .help("Owner user id"),
    )
    .arg(
        Arg::new("name")
            .long("name")
            .required(true)
            .help("Project name"),
    )
}

fn cli() -> Command {
    Command::new("texproj")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Provision LaTeX projects")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("first-name")
                .long("first-name")
                .global(true)
                .help("Owner first name used by templates"),
        )
        .arg(
            Arg::new("last-name")
                .long("last-name")
                .global(true)
                .help("Owner last name used by templates"),
        )
        .arg(
            Arg::new("locale")
                .long("locale")
                .global(true)
                .help("Owner spell-check language"),
        )
        .arg(
            Arg::new("no-history")
                .long("no-history")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Run with the history service disabled"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            owner_args(Command::new("blank").about("Create a project with no documents")).arg(
                Arg::new("import-history")
                    .long("import-history")
                    .help("Import with an existing history id instead of linking a new one"),
            ),
        )
        .subcommand(
            owner_args(Command::new("snippet").about("Create a project from raw content")).arg(
                Arg::new("file")
                    .long("file")
                    .value_parser(value_parser!(PathBuf))
                    .help("Root document content; read from stdin when absent"),
            ),
        )
        .subcommand(owner_args(
            Command::new("basic").about("Create a project from the starter template"),
        ))
        .subcommand(
            owner_args(Command::new("template").about("Create a project from a named template"))
                .arg(
                    Arg::new("key")
                        .long("key")
                        .default_value("example")
                        .help("Template key"),
                ),
        )
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<ProvisioningConfig> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ProvisioningConfig::load(path)?,
        None => ProvisioningConfig::new(),
    };
    Ok(config.with_env_overrides())
}

fn read_content(args: &ArgMatches) -> anyhow::Result<Vec<String>> {
    let text = match args.get_one::<PathBuf>("file") {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
            text
        }
    };
    Ok(split_lines(&text))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let Some((mode, args)) = matches.subcommand() else {
        bail!("no subcommand given");
    };
    init_logging(args.get_flag("log-json"));
    let config = load_config(args)?;
    tracing::debug!("Serving templates from {}", config.templates_root().display());

    let owner = UserId::new(args.get_one::<String>("owner").cloned().unwrap_or_default());
    let name = args.get_one::<String>("name").cloned().unwrap_or_default();

    let mut profile = UserProfile::new(owner.clone());
    profile.first_name = args.get_one::<String>("first-name").cloned();
    profile.last_name = args.get_one::<String>("last-name").cloned();
    profile.spell_check_language = args.get_one::<String>("locale").cloned();

    let store = Arc::new(InMemoryEntityStore::new());
    let users = Arc::new(InMemoryUserDirectory::new());
    users.insert(profile);
    let history = if args.get_flag("no-history") {
        InMemoryHistoryService::disabled()
    } else {
        InMemoryHistoryService::enabled()
    };

    let provisioner = ProjectProvisioner::new(
        Collaborators {
            store: store.clone(),
            history: Arc::new(history),
            users,
            analytics: Arc::new(RecordingAnalytics::new()),
        },
        &config,
    );

    let project = match mode {
        "blank" => {
            let origin = match args.get_one::<String>("import-history") {
                Some(id) => BlankProject::imported(
                    HistoryRef::linked(id.as_str()),
                    ProjectAttributes::new(),
                ),
                None => BlankProject::default(),
            };
            provisioner.create_blank(&owner, &name, origin).await?
        }
        "snippet" => {
            let lines = read_content(args)?;
            provisioner.create_from_content(&owner, &name, lines).await?
        }
        "basic" => provisioner.create_from_starter_template(&owner, &name).await?,
        "template" => {
            let key = args
                .get_one::<String>("key")
                .map_or("example", String::as_str);
            provisioner
                .create_from_named_template(&owner, &name, key)
                .await?
        }
        other => bail!("unknown mode: {other}"),
    };

    let snapshot = store
        .snapshot(project.id)
        .context("provisioned project missing from store")?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
