use clap::{CommandFactory, Parser, Subcommand};

mod base62;
mod client;
mod config;
mod daemon;
mod db;
mod id;
mod paths;
mod referral;
mod registry;
mod slug;

#[derive(Parser)]
#[command(
    name = "refcode",
    about = "Referral codes and unique domain names for members",
    version
)]
struct Cli {
    #[arg(long, global = true, env = "REFCODE_DEBUG")]
    debug: bool,

    #[arg(long, global = true, env = "REFCODE_HOME")]
    refcode_home: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Reset the database (destroys all data)
    #[command(hide = true)]
    ResetDatabase,

    /// Derive the referral code for an identifier
    Code {
        /// Stable member identifier
        identifier: String,

        /// Code length (uses config, then 12, if not specified)
        #[arg(long)]
        length: Option<usize>,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Normalize text into domain-name bases
    Slug {
        #[command(subcommand)]
        command: SlugCommand,
    },

    /// Query and allocate domain names
    Domain {
        #[command(subcommand)]
        command: DomainCommand,
    },

    /// Manage registered members
    Member {
        #[command(subcommand)]
        command: MemberCommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Manage the daemon
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::aot::Shell,
    },
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Plain,
    Json,
}

#[derive(Subcommand)]
enum SlugCommand {
    /// Print the allocator base for a display name
    Clean {
        /// Free-text base, e.g. a display name
        base: String,
    },

    /// Print the hyphenated form of a display name
    Sanitize {
        /// Free-text input
        input: String,
    },

    /// List reserved paths
    Reserved,
}

#[derive(Subcommand)]
enum DomainCommand {
    /// Check whether a domain name is reserved, taken or available
    Check {
        /// Domain name
        name: String,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Allocate a free domain name without registering it
    Allocate {
        /// Free-text base, e.g. a display name
        base: String,

        /// Sequential suffixes to try before random ones (uses config if not specified)
        #[arg(long)]
        max_tries: Option<usize>,
    },
}

#[derive(Subcommand)]
enum MemberCommand {
    /// Register a member, allocating its domain name and referral code
    Register {
        /// Stable member identifier
        identifier: String,

        /// Display name the domain name is derived from
        display_name: String,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Show a member by domain name
    Get {
        /// Domain name
        domain_name: String,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Remove a member
    #[command(alias = "rm")]
    Remove {
        /// Domain name
        domain_name: String,
    },

    /// List members
    #[command(alias = "ls")]
    List {
        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Open the config file in $EDITOR
    Edit,
}

#[derive(Subcommand)]
enum DaemonCommand {
    /// Start the daemon
    Start {
        /// Remove existing runtime files before starting
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    clap_complete::env::CompleteEnv::with_factory(Cli::command).complete();

    if let Err(e) = run().await {
        eprintln!("\x1b[1;31merror:\x1b[0m {e}");

        // Print the chain of causes, if any.
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  \x1b[1;31mcaused by:\x1b[0m {cause}");
            source = std::error::Error::source(cause);
        }

        std::process::exit(1);
    }
}

fn print_member(member: &db::Member, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {
            println!(
                "\x1b[1;32m{}\x1b[0m \x1b[2m(id: {})\x1b[0m",
                member.domain_name, member.id
            );
            println!("  \x1b[1midentifier:\x1b[0m  {}", member.identifier);
            println!("  \x1b[1mname:\x1b[0m        {}", member.display_name);
            println!("  \x1b[1mreferral:\x1b[0m    {}", member.referral_code);
        }
        OutputFormat::Plain => {
            println!(
                "{}\t{}\t{}\t{}",
                member.domain_name, member.referral_code, member.identifier, member.display_name
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(member)?);
        }
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let is_daemon = matches!(cli.command, Some(Command::Daemon { .. }));

    paths::init(cli.refcode_home);
    paths::ensure_dirs()?;

    let config = config::load()?;

    let config_debug = config.daemon.as_ref().is_some_and(|d| d.debug);

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.debug || config_debug {
            tracing::Level::DEBUG
        } else if is_daemon {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        })
        .init();

    match cli.command {
        Some(Command::Daemon { command }) => match command {
            DaemonCommand::Start { force } => daemon::start(force).await?,
        },
        Some(Command::Config { command }) => match command {
            ConfigCommand::Edit => {
                let editor =
                    std::env::var("EDITOR").map_err(|_| anyhow::anyhow!("$EDITOR is not set"))?;
                let dir = paths::config_dir()?;
                std::fs::create_dir_all(&dir)?;
                let path = dir.join("config.toml");
                let status = std::process::Command::new(&editor).arg(&path).status()?;
                if !status.success() {
                    anyhow::bail!("{editor} exited with {status}");
                }
            }
        },
        Some(Command::Version) => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Some(Command::Completions { shell }) => {
            let status = std::process::Command::new(std::env::current_exe()?)
                .env("COMPLETE", shell.to_string())
                .status()?;
            std::process::exit(status.code().unwrap_or(1));
        }
        Some(Command::Code {
            identifier,
            length,
            format,
        }) => {
            let secret = config.referral_secret()?;
            let length = length.unwrap_or_else(|| config.referral_length());
            let code = referral::generate_referral_code(&identifier, secret.expose(), length)?;
            match format {
                OutputFormat::Human | OutputFormat::Plain => println!("{code}"),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({"identifier": identifier, "referral_code": code})
                ),
            }
        }
        Some(Command::Slug { command }) => match command {
            SlugCommand::Clean { base } => println!("{}", slug::clean_base(&base)?),
            SlugCommand::Sanitize { input } => println!("{}", slug::sanitize_domain_base(&input)),
            SlugCommand::Reserved => {
                for path in slug::reserved_paths() {
                    if path.is_empty() {
                        println!("\"\"");
                    } else {
                        println!("{path}");
                    }
                }
            }
        },
        Some(cmd) => {
            let client = client::DaemonClient::new()?;
            match cmd {
                Command::ResetDatabase => client.reset_database().await?,
                Command::Domain { command } => match command {
                    DomainCommand::Check { name, format } => {
                        let status = client.check_domain(&name).await?;
                        match format {
                            OutputFormat::Human => {
                                let color = if status.status == "available" { 32 } else { 33 };
                                println!(
                                    "{} \x1b[1;{color}m{}\x1b[0m",
                                    status.name, status.status
                                );
                            }
                            OutputFormat::Plain => println!("{}\t{}", status.name, status.status),
                            OutputFormat::Json => println!("{}", serde_json::to_string(&status)?),
                        }
                    }
                    DomainCommand::Allocate { base, max_tries } => {
                        println!("{}", client.allocate_domain(&base, max_tries).await?);
                    }
                },
                Command::Member { command } => match command {
                    MemberCommand::Register {
                        identifier,
                        display_name,
                        format,
                    } => {
                        let member = client.register_member(&identifier, &display_name).await?;
                        print_member(&member, &format)?;
                    }
                    MemberCommand::Get {
                        domain_name,
                        format,
                    } => {
                        let member = client.get_member(&domain_name).await?;
                        print_member(&member, &format)?;
                    }
                    MemberCommand::Remove { domain_name } => {
                        client.remove_member(&domain_name).await?;
                    }
                    MemberCommand::List { format } => {
                        let members = client.list_members().await?;
                        match format {
                            OutputFormat::Human => {
                                if members.is_empty() {
                                    return Ok(());
                                }
                                let name_width = members
                                    .iter()
                                    .map(|m| m.domain_name.len())
                                    .max()
                                    .unwrap_or(0)
                                    .max(6);
                                println!("{:<name_width$}  {:<12}  IDENTIFIER", "DOMAIN", "REFERRAL");
                                for m in &members {
                                    println!(
                                        "{:<name_width$}  {:<12}  {}",
                                        m.domain_name, m.referral_code, m.identifier
                                    );
                                }
                            }
                            OutputFormat::Plain => {
                                for m in &members {
                                    println!(
                                        "{}\t{}\t{}\t{}",
                                        m.domain_name, m.referral_code, m.identifier, m.display_name
                                    );
                                }
                            }
                            OutputFormat::Json => {
                                println!("{}", serde_json::to_string(&members)?);
                            }
                        }
                    }
                },
                Command::Code { .. }
                | Command::Slug { .. }
                | Command::Config { .. }
                | Command::Daemon { .. }
                | Command::Completions { .. }
                | Command::Version => {
                    unreachable!()
                }
            }
        }
        None => {}
    }

    Ok(())
}
