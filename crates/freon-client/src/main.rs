//! The `freon` command-line client.

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use freon_client::relay::RelayClient;
use freon_client::store::ShareStore;
use freon_client::{keygen, sign};

#[derive(Parser)]
#[command(name = "freon", version, about = "Threshold Ed25519 signing ceremonies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Distributed key generation ceremonies
    Keygen {
        #[command(subcommand)]
        command: KeygenCommands,
    },
    /// Signing ceremonies
    Sign {
        #[command(subcommand)]
        command: SignCommands,
    },
    /// Terminate a signing ceremony
    Terminate {
        #[arg(short = 'H', long)]
        host: String,
        #[arg(short, long)]
        ceremony: String,
    },
}

#[derive(Subcommand)]
enum KeygenCommands {
    /// Create a new DKG group on the coordinator
    Create {
        #[arg(short = 'H', long)]
        host: String,
        /// Party size
        #[arg(short)]
        n: u16,
        /// Threshold
        #[arg(short)]
        t: u16,
    },
    /// Join a DKG group and generate this party's share
    Join {
        #[arg(short = 'H', long)]
        host: String,
        #[arg(short, long)]
        group: String,
        /// age public key the secret share is encrypted to
        #[arg(short, long)]
        recipient: String,
    },
    /// List local key shares and groups
    List,
}

#[derive(Subcommand)]
enum SignCommands {
    /// Create a signing ceremony over a message
    Create {
        #[arg(short = 'H', long)]
        host: String,
        #[arg(short, long)]
        group: String,
        /// Emit an OpenSSH SSHSIG block instead of raw hex
        #[arg(long)]
        ssh: bool,
        /// SSHSIG namespace
        #[arg(long, default_value = "file")]
        namespace: String,
        /// Message file; `-` reads stdin
        message: PathBuf,
    },
    /// Join a signing ceremony with the local share
    Join {
        #[arg(short = 'H', long)]
        host: String,
        #[arg(short, long)]
        ceremony: String,
        /// age identity file used to decrypt the local share
        #[arg(short, long)]
        identity: PathBuf,
        /// Message file; `-` reads stdin
        message: PathBuf,
    },
    /// Fetch the signature of a finalized ceremony
    Get {
        #[arg(short = 'H', long)]
        host: String,
        #[arg(short, long)]
        ceremony: String,
    },
    /// List active ceremonies for a group
    List {
        #[arg(short = 'H', long)]
        host: String,
        #[arg(short, long)]
        group: String,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
}

fn read_message(path: &PathBuf) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read(path)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "freon=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Keygen { command } => keygen_command(command).await,
        Commands::Sign { command } => sign_command(command).await,
        Commands::Terminate { host, ceremony } => {
            let relay = RelayClient::new(&host)?;
            relay.terminate(&ceremony).await?;
            println!("Ceremony terminated.");
            Ok(())
        }
    }
}

async fn keygen_command(command: KeygenCommands) -> anyhow::Result<()> {
    match command {
        KeygenCommands::Create { host, n, t } => {
            if t > n {
                anyhow::bail!("t > n: t = {t}, n = {n}");
            }
            let relay = RelayClient::new(&host)?;
            let created = relay.create_keygen(n, t).await?;
            println!(
                "Distributed key generation ceremony created! Group ID:\n{}",
                created.group_id
            );
        }
        KeygenCommands::Join {
            host,
            group,
            recipient,
        } => {
            let relay = RelayClient::new(&host)?;
            let store = ShareStore::open_default()?;
            let outcome =
                keygen::join_ceremony(&relay, &store, &host, &group, &recipient).await?;
            println!("Group public key:\n{}", outcome.group_public_key);
        }
        KeygenCommands::List => {
            let store = ShareStore::open_default()?;
            let shares = store.load()?;
            if shares.shares.is_empty() {
                println!("No local key shares/groups found");
                return Ok(());
            }
            println!("Group ID\tPublic Key");
            for share in &shares.shares {
                println!("{}\t{}", share.group_id, share.public_key);
            }
        }
    }
    Ok(())
}

async fn sign_command(command: SignCommands) -> anyhow::Result<()> {
    match command {
        SignCommands::Create {
            host,
            group,
            ssh,
            namespace,
            message,
        } => {
            let message = read_message(&message)?;
            let hash = freon_crypto::sanity::sanity_hash(&message, &group);
            let relay = RelayClient::new(&host)?;
            let created = relay.create_sign(&group, &hash, ssh, &namespace).await?;
            println!("Key signing ceremony created!\n{}", created.ceremony_id);
        }
        SignCommands::Join {
            host,
            ceremony,
            identity,
            message,
        } => {
            let message = read_message(&message)?;
            let relay = RelayClient::new(&host)?;
            let store = ShareStore::open_default()?;
            let outcome =
                sign::join_ceremony(&relay, &store, &ceremony, &identity, &message).await?;
            println!("Signature:\n{}", outcome.signature);
        }
        SignCommands::Get { host, ceremony } => {
            let relay = RelayClient::new(&host)?;
            let response = relay.get_signature(&ceremony).await?;
            println!("Signature:\n{}", response.signature);
        }
        SignCommands::List {
            host,
            group,
            limit,
            offset,
        } => {
            let relay = RelayClient::new(&host)?;
            let listed = relay.list_sign(&group, limit, offset).await?;
            if listed.ceremonies.is_empty() {
                println!("No ceremonies found.");
                return Ok(());
            }
            println!(
                "Listing the most recent {} ceremonies:\n",
                listed.ceremonies.len()
            );
            println!("\tCeremony ID\tHash\tFormat\tOpen?");
            println!("\t{}", "-".repeat(79));
            for ceremony in &listed.ceremonies {
                let format = if ceremony.openssh { "OpenSSH" } else { "Raw" };
                let status = if ceremony.active { "Open" } else { " -- " };
                println!("\t{}\t{}\t{}\t{}", ceremony.uid, ceremony.hash, format, status);
            }
        }
    }
    Ok(())
}
