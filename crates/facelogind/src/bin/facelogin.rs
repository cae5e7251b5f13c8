use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facelogind::config::Config;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "facelogin", about = "facelogin administration CLI", version)]
struct Cli {
    /// Path to a TOML config file (defaults to $FACELOGIN_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a user from an image file
    Register {
        username: String,
        /// Image containing exactly the face to enroll
        image: PathBuf,
    },
    /// Identify the user in an image file
    Login { image: PathBuf },
    /// List enrolled users
    Users,
    /// List files uploaded by a user
    Files { username: String },
    /// Delete one of a user's files
    Delete { id: i64, username: String },
    /// Show store status
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Register { username, image } => {
            let bytes = read_image(&image)?;
            let (mut auth, _) = facelogind::open_services(&config)?;
            auth.register(&username, &bytes)?;
            println!("Registered {}", username.trim());
        }
        Commands::Login { image } => {
            let bytes = read_image(&image)?;
            let (mut auth, _) = facelogind::open_services(&config)?;
            let user = auth.login(&bytes)?;
            println!("Welcome {user}!");
        }
        Commands::Users => {
            let store = open_store(&config)?;
            let users = store.list_usernames()?;
            if users.is_empty() {
                println!("No users enrolled");
            }
            for user in users {
                println!("{user}");
            }
        }
        Commands::Files { username } => {
            let store = open_store(&config)?;
            let files = store.list_files(&username)?;
            if files.is_empty() {
                println!("No files for {username}");
            }
            for f in files {
                println!(
                    "{:>6}  {}  {}  {}",
                    f.id,
                    f.upload_time.format("%Y-%m-%d %H:%M:%S"),
                    f.file_name,
                    f.file_path.display()
                );
            }
        }
        Commands::Delete { id, username } => {
            let store = open_store(&config)?;
            let uploads = facelogin_store::UploadDir::open(&config.upload_dir)?;
            let files = facelogind::files::FileManager::new(store, uploads);
            let record = files.delete(id, &username)?;
            println!("Deleted {} ({})", record.file_name, record.id);
        }
        Commands::Status => {
            let store = open_store(&config)?;
            println!("database:   {}", store.path().display());
            println!("uploads:    {}", config.upload_dir.display());
            println!("models:     {}", config.model_dir.display());
            println!("users:      {}", store.count_users()?);
            println!("threshold:  {}", config.match_threshold);
        }
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<facelogin_store::Store> {
    facelogin_store::Store::open(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path.display()))
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if bytes.is_empty() {
        bail!("{} is empty", path.display());
    }
    Ok(bytes)
}
