use clap::Parser;
use mboxd::SmtpServer;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

/// Local SMTP server delivering into per-user mbox files
#[derive(Parser, Debug)]
#[command(name = "mboxd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding one <user>.mbox file per local user
    #[arg(env = "MBOXD_MAIL_DIR")]
    mail_dir: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value_t = 2500)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Name used in replies and the only accepted recipient domain
    #[arg(long, default_value = "localhost")]
    hostname: String,

    /// Log every command and reply
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = mboxd::logging::init(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    if !cli.mail_dir.is_dir() {
        error!(
            mail_dir = %cli.mail_dir.display(),
            "mail directory does not exist or is not a directory"
        );
        process::exit(1);
    }

    let server = SmtpServer::new(&cli.hostname, &cli.mail_dir);

    let handle = server.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received interrupt");
        handle.shutdown();
    }) {
        error!(error = %e, "failed to install interrupt handler");
        process::exit(1);
    }

    if let Err(e) = server.start((cli.bind.as_str(), cli.port)) {
        error!(error = %e, "failed to start server");
        process::exit(1);
    }
    info!("shutdown complete");
}
