#[derive(clap::Parser)]
#[clap(author, version, long_about = None)]
#[clap(about = "Exchange ADFS directory credentials for temporary AWS credentials")]
#[clap(propagate_version = true)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in, pick a role and print (or store) its temporary credentials
    Login(adfs2aws::cmd::login::LoginArgs),
    /// Sign in and list the roles the assertion authorizes
    ListRoles(adfs2aws::cmd::list_roles::ListRolesArgs),
    /// Print credentials in the AWS credential_process format
    CredentialProcess(adfs2aws::cmd::credential_process::CredentialProcessArgs),
}

fn main() -> Result<std::process::ExitCode, anyhow::Error> {
    use clap::Parser;
    let cli = Cli::parse();

    enable_tracing();
    let retval = match &cli.command {
        Commands::Login(args) => adfs2aws::cmd::login::run(args),
        Commands::ListRoles(args) => adfs2aws::cmd::list_roles::run(args),
        Commands::CredentialProcess(args) => adfs2aws::cmd::credential_process::run(args),
    };
    match retval {
        Ok(_) => Ok(std::process::ExitCode::SUCCESS),
        Err(e) => match e.downcast_ref::<adfs2aws::Error>() {
            Some(adfs2aws::Error::FailureButSilentlyExit) => Ok(std::process::ExitCode::FAILURE),
            _ => Err(e),
        },
    }
}

fn enable_tracing() {
    if let Ok(l) = std::env::var("ADFS2AWS_LOG") {
        std::env::set_var("RUST_LOG", l);
    }
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "adfs2aws=info");
    }

    // stdout carries credentials
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
