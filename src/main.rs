mod args;
mod cmd;
mod compose;
mod config;
mod credentials;
mod env;
mod error;
mod installation;
mod job;
mod logging;
mod runner;
mod step;
mod workspace;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "flyway-runner",
    version,
    about = "Run Flyway database migrations as a CI build step"
)]
#[command(
    long_about = "flyway-runner invokes the Flyway command-line tool from a CI job.\nIt resolves a configured Flyway installation, composes the command line\nfrom connection settings and credentials, masks passwords in every log\nline, and fails the step when Flyway fails."
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "FLYWAY_RUNNER_JSON",
        help = "Enable JSON log output"
    )]
    json: bool,

    #[arg(
        long,
        global = true,
        default_value = "info",
        env = "FLYWAY_RUNNER_LOG_LEVEL",
        help = "Minimum log level (debug, info, warn, error)"
    )]
    log_level: String,

    #[arg(
        long,
        global = true,
        default_value = "flyway-runner.yaml",
        env = "FLYWAY_RUNNER_CONFIG",
        help = "Tool configuration file (YAML, or JSON by extension)"
    )]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke Flyway once with the given settings
    Run {
        #[arg(
            long,
            required = true,
            env = "FLYWAY_RUNNER_INSTALLATION",
            help = "Name of the configured Flyway installation"
        )]
        installation: String,
        #[arg(
            long,
            required = true,
            env = "FLYWAY_RUNNER_COMMAND",
            allow_hyphen_values = true,
            help = "Flyway command (e.g. migrate, info, clean)"
        )]
        command: String,
        #[arg(long, default_value = "", env = "FLYWAY_RUNNER_URL", help = "JDBC connection URL")]
        url: String,
        #[arg(
            long,
            default_value = "",
            env = "FLYWAY_RUNNER_LOCATIONS",
            help = "Migration locations (e.g. filesystem:$WORKSPACE/sql)"
        )]
        locations: String,
        #[arg(long, default_value = "", env = "FLYWAY_RUNNER_USERNAME", help = "Database user")]
        username: String,
        #[arg(
            long,
            default_value = "",
            env = "FLYWAY_RUNNER_PASSWORD",
            hide_env_values = true,
            help = "Database password"
        )]
        password: String,
        #[arg(
            long,
            default_value = "",
            env = "FLYWAY_RUNNER_COMMAND_LINE_ARGS",
            allow_hyphen_values = true,
            help = "Additional flyway arguments placed before the command"
        )]
        command_line_args: String,
        #[arg(
            long,
            env = "FLYWAY_RUNNER_CREDENTIALS_ID",
            help = "Configured credentials to use instead of --username/--password"
        )]
        credentials_id: Option<String>,
        #[command(flatten)]
        exec: cmd::ExecArgs,
    },

    /// Run the Flyway steps declared in a job file
    RunJob {
        #[arg(
            long,
            required = true,
            env = "FLYWAY_RUNNER_JOB_FILE",
            help = "Path to job file (YAML or JSON)"
        )]
        file: String,
        #[command(flatten)]
        exec: cmd::ExecArgs,
    },

    /// List configured Flyway installations and their executables
    Installations {
        #[arg(long, default_value = "", env = "NODE_NAME", help = "Worker node name")]
        node: String,
        #[arg(long = "env", value_name = "KEY=VALUE", help = "Extra environment variable (repeatable)")]
        env_overrides: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    let log = match cli.log_level.parse::<logging::Level>() {
        Ok(level) => logging::Logger::with_level(level),
        Err(e) => {
            let log = logging::Logger::default_logger();
            log.error(&format!("invalid --log-level: {}", e), &[]);
            std::process::exit(1);
        }
    };
    if cli.json {
        log.set_json(true);
    }

    let result = match cli.command {
        Commands::Run {
            installation,
            command,
            url,
            locations,
            username,
            password,
            command_line_args,
            credentials_id,
            exec,
        } => {
            let req = compose::MigrationRequest {
                installation,
                command,
                url,
                locations,
                username,
                password,
                command_line_args,
                credentials_id,
            };
            cmd::run::run(&log, &cli.config, &req, &exec)
        }
        Commands::RunJob { file, exec } => cmd::run_job::run(&log, &cli.config, &file, &exec),
        Commands::Installations {
            node,
            env_overrides,
        } => cmd::installations::run(&log, &cli.config, &node, &env_overrides),
    };

    if let Err(e) = result {
        log.error(&e, &[]);
        std::process::exit(1);
    }
}
