use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use reformat::cli::{Cli, Command, ProfilesCommand};
use reformat::commands;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    reformat::logging::init(if cli.verbose { "debug" } else { "info" }).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        Command::Quiz(args) => commands::quiz(args).context("quiz")?,
        Command::Validate(args) => commands::validate(args).context("validate")?,
        Command::Transform(args) => commands::transform(args, &cli.data_dir)
            .await
            .context("transform")?,
        Command::Mindmap(args) => commands::mindmap(args).context("mindmap")?,
        Command::Check(args) => commands::check(args).context("check")?,
        Command::Profiles {
            command: ProfilesCommand::List,
        } => commands::profiles_list(&cli.data_dir)
            .await
            .context("profiles list")?,
        Command::Profiles {
            command: ProfilesCommand::Save(args),
        } => commands::profiles_save(args, &cli.data_dir)
            .await
            .context("profiles save")?,
        Command::Narrate(args) => commands::narrate(args).await.context("narrate")?,
    }

    Ok(())
}
