mod cli;

use indexmap::IndexMap;
use std::path::PathBuf;
use tfload::loader::Loader;
use tfload::module::Config;
use tfload::value::Value;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TFLOAD_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Modules(modules_cli) => modules(modules_cli),
        cli::Command::Values(values_cli) => values(values_cli),
    };

    match command_result {
        Err(e) => {
            for error in e.chain() {
                eprintln!("{error}")
            }
            std::process::exit(1);
        }
        Ok(had_errors) => {
            if had_errors {
                std::process::exit(1);
            }
        }
    }
}

/// Tree view of a resolved configuration, stripped down to what is useful on
/// a terminal.
#[derive(serde::Serialize)]
struct ModuleNode {
    source_dir: PathBuf,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    children: IndexMap<String, ModuleNode>,
}

impl From<&Config> for ModuleNode {
    fn from(config: &Config) -> Self {
        Self {
            source_dir: config.module.source_dir.clone(),
            children: config
                .children
                .iter()
                .map(|(name, child)| (name.clone(), child.into()))
                .collect(),
        }
    }
}

fn modules(cli: cli::ModulesCommand) -> anyhow::Result<bool> {
    let mut loader = Loader::new(".")?;
    let (config, diags) = loader.load_config(&cli.dir, cli.walk.into());

    output(&cli.output, &ModuleNode::from(&config))?;

    if !diags.is_empty() {
        eprintln!("{diags}");
    }
    Ok(diags.has_errors())
}

fn values(cli: cli::ValuesCommand) -> anyhow::Result<bool> {
    let mut loader = Loader::new(".")?;
    let (values, diags) = loader.load_values_files(&cli.dir, &cli.files);

    // precedence-ordered list of name -> value sets
    let view: Vec<IndexMap<&String, &Value>> = values
        .iter()
        .map(|set| set.iter().map(|(name, input)| (name, &input.value)).collect())
        .collect();
    output(&cli.output, &view)?;

    if !diags.is_empty() {
        eprintln!("{diags}");
    }
    Ok(diags.has_errors())
}

fn output<T: serde::Serialize>(output: &cli::OutputArgs, value: &T) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}
