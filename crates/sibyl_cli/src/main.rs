use clap::Parser;
use sibyl_core::{KernelError, SibylConfig};
use sibyl_kernel::{Kernel, Request};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long, default_value = "sibyl.toml", env = "SIBYL_CONFIG")]
    config: PathBuf,

    /// Knowledge file pattern to learn (repeatable, `*` and `?` allowed)
    #[arg(short, long)]
    learn: Vec<String>,

    /// Saved brain to restore before learning
    #[arg(short, long)]
    brain: Option<PathBuf>,

    /// Session to talk in
    #[arg(short, long)]
    session: Option<String>,

    /// Save the brain here on exit
    #[arg(long)]
    save_brain: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let config = SibylConfig::load_or_default(&args.config);
    let kernel = Kernel::new(&config);

    if let Some(path) = &config.brain.subs_file {
        kernel.load_subs(path)?;
    }

    let brain = args.brain.as_ref().or(config.brain.brain_file.as_ref());
    let mut learn = config.brain.learn.clone();
    learn.extend(args.learn.iter().cloned());
    info!("Bootstrapping {}...", kernel.version());
    kernel
        .bootstrap(brain.map(PathBuf::as_path), &learn, &config.brain.commands)
        .await?;

    let request = Request {
        session_id: args.session.clone(),
    };
    kernel.add_session(request.session_id());
    let bot = kernel.get_bot_predicate("name");

    println!(
        "{} online with {} categories. Type 'quit' to exit, ':session' to inspect state.",
        bot,
        kernel.num_categories()
    );
    print!("> ");
    io::stdout().flush()?;

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let trimmed = input.trim();

        if trimmed == "quit" || trimmed == "exit" {
            break;
        }

        if trimmed == ":session" {
            let data = kernel.session_data(Some(request.session_id()));
            println!("{}", serde_json::to_string_pretty(&data)?);
            print!("> ");
            io::stdout().flush()?;
            continue;
        }

        if trimmed.is_empty() {
            print!("> ");
            io::stdout().flush()?;
            continue;
        }

        match kernel.respond(&request, trimmed).await {
            Ok(response) => println!("\n{}: {}\n", bot, response),
            Err(e) => {
                let fatal = e
                    .downcast_ref::<KernelError>()
                    .is_some_and(KernelError::is_fatal);
                error!("Error responding (fatal={}): {}", fatal, e);
                println!("\n[System Error]: {}\n", e);
            }
        }

        print!("> ");
        io::stdout().flush()?;
    }

    if let Some(path) = &args.save_brain {
        kernel.save_brain(path)?;
        println!("Brain saved to {}", path.display());
    }

    Ok(())
}
