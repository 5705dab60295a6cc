use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use alex_gateway::answer::{answer_schema, render_answer};
use alex_gateway::api::ApiServerBuilder;
use alex_gateway::voice::{CpalMicrophone, CpalSpeaker};
use alex_gateway::{
    AnswerResult, Config, HttpBackend, SessionController, build_speakable_script,
};

/// ALEX - Voice front end for procedural question answering
#[derive(Parser)]
#[command(name = "alex", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve {
        /// Port to listen on, overriding configuration
        #[arg(long)]
        port: Option<u16>,
    },
    /// Interactive voice session against a running gateway
    Talk {
        /// Base URL of the gateway
        #[arg(long, env = "ALEX_SERVER", default_value = "http://localhost:3000")]
        server: String,
    },
    /// Print the speakable script for an answer JSON file
    Script {
        /// Path to an answer JSON document
        file: PathBuf,
    },
    /// Print the strict answer schema
    Schema,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,alex_gateway=info",
        1 => "info,alex_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(port).await,
        Command::Talk { server } => talk(&server).await,
        Command::Script { file } => print_script(&file),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&answer_schema())?);
            Ok(())
        }
    }
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!(
        port = config.server.port,
        knowledge = %config.server.knowledge_path.display(),
        answer_model = %config.models.answer,
        credential = config.has_credential(),
        "starting ALEX gateway"
    );

    ApiServerBuilder::from_config(&config).build().run().await?;
    Ok(())
}

fn print_script(file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let result = AnswerResult::from_json(&raw)?;
    println!("{}", build_speakable_script(&result));
    Ok(())
}

const TALK_HELP: &str = "\
commands:
  record        start recording from the microphone
  stop          stop recording and transcribe
  ask [text]    ask the given text, or the current question
  speak         read the current answer aloud
  barge         stop speech immediately
  show          print the session
  quit          exit
anything else replaces the question";

/// Drive a session from terminal input
async fn talk(server: &str) -> anyhow::Result<()> {
    let backend = Arc::new(HttpBackend::new(server));
    let mut controller = SessionController::new(
        backend,
        Box::new(CpalMicrophone::new()),
        Box::new(CpalSpeaker::new()),
    );

    println!("ALEX talking to {server}");
    println!("{TALK_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !run_command(&mut controller, line.trim()).await {
                    break;
                }
            }
            Some(event) = controller.next_event() => {
                controller.handle(event);
                println!("[{}]", controller.session().status());
                if let Some(err) = controller.session().last_error() {
                    println!("error: {err}");
                }
            }
        }
    }

    controller.barge_in();
    Ok(())
}

/// Returns `false` when the user asked to quit
async fn run_command(controller: &mut SessionController, line: &str) -> bool {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

    let outcome = match command {
        "" => Ok(()),
        "quit" | "exit" => return false,
        "help" => {
            println!("{TALK_HELP}");
            Ok(())
        }
        "record" => controller.start_recording().await,
        "stop" => controller.stop_recording().await.map(|()| {
            println!("question: {}", controller.session().question());
        }),
        "ask" => {
            let asked = if rest.trim().is_empty() {
                controller.ask_current().await
            } else {
                controller.set_question(rest.trim());
                controller.ask(rest).await
            };
            asked.map(|asked| {
                if !asked {
                    println!("nothing to ask");
                } else if let Some(result) = controller.session().result() {
                    println!("{}", render_answer(result));
                }
            })
        }
        "speak" => {
            if !controller.speak_result() {
                println!("no answer to speak");
            }
            Ok(())
        }
        "barge" => {
            controller.barge_in();
            Ok(())
        }
        "show" => {
            println!("{:#?}", controller.session());
            if let Some(result) = controller.session().result() {
                println!("\n{}", render_answer(result));
            }
            Ok(())
        }
        _ => {
            controller.set_question(line);
            println!("question: {line}");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        println!("error: {e}");
    }
    println!("[{}]", controller.session().status());
    true
}
