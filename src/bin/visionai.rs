//! CLI for VisionAI - natural-language photo editing.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use visionai::{
    ClientConfig, EditClient, EditOutcome, Editor, GeminiEditClient, GeminiModel, UploadOutcome,
    SUGGESTED_PROMPTS,
};

#[derive(Parser)]
#[command(name = "visionai")]
#[command(about = "Edit photos with natural-language instructions via Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one instruction to an image
    Edit(EditArgs),

    /// Edit an image interactively
    Session(SessionArgs),

    /// List suggested prompts
    Prompts,

    /// Check that the API key and model are usable
    Check(CheckArgs),
}

#[derive(Args)]
struct EditArgs {
    /// Image to edit
    input: PathBuf,

    /// Instruction describing the change
    #[arg(short, long)]
    prompt: String,

    /// Output file path (defaults to a timestamped name in --out-dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for timestamped downloads
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Model to use (overrides VISIONAI_MODEL)
    #[arg(short, long, value_enum)]
    model: Option<ModelArg>,
}

#[derive(Args)]
struct SessionArgs {
    /// Image to start with
    input: PathBuf,

    /// Directory for downloads
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Model to use (overrides VISIONAI_MODEL)
    #[arg(short, long, value_enum)]
    model: Option<ModelArg>,
}

#[derive(Args)]
struct CheckArgs {
    /// Model to check (overrides VISIONAI_MODEL)
    #[arg(short, long, value_enum)]
    model: Option<ModelArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    NanoBanana,
    NanoBananaPro,
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::NanoBanana => GeminiModel::NanoBanana,
            ModelArg::NanoBananaPro => GeminiModel::NanoBananaPro,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Edit(args) => {
            edit_image(args, cli.json).await?;
        }
        Commands::Session(args) => {
            run_session(args).await?;
        }
        Commands::Prompts => {
            list_prompts(cli.json)?;
        }
        Commands::Check(args) => {
            check(args, cli.json).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("visionai=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn client_for(model: Option<ModelArg>) -> GeminiEditClient {
    let mut config = ClientConfig::from_env();
    if let Some(model) = model {
        config = config.with_model(model.into());
    }
    GeminiEditClient::new(config)
}

fn open_image(editor: &mut Editor, path: &Path) -> anyhow::Result<()> {
    match editor.upload(path)? {
        UploadOutcome::Accepted => Ok(()),
        UploadOutcome::Rejected { message } => anyhow::bail!("{}: {message}", path.display()),
    }
}

async fn edit_image(args: EditArgs, json_output: bool) -> anyhow::Result<()> {
    let client = client_for(args.model);
    let mut editor = Editor::new();
    open_image(&mut editor, &args.input)?;

    if let Some(session) = editor.session_mut() {
        session.set_prompt(&args.prompt);
    }

    match editor.generate(&client).await {
        Some(EditOutcome::Applied) => {}
        Some(EditOutcome::Failed { message }) => anyhow::bail!(message),
        Some(EditOutcome::Dropped) => anyhow::bail!("edit result was discarded"),
        None => anyhow::bail!("prompt must not be empty"),
    }

    let session = editor
        .session()
        .ok_or_else(|| anyhow::anyhow!("editing session ended unexpectedly"))?;
    let output = match args.output {
        Some(path) => {
            session.current().save(&path)?;
            path
        }
        None => session.download(&args.out_dir)?,
    };

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "input": args.input.display().to_string(),
            "output": output.display().to_string(),
            "content_type": session.current().content_type(),
            "model": client.config().model.as_str(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Edited image: {} ({}) via {}",
            output.display(),
            session.current().content_type(),
            client.name()
        );
    }

    Ok(())
}

/// A line typed into the interactive session.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    /// Generate with the pending prompt, or with new text if given.
    Generate(Option<&'a str>),
    /// List suggestions, or copy the 1-based suggestion into the prompt.
    Suggest(Option<usize>),
    Compare,
    Reset,
    Dismiss,
    Download,
    New(&'a str),
    Status,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> ReplCommand<'_> {
    let line = line.trim();
    let Some(command) = line.strip_prefix(':') else {
        return ReplCommand::Generate(Some(line).filter(|l| !l.is_empty()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "suggest" | "s" if arg.is_empty() => ReplCommand::Suggest(None),
        "suggest" | "s" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => ReplCommand::Suggest(Some(n)),
            _ => ReplCommand::Unknown(line),
        },
        "compare" | "c" => ReplCommand::Compare,
        "reset" | "undo" => ReplCommand::Reset,
        "dismiss" => ReplCommand::Dismiss,
        "download" | "d" => ReplCommand::Download,
        "new" if !arg.is_empty() => ReplCommand::New(arg),
        "status" => ReplCommand::Status,
        "help" | "h" => ReplCommand::Help,
        "quit" | "q" | "exit" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(line),
    }
}

fn print_help() {
    println!("Type an instruction and press Enter to edit the image.");
    println!("An empty line retries the pending prompt.");
    println!("  :suggest [n]  list suggestions, or use suggestion n as the prompt");
    println!("  :compare      toggle between the original and the edit");
    println!("  :reset        restore the original image");
    println!("  :dismiss      clear the last error");
    println!("  :download     save the current image");
    println!("  :new <path>   start over with another image");
    println!("  :status       show the session state");
    println!("  :quit         leave");
}

fn print_status(editor: &Editor) {
    let Some(session) = editor.session() else {
        println!("No image loaded. Use :new <path>.");
        return;
    };
    let displayed = if session.show_original() {
        "original"
    } else {
        "current"
    };
    println!(
        "status: {} | edits: {} | showing: {} ({}) | prompt: {:?}",
        session.status(),
        session.revision(),
        displayed,
        session.displayed_image().content_type(),
        session.prompt()
    );
}

async fn run_session(args: SessionArgs) -> anyhow::Result<()> {
    let client = client_for(args.model);
    let mut editor = Editor::new();
    open_image(&mut editor, &args.input)?;

    println!("Editing {} with {}.", args.input.display(), client.name());
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = parse_command(&line);
        if command == ReplCommand::Quit {
            break;
        }
        handle_command(&mut editor, &client, command, &args.out_dir).await;
    }

    Ok(())
}

async fn handle_command(
    editor: &mut Editor,
    client: &GeminiEditClient,
    command: ReplCommand<'_>,
    out_dir: &Path,
) {
    match command {
        ReplCommand::New(path) => {
            editor.discard();
            match editor.upload(path) {
                Ok(UploadOutcome::Accepted) => println!("Loaded {path}."),
                Ok(UploadOutcome::Rejected { message }) => println!("{message}"),
                Err(e) => println!("Failed to read file. {e}"),
            }
            return;
        }
        ReplCommand::Help => {
            print_help();
            return;
        }
        ReplCommand::Status => {
            print_status(editor);
            return;
        }
        ReplCommand::Unknown(line) => {
            println!("Unknown command: {line} (try :help)");
            return;
        }
        _ => {}
    }

    let Some(session) = editor.session_mut() else {
        println!("No image loaded. Use :new <path>.");
        return;
    };

    match command {
        ReplCommand::Generate(text) => {
            if let Some(text) = text {
                session.set_prompt(text);
            }
            if !session.can_generate() {
                println!("Type an instruction first.");
                return;
            }
            println!("Editing...");
            match editor.generate(client).await {
                Some(EditOutcome::Applied) => println!("Done. Use :download to save it."),
                Some(EditOutcome::Failed { message }) => println!("Error: {message}"),
                Some(EditOutcome::Dropped) | None => {}
            }
        }
        ReplCommand::Suggest(None) => {
            for (i, prompt) in SUGGESTED_PROMPTS.iter().enumerate() {
                println!("  {}. {prompt}", i + 1);
            }
        }
        ReplCommand::Suggest(Some(n)) => {
            if session.apply_suggestion(n - 1) {
                println!("Prompt: {} (press Enter to apply)", session.prompt());
            } else {
                println!("No suggestion {n}.");
            }
        }
        ReplCommand::Compare => {
            if !session.has_edits() {
                println!("Nothing to compare yet.");
            } else if session.toggle_comparison() {
                println!("Showing the original.");
            } else {
                println!("Showing the edit.");
            }
        }
        ReplCommand::Reset => {
            if session.reset() {
                println!("Restored the original image.");
            } else {
                println!("Nothing to reset.");
            }
        }
        ReplCommand::Dismiss => {
            session.dismiss_error();
        }
        ReplCommand::Download => match session.download(out_dir) {
            Ok(path) => println!("Saved {}.", path.display()),
            Err(e) => println!("Download failed: {e}"),
        },
        ReplCommand::New(_)
        | ReplCommand::Help
        | ReplCommand::Status
        | ReplCommand::Unknown(_)
        | ReplCommand::Quit => {}
    }
}

fn list_prompts(json_output: bool) -> anyhow::Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(&SUGGESTED_PROMPTS)?);
    } else {
        println!("Suggested prompts:\n");
        for (i, prompt) in SUGGESTED_PROMPTS.iter().enumerate() {
            println!("  {}. {prompt}", i + 1);
        }
    }
    Ok(())
}

async fn check(args: CheckArgs, json_output: bool) -> anyhow::Result<()> {
    let client = client_for(args.model);
    let result = client.health_check().await;

    if json_output {
        let report = serde_json::json!({
            "model": client.config().model.as_str(),
            "ok": result.is_ok(),
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if result.is_ok() {
        println!("{} is reachable ({}).", client.name(), client.config().model);
    }

    result?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_generates() {
        assert_eq!(
            parse_command("  add fireworks "),
            ReplCommand::Generate(Some("add fireworks"))
        );
        assert_eq!(parse_command(""), ReplCommand::Generate(None));
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command(":suggest"), ReplCommand::Suggest(None));
        assert_eq!(parse_command(":s 3"), ReplCommand::Suggest(Some(3)));
        assert_eq!(parse_command(":suggest 0"), ReplCommand::Unknown(":suggest 0"));
        assert_eq!(parse_command(":undo"), ReplCommand::Reset);
        assert_eq!(
            parse_command(":new  photos/cat.png"),
            ReplCommand::New("photos/cat.png")
        );
        assert_eq!(parse_command(":new"), ReplCommand::Unknown(":new"));
        assert_eq!(parse_command(":q"), ReplCommand::Quit);
        assert_eq!(parse_command(":frobnicate"), ReplCommand::Unknown(":frobnicate"));
    }
}
