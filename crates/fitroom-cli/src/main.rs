use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use fitroom_contracts::chat::{chat_help, parse_intent, Intent};
use fitroom_contracts::events::{new_session_id, EventWriter};
use fitroom_contracts::image::{encode_file, EncodedImage, DEFAULT_EXPORT_FILENAME};
use fitroom_contracts::wizard::WizardStage;
use fitroom_engine::{EngineConfig, GenerationClient, GenerationOutcome, Notifier, Orchestrator};

#[derive(Debug, Parser)]
#[command(name = "fitroom", version, about = "Virtual try-on studio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive person → garment → result session.
    Chat(ChatArgs),
    /// Generate garment candidates from a description.
    Garment(GarmentArgs),
    /// Dress a person photo in an uploaded or generated garment.
    Tryon(TryonArgs),
}

#[derive(Debug, Args)]
struct EngineArgs {
    /// Overrides FITROOM_PROVIDER.
    #[arg(long)]
    provider: Option<String>,
    /// Overrides FITROOM_IMAGE_MODEL.
    #[arg(long)]
    model: Option<String>,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Debug, Parser)]
struct GarmentArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Debug, Parser)]
struct TryonArgs {
    #[arg(long)]
    person: PathBuf,
    #[arg(long, conflicts_with = "prompt", required_unless_present = "prompt")]
    garment: Option<PathBuf>,
    /// Generate the garment from this description instead of uploading one.
    #[arg(long)]
    prompt: Option<String>,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    engine: EngineArgs,
}

/// Failure notices go to stderr so stdout stays clean for transcripts.
#[derive(Debug, Default)]
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, message: &str) {
        eprintln!("! {message}");
    }
}

type Session = Orchestrator<ConsoleNotifier>;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("fitroom error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Garment(args) => run_garment_once(args),
        Command::Tryon(args) => run_tryon_once(args),
    }
}

fn open_session(engine: &EngineArgs, out: &Path, events: Option<&Path>) -> Result<Session> {
    fs::create_dir_all(out)
        .with_context(|| format!("failed to create output directory {}", out.display()))?;
    let config = EngineConfig::from_env()
        .with_provider(engine.provider.clone())
        .with_model(engine.model.clone());
    let client = GenerationClient::from_config(&config)?;
    let events_path = events
        .map(Path::to_path_buf)
        .unwrap_or_else(|| out.join("events.jsonl"));
    let writer = EventWriter::new(events_path, new_session_id());
    Ok(Orchestrator::new(client, ConsoleNotifier).with_events(writer))
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let mut session = open_session(&args.engine, &args.out, args.events.as_deref())?;
    let stdin = io::stdin();
    let mut line = String::new();

    println!(
        "Fitroom started ({} / {}). Type /help for commands.",
        session.client().provider(),
        session.client().model()
    );
    println!("Step 1: /person <path> to upload a photo of the person.");

    loop {
        print!("[{}] > ", session.state().stage().as_str());
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        if !handle_intent(&mut session, intent, &args.out) {
            break;
        }
    }

    let summary_path = args.out.join("summary.json");
    session.finish(&summary_path)?;
    println!("Session saved to {}", summary_path.display());
    Ok(())
}

/// Runs one chat command. Returns false when the user asked to quit.
fn handle_intent(session: &mut Session, intent: Intent, out: &Path) -> bool {
    match intent {
        Intent::Noop => {}
        Intent::Quit => return false,
        Intent::Help => {
            for (usage, summary) in chat_help() {
                println!("  {usage:<24} {summary}");
            }
            println!("Plain text describes a garment to generate.");
        }
        Intent::Status => print_status(session),
        Intent::SelectPerson { path: None } => println!("usage: /person PATH"),
        Intent::SelectPerson { path: Some(path) } => handle_select_person(session, &path),
        Intent::UploadGarment { path: None } => println!("usage: /garment PATH"),
        Intent::UploadGarment { path: Some(path) } => handle_upload_garment(session, &path),
        Intent::GenerateGarment { prompt } => {
            if prompt.trim().is_empty() {
                println!("usage: /generate TEXT");
            } else if ensure_stage(session, WizardStage::Garment) {
                println!("Generating garment...");
                if let GenerationOutcome::Produced(count) = session.request_garment(&prompt) {
                    println!("Generated {count} candidate(s).");
                    print_garments(session);
                }
            }
        }
        Intent::ListGarments => print_garments(session),
        Intent::PickGarment { index: None } => println!("usage: /pick N (see /garments)"),
        Intent::PickGarment { index: Some(index) } => {
            if ensure_stage(session, WizardStage::Garment) {
                match session.pick_garment(index) {
                    Ok(_) => println!("Garment #{} selected. /tryon when ready.", index + 1),
                    Err(err) => println!("{err}"),
                }
            }
        }
        Intent::ConfirmGarment => {
            println!("Dressing the person...");
            match session.confirm_garment() {
                Ok(GenerationOutcome::Produced(_)) => println!(
                    "Try-on ready. /export to save, /retry for another garment, /reset to start over."
                ),
                Ok(GenerationOutcome::Skipped) => println!("A request is already running."),
                Ok(_) => println!("/retry to choose another garment."),
                Err(err) => println!("{err}"),
            }
        }
        Intent::RetryGarment => match session.retry_garment() {
            Ok(_) => println!("Back to garment selection."),
            Err(err) => println!("{err}"),
        },
        Intent::Reset => match session.reset() {
            Ok(_) => println!(
                "Started over. History kept ({} item(s)).",
                session.history().len()
            ),
            Err(err) => println!("{err}"),
        },
        Intent::Navigate { stage: None } => println!("usage: /stage person|garment"),
        Intent::Navigate { stage: Some(stage) } => match session.navigate(stage) {
            Ok(_) => println!("Now at {stage}."),
            Err(err) => println!("{err}"),
        },
        Intent::ListHistory => print_history(session),
        Intent::RestoreHistory { index: None } => println!("usage: /restore N (see /history)"),
        Intent::RestoreHistory { index: Some(index) } => match session.restore_history(index) {
            Some(image) => println!("Restored #{} ({}).", index + 1, describe_image(&image)),
            None => println!("No history item #{}.", index + 1),
        },
        Intent::Export { path } => {
            let target = export_target(out, path.as_deref());
            match session.export_result(&target) {
                Ok(Some(bytes)) => println!("Exported {} ({bytes} bytes).", target.display()),
                Ok(None) => println!("Nothing to export yet."),
                Err(err) => eprintln!("fitroom: {err:#}"),
            }
        }
        Intent::Unknown { command } => println!("Unknown command /{command}. Type /help."),
    }
    true
}

fn handle_select_person(session: &mut Session, path: &Path) {
    let image = match encode_file(path) {
        Ok(image) => image,
        Err(err) => {
            eprintln!("fitroom: {err}");
            return;
        }
    };
    if !ensure_stage(session, WizardStage::Person) {
        return;
    }
    match session.select_person(image) {
        Ok(_) => println!("Person set. Describe a garment or /garment <path>."),
        Err(err) => println!("{err}"),
    }
}

fn handle_upload_garment(session: &mut Session, path: &Path) {
    let image = match encode_file(path) {
        Ok(image) => image,
        Err(err) => {
            eprintln!("fitroom: {err}");
            return;
        }
    };
    if !ensure_stage(session, WizardStage::Garment) {
        return;
    }
    match session.upload_garment(image) {
        Ok(_) => println!("Garment uploaded and selected. /tryon when ready."),
        Err(err) => println!("{err}"),
    }
}

/// Moves to `stage` when the session is elsewhere. Prints the refusal and
/// returns false when the move is not allowed.
fn ensure_stage(session: &mut Session, stage: WizardStage) -> bool {
    if session.state().stage() == stage {
        return true;
    }
    match session.navigate(stage) {
        Ok(_) => true,
        Err(err) => {
            println!("{err}");
            false
        }
    }
}

fn run_garment_once(args: GarmentArgs) -> Result<i32> {
    let mut session = open_session(&args.engine, &args.out, args.events.as_deref())?;
    let outcome = session.request_garment(&args.prompt);
    let written = match outcome {
        GenerationOutcome::Produced(_) => write_candidates(&session, &args.out)?,
        _ => Vec::new(),
    };
    session.finish(&args.out.join("summary.json"))?;
    for path in &written {
        println!("{}", path.display());
    }
    Ok(if written.is_empty() { 1 } else { 0 })
}

fn run_tryon_once(args: TryonArgs) -> Result<i32> {
    let mut session = open_session(&args.engine, &args.out, args.events.as_deref())?;
    let person = encode_file(&args.person)?;
    session.select_person(person)?;

    match (&args.garment, &args.prompt) {
        (Some(path), _) => {
            session.upload_garment(encode_file(path)?)?;
        }
        (None, Some(prompt)) => {
            if !matches!(session.request_garment(prompt), GenerationOutcome::Produced(_)) {
                session.finish(&args.out.join("summary.json"))?;
                return Ok(1);
            }
            write_candidates(&session, &args.out)?;
        }
        (None, None) => bail!("either --garment or --prompt is required"),
    }

    let outcome = session.confirm_garment()?;
    let target = args.out.join(DEFAULT_EXPORT_FILENAME);
    let exported = match outcome {
        GenerationOutcome::Produced(_) => session.export_result(&target)?,
        _ => None,
    };
    session.finish(&args.out.join("summary.json"))?;
    match exported {
        Some(_) => {
            println!("{}", target.display());
            Ok(0)
        }
        None => Ok(1),
    }
}

/// Writes the generated pool as `garment-<n>.<ext>`, newest first.
fn write_candidates(session: &Session, out: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (idx, image) in session.state().pool().generated().enumerate() {
        let ext = image
            .mime_type()
            .map(extension_for_mime)
            .unwrap_or("png");
        let path = out.join(format!("garment-{}.{ext}", idx + 1));
        fitroom_contracts::image::export(image, &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

fn print_status(session: &Session) {
    let state = session.state();
    let selection = state.selection();
    println!(
        "Step {}/3 ({}) | person: {} | garment: {} | result: {}",
        state.stage().step(),
        state.stage().as_str(),
        presence(selection.person.as_ref()),
        presence(selection.garment.as_ref()),
        presence(selection.result.as_ref()),
    );
    println!(
        "Candidates: {} | history: {} | {} / {}",
        state.pool().len(),
        session.history().len(),
        session.client().provider(),
        session.client().model(),
    );
}

fn print_garments(session: &Session) {
    let pool = session.state().pool();
    let selected = session.state().selection().garment.as_ref();
    if pool.is_empty() && pool.uploaded().is_none() {
        println!("No garments yet. Describe one or /garment <path>.");
        return;
    }
    for (idx, image) in pool.generated().enumerate() {
        let marker = if Some(image) == selected { "*" } else { " " };
        println!("{marker} #{} {}", idx + 1, describe_image(image));
    }
    if let Some(uploaded) = pool.uploaded() {
        let marker = if Some(uploaded) == selected { "*" } else { " " };
        println!("{marker} uploaded {}", describe_image(uploaded));
    }
}

fn print_history(session: &Session) {
    if session.history().is_empty() {
        println!("No try-ons yet.");
        return;
    }
    for (idx, entry) in session.history().iter().enumerate() {
        println!(
            "#{} {} {}",
            idx + 1,
            entry.timestamp().format("%Y-%m-%d %H:%M:%S"),
            describe_image(entry.result())
        );
    }
}

fn presence(image: Option<&EncodedImage>) -> &'static str {
    if image.is_some() {
        "set"
    } else {
        "none"
    }
}

fn describe_image(image: &EncodedImage) -> String {
    let mime = image.mime_type().unwrap_or("unknown");
    let payload = image.strip_payload().unwrap_or("");
    let padding = payload.bytes().rev().take_while(|byte| *byte == b'=').count();
    let bytes = (payload.len() * 3 / 4).saturating_sub(padding);
    format!("{mime}, ~{} KiB", bytes.div_ceil(1024))
}

fn export_target(out: &Path, path: Option<&Path>) -> PathBuf {
    match path {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => out.join(path),
        None => out.join(DEFAULT_EXPORT_FILENAME),
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}
