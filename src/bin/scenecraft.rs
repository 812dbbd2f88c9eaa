use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scenecraft", version, about = "Turn transcripts into narrated math animations")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the language model for a storyboard and save it.
    Generate(GenerateArgs),
    /// Validate a storyboard and print its summary.
    Validate(ValidateArgs),
    /// Compile a storyboard and print the instruction dump.
    Compile(CompileArgs),
    /// Render a storyboard (or a saved program) with Manim.
    Render(RenderArgs),
    /// Generate a storyboard, then render it.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct TranscriptArgs {
    /// Transcript text (takes precedence over --transcript-file).
    #[arg(long)]
    transcript: Option<String>,

    /// File holding the transcript.
    #[arg(long, default_value = "input/transcript.txt")]
    transcript_file: PathBuf,
}

#[derive(Args, Debug)]
struct AgentArgs {
    /// Command that reads a prompt on stdin and prints the model's answer.
    #[arg(long, env = "SCENECRAFT_AGENT_CMD", default_value = "ollama run llama3")]
    agent_cmd: String,

    /// Seconds to wait for one model answer.
    #[arg(long, default_value_t = 300)]
    agent_timeout_secs: u64,

    /// Answers to request before giving up on unusable output.
    #[arg(long, default_value_t = 3)]
    attempts: usize,
}

#[derive(Args, Debug)]
struct RenderOptsArgs {
    /// Render quality: l, m, h or k.
    #[arg(long, default_value = "m")]
    quality: scenecraft::Quality,

    /// Directory that receives the final video.
    #[arg(long, default_value = "media")]
    output: PathBuf,

    /// Jobs rendered at the same time.
    #[arg(long, env = "SCENECRAFT_MAX_JOBS", default_value_t = 2)]
    max_jobs: usize,

    /// Seconds allowed for each backend call; 0 disables the limit.
    #[arg(long, env = "SCENECRAFT_TIMEOUT_SECS", default_value_t = 600)]
    timeout_secs: u64,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    transcript: TranscriptArgs,

    #[command(flatten)]
    agent: AgentArgs,

    /// Where to write the storyboard JSON.
    #[arg(long, default_value = "data/storyboard.json")]
    storyboard: PathBuf,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Storyboard JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Args, Debug)]
struct CompileArgs {
    /// Storyboard JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Also write the compiled program (with its fingerprint) here.
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Storyboard JSON.
    #[arg(long = "in", required_unless_present = "program", conflicts_with = "program")]
    in_path: Option<PathBuf>,

    /// Program saved by `compile --save`.
    #[arg(long)]
    program: Option<PathBuf>,

    #[command(flatten)]
    render: RenderOptsArgs,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    transcript: TranscriptArgs,

    #[command(flatten)]
    agent: AgentArgs,

    #[command(flatten)]
    render: RenderOptsArgs,

    /// Storyboard path, written after generation and read before rendering.
    #[arg(long, default_value = "data/storyboard.json")]
    storyboard: PathBuf,

    /// Render the existing storyboard instead of generating a new one.
    #[arg(long, conflicts_with = "generate_only")]
    skip_generation: bool,

    /// Stop after writing the storyboard.
    #[arg(long)]
    generate_only: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::Validate(args) => cmd_validate(args),
        Command::Compile(args) => cmd_compile(args),
        Command::Render(args) => cmd_render(args),
        Command::Run(args) => cmd_run(args),
    }
}

fn read_transcript(args: &TranscriptArgs) -> anyhow::Result<String> {
    if let Some(text) = &args.transcript {
        return Ok(text.clone());
    }
    std::fs::read_to_string(&args.transcript_file)
        .with_context(|| format!("read transcript '{}'", args.transcript_file.display()))
}

fn generate(
    transcript: &TranscriptArgs,
    agent: &AgentArgs,
    out: &Path,
) -> anyhow::Result<scenecraft::Storyboard> {
    let text = read_transcript(transcript)?;
    let timeout =
        (agent.agent_timeout_secs > 0).then(|| Duration::from_secs(agent.agent_timeout_secs));
    let cmd = scenecraft::CommandAgent::from_command_line(&agent.agent_cmd, timeout)?;

    eprintln!("generating storyboard with `{}`", agent.agent_cmd);
    let storyboard = scenecraft::generate_storyboard(&cmd, &text, agent.attempts)
        .context("generate storyboard")?;
    storyboard
        .save(out)
        .with_context(|| format!("write storyboard '{}'", out.display()))?;

    eprintln!("wrote {}", out.display());
    print_summary(&storyboard.summary());
    Ok(storyboard)
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    generate(&args.transcript, &args.agent, &args.storyboard)?;
    Ok(())
}

fn load_storyboard(path: &Path) -> anyhow::Result<scenecraft::Storyboard> {
    scenecraft::Storyboard::from_path(path)
        .with_context(|| format!("load storyboard '{}'", path.display()))
}

fn print_summary(s: &scenecraft::StoryboardSummary) {
    println!("title:       {}", s.title);
    if !s.description.is_empty() {
        println!("description: {}", s.description);
    }
    println!("scenes:      {}", s.num_scenes);
    println!("duration:    {}s", s.total_duration);
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let storyboard = load_storyboard(&args.in_path)?;
    print_summary(&storyboard.summary());
    Ok(())
}

fn cmd_compile(args: CompileArgs) -> anyhow::Result<()> {
    let storyboard = load_storyboard(&args.in_path)?;
    let program = scenecraft::compile(&storyboard);
    print!("{}", program.dump());
    println!("fingerprint: {}", program.fingerprint());

    if let Some(path) = &args.save {
        program
            .save(path)
            .with_context(|| format!("write program '{}'", path.display()))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let program = match (&args.in_path, &args.program) {
        (_, Some(path)) => scenecraft::CompiledProgram::from_path(path)
            .with_context(|| format!("load program '{}'", path.display()))?,
        (Some(path), None) => {
            let storyboard = load_storyboard(path)?;
            print_summary(&storyboard.summary());
            scenecraft::compile(&storyboard)
        }
        (None, None) => anyhow::bail!("either --in or --program is required"),
    };
    render(program, &args.render)
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let storyboard = if args.skip_generation {
        let storyboard = load_storyboard(&args.storyboard)?;
        print_summary(&storyboard.summary());
        storyboard
    } else {
        generate(&args.transcript, &args.agent, &args.storyboard)?
    };

    if args.generate_only {
        eprintln!("storyboard ready; skipping render");
        return Ok(());
    }
    render(scenecraft::compile(&storyboard), &args.render)
}

fn render(program: scenecraft::CompiledProgram, args: &RenderOptsArgs) -> anyhow::Result<()> {
    for note in program.notes() {
        eprintln!(
            "note: scene {} {} ({} with {}): {}",
            note.scene_id, note.slot, note.element, note.animation, note.reason
        );
    }

    let options = scenecraft::RenderOptions {
        quality: args.quality,
        output_dir: args.output.clone(),
        timeout: (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs)),
    };
    let backend = Arc::new(scenecraft::ManimBackend::default());
    let manager = scenecraft::JobManager::new(
        backend,
        scenecraft::JobManagerOpts {
            max_concurrent_jobs: args.max_jobs,
            render: options,
        },
    )?;

    let id = manager.submit(program);
    eprintln!("job {id} submitted (quality {})", args.quality);

    let mut last = None;
    for snapshot in manager.subscribe(id)? {
        eprintln!("  {:<9} {:>5.1}%", snapshot.state, snapshot.progress * 100.0);
        last = Some(snapshot);
    }

    let job = match last {
        Some(job) => job,
        None => manager.status(id)?,
    };
    println!("{}", serde_json::to_string_pretty(&job)?);
    match job.state {
        scenecraft::JobState::Completed => Ok(()),
        state => anyhow::bail!(
            "job {id} ended {state}{}",
            job.error.map(|e| format!(": {e}")).unwrap_or_default()
        ),
    }
}
