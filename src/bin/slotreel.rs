use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "slotreel", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the niches of a catalog.
    Niches(CatalogArgs),
    /// List the templates of one niche.
    Templates(TemplatesArgs),
    /// Fill a template with clips, apply trims and write the render manifest.
    Plan(PlanArgs),
}

#[derive(Args, Debug)]
struct CatalogArgs {
    /// Template catalog JSON.
    #[arg(long)]
    catalog: PathBuf,
}

#[derive(Args, Debug)]
struct TemplatesArgs {
    #[command(flatten)]
    catalog: CatalogArgs,

    #[arg(long)]
    niche: String,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    catalog: CatalogArgs,

    #[arg(long)]
    niche: String,

    #[arg(long)]
    template: String,

    /// Clip files, bound to slots in the order given.
    #[arg(long = "clip", required = true)]
    clips: Vec<PathBuf>,

    /// Known clip durations in seconds, one per --clip; skips ffprobe when given.
    #[arg(long = "duration")]
    durations: Vec<f64>,

    /// Trim as SLOT:START:END (dual-ended) or SLOT:START (single-ended), SLOT 0-based.
    #[arg(long = "trim")]
    trims: Vec<String>,

    /// Seed a default trim for every clip that needs one and has none.
    #[arg(long)]
    auto_trim: bool,

    /// Wizard config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output render manifest path.
    #[arg(long)]
    out: PathBuf,

    /// Also write the durable session state here.
    #[arg(long)]
    state: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
struct TrimArg {
    slot: usize,
    start_sec: f64,
    end_sec: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Niches(args) => cmd_niches(args),
        Command::Templates(args) => cmd_templates(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn load_catalog(path: &Path) -> anyhow::Result<slotreel::StaticCatalog> {
    slotreel::StaticCatalog::load_json(path)
        .with_context(|| format!("load catalog '{}'", path.display()))
}

fn cmd_niches(args: CatalogArgs) -> anyhow::Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    for niche in &catalog.niches {
        println!("{}\t{}", niche.id, niche.label);
    }
    Ok(())
}

fn cmd_templates(args: TemplatesArgs) -> anyhow::Result<()> {
    use slotreel::TemplateCatalog as _;

    let catalog = load_catalog(&args.catalog.catalog)?;
    if catalog.niche(&args.niche).is_none() {
        anyhow::bail!("unknown niche '{}'", args.niche);
    }
    for t in catalog.templates(&args.niche) {
        let slots = t
            .slots
            .iter()
            .map(|s| format!("{} {}s", s.label, s.target_duration_sec))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{}\t{}\t[{slots}]", t.id, t.name);
    }
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let catalog = load_catalog(&args.catalog.catalog)?;
    let config = match &args.config {
        Some(p) => slotreel::WizardConfig::load_json(p)
            .with_context(|| format!("load config '{}'", p.display()))?,
        None => slotreel::WizardConfig::default(),
    };
    let trims = args
        .trims
        .iter()
        .map(|s| parse_trim(s))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut session = slotreel::WizardSession::new(Arc::new(catalog), config)?;
    session.select_niche(&args.niche)?;
    session.select_template(&args.template)?;

    let files = args
        .clips
        .iter()
        .map(|p| {
            slotreel::MediaBlob::from_path(p).with_context(|| format!("read clip '{}'", p.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let report = if args.durations.is_empty() {
        session.add_clips(files, &slotreel::FfprobeProbe)?
    } else {
        if args.durations.len() != files.len() {
            anyhow::bail!(
                "got {} --duration value(s) for {} --clip file(s)",
                args.durations.len(),
                files.len()
            );
        }
        let mut probe = slotreel::FixedProbe::new();
        for (f, d) in files.iter().zip(&args.durations) {
            probe.insert(f.source.clone(), *d);
        }
        session.add_clips(files, &probe)?
    };
    eprintln!("bound {} clip(s)", report.added.len());

    session
        .advance()
        .context("cannot start trimming until every slot has a clip")?;

    for t in &trims {
        let clip_id = session
            .registry()
            .clip_at_slot(t.slot)
            .map(|c| c.id().clone())
            .with_context(|| format!("no clip in slot {}", t.slot))?;
        match t.end_sec {
            Some(end) => session.upsert_trim(&clip_id, t.start_sec, end)?,
            None => session.trim_from(&clip_id, t.start_sec)?,
        };
    }
    if args.auto_trim {
        let ids: Vec<_> = session.clips().iter().map(|c| c.id().clone()).collect();
        for id in &ids {
            session.ensure_default_trim(id)?;
        }
    }

    let plan = session.edit_plan()?;
    print_plan(&plan);

    if let Some(state) = &args.state {
        session
            .snapshot()
            .save_json(state)
            .with_context(|| format!("write state '{}'", state.display()))?;
    }

    session
        .advance()
        .context("edit plan is not ready to render")?;
    let mut renderer = slotreel::ManifestRenderer::new(&args.out);
    let artifact = session.render(&mut renderer)?;

    eprintln!("wrote {}", artifact.uri);
    Ok(())
}

fn parse_trim(s: &str) -> anyhow::Result<TrimArg> {
    let parts: Vec<&str> = s.split(':').collect();
    let num = |p: &str| -> anyhow::Result<f64> {
        p.trim()
            .parse::<f64>()
            .with_context(|| format!("invalid number '{p}' in --trim '{s}'"))
    };
    let slot = |p: &str| -> anyhow::Result<usize> {
        p.trim()
            .parse::<usize>()
            .with_context(|| format!("invalid slot '{p}' in --trim '{s}'"))
    };
    match parts.as_slice() {
        [i, start] => Ok(TrimArg {
            slot: slot(i)?,
            start_sec: num(start)?,
            end_sec: None,
        }),
        [i, start, end] => Ok(TrimArg {
            slot: slot(i)?,
            start_sec: num(start)?,
            end_sec: Some(num(end)?),
        }),
        _ => anyhow::bail!("--trim expects SLOT:START or SLOT:START:END, got '{s}'"),
    }
}

fn print_plan(plan: &slotreel::EditPlan) {
    println!("{} ({})", plan.template_name, plan.template_id);
    for e in &plan.entries {
        let detail = match &e.clip {
            None => "empty".to_string(),
            Some(c) => {
                let duration = match c.duration {
                    slotreel::ClipDuration::Known(d) => format!("{d:.1}s"),
                    slotreel::ClipDuration::Unknown => "unknown".to_string(),
                };
                let range = match c.effective_range {
                    Some(r) => format!("{:.1}-{:.1}", r.start_sec, r.end_sec),
                    None => "needs trim".to_string(),
                };
                let warn = match c.validity {
                    Some(v) if !v.ok => format!(" ({:.1}s over)", v.overage_sec),
                    _ => String::new(),
                };
                format!("{} [{duration}] {range}{warn}", c.clip_id)
            }
        };
        println!(
            "  {}. {} ({}s): {detail}",
            e.slot_index + 1,
            e.slot_label,
            e.target_duration_sec
        );
    }
}
