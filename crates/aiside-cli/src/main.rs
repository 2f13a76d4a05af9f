use aiside_core::{
    config::CONFIG_FILE_NAME, CourseKey, SettingsStore, SummaryConfig, UsageKey, User,
};
use aiside_local::settings::{
    apply_course_update, apply_unit_update, delete_course_settings, delete_unit_settings,
    get_course_settings, get_unit_settings, is_available, is_summary_enabled, EnabledSettings,
};
use aiside_local::{
    extract, html_to_text, is_summarizable, ExtractorAside, FileSettings, MemorySettings,
    MemoryStore, SettingsUpdate, StaticCredit, StaticFlags, StaticUser, SummaryHookAside,
    Viewer,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "aiside")]
#[command(about = "Summarizable-content extraction for course units", long_about = None)]
struct Cli {
    /// Config file. Default: `aiside.toml` in the working directory or a parent, then the
    /// user config directory, then built-in defaults. `AISIDE_*` env vars override it.
    #[arg(long, global = true, env = "AISIDE_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize markup to plain text (reads stdin when no file is given).
    Normalize(NormalizeCmd),
    /// Run the summarizability gate on a unit (json).
    Check(UnitArgs),
    /// Extract a unit's summarizable content (json).
    Extract(UnitArgs),
    /// Text of a block and all of its descendants, as the extract handler serves it (json).
    Content(ContentCmd),
    /// Answer the summary handler for a unit (json: status + body).
    Summary(SummaryCmd),
    /// Render the student-view launcher fragment for a unit (html; empty when not shown).
    Fragment(FragmentCmd),
    /// Read and write course/unit enable settings (json).
    #[command(subcommand)]
    Settings(SettingsCmd),
    /// Print the effective configuration (json).
    Config,
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct NormalizeCmd {
    /// Markup file. Default: stdin.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Tag whose text is dropped (repeatable). Default: `html_tags_to_remove` from config.
    #[arg(long = "remove-tag")]
    remove_tag: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct UnitArgs {
    /// Block tree (json).
    #[arg(long)]
    tree: PathBuf,
    /// Usage key of the unit.
    #[arg(long)]
    unit: UsageKey,
}

#[derive(clap::Args, Debug)]
struct ContentCmd {
    /// Block tree (json).
    #[arg(long)]
    tree: PathBuf,
    /// Usage key of the block to start from. Default: the tree root.
    #[arg(long)]
    root: Option<UsageKey>,
    /// Ask as a non-staff user (the handler answers 403).
    #[arg(long)]
    anonymous: bool,
}

#[derive(clap::Args, Debug)]
struct SummaryCmd {
    #[command(flatten)]
    target: UnitArgs,
    /// Ask as staff. Everyone else gets a 403.
    #[arg(long)]
    staff: bool,
    /// Settings file (json). Default: no settings.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct FragmentCmd {
    #[command(flatten)]
    target: UnitArgs,
    /// Third-party handler URL issued by the runtime for this unit.
    #[arg(long)]
    handler_url: String,
    /// Current user id. Without it the role is `unknown`.
    #[arg(long)]
    user_id: Option<String>,
    #[arg(long)]
    role: Option<String>,
    #[arg(long)]
    enrollment_mode: Option<String>,
    #[arg(long)]
    staff: bool,
    /// Settings file (json). Default: no settings.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum SettingsCmd {
    /// Show the course setting, or the unit override with `--unit`.
    Get(SettingsTarget),
    /// Write the course setting, or the unit override with `--unit`.
    Set(SettingsSetCmd),
    /// Delete the course setting (and every unit override), or one unit override.
    Delete(SettingsTarget),
    /// Effective state for a course or unit, after flags and overrides.
    Status(SettingsTarget),
}

#[derive(clap::Args, Debug)]
struct SettingsTarget {
    /// Settings file (json). Created on first write.
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    course: CourseKey,
    #[arg(long)]
    unit: Option<UsageKey>,
}

#[derive(clap::Args, Debug)]
struct SettingsSetCmd {
    #[command(flatten)]
    target: SettingsTarget,
    #[arg(long, action = clap::ArgAction::Set, required_unless_present = "body")]
    enabled: Option<bool>,
    /// Course only: also drop every unit override.
    #[arg(long)]
    reset: bool,
    /// Raw request body instead of flags, e.g. `{"enabled": true, "reset": true}`.
    #[arg(long, conflicts_with_all = ["enabled", "reset"])]
    body: Option<String>,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn init_tracing() {
    // Logs go to stderr so stdout stays machine-readable.
    let filter = std::env::var("AISIDE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(explicit: Option<&Path>) -> Result<SummaryConfig> {
    let cfg = match explicit {
        Some(p) => SummaryConfig::from_toml_file(p)?,
        None => match SummaryConfig::discover()? {
            Some(cfg) => cfg,
            None => {
                let user_cfg = dirs::config_dir().map(|d| d.join("aiside").join(CONFIG_FILE_NAME));
                match user_cfg {
                    Some(p) if p.is_file() => SummaryConfig::from_toml_file(&p)?,
                    _ => SummaryConfig::default(),
                }
            }
        },
    };
    Ok(cfg.apply_env()?)
}

fn load_tree(path: &Path) -> Result<MemoryStore> {
    let store = MemoryStore::from_json_file(path)
        .with_context(|| format!("load block tree {}", path.display()))?;
    debug!(blocks = store.len(), tree = %path.display(), "loaded block tree");
    Ok(store)
}

fn settings_store(path: Option<&Path>) -> Box<dyn SettingsStore> {
    match path {
        Some(p) => Box::new(FileSettings::new(p)),
        None => Box::new(MemorySettings::new()),
    }
}

fn print_json(v: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

/// `{"response": {"success": true, ...}}`, the shape of the settings API.
fn settings_reply(data: Option<EnabledSettings>) -> serde_json::Value {
    let mut reply = serde_json::json!({ "success": true });
    if let Some(d) = data {
        reply["enabled"] = serde_json::Value::Bool(d.enabled);
    }
    serde_json::json!({ "response": reply })
}

fn run_settings(cmd: SettingsCmd, cfg: &SummaryConfig) -> Result<()> {
    match cmd {
        SettingsCmd::Get(t) => {
            let store = FileSettings::new(&t.file);
            let data = match &t.unit {
                Some(unit) => get_unit_settings(&store, &t.course, unit)?,
                None => get_course_settings(&store, &t.course)?,
            };
            print_json(&settings_reply(Some(data)))
        }
        SettingsCmd::Set(cmd) => {
            let t = cmd.target;
            let update = match cmd.body {
                Some(body) => {
                    let v: serde_json::Value =
                        serde_json::from_str(&body).context("parse --body as json")?;
                    SettingsUpdate::from_json(&v)?
                }
                None => SettingsUpdate {
                    enabled: cmd.enabled.context("--enabled is required")?,
                    reset: cmd.reset,
                },
            };
            let store = FileSettings::new(&t.file);
            let data = match &t.unit {
                Some(unit) => apply_unit_update(&store, &t.course, unit, &update)?,
                None => apply_course_update(&store, &t.course, &update)?,
            };
            print_json(&settings_reply(Some(data)))
        }
        SettingsCmd::Delete(t) => {
            let store = FileSettings::new(&t.file);
            match &t.unit {
                Some(unit) => delete_unit_settings(&store, &t.course, unit)?,
                None => delete_course_settings(&store, &t.course)?,
            }
            print_json(&settings_reply(None))
        }
        SettingsCmd::Status(t) => {
            let store = FileSettings::new(&t.file);
            let flags = StaticFlags::new(cfg.flags.clone());
            let enabled = is_summary_enabled(&flags, &store, &t.course, t.unit.as_ref())?;
            print_json(&serde_json::json!({
                "course": &t.course,
                "unit": &t.unit,
                "available": is_available(&flags, &t.course),
                "enabled": enabled,
            }))
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Normalize(args) => {
            let markup = match &args.file {
                Some(p) => std::fs::read_to_string(p)
                    .with_context(|| format!("read {}", p.display()))?,
                None => {
                    let mut s = String::new();
                    std::io::stdin()
                        .read_to_string(&mut s)
                        .context("read stdin")?;
                    s
                }
            };
            let tags = if args.remove_tag.is_empty() {
                cfg.html_tags_to_remove.clone()
            } else {
                args.remove_tag
                    .iter()
                    .map(|t| t.trim().to_ascii_lowercase())
                    .collect()
            };
            println!("{}", html_to_text(&markup, &tags));
        }
        Commands::Check(args) => {
            let store = load_tree(&args.tree)?;
            let summarizable = is_summarizable(&store, &cfg, &args.unit)
                .with_context(|| format!("check {}", args.unit))?;
            print_json(&serde_json::json!({
                "unit": &args.unit,
                "min_size": cfg.min_size,
                "summarizable": summarizable,
            }))?;
        }
        Commands::Extract(args) => {
            let store = load_tree(&args.tree)?;
            let bundle = extract(&store, &cfg, &args.unit)
                .with_context(|| format!("extract {}", args.unit))?;
            print_json(&bundle)?;
        }
        Commands::Content(args) => {
            let store = load_tree(&args.tree)?;
            let root = match args.root {
                Some(root) => root,
                None => store
                    .root()
                    .cloned()
                    .context("block tree has no root")?,
            };
            let resp = ExtractorAside::new(&cfg, &store).extract_handler(!args.anonymous, &root)?;
            print_json(&serde_json::json!({
                "status": resp.status(),
                "body": resp.body(),
            }))?;
        }
        Commands::Summary(args) => {
            let store = load_tree(&args.target.tree)?;
            let settings = settings_store(args.settings.as_deref());
            let flags = StaticFlags::new(cfg.flags.clone());
            let aside = SummaryHookAside::new(&cfg, &store, &flags, settings.as_ref());
            let (users, credit) = (StaticUser::default(), StaticCredit::default());
            let viewer = Viewer {
                is_staff: args.staff,
                users: &users,
                credit: &credit,
            };
            let resp = aside
                .summary_handler(&viewer, &args.target.unit)
                .with_context(|| format!("summary handler for {}", args.target.unit))?;
            print_json(&serde_json::json!({
                "status": resp.status(),
                "body": resp.body(),
            }))?;
        }
        Commands::Fragment(args) => {
            let store = load_tree(&args.target.tree)?;
            let settings = settings_store(args.settings.as_deref());
            let flags = StaticFlags::new(cfg.flags.clone());
            let aside = SummaryHookAside::new(&cfg, &store, &flags, settings.as_ref());
            let users = StaticUser(args.user_id.map(|id| User {
                id,
                role: args.role,
            }));
            let credit = match args.enrollment_mode {
                Some(mode) => StaticCredit::enrolled(mode),
                None => StaticCredit::default(),
            };
            let viewer = Viewer {
                is_staff: args.staff,
                users: &users,
                credit: &credit,
            };
            let unit = &args.target.unit;
            // The host only renders asides that apply to the block.
            if aside.should_apply_to_block(unit, args.staff) {
                let fragment = aside.student_view(&viewer, unit, &args.handler_url);
                print!("{}", fragment.body_html());
            }
        }
        Commands::Settings(cmd) => run_settings(cmd, &cfg)?,
        Commands::Config => print_json(&cfg)?,
        Commands::Version(args) => {
            let name = "aiside";
            let version = env!("CARGO_PKG_VERSION");
            if args.output.trim().eq_ignore_ascii_case("text") {
                println!("{name} {version}");
            } else {
                print_json(&serde_json::json!({
                    "schema_version": 1,
                    "name": name,
                    "version": version,
                }))?;
            }
        }
    }
    Ok(())
}
