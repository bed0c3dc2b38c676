//! Purpose: `herodex` CLI entry point and command bootstrap.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (human or JSON by tty/flags).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All collection mutations go through `api::HeroStore`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint,
    error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod serve;

use herodex::api::{
    AssetRef, Error, ErrorKind, Hero, HeroStore, Publisher, default_asset_ref, ensure_hero_id,
    open_source, to_exit_code,
};
use herodex::notice::{Notice, notice_json};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Run `herodex --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let asset = cli
        .db
        .as_deref()
        .map(AssetRef::parse)
        .unwrap_or_else(default_asset_ref);
    let color_mode = cli.color;

    // The serve command installs its own subscriber at info level.
    if !matches!(cli.command, Command::Serve(_)) {
        init_cli_tracing();
    }

    let result = command_dispatch::dispatch_command(cli.command, asset, color_mode);

    result
        .map_err(add_fetch_hint)
        .map_err(add_parse_hint)
        .map_err(add_io_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "herodex",
    version,
    about = "An in-memory hero catalog seeded from a JSON asset",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"The catalog loads once from a JSON asset and lives in process memory.
Mutations last for one command (or one serve session); nothing is written back.

Mental model:
  - `list`, `show`, `search` read the catalog
  - `add`, `edit`, `delete` change the in-memory copy
  - `serve` exposes the same operations over HTTP/JSON
"#,
    after_help = r#"EXAMPLES
  $ herodex list
  $ herodex show dc-batman
  $ herodex search man
  $ herodex add --superhero "Moon Knight" --publisher marvel-comics --alter-ego "Marc Spector"
  $ herodex serve --bind 127.0.0.1:9270

LEARN MORE
  $ herodex <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        help = "Hero asset to load: a file path or an http(s) URL (default: assets/db.json, or $HERODEX_DB)",
        value_hint = ValueHint::AnyPath
    )]
    db: Option<String>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum PublisherArg {
    #[value(name = "dc-comics", alias = "dc", alias = "DC Comics")]
    DcComics,
    #[value(name = "marvel-comics", alias = "marvel", alias = "Marvel Comics")]
    MarvelComics,
}

impl PublisherArg {
    fn to_publisher(self) -> Publisher {
        match self {
            PublisherArg::DcComics => Publisher::DcComics,
            PublisherArg::MarvelComics => Publisher::MarvelComics,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "List every hero in the catalog")]
    List {
        #[arg(long, help = "Force JSON output even on a terminal")]
        json: bool,
    },
    #[command(
        about = "Show one hero by id",
        long_about = "Show one hero by id.\n\nAn unknown id is not an error: a redirect notice goes to stderr and the\nfull list is shown instead."
    )]
    Show {
        #[arg(help = "Hero id, e.g. dc-batman")]
        id: String,
        #[arg(long, help = "Force JSON output even on a terminal")]
        json: bool,
    },
    #[command(about = "Add a hero (the catalog assigns the id)")]
    Add(AddArgs),
    #[command(about = "Edit an existing hero's fields")]
    Edit(EditArgs),
    #[command(about = "Delete a hero by id (asks for confirmation)")]
    Delete {
        #[arg(help = "Hero id to delete")]
        id: String,
        #[arg(long, help = "Delete without a confirmation prompt")]
        yes: bool,
    },
    #[command(about = "Search heroes by name (case-insensitive substring)")]
    Search {
        #[arg(help = "Substring to match against superhero names")]
        query: String,
        #[arg(long, help = "Force JSON output even on a terminal")]
        json: bool,
    },
    #[command(about = "Serve the catalog over HTTP/JSON")]
    Serve(ServeArgs),
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct AddArgs {
    #[arg(long, help = "Superhero name")]
    superhero: String,
    #[arg(long, value_enum, help = "Publisher")]
    publisher: PublisherArg,
    #[arg(long, default_value = "", help = "Alter ego")]
    alter_ego: String,
    #[arg(long, default_value = "", help = "First appearance")]
    first_appearance: String,
    #[arg(long, default_value = "", help = "Associated characters")]
    characters: String,
    #[arg(long, help = "Alternate image URL or path")]
    alt_img: Option<String>,
    #[arg(long, help = "Force JSON output even on a terminal")]
    json: bool,
}

impl AddArgs {
    fn into_hero(self) -> Hero {
        Hero {
            id: String::new(),
            superhero: self.superhero,
            publisher: self.publisher.to_publisher(),
            alter_ego: self.alter_ego,
            first_appearance: self.first_appearance,
            characters: self.characters,
            alt_img: self.alt_img,
        }
    }
}

#[derive(Args)]
struct EditArgs {
    #[arg(help = "Hero id to edit")]
    id: String,
    #[arg(long, help = "New superhero name")]
    superhero: Option<String>,
    #[arg(long, value_enum, help = "New publisher")]
    publisher: Option<PublisherArg>,
    #[arg(long, help = "New alter ego")]
    alter_ego: Option<String>,
    #[arg(long, help = "New first appearance")]
    first_appearance: Option<String>,
    #[arg(long, help = "New associated characters")]
    characters: Option<String>,
    #[arg(long, help = "New alternate image (empty string clears it)")]
    alt_img: Option<String>,
    #[arg(long, help = "Force JSON output even on a terminal")]
    json: bool,
}

impl EditArgs {
    /// Overlay the provided flags on the stored record, pre-populated the
    /// way the edit form was.
    fn apply_to(self, mut hero: Hero) -> Hero {
        if let Some(superhero) = self.superhero {
            hero.superhero = superhero;
        }
        if let Some(publisher) = self.publisher {
            hero.publisher = publisher.to_publisher();
        }
        if let Some(alter_ego) = self.alter_ego {
            hero.alter_ego = alter_ego;
        }
        if let Some(first_appearance) = self.first_appearance {
            hero.first_appearance = first_appearance;
        }
        if let Some(characters) = self.characters {
            hero.characters = characters;
        }
        if let Some(alt_img) = self.alt_img {
            hero.alt_img = if alt_img.is_empty() { None } else { Some(alt_img) };
        }
        hero
    }
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:9270", help = "Address to bind")]
    bind: String,
    #[arg(long, help = "Allow binding to a non-loopback address")]
    allow_non_loopback: bool,
    #[arg(
        long,
        default_value_t = 64 * 1024,
        help = "Maximum request body size in bytes"
    )]
    max_body_bytes: u64,
    #[arg(
        long = "cors-origin",
        help = "Origin allowed for CORS (repeatable; * allows any)"
    )]
    cors_origin: Vec<String>,
}

fn serve_config_from_args(args: ServeArgs, asset: AssetRef) -> Result<serve::ServeConfig, Error> {
    let bind: SocketAddr = args.bind.parse().map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid bind address")
            .with_hint("Use a host:port value like 127.0.0.1:9270.")
    })?;
    Ok(serve::ServeConfig {
        bind,
        asset,
        allow_non_loopback: args.allow_non_loopback,
        max_body_bytes: args.max_body_bytes,
        cors_allowed_origins: args.cors_origin,
    })
}

/// Build a store and run the one-time load. Load failures are swallowed by
/// the store (logged, empty collection), matching the catalog's degraded
/// failure semantics; only a bad asset reference is an error here.
fn load_store(asset: &AssetRef) -> Result<HeroStore, Error> {
    let source = open_source(asset)?;
    let mut store = HeroStore::new();
    store.load_from_source(source.as_ref());
    Ok(store)
}

fn init_cli_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .compact()
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("invalid arguments")
        .trim()
        .trim_start_matches("error: ")
        .to_string()
}

fn confirm_delete(id: &str, yes: bool) -> Result<(), Error> {
    if yes {
        return Ok(());
    }
    if !io::stdin().is_terminal() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("delete requires confirmation")
            .with_hint("Pass --yes to delete without a prompt."));
    }
    eprint!("Delete hero {id}? [y/N] ");
    let _ = io::stderr().flush();
    let mut answer = String::new();
    io::stdin().read_line(&mut answer).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read confirmation")
            .with_source(err)
    })?;
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Ok(()),
        _ => Err(Error::new(ErrorKind::Usage).with_message("delete aborted")),
    }
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

impl AnsiColor {
    fn code(self) -> &'static str {
        match self {
            AnsiColor::Red => "31",
            AnsiColor::Yellow => "33",
        }
    }
}

fn colorize_label(label: &str, use_color: bool, color: AnsiColor) -> String {
    if use_color {
        format!("\x1b[{}m{label}\x1b[0m", color.code())
    } else {
        label.to_string()
    }
}

fn emit_json(value: Value) {
    if io::stdout().is_terminal() {
        let pretty = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        println!("{pretty}");
    } else {
        println!("{value}");
    }
}

fn emit_heroes(heroes: &[Hero], force_json: bool) {
    if !force_json && io::stdout().is_terminal() {
        emit_heroes_human(heroes);
        return;
    }
    emit_json(json!({ "heroes": heroes }));
}

fn emit_hero(hero: &Hero, force_json: bool) {
    if !force_json && io::stdout().is_terminal() {
        emit_hero_human(hero);
        return;
    }
    emit_json(json!({ "hero": hero }));
}

fn emit_heroes_human(heroes: &[Hero]) {
    if heroes.is_empty() {
        println!("No heroes loaded.");
        return;
    }
    let id_width = heroes.iter().map(|hero| hero.id.len()).max().unwrap_or(0).max(2);
    let name_width = heroes
        .iter()
        .map(|hero| hero.superhero.len())
        .max()
        .unwrap_or(0)
        .max("SUPERHERO".len());
    println!(
        "{:<id_width$}  {:<name_width$}  {:<13}  {}",
        "ID", "SUPERHERO", "PUBLISHER", "ALTER EGO"
    );
    for hero in heroes {
        println!(
            "{:<id_width$}  {:<name_width$}  {:<13}  {}",
            hero.id,
            hero.superhero,
            hero.publisher.as_str(),
            hero.alter_ego
        );
    }
}

fn emit_hero_human(hero: &Hero) {
    println!("id:               {}", hero.id);
    println!("superhero:        {}", hero.superhero);
    println!("publisher:        {}", hero.publisher);
    println!("alter ego:        {}", hero.alter_ego);
    println!("first appearance: {}", hero.first_appearance);
    println!("characters:       {}", hero.characters);
    if let Some(alt_img) = &hero.alt_img {
        println!("alt img:          {alt_img}");
    }
}

fn notice_time_now() -> Option<String> {
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn redirect_notice(id: &str) -> Notice {
    Notice {
        kind: "redirect".to_string(),
        time: notice_time_now().unwrap_or_default(),
        cmd: "show".to_string(),
        id: id.to_string(),
        message: "hero not found; showing the list instead".to_string(),
        details: Map::new(),
    }
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {} (id: {})", notice.message, notice.id);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("error:", color_mode.use_color(is_tty), AnsiColor::Red);
        eprintln!("{label} {}", error_message(err));
        if let Some(hint) = err.hint() {
            eprintln!("  hint: {hint}");
        }
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    let mut message = err.message().unwrap_or("unexpected failure").to_string();
    if let Some(id) = err.id() {
        message.push_str(&format!(" (id: {id})"));
    }
    if let Some(path) = err.path() {
        message.push_str(&format!(" (asset: {})", path.display()));
    }
    message
}

fn error_json(err: &Error) -> Value {
    let mut body = Map::new();
    body.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    body.insert(
        "message".to_string(),
        json!(err.message().unwrap_or("unexpected failure")),
    );
    if let Some(hint) = err.hint() {
        body.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        body.insert("path".to_string(), json!(path.to_string_lossy()));
    }
    if let Some(id) = err.id() {
        body.insert("id".to_string(), json!(id));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(body));
    Value::Object(outer)
}

fn add_fetch_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Fetch || err.hint().is_some() {
        return err;
    }
    err.with_hint("The asset could not be fetched. Check the --db path or URL.")
}

fn add_parse_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Parse || err.hint().is_some() {
        return err;
    }
    err.with_hint(r#"The asset is not a valid hero document. Expected {"heroes": [...]}."#)
}

fn add_io_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Io || err.hint().is_some() {
        return err;
    }
    err.with_hint("I/O error. Check the path, filesystem, and permissions.")
}

#[cfg(test)]
mod tests {
    use super::{Cli, CommandFactory, EditArgs, PublisherArg};
    use herodex::api::{Hero, Publisher};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn publisher_args_map_to_wire_publishers() {
        assert_eq!(PublisherArg::DcComics.to_publisher(), Publisher::DcComics);
        assert_eq!(
            PublisherArg::MarvelComics.to_publisher(),
            Publisher::MarvelComics
        );
    }

    #[test]
    fn edit_args_overlay_only_provided_fields() {
        let current = Hero {
            id: "1".to_string(),
            superhero: "Superman".to_string(),
            publisher: Publisher::DcComics,
            alter_ego: "Clark Kent".to_string(),
            first_appearance: "Action Comics #1".to_string(),
            characters: "Clark Kent".to_string(),
            alt_img: Some("superman.jpg".to_string()),
        };
        let args = EditArgs {
            id: "1".to_string(),
            superhero: Some("Superman Prime".to_string()),
            publisher: None,
            alter_ego: None,
            first_appearance: None,
            characters: None,
            alt_img: Some(String::new()),
            json: false,
        };

        let merged = args.apply_to(current);
        assert_eq!(merged.superhero, "Superman Prime");
        assert_eq!(merged.alter_ego, "Clark Kent");
        assert_eq!(merged.publisher, Publisher::DcComics);
        assert!(merged.alt_img.is_none());
    }
}
