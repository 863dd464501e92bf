//! try - ephemeral workspace manager
//!
//! try keeps throwaway project directories under one tries directory, each
//! prefixed with its creation date, and lets you jump between them with a
//! fuzzy-filtered terminal selector.
//!
//! The binary never changes directory itself. It prints a shell script on
//! stdout which the `try` shell function (see `try init`) evaluates. The
//! selector UI is drawn on stderr.
//!
//! # Quick Start
//!
//! ```text
//! eval "$(try init ~/src/tries)"   # bash/zsh
//! try                              # open the selector
//! try redis                        # selector filtered by "redis"
//! try clone https://github.com/user/repo
//! try . experiment                 # worktree of the current repo
//! ```
//!
//! # Selector keys
//!
//! | Key | Action |
//! |-----|--------|
//! | ↑/↓, Ctrl-P/Ctrl-N | Move |
//! | Enter | Open, create, or confirm deletion |
//! | Ctrl-D | Mark for deletion |
//! | Ctrl-A/E/B/F/K/W | Edit the query |
//! | Esc, Ctrl-C | Leave delete mode, or cancel |

mod config;
mod core;
mod selector;
mod shell;
mod ui;
mod workspace;

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context as _};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config;
use crate::selector::{SelectionResult, Selector, SelectorOptions};
use crate::ui::{KeyMapper, OutputMode, TokenMode};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "{h1}try{reset} v{version} - ephemeral workspace manager

To use try, add to your shell config:

  {dim}# bash/zsh (~/.bashrc or ~/.zshrc){/fg}
  {b}eval \"$(try init ~/src/tries)\"{/b}

  {dim}# fish (~/.config/fish/config.fish){/fg}
  {b}eval (try init ~/src/tries | string collect){/b}

{h2}Usage:{reset}
  try [query]           Interactive directory selector
  try clone <url>       Clone repo into dated directory
  try worktree <name>   Create worktree from current git repo
  try --help            Show this help

{h2}Commands:{reset}
  init [path]           Output shell function definition
  clone <url> [name]    Clone git repo into date-prefixed directory
  worktree <name>       Create worktree in dated directory

{h2}Examples:{reset}
  try                   Open interactive selector
  try project           Selector with initial filter
  try clone https://github.com/user/repo
  try worktree feature-branch

{h2}Manual mode (without alias):{reset}
  try exec [query]      Output shell script to eval

{h2}Defaults:{reset}
  Default path: {dim}~/src/tries{/fg}
  Current: {dim}{tries}{/fg}
";

/// Command line
#[derive(Parser, Debug)]
#[command(name = "try", disable_help_flag = true, disable_version_flag = true)]
struct Args {
    /// Override tries directory
    #[arg(long = "path", value_name = "DIR")]
    path: Option<String>,

    /// Disable ANSI colors
    #[arg(long)]
    no_colors: bool,

    #[arg(long, hide = true)]
    no_expand_tokens: bool,

    /// Initial query, replacing the one from the command line
    #[arg(long, hide = true, value_name = "QUERY")]
    and_type: Option<String>,

    /// Render one frame and exit
    #[arg(long, hide = true)]
    and_exit: bool,

    /// Key script to use instead of the keyboard
    #[arg(long, hide = true, value_name = "KEYS")]
    and_keys: Option<String>,

    /// Deletion confirmation to use instead of typed input
    #[arg(long, hide = true, value_name = "TEXT")]
    and_confirm: Option<String>,

    #[arg(short = 'v', long)]
    version: bool,

    #[arg(short = 'h', long)]
    help: bool,

    /// Command and its arguments, or a search query
    #[arg(value_name = "ARGS")]
    args: Vec<String>,
}

/// What a command produced
#[derive(Debug, PartialEq)]
enum Outcome {
    /// Commands for the shell function to evaluate
    Script(Vec<String>),
    /// Text printed as-is
    Text(String),
    /// Selector was dismissed
    Cancelled,
}

/// Resolved settings shared by all commands
struct App {
    args: Args,
    config: Config,
    tries: PathBuf,
    tokens: TokenMode,
    cwd: PathBuf,
}

impl App {
    fn route(&self) -> anyhow::Result<Outcome> {
        let args = &self.args.args;
        let Some(command) = args.first() else {
            return self.cmd_cd(&[]);
        };
        let rest = &args[1..];

        match command.as_str() {
            "clone" => self.cmd_clone(rest),
            "init" => self.cmd_init(rest),
            "worktree" => self.cmd_worktree(rest),
            "exec" => match rest.first().map(String::as_str) {
                Some("clone") => self.cmd_clone(&rest[1..]),
                Some("worktree") => self.cmd_worktree(&rest[1..]),
                Some("cd") => self.cmd_cd(&rest[1..]),
                _ => self.cmd_cd(rest),
            },
            _ => self.cmd_cd(args),
        }
    }

    /// Selector, `try . <name>`, `try ./path`, or clone shorthand
    fn cmd_cd(&self, args: &[String]) -> anyhow::Result<Outcome> {
        if let Some(first) = args.first() {
            if first == "clone" {
                return self.cmd_clone(&args[1..]);
            }
            if first.starts_with('.') {
                return self.cmd_dot(first, &args[1..]);
            }
        }

        let search = args.join(" ");
        let mut words = search.split_whitespace();
        if let Some(uri) = words.next().filter(|w| workspace::is_git_uri(w)) {
            let custom = words.collect::<Vec<_>>().join(" ");
            return self.clone_into(uri, Some(custom.as_str()).filter(|c| !c.is_empty()));
        }

        let result = self.select(&search)?;
        Ok(match result {
            SelectionResult::Cd(path) => Outcome::Script(shell::script_cd(&path)),
            SelectionResult::Mkdir(path) => Outcome::Script(shell::script_mkdir_cd(&path)),
            SelectionResult::Delete { paths, base } => {
                Outcome::Script(shell::script_delete(&paths, &base, &self.cwd))
            }
            SelectionResult::Cancelled => Outcome::Cancelled,
        })
    }

    fn select(&self, search: &str) -> anyhow::Result<SelectionResult> {
        let args = &self.args;
        let forced = args.and_exit || args.and_keys.is_some();

        let mut output = OutputMode::empty();
        output.set(OutputMode::TTY, io::stderr().is_terminal());
        output.set(OutputMode::FORCE_COLORS, forced);

        let options = SelectorOptions {
            initial_query: initial_query(args.and_type.as_deref(), search),
            render_once: args.and_exit,
            key_script: args
                .and_keys
                .as_deref()
                .filter(|k| !k.is_empty())
                .map(KeyMapper::parse_script),
            confirm: args.and_confirm.clone(),
            escape_timeout: self.config.escape_timeout(),
            output,
            tokens: self.tokens,
        };

        let mut selector = Selector::new(&self.tries, options);
        selector.run().map_err(|e| {
            error!("Selector failed: {}", e);
            anyhow!(e)
        })
    }

    /// `try . <name>` / `try ./path [name]`: worktree for a git repository,
    /// plain directory otherwise
    fn cmd_dot(&self, path_arg: &str, rest: &[String]) -> anyhow::Result<Outcome> {
        let custom = rest.join(" ");
        if path_arg == "." && custom.trim().is_empty() {
            bail!("'try .' requires a name argument\nUsage: try . <name>");
        }

        let repo_dir = self.cwd.join(path_arg);
        let name = if custom.trim().is_empty() {
            dir_name(&repo_dir)
        } else {
            workspace::dashify(&custom)
        };
        let date = workspace::date_prefix();
        let name = workspace::resolve_unique_name(&self.tries, &date, &name);
        let full = self.tries.join(format!("{}-{}", date, name));

        if repo_dir.join(".git").is_dir() {
            Ok(Outcome::Script(shell::script_worktree(
                &full,
                Some(&repo_dir),
                &self.cwd,
                self.tokens,
            )))
        } else {
            Ok(Outcome::Script(shell::script_mkdir_cd(&full)))
        }
    }

    fn cmd_clone(&self, args: &[String]) -> anyhow::Result<Outcome> {
        let Some(uri) = args.first() else {
            bail!("git URI required for clone command\nUsage: try clone <git-uri> [name]");
        };
        self.clone_into(uri, args.get(1).map(String::as_str))
    }

    fn clone_into(&self, uri: &str, custom: Option<&str>) -> anyhow::Result<Outcome> {
        let dir = workspace::clone_dir_name(uri, custom)
            .ok_or_else(|| anyhow!("Unable to parse git URI: {}", uri))?;
        Ok(Outcome::Script(shell::script_clone(&self.tries.join(dir), uri, self.tokens)))
    }

    /// `try worktree [dir|<repo>] [name...]`
    fn cmd_worktree(&self, args: &[String]) -> anyhow::Result<Outcome> {
        let repo_dir = match args.first().map(String::as_str) {
            Some(repo) if repo != "dir" => self.cwd.join(repo),
            _ => self.cwd.clone(),
        };
        let custom = (args.len() > 1).then(|| args[1..].join(" "));
        let path = workspace::worktree_path(&self.tries, &repo_dir, custom.as_deref());
        let repo = (repo_dir != self.cwd).then_some(repo_dir.as_path());
        Ok(Outcome::Script(shell::script_worktree(&path, repo, &self.cwd, self.tokens)))
    }

    fn cmd_init(&self, args: &[String]) -> anyhow::Result<Outcome> {
        let tries = match args.first() {
            Some(p) if p.starts_with('/') || p.starts_with('~') => workspace::expand_home(p),
            _ => self.tries.clone(),
        };
        let exe = std::env::current_exe().context("Cannot locate the try executable")?;
        let fish = shell::is_fish(std::env::var("SHELL").ok().as_deref());
        Ok(Outcome::Text(shell::init_script(&exe, &tries, fish)))
    }
}

fn dir_name(path: &Path) -> String {
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `--and-type` wins; otherwise the search words joined with `-`
fn initial_query(and_type: Option<&str>, search: &str) -> String {
    let raw = and_type.filter(|q| !q.is_empty()).unwrap_or(search);
    workspace::dashify(raw.trim())
}

fn token_mode(no_expand: bool, no_colors: bool, no_color_env: bool, config_colors: bool) -> TokenMode {
    if no_expand {
        TokenMode::Literal
    } else if no_colors || no_color_env || !config_colors {
        TokenMode::Strip
    } else {
        TokenMode::Expand
    }
}

/// Log to `~/.try/try.log`; stderr is the UI and stdout the script
fn init_logging(config: &Config) {
    let Some(dir) = Config::data_dir() else {
        return;
    };
    let log_path = dir.join("try.log");

    // Create log directory if needed
    let _ = std::fs::create_dir_all(&dir);

    let log_file = OpenOptions::new().create(true).append(true).open(&log_path).ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_env("TRY_LOG")
            .or_else(|_| EnvFilter::try_new(config.log.level.as_deref().unwrap_or("warn")))
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.version {
        println!("try {}", VERSION);
        return Ok(());
    }

    let (config, config_error) = match Config::load() {
        Ok(c) => (c, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_logging(&config);
    if let Some(e) = config_error {
        warn!("{}, using defaults", e);
    }
    info!("try {} starting", VERSION);

    let no_color_env = std::env::var_os("NO_COLOR").map_or(false, |v| !v.is_empty());
    let tokens = token_mode(args.no_expand_tokens, args.no_colors, no_color_env, config.colors);
    let tries = config.tries_path(args.path.as_deref());

    if args.help {
        let help = HELP_TEXT
            .replace("{version}", VERSION)
            .replace("{tries}", &tries.display().to_string());
        print!("{}", tokens.apply(&help));
        return Ok(());
    }

    let cwd = std::env::current_dir().context("Cannot determine the current directory")?;
    let app = App {
        args,
        config,
        tries,
        tokens,
        cwd,
    };

    match app.route()? {
        Outcome::Script(cmds) => {
            shell::emit_script(&mut io::stdout().lock(), &cmds)?;
        }
        Outcome::Text(text) => print!("{}", text),
        Outcome::Cancelled => {
            println!("Cancelled.");
            std::process::exit(1);
        }
    }
    Ok(())
}
