use clap::{Parser, Subcommand};
use leafscribe::{editor_builder, open_store, MediaWikiApi, ScribeConfig};
use leafscribe_core::{markup, DocumentIdentity, Mode, RecoveryOutcome, Transcriber};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leafscribe")]
#[command(about = "Transcribe palm-leaf manuscript pages")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Script code of the manuscript
    #[arg(long, global = true, default_value = "bali")]
    script: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read leaves from the wiki, one page title per leaf
    View {
        /// Page titles in leaf order
        #[arg(long, num_args = 1.., required = true)]
        pages: Vec<String>,
        /// Item the leaves belong to
        #[arg(long)]
        item: String,
        /// Leaf to start on
        #[arg(long, default_value_t = 0)]
        leaf: usize,
    },
    /// Transcribe into a local file standing in for the host field
    Edit {
        #[arg(long)]
        host_file: PathBuf,
        #[arg(long)]
        item: String,
        #[arg(long)]
        file: String,
        #[arg(long, default_value_t = 0)]
        leaf: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ScribeConfig::load_toml(path)?,
        None => ScribeConfig::default(),
    };

    match cli.command {
        Commands::View { pages, item, leaf } => {
            run_view(&config, &cli.script, pages, item, leaf)
        }
        Commands::Edit {
            host_file,
            item,
            file,
            leaf,
        } => run_edit(&config, &cli.script, host_file, item, file, leaf),
    }
}

/// Next input line, trimmed; `None` at end of input.
fn read_command() -> anyhow::Result<Option<String>> {
    print!("> ");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn ask_restore(saved: &str, loaded: &str) -> bool {
    println!("Unsaved work was found for this leaf.");
    println!("--- saved ---\n{saved}\n--- loaded ---\n{loaded}");
    print!("Restore the saved text? [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
        Err(_) => false,
    }
}

fn run_timers(editor: &mut Transcriber) {
    let mut prompt = ask_restore;
    if let RecoveryOutcome::Restored(_) = editor.tick(Instant::now(), &mut prompt) {
        print_leaf(editor);
    }
}

fn print_leaf(editor: &Transcriber) {
    let id = editor.identity();
    println!("== {} (leaf {}) ==", id, id.leaf + 1);
    if let Some(url) = &editor.media().image_url {
        println!("image: {url}");
    }
    println!("{}", editor.text());
    if editor.transliteration().is_open() {
        println!("-- {} --\n{}", editor.variant(), editor.transliteration().text());
    }
}

fn run_view(
    config: &ScribeConfig,
    script: &str,
    pages: Vec<String>,
    item: String,
    leaf: usize,
) -> anyhow::Result<()> {
    let api = MediaWikiApi::new(&config.api_url, pages, config.request_timeout())?;
    let store = open_store(config)?;
    let identity = DocumentIdentity::new(
        item,
        config.commons_file.clone().unwrap_or_default(),
        leaf,
    );
    let mut editor = editor_builder(config, identity, Mode::View, script, store)
        .leaf_count(api.leaf_count())
        .build();

    editor.open_from_fetch(&api, Instant::now())?;
    print_leaf(&editor);
    println!("commands: n (next), p (previous), t [variant] (transliterate), q (quit)");

    while let Some(line) = read_command()? {
        run_timers(&mut editor);
        let mut words = line.split_whitespace();
        let target = match words.next() {
            Some("q") => break,
            Some("n") if editor.can_go_next() => Some(editor.identity().leaf + 1),
            Some("p") if editor.can_go_prev() => Some(editor.identity().leaf - 1),
            Some("n") | Some("p") => {
                println!("no more leaves that way");
                None
            }
            Some("t") => {
                let changed = match words.next() {
                    Some(variant) => editor.set_variant(variant, &api),
                    None => editor.set_transliteration_open(true, &api),
                };
                if changed {
                    print_leaf(&editor);
                }
                None
            }
            Some(other) => {
                println!("unknown command `{other}`");
                None
            }
            None => None,
        };
        if let Some(next) = target {
            match editor.set_leaf(next, &api, Instant::now()) {
                Ok(()) => print_leaf(&editor),
                Err(e) => warn!(leaf = next, error = %e, "could not change leaf"),
            }
        }
    }
    editor.close(None);
    Ok(())
}

fn run_edit(
    config: &ScribeConfig,
    script: &str,
    host_file: PathBuf,
    item: String,
    file: String,
    leaf: usize,
) -> anyhow::Result<()> {
    let mut host = if host_file.exists() {
        std::fs::read_to_string(&host_file)?
    } else {
        String::new()
    };
    let store = open_store(config)?;
    let identity = DocumentIdentity::new(item, file, leaf);
    let mut editor = editor_builder(config, identity, Mode::Edit, script, store).build();

    editor.open_from_host(&host, Instant::now());
    print_leaf(&editor);
    println!("commands: type <keys...>, text <s>, caret <n>, show, q");

    while let Some(line) = read_command()? {
        run_timers(&mut editor);
        let (cmd, rest) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        match cmd {
            "q" => break,
            "type" => {
                for key in rest.split_whitespace() {
                    editor.press_key(key);
                }
            }
            "text" => {
                let text = markup::decode(&rest.replace("\\n", "\n"));
                let caret = text.chars().count();
                editor.native_edit(&text, caret);
            }
            "caret" => match rest.trim().parse::<usize>() {
                Ok(n) => {
                    editor.native_select(n);
                }
                Err(_) => println!("caret needs a number"),
            },
            "show" => {}
            "" => continue,
            other => {
                println!("unknown command `{other}`");
                continue;
            }
        }
        show_caret(&editor);
    }

    editor.close(Some(&mut host));
    std::fs::write(&host_file, &host)?;
    info!(path = %host_file.display(), "host field written");
    Ok(())
}

fn show_caret(editor: &Transcriber) {
    let buffer = editor.buffer();
    println!("{}|{}", buffer.before_caret(), buffer.after_caret());
    let pending = editor.composition();
    if !pending.is_empty() {
        println!("(pending: {})", pending.pending().join("+"));
    }
}
