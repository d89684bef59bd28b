//! # CLI Layer
//!
//! The CLI layer is the **only** place that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Installs the `tracing` subscriber
//! - Formats output for human consumption
//!
//! ## Flow
//!
//! 1. Parse arguments (`setup.rs`).
//! 2. Install logging: `warn` by default, `debug` with `-v`, `RUST_LOG`
//!    overrides both.
//! 3. Resolve configuration: `--config` file or the default one, then
//!    environment, then `--data-dir` / `--backend` flags on top.
//! 4. Initialize the storage façade and the preferences store over one
//!    shared key-value engine.
//! 5. Dispatch to a `handle_*` function and render the result.

use super::print::{
    print_labels, print_message, print_note, print_notes, print_notice, print_stats, MessageLevel,
};
use super::setup::{Cli, Commands};
use anyhow::{bail, Context, Result};
use clap::Parser;
use notekeep::kv::{self, KvEngine};
use notekeep::{
    sort_notes, ExportBundle, NoteDraft, NoteOrder, NoteStorage, NoteUpdate, Preferences,
    StorageConfig,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const WELCOME: &str = "Welcome to notekeep! Notes are stored locally; run `notekeep --help` to get started.";

struct AppContext {
    storage: NoteStorage,
    prefs: Preferences<Arc<dyn KvEngine>>,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = resolve_config(&cli)?;
    let ctx = init_context(config).await?;
    greet_once(&ctx);

    match cli.command {
        Some(Commands::Create {
            title,
            folder,
            tags,
            content,
        }) => handle_create(&ctx, title, folder, tags, content).await,
        Some(Commands::Get { id, json }) => handle_get(&ctx, &id, json).await,
        Some(Commands::List {
            folder,
            tag,
            sort,
            json,
        }) => handle_list(&ctx, folder, tag, sort, json).await,
        Some(Commands::Update {
            id,
            title,
            content,
            folder,
            tags,
            clear_tags,
        }) => {
            let tags = if clear_tags {
                Some(Vec::new())
            } else if tags.is_empty() {
                None
            } else {
                Some(tags)
            };
            let update = NoteUpdate {
                title,
                content,
                tags,
                folder,
            };
            handle_update(&ctx, &id, update).await
        }
        Some(Commands::Delete { id }) => handle_delete(&ctx, &id).await,
        Some(Commands::Search { term, json }) => handle_search(&ctx, &term, json).await,
        Some(Commands::Folders) => handle_folders(&ctx).await,
        Some(Commands::Tags) => handle_tags(&ctx).await,
        Some(Commands::Export { output }) => handle_export(&ctx, output).await,
        Some(Commands::Import { file }) => handle_import(&ctx, &file).await,
        Some(Commands::Clear { yes }) => handle_clear(&ctx, yes).await,
        Some(Commands::Stats { json }) => handle_stats(&ctx, json).await,
        None => handle_list(&ctx, None, None, NoteOrder::default(), false).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    // logs go to stderr so stdout stays parseable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_config(cli: &Cli) -> Result<StorageConfig> {
    let mut config =
        StorageConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(backend) = cli.backend {
        config = config.with_backend(backend);
    }
    debug!(?config, "configuration resolved");
    Ok(config)
}

async fn init_context(config: StorageConfig) -> Result<AppContext> {
    let engine = kv::engine_for(&config)?;
    let mut storage = NoteStorage::open(config, Some(Arc::clone(&engine))).await;
    storage.init().await?;
    Ok(AppContext {
        storage,
        prefs: Preferences::new(engine),
    })
}

fn greet_once(ctx: &AppContext) {
    match ctx.prefs.has_seen_welcome() {
        Ok(true) => {}
        Ok(false) => {
            print_notice(WELCOME);
            if let Err(err) = ctx.prefs.mark_welcome_seen() {
                warn!(error = %err, "could not record welcome message");
            }
        }
        Err(err) => debug!(error = %err, "preferences unavailable"),
    }
}

async fn handle_create(
    ctx: &AppContext,
    title: Option<String>,
    folder: Option<String>,
    tags: Vec<String>,
    content: Vec<String>,
) -> Result<()> {
    let draft = NoteDraft {
        title,
        content: (!content.is_empty()).then(|| content.join(" ")),
        tags: (!tags.is_empty()).then_some(tags),
        folder,
    };
    let note = ctx.storage.create_note(draft).await?;
    print_message(MessageLevel::Success, &format!("Created note {}", note.id));
    Ok(())
}

async fn handle_get(ctx: &AppContext, id: &str, json: bool) -> Result<()> {
    let Some(note) = ctx.storage.get_note(id).await? else {
        bail!("Note not found: {id}");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        print_note(&note);
    }
    Ok(())
}

async fn handle_list(
    ctx: &AppContext,
    folder: Option<String>,
    tag: Option<String>,
    sort: NoteOrder,
    json: bool,
) -> Result<()> {
    let mut notes = match (folder, tag) {
        (Some(folder), _) => ctx.storage.get_notes_by_folder(&folder).await?,
        (None, Some(tag)) => ctx.storage.get_notes_by_tag(&tag).await?,
        (None, None) => ctx.storage.get_all_notes().await?,
    };
    sort_notes(&mut notes, sort);

    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else {
        print_notes(&notes);
    }
    Ok(())
}

async fn handle_update(ctx: &AppContext, id: &str, update: NoteUpdate) -> Result<()> {
    if update.is_empty() {
        bail!("nothing to update: pass --title, --content, --folder, --tag or --clear-tags");
    }
    let note = ctx.storage.update_note(id, update).await?;
    print_message(MessageLevel::Success, &format!("Updated note {}", note.id));
    Ok(())
}

async fn handle_delete(ctx: &AppContext, id: &str) -> Result<()> {
    ctx.storage.delete_note(id).await?;
    print_message(MessageLevel::Success, &format!("Deleted note {id}"));
    Ok(())
}

async fn handle_search(ctx: &AppContext, term: &str, json: bool) -> Result<()> {
    let mut notes = ctx.storage.search_notes(term).await?;
    sort_notes(&mut notes, NoteOrder::UpdatedDesc);
    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else {
        print_notes(&notes);
    }
    Ok(())
}

async fn handle_folders(ctx: &AppContext) -> Result<()> {
    let folders = ctx.storage.get_folders().await?;
    print_labels(&folders, "", "No folders yet.");
    Ok(())
}

async fn handle_tags(ctx: &AppContext) -> Result<()> {
    let tags = ctx.storage.get_tags().await?;
    print_labels(&tags, "#", "No tags yet.");
    Ok(())
}

async fn handle_export(ctx: &AppContext, output: Option<PathBuf>) -> Result<()> {
    let bundle = ctx.storage.export_data().await?;
    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            bundle.to_writer(&mut writer)?;
            writer.flush()?;
            print_message(
                MessageLevel::Success,
                &format!("Exported {} notes to {}", bundle.notes.len(), path.display()),
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            bundle.to_writer(&mut stdout)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

async fn handle_import(ctx: &AppContext, file: &Path) -> Result<()> {
    let reader = File::open(file)
        .map(BufReader::new)
        .with_context(|| format!("cannot open {}", file.display()))?;
    let bundle = ExportBundle::read_json(reader)?;
    let count = ctx.storage.import_data(&bundle).await?;
    print_message(
        MessageLevel::Success,
        &format!("Imported {count} notes (previous notes were replaced)"),
    );
    Ok(())
}

async fn handle_clear(ctx: &AppContext, yes: bool) -> Result<()> {
    if !yes {
        print_message(
            MessageLevel::Warning,
            "This deletes every note. Re-run with --yes to confirm.",
        );
        bail!("refusing to clear without --yes");
    }
    ctx.storage.clear_all_data().await?;
    print_message(MessageLevel::Success, "All notes deleted");
    Ok(())
}

async fn handle_stats(ctx: &AppContext, json: bool) -> Result<()> {
    let stats = ctx.storage.get_storage_stats().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    print_stats(&stats);
    if stats.total_notes == 0 {
        print_message(MessageLevel::Info, "The store is empty.");
    }
    Ok(())
}
