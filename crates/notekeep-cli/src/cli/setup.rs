use clap::{Parser, Subcommand};
use notekeep::{BackendPreference, NoteOrder};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notekeep", bin_name = "notekeep", version)]
#[command(about = "Local notes with a SQLite store and a key-value fallback", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (defaults to notekeep.toml in the OS config directory)
    #[arg(long, global = true, help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Directory holding the database and key-value store
    #[arg(long, global = true, help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Storage backend: auto, sqlite or kv
    #[arg(long, global = true, value_parser = parse_backend, help_heading = "Options")]
    pub backend: Option<BackendPreference>,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "n", display_order = 1)]
    Create {
        /// Note title (defaults to "Untitled Note")
        #[arg(short, long)]
        title: Option<String>,

        /// Folder (defaults to "default")
        #[arg(short, long)]
        folder: Option<String>,

        /// Tag, repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Note body words (joined with spaces)
        #[arg(trailing_var_arg = true)]
        content: Vec<String>,
    },

    /// Show a note
    #[command(alias = "v", display_order = 2)]
    Get {
        id: String,

        /// Print the note as JSON
        #[arg(long)]
        json: bool,
    },

    /// List notes
    #[command(alias = "ls", display_order = 3)]
    List {
        /// Only notes in this folder
        #[arg(short, long)]
        folder: Option<String>,

        /// Only notes carrying this tag
        #[arg(long, conflicts_with = "folder")]
        tag: Option<String>,

        /// Sort order: updated, created or title
        #[arg(short, long, default_value = "updated")]
        sort: NoteOrder,

        /// Print notes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update fields of a note
    #[command(alias = "e", display_order = 4)]
    Update {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,

        #[arg(short, long)]
        folder: Option<String>,

        /// Replace all tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Remove every tag
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
    },

    /// Delete a note (missing ids are not an error)
    #[command(alias = "rm", display_order = 5)]
    Delete { id: String },

    /// Search title, content and tags
    #[command(display_order = 6)]
    Search {
        term: String,

        #[arg(long)]
        json: bool,
    },

    /// List folders with note counts
    #[command(display_order = 10)]
    Folders,

    /// List tags with note counts
    #[command(display_order = 11)]
    Tags,

    /// Export every note as a JSON bundle
    #[command(display_order = 20)]
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all notes with the contents of a bundle
    #[command(display_order = 21)]
    Import { file: PathBuf },

    /// Delete every note
    #[command(display_order = 22)]
    Clear {
        /// Required: confirms the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show storage statistics
    #[command(display_order = 30)]
    Stats {
        #[arg(long)]
        json: bool,
    },
}

fn parse_backend(raw: &str) -> Result<BackendPreference, String> {
    raw.parse().map_err(|e: notekeep::NotekeepError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "notekeep", "list", "--backend", "kv", "--data-dir", "/tmp/x", "-v",
        ])
        .unwrap();
        assert_eq!(cli.backend, Some(BackendPreference::Kv));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(cli.verbose);
    }

    #[test]
    fn list_sort_parses_note_order() {
        let cli = Cli::try_parse_from(["notekeep", "ls", "--sort", "title"]).unwrap();
        match cli.command {
            Some(Commands::List { sort, .. }) => assert_eq!(sort, NoteOrder::TitleAsc),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["notekeep", "ls", "--sort", "size"]).is_err());
    }

    #[test]
    fn create_collects_tags_and_content_words() {
        let cli = Cli::try_parse_from([
            "notekeep", "create", "--tag", "a", "--tag", "b", "buy", "milk",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Create { tags, content, .. }) => {
                assert_eq!(tags, vec!["a", "b"]);
                assert_eq!(content, vec!["buy", "milk"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["notekeep", "--backend", "postgres", "list"]).is_err());
    }
}
