use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Keyword index for browser bookmarks", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the index over http and apply bookmark events.
    Daemon {},

    /// Reconcile the index with a bookmark tree and extract keywords for
    /// new or renamed bookmarks.
    Sync {
        /// Bookmark tree json (node array or browser `Bookmarks` file).
        /// Defaults to `bookmarks_file` from config, then the browser profile.
        #[clap(short, long)]
        bookmarks: Option<String>,
    },

    /// Replace the index with unindexed records from a bookmark tree.
    Import {
        #[clap(short, long)]
        bookmarks: Option<String>,
    },

    /// Re-extract keywords for bookmarks already in the index
    Index {
        #[clap(required = true)]
        urls: Vec<String>,
    },

    /// Remove bookmarks from the index
    Delete {
        #[clap(required = true)]
        urls: Vec<String>,

        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },

    /// Overwrite the keywords of one bookmark.
    Keywords {
        url: String,

        /// Comma separated list
        keywords: String,
    },

    /// Search title, url and keywords (case-insensitive).
    Search {
        query: String,

        #[clap(short, long)]
        limit: Option<usize>,

        /// Print only the number of matches
        #[clap(short, long, default_value = "false")]
        count: bool,
    },

    /// Print address-bar suggestions for the given text
    Suggest { text: String },

    /// List indexed bookmarks with their status
    List {},

    /// Fetch a page and print its keywords without touching the index.
    Extract { url: String },

    /// Write the whole index as json.
    Export {
        /// Defaults to bookmark_data_<timestamp>.json
        #[clap(short, long)]
        output: Option<String>,
    },
}

/// Splits a comma separated keyword list.
pub fn parse_keywords(keywords: &str) -> Vec<String> {
    keywords
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .collect()
}
