use std::io::{self, IsTerminal, Read};

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "selectwise",
    version,
    about = "Analyze selected text with Gemini and save it to Notion"
)]
struct Cli {
    /// Page URL the text was selected from
    #[arg(short = 'u', long = "url")]
    url: Option<String>,

    /// Target language override (e.g. English, 中文)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Interface language (en, zh-CN, ja, es, fr)
    #[arg(long = "ui-lang")]
    ui_lang: Option<String>,

    /// Gemini API key (overrides settings)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Notion database id for save operations
    #[arg(short = 'd', long = "database")]
    database: Option<String>,

    /// Save the analysis to Notion after analyzing
    #[arg(short = 's', long = "save")]
    save: bool,

    /// Print the raw analysis JSON instead of the labelled rendering
    #[arg(long = "json")]
    json: bool,

    /// Show analysis history and exit
    #[arg(long = "show-history")]
    show_history: bool,

    /// Search history by text, translation or tag and exit
    #[arg(long = "search")]
    search: Option<String>,

    /// Delete one history entry by id and exit
    #[arg(long = "delete-history")]
    delete_history: Option<String>,

    /// Delete all history entries and exit
    #[arg(long = "clear-history")]
    clear_history: bool,

    /// Save a stored history entry to Notion and exit
    #[arg(long = "save-history")]
    save_history: Option<String>,

    /// Show usage statistics and exit
    #[arg(long = "show-statistics")]
    show_statistics: bool,

    /// Show the resolved Notion database name and exit
    #[arg(long = "show-database-name")]
    show_database_name: bool,

    /// Show selectable target languages and exit
    #[arg(long = "show-target-languages")]
    show_target_languages: bool,

    /// Export settings, history and statistics to a file
    #[arg(long = "export")]
    export: Option<String>,

    /// Import a previously exported configuration file
    #[arg(long = "import")]
    import: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Serve the HTTP API on the given address (e.g. 127.0.0.1:8787)
    #[arg(long = "serve")]
    serve: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

impl Cli {
    fn needs_input(&self) -> bool {
        !(self.show_history
            || self.search.is_some()
            || self.delete_history.is_some()
            || self.clear_history
            || self.save_history.is_some()
            || self.show_statistics
            || self.show_database_name
            || self.show_target_languages
            || self.export.is_some()
            || self.import.is_some()
            || self.serve.is_some())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    selectwise::logging::init(cli.verbose);

    let input = if cli.needs_input() && !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Some(buffer)
    } else {
        None
    };

    let output = selectwise::run(
        selectwise::Config {
            url: cli.url,
            lang: cli.lang,
            ui_lang: cli.ui_lang,
            key: cli.key,
            database: cli.database,
            save: cli.save,
            json: cli.json,
            show_history: cli.show_history,
            search: cli.search,
            delete_history: cli.delete_history,
            clear_history: cli.clear_history,
            save_history: cli.save_history,
            show_statistics: cli.show_statistics,
            show_database_name: cli.show_database_name,
            show_target_languages: cli.show_target_languages,
            export_path: cli.export,
            import_path: cli.import,
            settings_path: cli.read_settings,
            serve: cli.serve,
            verbose: cli.verbose,
        },
        input,
    )
    .await?;

    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
