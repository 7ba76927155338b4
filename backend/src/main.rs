//! Libadmin CLI - Validate, enrich and register public library CSV files
//!
//! # Main Commands
//!
//! ```bash
//! libadmin check libraries.csv             # Validate only, exit 0 / -1
//! libadmin extend libraries.csv            # Validate + write extended_libraries.csv
//! libadmin upload extended_libraries.csv   # Validate + insert missing libraries
//! ```
//!
//! # Registry Maintenance
//!
//! ```bash
//! libadmin update KY0069 --address "1 Main St"
//! libadmin update KY0069 --regenerate-api-key
//! libadmin delete KY0069
//! ```

use clap::{Args, Parser, Subcommand};
use libadmin::{
    delete_library, extend_csv, update_library, upload_csv, validate_file, AdminError,
    AdminResult, CheckOrder, Diagnostics, ExtendOptions, IdentifierPattern, LetterWriter,
    LibraryUpdate, LogLevel, PassphraseGenerator, PostgrestStore, StoreConfig, TokenSource,
    UploadOptions, ValidationPolicy, Verdict, API_KEY, DEFAULT_LOG_FILE, DEFAULT_WORD_COUNT,
};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "libadmin")]
#[command(about = "Validate and register public library CSV files", long_about = None)]
struct Cli {
    /// Append warnings and errors to this file
    #[arg(long, global = true, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a library CSV file
    Check {
        /// Input CSV file
        input: PathBuf,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Validate a CSV file and write a copy with a generated API key per row
    Extend {
        /// Input CSV file
        input: PathBuf,

        /// Replace an existing extended file
        #[arg(long)]
        overwrite: bool,

        /// Name of the credential column
        #[arg(long, default_value = API_KEY)]
        column: String,

        /// Words per generated API key
        #[arg(long, default_value_t = DEFAULT_WORD_COUNT)]
        words: usize,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Insert every library of an extended CSV that the registry does not have yet
    Upload {
        /// Extended CSV file
        input: PathBuf,

        /// Write a letter for each inserted library into this directory
        #[arg(long)]
        letters: Option<PathBuf>,

        /// Write HTML letters only
        #[arg(long)]
        no_pdf: bool,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Change fields of a registered library
    Update {
        /// FSCS id of the library
        fscs_id: String,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        /// Issue a new API key and write a new letter
        #[arg(long)]
        regenerate_api_key: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Directory for the new letter
        #[arg(long, default_value = "letters")]
        letters: PathBuf,

        /// Write HTML letters only
        #[arg(long)]
        no_pdf: bool,
    },

    /// Remove a library from the registry
    Delete {
        /// FSCS id of the library
        fscs_id: String,
    },
}

/// Validation settings shared by the file commands.
#[derive(Args)]
struct PolicyArgs {
    /// Require full FSCS ids (`AA0000` or `AA0000-000`) instead of a matching prefix
    #[arg(long, conflicts_with = "id_pattern")]
    strict_ids: bool,

    /// Custom regular expression for FSCS ids
    #[arg(long)]
    id_pattern: Option<String>,

    /// Compare headers before looking for missing values
    #[arg(long)]
    headers_first: bool,
}

impl PolicyArgs {
    fn to_policy(&self) -> AdminResult<ValidationPolicy> {
        let pattern = match (&self.id_pattern, self.strict_ids) {
            (Some(custom), _) => IdentifierPattern::custom(custom)?,
            (None, true) => IdentifierPattern::strict(),
            (None, false) => IdentifierPattern::prefix(),
        };
        let order = if self.headers_first {
            CheckOrder::HeadersFirst
        } else {
            CheckOrder::NullsFirst
        };
        Ok(ValidationPolicy::default()
            .with_identifier_pattern(pattern)
            .with_check_order(order))
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let diag = match Diagnostics::standard(&cli.log_file) {
        Ok(diag) => diag,
        Err(e) => {
            eprintln!("⚠️  Cannot open {}: {}", cli.log_file.display(), e);
            Diagnostics::silent().with_sink(LogLevel::Debug, libadmin::logs::ConsoleSink)
        }
    };

    let result = match cli.command {
        Commands::Check { input, policy } => cmd_check(&input, &policy, &diag),

        Commands::Extend {
            input,
            overwrite,
            column,
            words,
            policy,
        } => cmd_extend(&input, overwrite, column, words, &policy, &diag),

        Commands::Upload {
            input,
            letters,
            no_pdf,
            policy,
        } => cmd_upload(&input, letters, no_pdf, &policy, &diag).await,

        Commands::Update {
            fscs_id,
            address,
            name,
            tag,
            regenerate_api_key,
            yes,
            letters,
            no_pdf,
        } => {
            let update = LibraryUpdate {
                address,
                name,
                tag,
                ..LibraryUpdate::new(fscs_id)
            };
            cmd_update(update, regenerate_api_key, yes, letter_writer(letters, no_pdf), &diag).await
        }

        Commands::Delete { fscs_id } => cmd_delete(&fscs_id, &diag).await,
    };

    if let Err(e) = &result {
        if !e.already_reported() {
            diag.error(e.to_string());
        }
    }
    std::process::exit(Verdict::from(&result).exit_code());
}

fn cmd_check(input: &Path, policy: &PolicyArgs, diag: &Diagnostics) -> AdminResult<()> {
    validate_file(input, &policy.to_policy()?, diag)?;
    Ok(())
}

fn cmd_extend(
    input: &Path,
    overwrite: bool,
    column: String,
    words: usize,
    policy: &PolicyArgs,
    diag: &Diagnostics,
) -> AdminResult<()> {
    let mut generator = PassphraseGenerator::new().with_word_count(words);
    let options = ExtendOptions {
        policy: policy.to_policy()?,
        column,
        overwrite,
    };
    let output = extend_csv(input, &options, &mut generator, diag)?;
    eprintln!("💾 Extended CSV written to: {}", output.display());
    Ok(())
}

async fn cmd_upload(
    input: &Path,
    letters: Option<PathBuf>,
    no_pdf: bool,
    policy: &PolicyArgs,
    diag: &Diagnostics,
) -> AdminResult<()> {
    let config = StoreConfig::from_env()?;
    let store = PostgrestStore::new(&config, diag);
    let options = UploadOptions {
        policy: policy.to_policy()?,
        letters: letters.map(|dir| letter_writer(dir, no_pdf)),
    };

    let report = upload_csv(input, &store, &options, diag).await?;

    let summary = report.summary();
    eprintln!(
        "\n📊 Results: {} inserted, {} already present",
        summary.inserted, summary.skipped
    );
    if !report.letters.is_empty() {
        diag.info(format!("{} letter(s) written", report.letters.len()));
        for files in &report.letters {
            let shown = files.pdf.as_ref().unwrap_or(&files.html);
            diag.info_indent(shown.display().to_string(), 1);
        }
    }
    for key in &report.letter_failures {
        diag.error_indent(format!("No letter for {}", key), 1);
    }
    Ok(())
}

async fn cmd_update(
    mut update: LibraryUpdate,
    regenerate_api_key: bool,
    yes: bool,
    letters: LetterWriter,
    diag: &Diagnostics,
) -> AdminResult<()> {
    if regenerate_api_key {
        let question = format!(
            "Regenerating the API key of {} invalidates the current one. Continue?",
            update.fscs_id
        );
        if !yes && !confirm(&question)? {
            return Err(AdminError::Aborted(format!(
                "API key of {} left unchanged",
                update.fscs_id
            )));
        }
        update.api_key = Some(PassphraseGenerator::new().generate());
    }

    let config = StoreConfig::from_env()?;
    let store = PostgrestStore::new(&config, diag);
    let result = update_library(&store, &update, Some(&letters), diag).await?;
    print_json(&result)
}

async fn cmd_delete(fscs_id: &str, diag: &Diagnostics) -> AdminResult<()> {
    let config = StoreConfig::from_env()?;
    let store = PostgrestStore::new(&config, diag);
    let result = delete_library(&store, fscs_id, diag).await?;
    print_json(&result)
}

fn letter_writer(dir: PathBuf, no_pdf: bool) -> LetterWriter {
    let writer = LetterWriter::new(dir);
    if no_pdf {
        writer.html_only()
    } else {
        writer
    }
}

/// Ask a yes/no question on stderr; only `y` or `yes` confirms.
fn confirm(question: &str) -> AdminResult<bool> {
    eprint!("{} [y/N] ", question);
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_json(value: &Value) -> AdminResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::from)?;
    println!("{}", json);
    Ok(())
}
