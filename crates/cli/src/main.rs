// Tabula CLI - headless spreadsheet operations

mod config;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use tabula_engine::cell_ref;
use tabula_engine::sheet::{CellRange, Sheet, SortKey};

use crate::config::Settings;

// Exit code registry
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE: u8 = 2;
pub const EXIT_IO: u8 = 3;
pub const EXIT_FORMAT: u8 = 4;

#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Headless spreadsheet formula engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty sheet file
    New {
        file: PathBuf,
        /// Grid rows (defaults from settings)
        #[arg(long)]
        rows: Option<usize>,
        /// Grid columns (defaults from settings)
        #[arg(long)]
        cols: Option<usize>,
    },
    /// Set a cell's formula
    Set {
        file: PathBuf,
        cell: String,
        formula: String,
    },
    /// Print a cell's raw formula text
    Get { file: PathBuf, cell: String },
    /// Print a cell's evaluated display text
    Show {
        file: PathBuf,
        cell: String,
        /// Emit the cell as a JSON object instead
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a formula against the sheet without storing it
    Eval { file: PathBuf, formula: String },
    /// Recompute every cell and print a report
    Recalc { file: PathBuf },
    /// Find the next cell whose display text contains the needle
    Find {
        file: PathBuf,
        text: String,
        #[arg(long)]
        case_sensitive: bool,
        /// Start searching after this cell
        #[arg(long)]
        after: Option<String>,
        /// Search backward instead
        #[arg(long)]
        backwards: bool,
    },
    /// Stable-sort the rows of a range by formula text
    Sort {
        file: PathBuf,
        range: String,
        /// Sort key as a column offset within the range, e.g. 0 or 1:desc
        #[arg(long = "key", value_name = "COL[:asc|desc]")]
        keys: Vec<String>,
    },
    /// Print a range of formulas as tab-separated text
    Copy { file: PathBuf, range: String },
    /// Paste tab-separated formulas from stdin at a cell or range
    Paste { file: PathBuf, target: String },
    /// Clear a range, or the whole sheet
    Clear {
        file: PathBuf,
        range: Option<String>,
    },
}

/// Error carrying its process exit code.
struct CliError {
    code: u8,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn usage(message: impl Into<String>) -> Self {
        CliError {
            code: EXIT_USAGE,
            message: message.into(),
            hint: None,
        }
    }

    fn io(message: impl Into<String>) -> Self {
        CliError {
            code: EXIT_IO,
            message: message.into(),
            hint: None,
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        CliError {
            code: EXIT_ERROR,
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(err.code)
        }
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::New { file, rows, cols } => cmd_new(&file, rows, cols),
        Commands::Set { file, cell, formula } => cmd_set(&file, &cell, &formula),
        Commands::Get { file, cell } => cmd_get(&file, &cell),
        Commands::Show { file, cell, json } => cmd_show(&file, &cell, json),
        Commands::Eval { file, formula } => cmd_eval(&file, &formula),
        Commands::Recalc { file } => cmd_recalc(&file),
        Commands::Find { file, text, case_sensitive, after, backwards } => {
            cmd_find(&file, &text, case_sensitive, after.as_deref(), backwards)
        }
        Commands::Sort { file, range, keys } => cmd_sort(&file, &range, &keys),
        Commands::Copy { file, range } => cmd_copy(&file, &range),
        Commands::Paste { file, target } => cmd_paste(&file, &target),
        Commands::Clear { file, range } => cmd_clear(&file, range.as_deref()),
    }
}

// =============================================================================
// Commands
// =============================================================================

fn cmd_new(file: &Path, rows: Option<usize>, cols: Option<usize>) -> Result<(), CliError> {
    let settings = Settings::load();
    let sheet = Sheet::with_size(
        rows.unwrap_or(settings.rows),
        cols.unwrap_or(settings.cols),
    );
    save_sheet(&sheet, file)?;
    println!("created {} ({}x{})", file.display(), sheet.rows(), sheet.cols());
    Ok(())
}

fn cmd_set(file: &Path, cell: &str, formula: &str) -> Result<(), CliError> {
    let mut sheet = open_sheet(file)?;
    let (row, col) = parse_cell(&sheet, cell)?;
    sheet.set_formula(row, col, formula);
    save_sheet(&sheet, file)
}

fn cmd_get(file: &Path, cell: &str) -> Result<(), CliError> {
    let sheet = open_sheet(file)?;
    let (row, col) = parse_cell(&sheet, cell)?;
    println!("{}", sheet.formula(row, col));
    Ok(())
}

fn cmd_show(file: &Path, cell: &str, as_json: bool) -> Result<(), CliError> {
    let sheet = open_sheet(file)?;
    let (row, col) = parse_cell(&sheet, cell)?;
    if as_json {
        let out = json!({
            "cell": cell_ref::format(row, col),
            "formula": sheet.formula(row, col),
            "value": sheet.value(row, col),
            "display": sheet.display_text(row, col),
        });
        println!("{}", out);
    } else {
        println!("{}", sheet.display_text(row, col));
    }
    Ok(())
}

fn cmd_eval(file: &Path, formula: &str) -> Result<(), CliError> {
    let sheet = open_sheet(file)?;
    println!("{}", sheet.eval_formula(formula).to_display());
    Ok(())
}

fn cmd_recalc(file: &Path) -> Result<(), CliError> {
    let mut sheet = open_sheet(file)?;
    let report = sheet.recalculate();
    log::info!("{}", report.log_line());
    println!("{}", report.summary());
    Ok(())
}

fn cmd_find(
    file: &Path,
    text: &str,
    case_sensitive: bool,
    after: Option<&str>,
    backwards: bool,
) -> Result<(), CliError> {
    let sheet = open_sheet(file)?;
    let from = match after {
        Some(token) => Some(parse_cell(&sheet, token)?),
        None => None,
    };
    let hit = if backwards {
        sheet.find_previous(from, text, case_sensitive)
    } else {
        sheet.find_next(from, text, case_sensitive)
    };
    match hit {
        Some((row, col)) => {
            println!("{}\t{}", cell_ref::format(row, col), sheet.display_text(row, col));
            Ok(())
        }
        None => Err(CliError::not_found(format!("'{}' not found", text))),
    }
}

fn cmd_sort(file: &Path, range: &str, keys: &[String]) -> Result<(), CliError> {
    let mut sheet = open_sheet(file)?;
    let range = parse_range(&sheet, range)?;
    let keys = if keys.is_empty() {
        vec![SortKey { column: 0, ascending: true }]
    } else {
        keys.iter()
            .map(|spec| parse_sort_key(spec))
            .collect::<Result<Vec<_>, _>>()?
    };
    sheet.sort_range(range, &keys);
    save_sheet(&sheet, file)
}

fn cmd_copy(file: &Path, range: &str) -> Result<(), CliError> {
    let sheet = open_sheet(file)?;
    let range = parse_range(&sheet, range)?;
    println!("{}", sheet.copy_range(range));
    Ok(())
}

fn cmd_paste(file: &Path, target: &str) -> Result<(), CliError> {
    let mut sheet = open_sheet(file)?;
    let target = parse_range(&sheet, target)?;

    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(|e| CliError::io(e.to_string()))?;

    sheet
        .paste(target, &text)
        .map_err(|e| CliError::not_found(e).with_hint("paste into a single anchor cell or a range matching the block"))?;
    save_sheet(&sheet, file)
}

fn cmd_clear(file: &Path, range: Option<&str>) -> Result<(), CliError> {
    let mut sheet = open_sheet(file)?;
    match range {
        Some(token) => {
            let range = parse_range(&sheet, token)?;
            sheet.clear_range(range);
        }
        None => sheet.clear(),
    }
    save_sheet(&sheet, file)
}

// =============================================================================
// Helpers
// =============================================================================

fn open_sheet(path: &Path) -> Result<Sheet, CliError> {
    let mut sheet = tabula_io::native::load(path).map_err(|e| {
        if e.contains("not a Tabula sheet file") {
            CliError {
                code: EXIT_FORMAT,
                message: e,
                hint: None,
            }
        } else {
            CliError::io(e)
        }
    })?;
    sheet.set_auto_recalc(Settings::load().auto_recalc);
    log::debug!(
        "loaded {} cells from {}",
        sheet.non_empty().len(),
        path.display()
    );
    Ok(sheet)
}

fn save_sheet(sheet: &Sheet, path: &Path) -> Result<(), CliError> {
    tabula_io::native::save(sheet, path).map_err(CliError::io)?;
    log::debug!(
        "saved {} cells to {}",
        sheet.non_empty().len(),
        path.display()
    );
    Ok(())
}

fn parse_cell(sheet: &Sheet, token: &str) -> Result<(usize, usize), CliError> {
    let Some((row, col)) = cell_ref::parse(token) else {
        return Err(CliError::usage(format!("'{}' is not a cell reference", token))
            .with_hint("references look like A1 or c42"));
    };
    if row >= sheet.rows() || col >= sheet.cols() {
        return Err(CliError::usage(format!(
            "{} is outside the {}x{} grid",
            token,
            sheet.rows(),
            sheet.cols()
        )));
    }
    Ok((row, col))
}

fn parse_range(sheet: &Sheet, token: &str) -> Result<CellRange, CliError> {
    match token.split_once(':') {
        Some((a, b)) => {
            let a = parse_cell(sheet, a)?;
            let b = parse_cell(sheet, b)?;
            Ok(CellRange::from_corners(a, b))
        }
        None => {
            let (row, col) = parse_cell(sheet, token)?;
            Ok(CellRange::single(row, col))
        }
    }
}

fn parse_sort_key(spec: &str) -> Result<SortKey, CliError> {
    let (column, direction) = match spec.split_once(':') {
        Some((c, d)) => (c, Some(d)),
        None => (spec, None),
    };
    let column: usize = column.parse().map_err(|_| {
        CliError::usage(format!("bad sort key '{}'", spec)).with_hint("keys look like 0 or 1:desc")
    })?;
    let ascending = match direction {
        None | Some("asc") => true,
        Some("desc") => false,
        Some(other) => return Err(CliError::usage(format!("bad sort direction '{}'", other))),
    };
    Ok(SortKey { column, ascending })
}
