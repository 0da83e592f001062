use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use hilite_lib::{
    HighlightOptions, HtmlOutput, SearchTerms, SpanCase, UnhighlightOptions, highlight_html,
    unhighlight_html,
};
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "hilite", version, about = "Highlight search terms in HTML")]
struct Cli {
    /// Increase verbosity (-v INFO, -vv DEBUG, -vvv TRACE, -vvvv TRACE with file/line)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Input, output and root selection shared by every subcommand
#[derive(clap::Args, Debug, Clone)]
struct IoArgs {
    /// HTML file to read (stdin when omitted or "-")
    #[arg(long, short = 'i', value_name = "FILE")]
    input: Option<PathBuf>,

    /// File to write the result to (stdout when omitted)
    #[arg(long, short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only search inside elements matching this CSS selector
    #[arg(long, short = 's', value_name = "CSS")]
    selector: Option<String>,

    /// Print {"html": ..., "count": n} instead of bare HTML
    #[arg(long)]
    json: bool,
}

/// Tag and class of the highlight wrapper
#[derive(clap::Args, Debug, Clone)]
struct MarkerArgs {
    /// Class name of the highlight element [default: highlight]
    #[arg(long = "class", value_name = "NAME")]
    class_name: Option<String>,

    /// Tag name of the highlight element [default: span]
    #[arg(long, value_name = "TAG")]
    element: Option<String>,
}

/// Arguments for the mark command
#[derive(clap::Args, Debug, Clone)]
struct MarkArgs {
    /// Words to highlight; quote a phrase to keep it together
    #[arg(value_name = "TERMS", required = true, num_args = 1..)]
    terms: Vec<String>,

    #[command(flatten)]
    io: IoArgs,

    #[command(flatten)]
    marker: MarkerArgs,

    /// Match letter case exactly
    #[arg(long)]
    case_sensitive: bool,

    /// Only match whole words
    #[arg(long)]
    words_only: bool,

    /// Regex fragment used as the word boundary on both sides [default: \b]
    #[arg(long, value_name = "RE")]
    boundary: Option<String>,

    /// Regex fragment placed before each match
    #[arg(long, value_name = "RE")]
    boundary_start: Option<String>,

    /// Regex fragment placed after each match
    #[arg(long, value_name = "RE")]
    boundary_end: Option<String>,

    /// Letter case handling of matches that cross element boundaries
    #[arg(long, value_enum, value_name = "MODE")]
    span_case: Option<SpanCaseArg>,

    /// Options as a JSON object (camelCase keys); flags win on conflicts
    #[arg(long, value_name = "JSON")]
    options: Option<String>,
}

impl MarkArgs {
    fn highlight_options(&self) -> Result<HighlightOptions> {
        let mut options = match &self.options {
            Some(json) => {
                HighlightOptions::from_json(json).wrap_err("Invalid JSON in --options argument")?
            }
            None => HighlightOptions::default(),
        };

        if let Some(class_name) = &self.marker.class_name {
            options.class_name = class_name.clone();
        }
        if let Some(element) = &self.marker.element {
            options.element = element.clone();
        }
        if self.case_sensitive {
            options.case_sensitive = true;
        }
        if self.words_only {
            options.words_only = true;
        }
        if let Some(boundary) = &self.boundary {
            options.words_boundary = boundary.clone();
        }
        if let Some(start) = &self.boundary_start {
            options.words_boundary_start = Some(start.clone());
        }
        if let Some(end) = &self.boundary_end {
            options.words_boundary_end = Some(end.clone());
        }
        if let Some(span_case) = self.span_case {
            options.span_case = span_case.into();
        }

        Ok(options)
    }
}

/// Arguments for the clear command
#[derive(clap::Args, Debug, Clone)]
struct ClearArgs {
    #[command(flatten)]
    io: IoArgs,

    #[command(flatten)]
    marker: MarkerArgs,
}

impl ClearArgs {
    fn unhighlight_options(&self) -> UnhighlightOptions {
        let mut options = UnhighlightOptions::default();
        if let Some(class_name) = &self.marker.class_name {
            options.class_name = class_name.clone();
        }
        if let Some(element) = &self.marker.element {
            options.element = element.clone();
        }
        options
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum SpanCaseArg {
    /// Always ignore case in spanning matches
    Insensitive,
    /// Follow --case-sensitive
    FollowCaseSensitive,
}

impl From<SpanCaseArg> for SpanCase {
    fn from(arg: SpanCaseArg) -> Self {
        match arg {
            SpanCaseArg::Insensitive => SpanCase::Insensitive,
            SpanCaseArg::FollowCaseSensitive => SpanCase::FollowCaseSensitive,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Wrap every occurrence of the search terms in a highlight element
    Mark(MarkArgs),
    /// Remove highlight elements, restoring the original text nodes
    Clear(ClearArgs),
}

/// Initialize tracing subscriber based on verbosity level.
///
/// Nothing is installed without `-v`; `RUST_LOG` overrides the level
/// derived from the flag count.
fn init_tracing(verbose: u8) {
    if verbose == 0 {
        return;
    }

    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            1 => "warn,hilite=info,hilite_lib=info".to_string(),
            2 => "info,hilite=debug,hilite_lib=debug".to_string(),
            _ => "debug,hilite=trace,hilite_lib=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(verbose >= 4)
                .with_line_number(verbose >= 4)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Mark(args) => {
            let options = args.highlight_options()?;
            let html = read_input(args.io.input.as_deref())?;
            let output = highlight_html(
                &html,
                args.io.selector.as_deref(),
                SearchTerms::new(args.terms.iter().map(String::as_str)),
                &options,
            )
            .wrap_err("Failed to highlight input")?;
            info!(count = output.count, "highlighted");
            write_output(&args.io, &output)
        }
        Command::Clear(args) => {
            let options = args.unhighlight_options();
            let html = read_input(args.io.input.as_deref())?;
            let output = unhighlight_html(&html, args.io.selector.as_deref(), &options)
                .wrap_err("Failed to remove highlights")?;
            info!(count = output.count, "cleared");
            write_output(&args.io, &output)
        }
    }
}

/// Loads HTML from a file path or stdin.
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => {
            fs::read_to_string(p).wrap_err_with(|| format!("Failed to read file: {:?}", p))
        }
        Some(_) => read_from_stdin(),
        None if io::stdin().is_terminal() => Err(eyre!(
            "No input provided. Pass --input FILE or pipe HTML on stdin."
        )),
        None => read_from_stdin(),
    }
}

fn read_from_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .wrap_err("Failed to read from stdin")?;
    Ok(buffer)
}

fn write_output(io_args: &IoArgs, output: &HtmlOutput) -> Result<()> {
    let rendered = if io_args.json {
        serde_json::to_string(output).wrap_err("Failed to serialize output")?
    } else {
        output.html.clone()
    };

    match &io_args.output {
        Some(path) => fs::write(path, rendered)
            .wrap_err_with(|| format!("Failed to write to {:?}", path)),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}
