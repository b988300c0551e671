use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;
mod output;

use commands::{
    run_add, run_ask, run_clear, run_done, run_list, run_remove, run_search, run_show, run_stats,
};

#[derive(Parser)]
#[command(name = "taskbuddy")]
#[command(about = "Todo manager with a natural-language assistant", long_about = None)]
struct Cli {
    /// Machine-readable JSON output.
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging to stderr.
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a todo directly.
    Add(AddArgs),
    /// List todos, optionally filtered by category or status.
    List(ListArgs),
    /// Show one todo by id.
    Show(IdArg),
    /// Mark a todo as completed (or pending with --undo).
    Done(DoneArgs),
    /// Delete a todo by id.
    Remove(IdArg),
    /// Delete every todo.
    Clear,
    /// Search todos by keyword in the title (or description).
    Search(SearchArgs),
    /// Show completion statistics per category.
    Stats,
    /// Ask the assistant in natural language.
    Ask(AskArgs),
}

#[derive(Args)]
struct AddArgs {
    title: String,
    #[arg(long)]
    description: Option<String>,
    /// WORK, PERSONAL, SHOPPING, HEALTH, STUDY, HOME or OTHER.
    #[arg(long)]
    category: Option<String>,
    /// Create the todo already completed.
    #[arg(long)]
    done: bool,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    category: Option<String>,
    #[arg(long, conflicts_with = "pending")]
    completed: bool,
    #[arg(long)]
    pending: bool,
}

#[derive(Args)]
struct IdArg {
    id: i64,
}

#[derive(Args)]
struct DoneArgs {
    id: i64,
    /// Mark the todo as pending instead.
    #[arg(long)]
    undo: bool,
}

#[derive(Args)]
struct SearchArgs {
    keyword: String,
    /// Search descriptions instead of titles.
    #[arg(long)]
    description: bool,
}

#[derive(Args)]
struct AskArgs {
    question: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Add(args) => run_add(&cwd, cli.json, &args),
        Commands::List(args) => run_list(&cwd, cli.json, &args),
        Commands::Show(args) => run_show(&cwd, cli.json, args.id),
        Commands::Done(args) => run_done(&cwd, cli.json, args.id, args.undo),
        Commands::Remove(args) => run_remove(&cwd, cli.json, args.id),
        Commands::Clear => run_clear(&cwd, cli.json),
        Commands::Search(args) => run_search(&cwd, cli.json, &args),
        Commands::Stats => run_stats(&cwd, cli.json),
        Commands::Ask(args) => run_ask(&cwd, cli.json, cli.verbose, &args.question),
    }
}
