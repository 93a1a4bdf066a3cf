use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use periodize_core::dates::{local_day, local_noon, parse_date};
use periodize_core::gateway::ProgramSummary;
use periodize_core::resolver::Suggestion;
use periodize_core::*;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "periodize")]
#[command(about = "Training periodization planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show where each program is today (default)
    Today {
        /// Only this program (id or unique id prefix)
        #[arg(long)]
        program: Option<String>,

        /// Resolve for this date instead of today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Import a program from the text parser's compressed JSON output
    Import {
        /// File with the parser output
        file: PathBuf,

        /// Treat this date as the import day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Print the import report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the date a program starts
    Start {
        /// Program id or unique id prefix
        program: String,

        /// Start date (YYYY-MM-DD)
        date: String,
    },

    /// List stored programs
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show a program's blocks, phases and scheduled routines
    Show {
        /// Program id or unique id prefix
        program: String,
    },

    /// Record a completed training session
    Log {
        /// Session date (YYYY-MM-DD), defaults to now
        #[arg(long)]
        date: Option<String>,

        /// Program the session belongs to
        #[arg(long)]
        program: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Export a program's schedule to CSV
    Export {
        /// Program id or unique id prefix
        program: String,

        /// Output CSV file
        #[arg(long)]
        out: PathBuf,
    },

    /// Delete a program and everything it owns
    Delete {
        /// Program id or unique id prefix
        program: String,
    },

    /// Print the effective configuration
    Config {
        /// Write the defaults to the config file if it does not exist yet
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    periodize_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    if let Some(Commands::Config { init }) = cli.command {
        return cmd_config(&config, init);
    }

    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let mut gateway = FileGateway::open(&data_dir)?;

    match cli.command {
        Some(Commands::Today {
            program,
            date,
            json,
        }) => cmd_today(&gateway, program, date, json),
        Some(Commands::Import { file, date, json }) => {
            cmd_import(&mut gateway, &file, date, json, &config)
        }
        Some(Commands::Start { program, date }) => cmd_start(&mut gateway, &program, &date),
        Some(Commands::List { json }) => cmd_list(&gateway, json),
        Some(Commands::Show { program }) => cmd_show(&gateway, &program),
        Some(Commands::Log {
            date,
            program,
            notes,
        }) => cmd_log(&gateway, date, program, notes),
        Some(Commands::Export { program, out }) => cmd_export(&gateway, &program, &out),
        Some(Commands::Delete { program }) => cmd_delete(&mut gateway, &program),
        Some(Commands::Config { init }) => cmd_config(&config, init),
        None => cmd_today(&gateway, None, None, false),
    }
}

fn today_or(date: Option<String>) -> Result<NaiveDate> {
    match date {
        Some(d) => parse_date(&d),
        None => Ok(Local::now().date_naive()),
    }
}

/// Resolve a full id or a unique prefix of one
fn find_program(gateway: &FileGateway, key: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(key) {
        return Ok(id);
    }

    let key = key.to_lowercase();
    let matches: Vec<ProgramSummary> = gateway
        .list_programs()?
        .into_iter()
        .filter(|p| p.id.to_string().starts_with(&key))
        .collect();

    match matches.as_slice() {
        [only] => Ok(only.id),
        [] => Err(Error::NotFound(format!("program '{}'", key))),
        _ => Err(Error::Other(format!(
            "'{}' matches {} programs, use a longer prefix",
            key,
            matches.len()
        ))),
    }
}

fn cmd_today(
    gateway: &FileGateway,
    program: Option<String>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let today = today_or(date)?;

    let ids = match program {
        Some(key) => vec![find_program(gateway, &key)?],
        None => gateway.list_programs()?.into_iter().map(|p| p.id).collect(),
    };

    if ids.is_empty() && !json {
        println!("No programs yet. Import one with `periodize import <file>`.");
        return Ok(());
    }

    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        let program = gateway.get_program_with_blocks_and_phases(id)?;
        let resolution = current_suggestion(gateway, id, today)?;
        results.push((program, resolution));
    }

    if json {
        let value: Vec<serde_json::Value> = results
            .iter()
            .map(|(program, resolution)| {
                serde_json::json!({
                    "program_id": program.id,
                    "program_name": program.name,
                    "resolution": resolution,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (program, resolution) in &results {
        display_resolution(program, resolution);
    }
    Ok(())
}

fn display_resolution(program: &Program, resolution: &Resolution) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", program.name);
    println!("╰─────────────────────────────────────────╯");

    match resolution {
        Resolution::NeedsStartDate => {
            println!("  This program has no start date yet.");
            println!("  Set one with: periodize start {} <YYYY-MM-DD>", short_id(program.id));
        }
        Resolution::NotStartedYet { days_until_start } => {
            println!("  Starts in {} day(s).", days_until_start);
        }
        Resolution::Completed { completed_on } => {
            println!("  Completed on {}. Time to plan the next one!", completed_on);
        }
        Resolution::Suggestion(s) => display_suggestion(s),
    }
    println!();
}

fn display_suggestion(s: &Suggestion) {
    println!("  Week {} of {}", s.current_week, s.total_weeks);

    if let Some(ref block) = s.block {
        println!(
            "  Block: {} ({}) week {} of {}",
            block.name, block.block_type, block.week_in_block, block.total_block_weeks
        );
    }

    match s.phase {
        Some(ref phase) => {
            match phase.repeated_from_week {
                Some(week) => println!("  Phase: repeating week {}", week),
                None => println!("  Phase: week {}", phase.week_number),
            }
            println!(
                "  → Intensity x{:.2}, volume x{:.2}",
                phase.intensity_modifier, phase.volume_modifier
            );
            if let Some(ref notes) = phase.notes {
                println!("  → {}", notes);
            }
        }
        None => println!("  No phases planned for this block."),
    }

    if let Some(ref routine) = s.routine {
        println!("  Routine: {}", routine.variant.name);
        if let Some(level) = routine.variant.intensity_level {
            println!("  → Intensity level {}", level);
        }
        if let Some(ref notes) = routine.notes {
            println!("  → {}", notes);
        }
    }

    match s.days_since_last_session {
        Some(0) => println!("  ℹ You already trained today."),
        Some(days) => println!("  ℹ Last session: {} day(s) ago", days),
        None => println!("  ℹ No sessions logged yet"),
    }
}

fn cmd_import(
    gateway: &mut FileGateway,
    file: &Path,
    date: Option<String>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let today = today_or(date)?;
    let text = std::fs::read_to_string(file)?;

    let report = import_program(&CompressedJsonParser, gateway, &text, today, &config.import)?;
    gateway.commit()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("✓ Imported '{}' ({})", report.program_name, report.program_id);
    if let Some(start) = report.program_start {
        println!("  Schedule starts Monday {}", start);
    }
    println!(
        "  {} blocks, {} phases, {} routines, {} sessions scheduled",
        report.blocks_created,
        report.phases_created,
        report.routines_created,
        report.sessions_scheduled
    );
    for warning in &report.warnings {
        println!("  ! {}", warning);
    }
    for failure in &report.failures {
        println!("  ✗ {}", failure);
    }
    println!(
        "\nSet a start date with: periodize start {} <YYYY-MM-DD>",
        short_id(report.program_id)
    );
    Ok(())
}

fn cmd_start(gateway: &mut FileGateway, program: &str, date: &str) -> Result<()> {
    let id = find_program(gateway, program)?;
    let start = parse_date(date)?;
    gateway.set_program_start_date(id, Some(start))?;
    gateway.commit()?;
    println!("✓ Program {} starts on {}", short_id(id), start);
    Ok(())
}

fn cmd_list(gateway: &FileGateway, json: bool) -> Result<()> {
    let programs = gateway.list_programs()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&programs)?);
        return Ok(());
    }

    if programs.is_empty() {
        println!("No programs yet.");
        return Ok(());
    }

    for p in programs {
        let start = p
            .start_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "no start date".into());
        println!(
            "{}  {}  ({} blocks, {} weeks, {})",
            short_id(p.id),
            p.name,
            p.block_count,
            p.total_weeks,
            start
        );
    }
    Ok(())
}

fn cmd_show(gateway: &FileGateway, program: &str) -> Result<()> {
    let id = find_program(gateway, program)?;
    let program = gateway.get_program_with_blocks_and_phases(id)?;

    println!("{} ({})", program.name, program.id);
    if let Some(ref goal) = program.goal {
        println!("Goal: {}", goal);
    }
    match program.start_date {
        Some(start) => println!("Starts: {}", start),
        None => println!("Starts: not set"),
    }

    for block in program.ordered_blocks() {
        println!(
            "\n{}. {} [{}] - {} weeks",
            block.order_index, block.name, block.block_type, block.duration_weeks
        );
        for phase in block.ordered_phases() {
            println!("   Week {}", phase.week_number);
            for routine in &phase.routines {
                println!(
                    "     {}  {}",
                    routine.scheduled_at.format("%a %Y-%m-%d"),
                    routine.variant.name
                );
            }
        }
    }
    Ok(())
}

fn cmd_log(
    gateway: &FileGateway,
    date: Option<String>,
    program: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let performed_at = match date {
        Some(d) => local_noon(parse_date(&d)?),
        None => chrono::Utc::now(),
    };
    let program_id = match program {
        Some(key) => Some(find_program(gateway, &key)?),
        None => None,
    };

    let session = CompletedSession {
        id: Uuid::new_v4(),
        performed_at,
        program_id,
        notes,
    };
    let mut sink = JsonlSink::new(gateway.sessions_path());
    sink.append(&session)?;

    println!("✓ Session logged for {}", local_day(performed_at));
    Ok(())
}

fn cmd_export(gateway: &FileGateway, program: &str, out: &Path) -> Result<()> {
    let id = find_program(gateway, program)?;
    let program = gateway.get_program_with_blocks_and_phases(id)?;
    let count = export_schedule_csv(&program, out)?;
    println!("✓ Exported {} scheduled routines", count);
    println!("  CSV: {}", out.display());
    Ok(())
}

fn cmd_delete(gateway: &mut FileGateway, program: &str) -> Result<()> {
    let id = find_program(gateway, program)?;
    gateway.delete_program(id)?;
    gateway.commit()?;
    println!("✓ Deleted program {}", short_id(id));
    Ok(())
}

fn cmd_config(config: &Config, init: bool) -> Result<()> {
    let path = Config::default_config_path();

    if init {
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            config.save()?;
            println!("✓ Wrote default config to {}", path.display());
        }
    }

    println!("# {}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}
