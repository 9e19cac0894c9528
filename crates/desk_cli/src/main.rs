use std::{error::Error, io::Write, path::PathBuf};

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{
    Bicycle, BicycleCondition, BicycleFilter, BicycleStatus, Engine, EngineError, Money,
    OpenRental, RentCmd, RentalPolicy, ReturnCmd, SortField,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use tracing_subscriber::EnvFilter;

mod import;

const PAGE_SIZE: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "bike_rental_desk")]
#[command(about = "Front desk for the bicycle rental shop (catalog, members, rentals)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./bike_rental.db?mode=rwc"
    )]
    database_url: String,

    /// Days a bicycle may be kept before late fees accrue.
    #[arg(long, default_value_t = 7)]
    rental_period_days: i64,

    /// Late fee charged for each day past the rental period.
    #[arg(long, default_value = "10.00", value_parser = parse_money)]
    late_fee_per_day: Money,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Bicycles(Bicycles),
    Members(Members),
    /// Rent a bicycle to a member.
    Rent(RentArgs),
    /// Take a bicycle back and settle the fees.
    Return(ReturnArgs),
    Rentals(Rentals),
    Import(Import),
}

#[derive(Args, Debug)]
struct Bicycles {
    #[command(subcommand)]
    command: BicyclesCommand,
}

#[derive(Subcommand, Debug)]
enum BicyclesCommand {
    /// List the whole fleet.
    List,
    /// List rentable bicycles matching the filters.
    Available(FilterArgs),
    /// Search the catalog, showing near matches when nothing matches exactly.
    Search(SearchArgs),
    Show { id: i32 },
    /// Put a bicycle in or out of maintenance.
    Status(StatusArgs),
}

#[derive(Args, Debug)]
struct FilterArgs {
    #[arg(long)]
    brand: Option<String>,
    #[arg(long = "type")]
    kind: Option<String>,
    #[arg(long, value_parser = parse_status)]
    status: Option<BicycleStatus>,
    #[arg(long, value_parser = parse_condition)]
    condition: Option<BicycleCondition>,
    #[arg(long, value_parser = parse_money)]
    min_rate: Option<Money>,
    #[arg(long, value_parser = parse_money)]
    max_rate: Option<Money>,
    #[arg(long, value_parser = parse_sort)]
    sort_by: Option<SortField>,
}

impl From<FilterArgs> for BicycleFilter {
    fn from(args: FilterArgs) -> Self {
        BicycleFilter {
            brand: args.brand,
            kind: args.kind,
            status: args.status,
            condition: args.condition,
            min_rate: args.min_rate,
            max_rate: args.max_rate,
            sort_by: args.sort_by,
        }
    }
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[command(flatten)]
    filter: FilterArgs,
    /// Page of results to show, 10 per page.
    #[arg(long, default_value_t = 1)]
    page: usize,
}

#[derive(Args, Debug)]
struct StatusArgs {
    id: i32,
    #[arg(long, value_parser = parse_status)]
    status: BicycleStatus,
    #[arg(long, value_parser = parse_condition)]
    condition: BicycleCondition,
}

#[derive(Args, Debug)]
struct Members {
    #[command(subcommand)]
    command: MembersCommand,
}

#[derive(Subcommand, Debug)]
enum MembersCommand {
    Show { id: i32 },
    Eligibility { id: i32 },
}

#[derive(Args, Debug)]
struct RentArgs {
    #[arg(long)]
    member: i32,
    #[arg(long)]
    bicycle: i32,
}

#[derive(Args, Debug)]
struct ReturnArgs {
    #[arg(long)]
    bicycle: i32,
    #[arg(long)]
    member: i32,
    /// Condition the bicycle came back in.
    #[arg(long, value_parser = parse_condition)]
    condition: BicycleCondition,
    /// Damage charge on top of any late fee.
    #[arg(long, value_parser = parse_money)]
    damage: Option<Money>,
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    yes: bool,
}

#[derive(Args, Debug)]
struct Rentals {
    #[command(subcommand)]
    command: RentalsCommand,
}

#[derive(Subcommand, Debug)]
enum RentalsCommand {
    Open,
    Overdue,
    History(HistoryArgs),
}

#[derive(Args, Debug)]
struct HistoryArgs {
    #[arg(long)]
    member: Option<i32>,
    #[arg(long, default_value_t = 10)]
    limit: u64,
    #[arg(long)]
    cursor: Option<String>,
}

#[derive(Args, Debug)]
struct Import {
    #[command(subcommand)]
    command: ImportCommand,
}

#[derive(Subcommand, Debug)]
enum ImportCommand {
    /// Load bicycles; ids already in the fleet are skipped.
    Bicycles(ImportArgs),
    /// Load members; existing ids are replaced.
    Members(ImportArgs),
}

#[derive(Args, Debug)]
struct ImportArgs {
    path: PathBuf,
    /// Field delimiter; sniffed from the header when omitted.
    #[arg(long)]
    delimiter: Option<char>,
}

fn parse_money(raw: &str) -> Result<Money, String> {
    raw.parse::<Money>().map_err(|err| err.to_string())
}

fn parse_status(raw: &str) -> Result<BicycleStatus, String> {
    BicycleStatus::try_from(raw).map_err(|err| err.to_string())
}

fn parse_condition(raw: &str) -> Result<BicycleCondition, String> {
    BicycleCondition::try_from(raw).map_err(|err| err.to_string())
}

fn parse_sort(raw: &str) -> Result<SortField, String> {
    SortField::try_from(raw).map_err(|err| err.to_string())
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Asks a yes/no question; `y` confirms, `n` or Esc declines.
fn prompt_confirm(prompt: &str) -> Result<bool, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        let answer = match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char('y' | 'Y') => true,
            KeyCode::Char('n' | 'N') | KeyCode::Esc => false,
            _ => continue,
        };
        execute!(out, Print(if answer { "y\r\n" } else { "n\r\n" }))?;
        out.flush()?;
        return Ok(answer);
    }
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Prints rejections for the desk and exits; storage failures propagate.
fn or_exit<T>(result: Result<T, EngineError>) -> Result<T, Box<dyn Error + Send + Sync>> {
    match result {
        Err(err) if err.is_rejection() => {
            eprintln!("{err}");
            std::process::exit(1);
        }
        other => Ok(other?),
    }
}

fn print_bicycles(bicycles: &[Bicycle]) {
    println!(
        "{:>5}  {:<14} {:<10} {:<6} {:>8}  {:<9} {}",
        "ID", "Brand", "Type", "Frame", "Rate", "Condition", "Status"
    );
    for bicycle in bicycles {
        println!(
            "{:>5}  {:<14} {:<10} {:<6} {:>8}  {:<9} {}",
            bicycle.id,
            bicycle.brand,
            bicycle.kind,
            bicycle.frame_size,
            bicycle.daily_rate.to_string(),
            bicycle.condition.as_str(),
            bicycle.status.as_str()
        );
    }
}

fn print_open_rentals(rentals: &[OpenRental]) {
    if rentals.is_empty() {
        println!("no rentals");
        return;
    }
    for open in rentals {
        println!(
            "#{}  bicycle {} ({} {})  member {}  since {}  due {}",
            open.rental.id,
            open.rental.bicycle_id,
            open.brand,
            open.kind,
            open.rental.member_id,
            open.rental.rental_date.format("%Y-%m-%d %H:%M"),
            open.rental.expected_return_date.format("%Y-%m-%d %H:%M")
        );
    }
}

async fn bicycles(
    engine: &Engine,
    command: BicyclesCommand,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        BicyclesCommand::List => {
            print_bicycles(&or_exit(engine.list_all_bicycles().await)?);
        }
        BicyclesCommand::Available(args) => {
            let filter = BicycleFilter::from(args);
            print_bicycles(&or_exit(engine.list_available(&filter).await)?);
        }
        BicyclesCommand::Search(args) => {
            let filter = BicycleFilter::from(args.filter);
            let search = or_exit(engine.search_bicycles(&filter).await)?;
            if search.bicycles.is_empty() {
                println!("no bicycles found");
                return Ok(());
            }
            if !search.exact {
                println!("No exact match; showing similar bicycles.");
            }
            let pages = search.count().div_ceil(PAGE_SIZE);
            let page = args.page.clamp(1, pages);
            let start = (page - 1) * PAGE_SIZE;
            let end = (start + PAGE_SIZE).min(search.count());
            print_bicycles(&search.bicycles[start..end]);
            println!(
                "page {page} of {pages}, {} bicycles, average rate {}/day",
                search.count(),
                search.average_daily_rate().unwrap_or(Money::ZERO)
            );
        }
        BicyclesCommand::Show { id } => {
            let bicycle = or_exit(engine.get_bicycle(id).await)?;
            print_bicycles(std::slice::from_ref(&bicycle));
            if let Some(date) = bicycle.purchase_date {
                println!("purchased {date}");
            }
        }
        BicyclesCommand::Status(args) => {
            let bicycle = or_exit(
                engine
                    .set_status_and_condition(args.id, args.status, args.condition)
                    .await,
            )?;
            println!(
                "bicycle {} is now {} ({})",
                bicycle.id, bicycle.status, bicycle.condition
            );
        }
    }
    Ok(())
}

async fn members(
    engine: &Engine,
    command: MembersCommand,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        MembersCommand::Show { id } => {
            let member = or_exit(engine.get_member(id).await)?;
            let open = or_exit(engine.count_open_rentals(id).await)?;
            println!("{} #{} ({})", member.name, member.id, member.status.as_str());
            println!(
                "membership {} from {} to {}",
                member.membership_type.as_str(),
                member.registration_date,
                member.membership_end_date
            );
            if let Some(email) = &member.email {
                println!("email {email}");
            }
            if let Some(phone) = &member.phone {
                println!("phone {phone}");
            }
            println!("rentals {open} of {}", member.rental_limit);
        }
        MembersCommand::Eligibility { id } => {
            let eligibility = or_exit(engine.is_eligible(id).await)?;
            println!("{}", eligibility.reason);
            if !eligibility.eligible {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

async fn return_bicycle(
    engine: &Engine,
    args: ReturnArgs,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let open = or_exit(engine.open_rentals().await)?
        .into_iter()
        .find(|open| {
            open.rental.bicycle_id == args.bicycle && open.rental.member_id == args.member
        });

    // Without an open rental there is nothing to confirm; the engine explains.
    let confirmed = match open {
        Some(open) if !args.yes => {
            print_open_rentals(std::slice::from_ref(&open));
            if let Some(damage) = args.damage {
                println!("damage charge {damage}");
            }
            prompt_confirm("Confirm return? [y/n] ")?
        }
        _ => true,
    };

    let mut cmd = ReturnCmd::new(args.bicycle, args.member, args.condition, Utc::now())
        .confirmed(confirmed);
    if let Some(damage) = args.damage {
        cmd = cmd.damage(damage);
    }
    let receipt = or_exit(engine.complete_return(cmd).await)?;

    println!(
        "Return of bicycle {} by member {}",
        receipt.bicycle_id, receipt.member_id
    );
    println!("  rented     {}", receipt.rental_date.format("%Y-%m-%d"));
    println!("  returned   {}", receipt.return_date.format("%Y-%m-%d"));
    println!("  days       {}", receipt.days_rented);
    println!("  late fee   {}", receipt.late_fee);
    println!("  damage fee {}", receipt.damage_fee);
    println!("  total      {}", receipt.total_fee);
    println!("  condition  {}", receipt.condition);
    Ok(())
}

async fn rentals(
    engine: &Engine,
    command: RentalsCommand,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        RentalsCommand::Open => print_open_rentals(&or_exit(engine.open_rentals().await)?),
        RentalsCommand::Overdue => {
            print_open_rentals(&or_exit(engine.overdue_rentals(Utc::now()).await)?);
        }
        RentalsCommand::History(args) => {
            let (entries, next) = or_exit(
                engine
                    .rental_history(args.member, args.limit, args.cursor.as_deref())
                    .await,
            )?;
            for entry in &entries {
                let returned = entry
                    .rental
                    .return_date
                    .map_or_else(|| "open".to_string(), |at| at.format("%Y-%m-%d").to_string());
                let fees = entry.fee.map_or_else(String::new, |fee| {
                    format!("  fees {} + {}", fee.late_fee, fee.damage_fee)
                });
                println!(
                    "#{}  bicycle {}  member {}  {} -> {}{fees}",
                    entry.rental.id,
                    entry.rental.bicycle_id,
                    entry.rental.member_id,
                    entry.rental.rental_date.format("%Y-%m-%d"),
                    returned
                );
            }
            if let Some(cursor) = next {
                println!("more: --cursor {cursor}");
            }
        }
    }
    Ok(())
}

async fn import_file(
    engine: &Engine,
    command: ImportCommand,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        ImportCommand::Bicycles(args) => {
            let content = std::fs::read_to_string(&args.path)?;
            let delimiter = import::delimiter(&content, args.delimiter)?;
            let parsed = import::read_bicycles(content.as_bytes(), delimiter)?;
            for rejected in &parsed.rejected {
                eprintln!("skipped {rejected}");
            }

            let (mut added, mut present) = (0, 0);
            for bicycle in parsed.records {
                match engine.get_bicycle(bicycle.id).await {
                    Ok(_) => {
                        present += 1;
                        continue;
                    }
                    Err(EngineError::NotFound(_)) => {}
                    Err(err) => return Err(err.into()),
                }
                match engine.add_bicycle(&bicycle).await {
                    Ok(_) => added += 1,
                    Err(err) if err.is_rejection() => {
                        eprintln!("skipped bicycle {}: {err}", bicycle.id);
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            println!(
                "imported {added} bicycles, {present} already present, {} rejected",
                parsed.rejected.len()
            );
        }
        ImportCommand::Members(args) => {
            let content = std::fs::read_to_string(&args.path)?;
            let delimiter = import::delimiter(&content, args.delimiter)?;
            let today = Utc::now().date_naive();
            let parsed = import::read_members(content.as_bytes(), delimiter, today)?;
            for rejected in &parsed.rejected {
                eprintln!("skipped {rejected}");
            }

            let mut saved = 0;
            for member in parsed.records {
                match engine.upsert_member(&member).await {
                    Ok(_) => saved += 1,
                    Err(err) if err.is_rejection() => {
                        eprintln!("skipped member {}: {err}", member.id);
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            println!(
                "imported {saved} members, {} rejected",
                parsed.rejected.len()
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bike_rental_desk=warn,engine=error")),
        )
        .with_writer(std::io::stderr)
        .init();

    let policy = match RentalPolicy::new(cli.rental_period_days, cli.late_fee_per_day) {
        Ok(policy) => policy,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).policy(policy).build().await?;

    match cli.command {
        Command::Bicycles(Bicycles { command }) => bicycles(&engine, command).await?,
        Command::Members(Members { command }) => members(&engine, command).await?,
        Command::Rent(args) => {
            let rental = or_exit(
                engine
                    .initiate_rental(RentCmd::new(args.member, args.bicycle, Utc::now()))
                    .await,
            )?;
            println!(
                "rental #{} confirmed: bicycle {} for member {}, due back {}",
                rental.id,
                rental.bicycle_id,
                rental.member_id,
                rental.expected_return_date.format("%Y-%m-%d %H:%M")
            );
        }
        Command::Return(args) => return_bicycle(&engine, args).await?,
        Command::Rentals(Rentals { command }) => rentals(&engine, command).await?,
        Command::Import(Import { command }) => import_file(&engine, command).await?,
    }

    Ok(())
}
