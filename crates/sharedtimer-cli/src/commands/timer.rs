use std::sync::Arc;

use clap::Subcommand;
use sharedtimer_core::catalog::{find_program, Catalog};
use sharedtimer_core::storage::{Config, Database, SqliteLocks};
use sharedtimer_core::timer::{duration_label, TimerEngine, TimerService};
use sharedtimer_core::{ApplianceLock, Event};
use tokio::sync::broadcast;

const ENGINE_KEY: &str = "timer_engine";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Set an appliance timer duration (re-arms the timer)
    Set {
        /// Appliance id (see `appliance list`)
        appliance: String,
        /// Duration in minutes (or seconds with --seconds)
        duration: Option<u64>,
        /// Interpret the duration as seconds
        #[arg(long)]
        seconds: bool,
        /// Use a washing program instead, e.g. "Cotton/40°C"
        #[arg(long, conflicts_with = "duration")]
        program: Option<String>,
    },
    /// Start (or resume) a countdown and claim the appliance
    Start {
        appliance: String,
        /// Profile claiming the appliance; defaults to the first registered
        /// profile
        #[arg(long)]
        profile: Option<String>,
    },
    /// Pause a running countdown
    Pause { appliance: String },
    /// Add or remove time in seconds, e.g. `adjust washingMachine -300`
    Adjust {
        appliance: String,
        /// Signed delta in seconds
        #[arg(allow_negative_numbers = true)]
        delta_secs: i64,
    },
    /// Print all appliance timers (with lock holders) as JSON
    Status,
    /// Run the shared ticker and stream events until all timers stop
    Watch,
}

fn load_engine(db: &Database) -> TimerEngine {
    if let Ok(Some(json)) = db.kv_get(ENGINE_KEY) {
        if let Ok(engine) = serde_json::from_str::<TimerEngine>(&json) {
            return engine;
        }
    }
    TimerEngine::new(&Catalog::builtin())
}

fn save_engine(db: &Database, engine: &TimerEngine) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(engine)?;
    db.kv_set(ENGINE_KEY, &json)?;
    Ok(())
}

/// Reconcile timers that kept counting while no process was running, and
/// release the locks of any that expired in the meantime.
fn catch_up(engine: &mut TimerEngine, locks: &SqliteLocks) {
    for event in engine.tick() {
        if let Event::TimerExpired { appliance_id, .. } = &event {
            if let Err(e) = locks.release(appliance_id) {
                eprintln!("warning: {e}");
            }
        }
    }
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let locks = SqliteLocks::new(Database::open()?);
    let mut engine = load_engine(&db);
    catch_up(&mut engine, &locks);

    match action {
        TimerAction::Set {
            appliance,
            duration,
            seconds,
            program,
        } => {
            let secs = resolve_duration(duration, seconds, program.as_deref())?;
            let event = engine.set_duration(&appliance, secs)?;
            save_engine(&db, &engine)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Start { appliance, profile } => {
            let event = engine.start(&appliance)?;
            save_engine(&db, &engine)?;

            let config = Config::load();
            let profile_name = match profile {
                Some(name) => Some(name),
                None => db.list_profiles()?.first().map(|p| p.name.clone()),
            };
            match profile_name {
                Some(name) => {
                    if let Err(e) = locks.acquire(&appliance, &name, &config.household.user_id) {
                        eprintln!("warning: appliance lock not recorded: {e}");
                    }
                }
                None => eprintln!("warning: no household profile registered; lock not recorded"),
            }
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Pause { appliance } => {
            let event = engine.pause(&appliance)?;
            if matches!(event, Event::TimerExpired { .. }) {
                if let Err(e) = locks.release(&appliance) {
                    eprintln!("warning: {e}");
                }
            }
            save_engine(&db, &engine)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Adjust {
            appliance,
            delta_secs,
        } => {
            let event = engine.adjust(&appliance, delta_secs)?;
            if matches!(event, Event::TimerExpired { .. }) {
                if let Err(e) = locks.release(&appliance) {
                    eprintln!("warning: {e}");
                }
            }
            save_engine(&db, &engine)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Status => {
            save_engine(&db, &engine)?;
            let mut rows = Vec::new();
            for timer in engine.timers() {
                let mut row = serde_json::to_value(timer)?;
                row["remaining_label"] = duration_label(timer.remaining_secs).into();
                row["held_by"] = match locks.holder(&timer.appliance_id) {
                    Ok(Some(holder)) => serde_json::to_value(holder)?,
                    _ => serde_json::Value::Null,
                };
                rows.push(row);
            }
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        TimerAction::Watch => {
            save_engine(&db, &engine)?;
            let config = Config::load();
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(watch(&db, engine, config))?;
        }
    }
    Ok(())
}

async fn watch(
    db: &Database,
    engine: TimerEngine,
    config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let locks: Arc<dyn ApplianceLock> = Arc::new(SqliteLocks::new(Database::open()?));
    let service = TimerService::with_tick_interval(engine, locks, config.tick_interval());
    if !service.any_running() {
        println!("no running appliance timers");
        return Ok(());
    }

    let mut rx = service.subscribe();
    service.sync_ticker();
    while service.any_running() {
        match rx.recv().await {
            Ok(event) => {
                println!(
                    "[{}] {}",
                    chrono::Local::now().format("%H:%M:%S"),
                    serde_json::to_string(&event)?
                );
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    save_engine(db, &service.engine_snapshot())?;
    Ok(())
}

fn resolve_duration(
    duration: Option<u64>,
    seconds: bool,
    program: Option<&str>,
) -> Result<u64, Box<dyn std::error::Error>> {
    if let Some(raw) = program {
        let (mode, temperature) = raw
            .split_once('/')
            .ok_or("program must be MODE/TEMPERATURE, e.g. Cotton/40°C")?;
        return Ok(find_program(mode, temperature)
            .ok_or_else(|| format!("unknown washing program '{raw}'"))?
            .duration_secs());
    }
    match duration {
        Some(value) if seconds => Ok(value),
        Some(value) => Ok(value.saturating_mul(60)),
        None => Err("a duration (or --program) is required".into()),
    }
}
