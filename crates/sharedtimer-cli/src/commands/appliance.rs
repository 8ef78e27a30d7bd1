use clap::Subcommand;
use sharedtimer_core::catalog::{Catalog, WASH_PROGRAMS};
use sharedtimer_core::storage::{Database, SqliteLocks};
use sharedtimer_core::timer::duration_label;
use sharedtimer_core::ApplianceLock;

#[derive(Subcommand)]
pub enum ApplianceAction {
    /// List the appliance catalog with current lock holders
    List,
    /// List washing-machine programs
    Programs {
        /// Filter by mode, e.g. "Cotton"
        #[arg(long)]
        mode: Option<String>,
    },
}

pub fn run(action: ApplianceAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ApplianceAction::List => {
            let locks = SqliteLocks::new(Database::open()?);
            for appliance in Catalog::builtin().appliances() {
                match locks.holder(&appliance.id) {
                    Ok(Some(holder)) => println!(
                        "{:<16} {:<16} in use by {}",
                        appliance.id, appliance.name, holder.profile_name
                    ),
                    _ => println!("{:<16} {:<16} free", appliance.id, appliance.name),
                }
            }
        }
        ApplianceAction::Programs { mode } => {
            for program in WASH_PROGRAMS {
                if let Some(ref wanted) = mode {
                    if !program.mode.eq_ignore_ascii_case(wanted) {
                        continue;
                    }
                }
                println!(
                    "{:<12} {:<16} {}",
                    program.mode,
                    program.temperature,
                    duration_label(program.duration_secs())
                );
            }
        }
    }
    Ok(())
}
