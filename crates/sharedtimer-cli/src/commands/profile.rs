use clap::Subcommand;
use sharedtimer_core::storage::Database;

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Register a household member
    Add { name: String },
    /// List household members
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a household member
    Remove { name: String },
}

pub fn run(action: ProfileAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        ProfileAction::Add { name } => {
            let profile = db.create_profile(&name)?;
            println!("profile created: {} ({})", profile.name, profile.id);
        }
        ProfileAction::List { json } => {
            let profiles = db.list_profiles()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&profiles)?);
            } else {
                for profile in profiles {
                    println!(
                        "{:<16} since {}",
                        profile.name,
                        profile.created_at.format("%Y-%m-%d")
                    );
                }
            }
        }
        ProfileAction::Remove { name } => {
            if db.delete_profile(&name)? {
                println!("profile removed: {name}");
            } else {
                eprintln!("no such profile: {name}");
            }
        }
    }
    Ok(())
}
