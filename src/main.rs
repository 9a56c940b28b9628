use clinic_scheduler::clinic::Clinic;
use clinic_scheduler::config::{Config, Mode};
use clinic_scheduler::directory::Directory;
use clinic_scheduler::display::{print_roster, write_roster_to_file};
use clinic_scheduler::parser::load_slots;
use clinic_scheduler::registration::BookingPolicy;
use clinic_scheduler::web;
use log::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;

    info!("Loading directory from {}", config.directory_path.display());
    let directory = Directory::load(&config.directory_path)?;
    let clinic = Clinic::new(directory).with_policy(BookingPolicy {
        require_future: !config.allow_past_appointments,
    });

    if let Some(csv_path) = &config.slots_csv {
        info!("Importing schedules from {}", csv_path.display());
        let import = load_slots(csv_path)?;
        for (line, reason) in &import.rejected {
            warn!("Line {} not imported: {}", line, reason);
        }
        let report = clinic.import_slots(import.drafts)?;
        info!(
            "Imported {} schedules ({} rejected)",
            report.created.len(),
            import.rejected.len() + report.rejected.len()
        );
    }

    match config.mode {
        Mode::Web { port } => {
            info!("Starting web server on {}:{}", config.bind, port);
            web::start_server(&config.bind, port, clinic).await?;
        }
        Mode::Roster { date, output } => {
            let slots = clinic.list_slots_by_date(date)?;
            print_roster(date, clinic.directory(), &slots);
            if let Some(filename) = output {
                write_roster_to_file(date, clinic.directory(), &slots, &filename)?;
                println!("Roster saved to {}", filename);
            }
        }
    }

    Ok(())
}
