use location_arbiter::logging::init_logging;
use location_arbiter::{
    AcquisitionConfig, AcquisitionMode, Clock, EventCallback, LocationAcquirer, LocationFix,
    MockLocationProvider, MockPermissions, SessionDeps, SessionEvent, SessionOutcome, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;

/// Push `(delay_ms, accuracy_m, tag)` readings into a provider's fresh feed
fn script_readings(provider: MockLocationProvider, clock: Arc<SystemClock>, script: Vec<(u64, f32, &'static str)>) {
    tokio::spawn(async move {
        for (delay_ms, accuracy_m, tag) in script {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            let fix = LocationFix::new(59.3293, 18.0686, accuracy_m, clock.now_ms()).with_origin(tag);
            provider.push_fix(fix);
        }
    });
}

fn print_events() -> EventCallback {
    Box::new(|event| match event {
        SessionEvent::Progress(update) => println!("  [{:>3}%] {}", update.percent, update.message),
        SessionEvent::Rejected(reason) => println!("  rejected: {}", reason),
        _ => {}
    })
}

fn print_outcome(mode: AcquisitionMode, outcome: &SessionOutcome) {
    match outcome {
        SessionOutcome::Completed(fix) => println!(
            "{} session completed: {:.6}, {:.6} from {}",
            mode,
            fix.fix.latitude,
            fix.fix.longitude,
            fix.describe()
        ),
        SessionOutcome::Cancelled { fix, reason } => {
            println!("{} session cancelled: {}", mode, reason);
            if let Some(fix) = fix {
                println!("  using {}", fix.describe());
            }
        }
        SessionOutcome::TimedOut { fix } => {
            println!("{} session timed out", mode);
            if let Some(fix) = fix {
                println!("  using {}", fix.describe());
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("location_arbiter=info")?;

    let config = match std::env::args().nth(1) {
        Some(path) => AcquisitionConfig::from_file(&path)?,
        None => AcquisitionConfig::default(),
    };

    let precise = MockLocationProvider::new("gps");
    let coarse = MockLocationProvider::with_passive_feed("network");
    let clock = Arc::new(SystemClock);

    let deps = SessionDeps {
        precise: Arc::new(precise.clone()),
        coarse: Arc::new(coarse.clone()),
        permissions: Arc::new(MockPermissions::granted()),
        clock: clock.clone(),
    };
    let mut acquirer = LocationAcquirer::new(config, deps)?;

    println!("Coarse acquisition");
    script_readings(
        coarse.clone(),
        clock.clone(),
        vec![(500, 1400.0, "network"), (2_000, 12.0, "gps"), (3_000, 460.0, "network"), (4_000, 240.0, "fused")],
    );
    let outcome = acquirer.acquire(AcquisitionMode::Coarse, print_events()).await?;
    print_outcome(AcquisitionMode::Coarse, &outcome);

    println!("Precise acquisition");
    script_readings(
        precise.clone(),
        clock.clone(),
        vec![(1_000, 650.0, "gps"), (4_000, 85.0, "gps"), (5_000, 26.0, "gps")],
    );
    let outcome = acquirer.acquire(AcquisitionMode::Precise, print_events()).await?;
    print_outcome(AcquisitionMode::Precise, &outcome);

    Ok(())
}
