//! Application state and initialization
//!
//! All services are wired here, and a thin line-oriented terminal front
//! end drives the worry engine. Every decision the terminal forwards is
//! an engine operation; rendering stays out of the engine.

use crate::config::DB_FILE_NAME;
use crate::database::{create_pool, Repository, WorryRecord, WorryStatus};
use crate::error::Result;
use crate::services::wizard::WizardStep;
use crate::services::{
    CurrentUser, FlowOptions, IdentityService, ReviewForm, SettingsService, WorryService,
};
use crate::storage::{RecordStore, SqliteRecordStore, Subscription};
use chrono::{NaiveDate, Utc};
use std::io::Write as _;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use uuid::Uuid;

/// Central application state holding all services
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub settings: SettingsService,
    pub identity: IdentityService,
    pub store: SqliteRecordStore,
}

/// Application setup - called once on startup
pub async fn init(app_data_dir: PathBuf) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", app_data_dir);

    std::fs::create_dir_all(&app_data_dir)?;

    let pool = create_pool(&app_data_dir.join(DB_FILE_NAME)).await?;
    let store = SqliteRecordStore::new(Repository::new(pool));

    let settings_service = SettingsService::new(app_data_dir.clone());
    let mut settings = settings_service.load().await?;

    // First run creates a local profile so the owner id stays stable
    // across restarts
    let profile = match settings.profile.clone() {
        Some(profile) => profile,
        None => {
            let profile = CurrentUser {
                id: Uuid::new_v4().to_string(),
                display_name: std::env::var("USER").unwrap_or_else(|_| "local".to_string()),
            };
            settings.profile = Some(profile.clone());
            settings_service.save(&settings).await?;
            tracing::info!("Created local profile {}", profile.id);
            profile
        }
    };

    let mut identity = IdentityService::new();
    identity.sign_in(profile);

    tracing::info!("Application initialized successfully");

    Ok(AppState {
        app_data_dir,
        settings: settings_service,
        identity,
        store,
    })
}

/// Run the terminal session until the user quits or signs out
pub async fn run() -> Result<()> {
    let app_data_dir = std::env::var_os("WORRYTREE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".worrytree"));

    let mut state = init(app_data_dir).await?;
    let user = state.identity.require_user()?;
    let settings = state.settings.load().await?;

    let options = FlowOptions {
        restructure: settings.flow.restructure_enabled,
    };
    let mut service = WorryService::new(state.store.clone(), user, options);

    let mut subscription = state.store.subscribe(&service.owner().id).await?;
    service.apply_snapshot(subscription.latest());

    println!("Worry Tree — hello, {}.", service.owner().display_name);
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        refresh(&mut service, &mut subscription);

        let Some(line) = ask(&mut lines, "> ").await? else {
            break;
        };
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or("");
        let argument = parts.next();

        match command {
            "" => {}
            "help" => print_help(),
            "list" => print_worries(&service),
            "due" => {
                let today = Utc::now().date_naive();
                let due = service.due_scheduled(today);
                if due.is_empty() {
                    println!("Nothing scheduled is due.");
                }
                for record in due {
                    println!("  {}", describe(record));
                }
            }
            "new" => {
                if let Err(e) = run_wizard(&mut service, &mut lines).await {
                    println!("Could not save the worry: {e}");
                }
            }
            "done" => match resolve(&service, argument) {
                Ok(id) => match service.complete_quick(&id).await {
                    Ok(record) => println!("Completed: {}", record.text),
                    Err(e) => println!("Could not complete: {e}"),
                },
                Err(e) => println!("{e}"),
            },
            "review" => match resolve(&service, argument) {
                Ok(id) => {
                    if let Err(e) = run_review(&mut service, &mut lines, &id).await {
                        println!("Could not complete the review: {e}");
                    }
                }
                Err(e) => println!("{e}"),
            },
            "delete" => match resolve(&service, argument) {
                Ok(id) => {
                    if let Err(e) = run_delete(&mut service, &mut lines, &id).await {
                        println!("Could not delete: {e}");
                    }
                }
                Err(e) => println!("{e}"),
            },
            "signout" => {
                state.identity.sign_out();
                println!("Signed out.");
                break;
            }
            "quit" | "exit" => break,
            other => println!("Unknown command: {other} (try 'help')"),
        }
    }

    // Dropping the subscription tears the feed down with the session
    drop(subscription);
    Ok(())
}

/// Apply the latest snapshot if the feed pushed one since last time
fn refresh(service: &mut WorryService<SqliteRecordStore>, subscription: &mut Subscription) {
    if subscription.has_changed() {
        let snapshot = subscription.latest();
        service.apply_snapshot(snapshot);
    }
}

/// Walk the wizard from the current step until a commit or a cancel.
/// An empty answer cancels; 'back' moves one step back.
async fn run_wizard<S: RecordStore>(
    service: &mut WorryService<S>,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    loop {
        let step = service.session().step().clone();
        match step {
            WizardStep::Capture { .. } => {
                let Some(text) = ask(lines, "What are you worrying about? ").await? else {
                    break;
                };
                if text.is_empty() {
                    service.session_mut().reset();
                    println!("Cancelled.");
                    break;
                }
                if let Err(e) = service.session_mut().submit_worry(&text) {
                    println!("{e}");
                }
            }
            WizardStep::Restructure { text, .. } => {
                println!("Worry: {text}");
                let Some(evidence) =
                    ask(lines, "What evidence speaks against the worst case? ").await?
                else {
                    break;
                };
                if go_back(service, &evidence) {
                    continue;
                }
                let Some(reframe) = ask(lines, "How else could you look at it? ").await? else {
                    break;
                };
                if go_back(service, &reframe) {
                    continue;
                }
                if let Err(e) = service.session_mut().submit_restructure(&evidence, &reframe) {
                    println!("{e}");
                }
            }
            WizardStep::Categorize { worry } => {
                println!("Worry: {}", worry.text);
                let Some(answer) =
                    ask(lines, "Can you do something about it? (y/n/back) ").await?
                else {
                    break;
                };
                match answer.as_str() {
                    "y" => service.session_mut().choose_actionable()?,
                    "n" => service.session_mut().choose_not_actionable()?,
                    "back" => service.session_mut().back(),
                    _ => println!("Please answer y, n or back."),
                }
            }
            WizardStep::TimingCheck { .. } => {
                let Some(answer) = ask(lines, "Can you act on it right now? (y/n/back) ").await?
                else {
                    break;
                };
                match answer.as_str() {
                    "y" => service.session_mut().choose_act_now()?,
                    "n" => service.session_mut().choose_schedule_later()?,
                    "back" => service.session_mut().back(),
                    _ => println!("Please answer y, n or back."),
                }
            }
            WizardStep::Release { worry } => {
                println!("'{}' is out of your hands.", worry.text);
                let Some(answer) = ask(lines, "Let it go? (y/back) ").await? else {
                    break;
                };
                match answer.as_str() {
                    "y" => {
                        let record = service.commit_release().await?;
                        println!("Released: {}", record.text);
                        break;
                    }
                    "back" => service.session_mut().back(),
                    _ => println!("Please answer y or back."),
                }
            }
            WizardStep::ActNow { .. } => {
                let Some(what) = ask(lines, "What will you do right now? ").await? else {
                    break;
                };
                if go_back(service, &what) {
                    continue;
                }
                match service.commit_action(&what).await {
                    Ok(record) => {
                        println!(
                            "Planned: {}",
                            record.action_plan.as_ref().map_or("", |p| p.what.as_str())
                        );
                        break;
                    }
                    Err(e) => println!("{e}"),
                }
            }
            WizardStep::ScheduleLater { .. } => {
                let Some(what) = ask(lines, "What will you do? ").await? else {
                    break;
                };
                if go_back(service, &what) {
                    continue;
                }
                let Some(date_text) = ask(lines, "When? (YYYY-MM-DD) ").await? else {
                    break;
                };
                if go_back(service, &date_text) {
                    continue;
                }
                let Ok(date) = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d") else {
                    println!("That is not a date in YYYY-MM-DD form.");
                    continue;
                };
                let Some(how) = ask(lines, "Any notes on how? ").await? else {
                    break;
                };
                match service.commit_schedule(&what, &how, date).await {
                    Ok(record) => {
                        println!(
                            "Scheduled for {}: {}",
                            date,
                            record.action_plan.as_ref().map_or("", |p| p.what.as_str())
                        );
                        break;
                    }
                    Err(e) => println!("{e}"),
                }
            }
        }
    }

    Ok(())
}

/// Review-then-complete flow for one record
async fn run_review<S: RecordStore>(
    service: &mut WorryService<S>,
    lines: &mut Lines<BufReader<Stdin>>,
    id: &str,
) -> Result<()> {
    let mut form = ReviewForm::new();

    loop {
        let prompt = format!(
            "How well did dealing with it work? (1-5, enter keeps {}) ",
            form.rating()
        );
        let Some(answer) = ask(lines, &prompt).await? else {
            return Ok(());
        };
        if answer.is_empty() {
            form.acknowledge_rating();
            break;
        }
        match answer.parse::<u8>() {
            Ok(rating) => match form.set_rating(rating) {
                Ok(()) => break,
                Err(e) => println!("{e}"),
            },
            Err(_) => println!("Please enter a number from 1 to 5."),
        }
    }

    loop {
        let Some(lesson) = ask(lines, "What did you learn? ").await? else {
            return Ok(());
        };
        form.set_lesson(&lesson);
        match form.finish() {
            Ok(outcome) => {
                let record = service.complete_reviewed(id, outcome).await?;
                println!("Reviewed and completed: {}", record.text);
                return Ok(());
            }
            Err(e) => println!("{e}"),
        }
    }
}

/// Confirmation-gated deletion of one record
async fn run_delete<S: RecordStore>(
    service: &mut WorryService<S>,
    lines: &mut Lines<BufReader<Stdin>>,
    id: &str,
) -> Result<()> {
    service.request_delete(id)?;

    let Some(answer) = ask(lines, "Really delete? This cannot be undone. (y/n) ").await? else {
        service.cancel_delete();
        return Ok(());
    };

    if answer == "y" {
        service.confirm_delete().await?;
        println!("Deleted.");
    } else {
        service.cancel_delete();
        println!("Kept.");
    }

    Ok(())
}

/// Resolve a 1-based list index argument to a record id
fn resolve<S: RecordStore>(service: &WorryService<S>, argument: Option<&str>) -> Result<String> {
    let position: usize = argument
        .and_then(|a| a.parse().ok())
        .ok_or_else(|| crate::error::AppError::Validation("expected a list number".into()))?;

    service
        .worries()
        .get(position.wrapping_sub(1))
        .map(|record| record.id.clone())
        .ok_or_else(|| crate::error::AppError::WorryNotFound(format!("list entry {position}")))
}

fn go_back<S: RecordStore>(service: &mut WorryService<S>, answer: &str) -> bool {
    if answer == "back" {
        service.session_mut().back();
        true
    } else {
        false
    }
}

async fn ask(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;

    Ok(lines
        .next_line()
        .await?
        .map(|line| line.trim().to_string()))
}

fn print_worries<S: RecordStore>(service: &WorryService<S>) {
    let worries = service.worries();
    if worries.is_empty() {
        println!("No worries saved. Type 'new' to process one.");
        return;
    }
    for (index, record) in worries.into_iter().enumerate() {
        println!("{:>3}. {}", index + 1, describe(record));
    }
}

fn describe(record: &WorryRecord) -> String {
    let marker = match record.status {
        WorryStatus::Pending => " ",
        WorryStatus::Completed => "x",
    };
    let mut line = format!("[{marker}] {} ({})", record.text, record.category.as_str());
    if let Some(plan) = &record.action_plan {
        line.push_str(&format!(" — {}", plan.what));
    }
    if let Some(date) = record.scheduled_for {
        line.push_str(&format!(" on {date}"));
    }
    if let Some(rating) = record.effectiveness_rating {
        line.push_str(&format!(" — rated {rating}/5"));
    }
    line
}

fn print_help() {
    println!("Commands:");
    println!("  new          process a new worry");
    println!("  list         show your worries");
    println!("  due          show scheduled worries whose date has arrived");
    println!("  done <n>     complete a worry without a review");
    println!("  review <n>   review and complete a worry");
    println!("  delete <n>   delete a worry (asks for confirmation)");
    println!("  signout      sign out and exit");
    println!("  quit         exit");
}
