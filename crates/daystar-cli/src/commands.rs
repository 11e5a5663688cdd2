//! Subcommand definitions and handlers.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use daystar_core::{
    ApiClient, ApiError, CheckInOutcome, Config, Habit, HabitDraft, HabitSyncController,
    SessionManager,
};

#[derive(Parser)]
#[command(name = "daystar", about = "Build lasting habits, one day at a time", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login {
        /// Email address; defaults to the last one used
        email: Option<String>,
    },
    /// Create an account and sign in
    Signup {
        email: String,
        /// Display name
        #[arg(default_value = "User")]
        name: String,
    },
    /// Sign in with a Google identity token
    Google {
        /// ID token obtained from the Google sign-in flow
        id_token: String,
    },
    /// Sign out and forget the stored credential
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Update the profile name and optionally the password
    Profile {
        name: String,
        /// Prompt for a new password as well
        #[arg(long)]
        password: bool,
    },
    /// List habits with their current streaks
    Habits,
    /// Create a new habit
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "⭐")]
        icon: String,
        #[arg(long, default_value = "#FBBF24")]
        colour: String,
    },
    /// Edit a habit's fields
    Edit {
        id: i64,
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "⭐")]
        icon: String,
        #[arg(long, default_value = "#FBBF24")]
        colour: String,
    },
    /// Check in for today
    Done { id: i64 },
    /// Show a habit's check-in history
    Log { id: i64 },
    /// Show dashboard numbers
    Stats,
}

pub async fn run(
    command: Command,
    config: &mut Config,
    session: &SessionManager<ApiClient>,
    sync: &HabitSyncController<ApiClient>,
) -> Result<()> {
    match command {
        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => bail!("no email given and none remembered; run `daystar login <email>`"),
            };
            let password = rpassword::prompt_password("Password: ")?;
            let settled = session
                .login_with_password(&email, &password)
                .await
                .map_err(describe)?;
            config.last_email = Some(email);
            config.save()?;
            greet(settled.user().map(|u| u.name.as_str()));
        }
        Command::Signup { email, name } => {
            let password = rpassword::prompt_password("Password: ")?;
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            if password != confirm {
                bail!("passwords do not match");
            }
            let settled = session
                .signup(&email, &password, &name)
                .await
                .map_err(describe)?;
            config.last_email = Some(email);
            config.save()?;
            greet(settled.user().map(|u| u.name.as_str()));
        }
        Command::Google { id_token } => {
            let settled = session
                .login_with_identity_token(&id_token)
                .await
                .map_err(describe)?;
            greet(settled.user().map(|u| u.name.as_str()));
        }
        Command::Logout => {
            session.logout().await.map_err(describe)?;
            println!("Signed out.");
        }
        Command::Whoami => match session.snapshot().user() {
            Some(user) => println!("{} <{}>", user.name, user.email),
            None => println!("Not signed in."),
        },
        Command::Profile { name, password } => {
            let new_password = if password {
                Some(rpassword::prompt_password("New password: ")?)
            } else {
                None
            };
            let settled = session
                .update_profile(&name, new_password.as_deref())
                .await
                .map_err(describe)?;
            if let Some(user) = settled.user() {
                println!("Profile updated: {} <{}>", user.name, user.email);
            }
        }
        Command::Habits => {
            let habits = sync.refresh().await.map_err(describe)?;
            if habits.is_empty() {
                println!("No habits yet. Create your first with `daystar add <title>`.");
            }
            for habit in &habits {
                print_habit(habit);
            }
        }
        Command::Add {
            title,
            description,
            icon,
            colour,
        } => {
            let mut draft = HabitDraft::new(title);
            draft.description = description;
            draft.icon = icon;
            draft.colour = colour;
            let habit = sync.create_habit(&draft).await.map_err(describe)?;
            println!("Created:");
            print_habit(&habit);
        }
        Command::Edit {
            id,
            title,
            description,
            icon,
            colour,
        } => {
            let mut draft = HabitDraft::new(title);
            draft.description = description;
            draft.icon = icon;
            draft.colour = colour;
            let habit = sync.update_habit(id, &draft).await.map_err(describe)?;
            println!("Updated:");
            print_habit(&habit);
        }
        Command::Done { id } => match sync.check_in(id).await.map_err(describe)? {
            CheckInOutcome::Recorded(habit) => {
                println!("Checked in! {} day streak for {}", habit.streak, habit.title);
            }
            CheckInOutcome::Rejected { message } => {
                println!("{}", message);
            }
        },
        Command::Log { id } => {
            let history = sync.check_ins(id).await.map_err(describe)?;
            if history.is_empty() {
                println!("No check-ins yet.");
            }
            for check_in in &history {
                println!("{}", check_in.check_in_date.format("%A, %B %-d, %Y"));
            }
        }
        Command::Stats => {
            let stats = sync.stats().await.map_err(describe)?;
            println!("Active habits:   {}", stats.active_habits);
            println!("Best streak:     {}", stats.best_streak);
            println!("Total check-ins: {}", stats.total_check_ins);
        }
    }
    Ok(())
}

fn greet(name: Option<&str>) {
    match name {
        Some(name) => println!("Signed in as {}.", name),
        None => println!("Signed in."),
    }
}

fn print_habit(habit: &Habit) {
    println!(
        "{:>4}  {} {}  ({} day streak)",
        habit.id, habit.icon, habit.title, habit.streak
    );
    if let Some(description) = &habit.description {
        println!("      {}", description);
    }
}

/// Render an API failure with any server-side validation details, which
/// are authoritative and shown verbatim.
fn describe(err: ApiError) -> anyhow::Error {
    let mut message = err.to_string();
    for line in err.detail_lines() {
        message.push_str("\n  - ");
        message.push_str(&line);
    }
    anyhow::anyhow!(message)
}
