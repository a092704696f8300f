use std::path::PathBuf;

use afrikunle_app::AfrikunleClient;
use afrikunle_app::config::CONFIG_PATH_ENV;
use afrikunle_app::error::AppError;
use afrikunle_cache::preferences::Theme;
use afrikunle_content::application::code_runner::CodeRun;
use afrikunle_content::application::lesson_service::Origin;
use afrikunle_content::domain::lesson::{LessonContent, LessonId, Level};
use afrikunle_core::error::ClientError;
use afrikunle_health::HealthStatus;
use afrikunle_narration::domain::rate::parse_rate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

/// Afrikunle: coding lessons in your language, read aloud.
#[derive(Parser)]
#[command(name = "afrikunle", version, about)]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long, env = CONFIG_PATH_ENV)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show one lesson.
    Lesson {
        /// Lesson identifier (e.g. "1").
        id: LessonId,

        /// Content locale; defaults to the stored language.
        #[arg(long)]
        lang: Option<String>,

        /// Greet, then read the opening of the lesson aloud.
        #[arg(long)]
        narrate: bool,
    },

    /// List available lessons.
    Lessons {
        /// Content locale; defaults to the stored language.
        #[arg(long)]
        lang: Option<String>,

        /// Keep only this level (lessons without a level are always kept).
        #[arg(long)]
        level: Option<Level>,
    },

    /// Run a code snippet on the backend.
    Run {
        /// Source code to run.
        code: String,
    },

    /// Check whether the backend is reachable.
    Health {
        /// Keep polling and print every change until interrupted.
        #[arg(long)]
        watch: bool,
    },

    /// Show or change stored preferences.
    Prefs {
        #[command(subcommand)]
        command: PrefsCommand,
    },
}

#[derive(Subcommand)]
pub enum PrefsCommand {
    /// Print every preference.
    Show,

    /// Store one preference.
    Set {
        /// Preference to change.
        key: PrefKey,

        /// New value. Themes are "light" or "dark"; rates are "slow",
        /// "normal", "fast" or a positive number.
        value: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PrefKey {
    Lang,
    Theme,
    SpeechRate,
    UserName,
}

pub async fn run(client: &AfrikunleClient, command: Command) -> Result<(), AppError> {
    match command {
        Command::Lesson { id, lang, narrate } => {
            let locale = lang.unwrap_or_else(|| client.preferences().lang);
            let fetch = client.fetch_lesson(&id, &locale).await?;
            print_lesson(&fetch.lesson);
            if fetch.origin == Origin::Cache {
                println!("\n(offline copy)");
            }
            if narrate {
                narrate_lesson(client, &fetch.lesson, &locale).await;
            }
        }
        Command::Lessons { lang, level } => {
            let locale = lang.unwrap_or_else(|| client.preferences().lang);
            let fetch = client.list_lessons(&locale, level.as_ref()).await?;
            for lesson in &fetch.lessons {
                let id = lesson.id.as_ref().map(ToString::to_string).unwrap_or_default();
                let level = lesson.level.as_ref().map(ToString::to_string).unwrap_or_default();
                println!("{id:>6}  {level:<12}  {}", lesson.title);
            }
            if fetch.origin == Origin::Cache {
                println!("(offline copy)");
            }
        }
        Command::Run { code } => match client.run_code(&code).await? {
            CodeRun::Output(output) => println!("{output}"),
            CodeRun::Error(error) => println!("Error: {error}"),
        },
        Command::Health { watch } => {
            let handle = client.watch_health();
            let mut rx = handle.subscribe();
            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
                let status = rx.borrow_and_update().status;
                println!("{status}");
                if !watch {
                    break;
                }
            }
            let status = handle.status();
            handle.stop().await;
            if !watch && status == HealthStatus::Offline {
                return Err(ClientError::Network("backend offline".to_owned()).into());
            }
        }
        Command::Prefs { command } => match command {
            PrefsCommand::Show => {
                let prefs = client.preferences();
                println!("lang         {}", prefs.lang);
                println!(
                    "theme        {}",
                    if prefs.theme == Theme::Dark { "dark" } else { "light" }
                );
                println!("speech-rate  {}", prefs.speech_rate);
                println!("user-name    {}", prefs.user_name);
                if let Some(code) = prefs.last_code {
                    println!("last-code    {code}");
                }
                if let Some(output) = prefs.last_output {
                    println!("last-output  {output}");
                }
            }
            PrefsCommand::Set { key, value } => set_preference(client, key, &value)?,
        },
    }
    Ok(())
}

/// Narrates until playback ends or the user interrupts. A missing voice
/// leaves the printed lesson as the result.
async fn narrate_lesson(client: &AfrikunleClient, lesson: &LessonContent, locale: &str) {
    if let Err(e) = client.narrate_lesson(lesson, locale).await {
        warn!(error = %e, locale, "narration unavailable");
        return;
    }
    tokio::select! {
        () = client.narration().idle() => {}
        _ = tokio::signal::ctrl_c() => client.stop_speaking().await,
    }
}

fn set_preference(client: &AfrikunleClient, key: PrefKey, value: &str) -> Result<(), AppError> {
    match key {
        PrefKey::Lang => client.set_lang(value.trim()),
        PrefKey::Theme => match value.trim().to_ascii_lowercase().as_str() {
            "dark" => client.set_theme(Theme::Dark),
            "light" => client.set_theme(Theme::Light),
            other => {
                return Err(AppError::Config(format!(
                    "theme must be light or dark, got {other:?}"
                )));
            }
        },
        PrefKey::SpeechRate => {
            let rate = parse_rate(value)
                .ok_or_else(|| AppError::Config(format!("invalid speech rate {value:?}")))?;
            client.set_speech_rate(rate)?;
        }
        PrefKey::UserName => client.set_user_name(value.trim()),
    }
    Ok(())
}

fn print_lesson(lesson: &LessonContent) {
    println!("{}", lesson.title);
    if let Some(level) = &lesson.level {
        println!("[{level}]");
    }
    println!("\n{}", lesson.body);
    if let Some(quiz) = &lesson.quiz {
        println!("\nQuiz: {}", quiz.question);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use afrikunle_app::{AppConfig, Platform};
    use afrikunle_core::speech::SpeechEngine;
    use afrikunle_test_support::{
        FixedClock, MemoryStore, Reply, ScriptedSpeechEngine, ScriptedTransport,
    };
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    async fn client(speech: ScriptedSpeechEngine) -> AfrikunleClient {
        let transport = ScriptedTransport::new().route(
            "http://api.test/api/lesson/1?lang=en",
            Reply::ok(&json!({ "id": 1, "title": "Variables", "body": "A variable names a value." })),
        );
        let platform = Platform {
            transport: Arc::new(transport),
            store: Arc::new(MemoryStore::new()),
            speech: Arc::new(speech) as Arc<dyn SpeechEngine>,
            clock: Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())),
        };
        let config = AppConfig {
            api_url: "http://api.test".to_owned(),
            ..AppConfig::default()
        };
        AfrikunleClient::with_platform(config, platform).await
    }

    #[tokio::test]
    async fn test_lesson_with_narration_succeeds_without_a_voice() {
        // Arrange
        let client = client(ScriptedSpeechEngine::broken()).await;
        let command = Command::Lesson {
            id: LessonId::Number(1),
            lang: Some("en".to_owned()),
            narrate: true,
        };

        // Act
        let result = run(&client, command).await;

        // Assert
        assert!(result.is_ok());
        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_theme_is_rejected() {
        let client = client(ScriptedSpeechEngine::broken()).await;

        let result = set_preference(&client, PrefKey::Theme, "sepia");

        assert!(matches!(result, Err(AppError::Config(_))));
        client.shutdown().await;
    }
}
