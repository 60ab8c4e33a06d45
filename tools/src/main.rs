use anyhow::{Result, anyhow};
use clap::Parser;
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use suggest_core::{
    DictionaryFacilitator, FileDictionaryProvider, InputStyle, KeyboardState, Locale, NgramContext, Settings,
    Suggest, SuggestedWords, WordComposer, WordInfo,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Types each line of stdin word by word and prints what the suggestion
/// strip would show, committing auto-corrections as it goes.
#[derive(Parser)]
struct Args {
    /// Directory holding dictionaries and blacklists
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long, default_value = "en")]
    locale: String,

    /// Additional locales; overrides the settings file
    #[arg(long, num_args = 1..)]
    secondary: Vec<String>,

    /// Settings TOML
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    account: Option<String>,

    /// Print every request as one JSON object per line
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Leave user history untouched
    #[arg(long, default_value_t = false)]
    no_learn: bool,

    /// Print the dictionary state before exiting
    #[arg(long, default_value_t = false)]
    dump: bool,
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn render(out: &SuggestedWords, committed: &str) -> String {
    let words: Vec<&str> = out.suggestions().iter().map(|s| s.word.as_str()).collect();
    let typed = out.typed_word().unwrap_or("");
    if typed == committed {
        format!("{:<16} [{}]", typed, words.join(", "))
    } else {
        format!("{:<16} [{}]", format!("{} -> {}", typed, committed), words.join(", "))
    }
}

fn render_json(out: &SuggestedWords, committed: &str) -> serde_json::Value {
    let suggestions: Vec<serde_json::Value> = out
        .suggestions()
        .iter()
        .map(|s| {
            json!({
                "word": s.word,
                "score": s.score,
                "dictionary": s.source_dict.dict_type.to_string(),
                "locale": s.source_dict.locale.as_ref().map(|l| l.to_string()),
            })
        })
        .collect();
    json!({
        "typed": out.typed_word(),
        "committed": committed,
        "will_auto_correct": out.will_auto_correct,
        "typed_word_valid": out.typed_word_valid,
        "input_style": format!("{:?}", out.input_style),
        "suggestions": suggestions,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => Settings::load_toml(path).map_err(|e| anyhow!("{}: {}", path.display(), e))?,
        None => Settings::default(),
    };
    if let Some(dir) = &args.data_dir {
        settings.data_dir = Some(dir.clone());
    }
    if !args.secondary.is_empty() {
        settings.secondary_locales = args.secondary.clone();
    }
    let data_dir = settings.data_dir.clone().unwrap_or_else(|| PathBuf::from("data"));

    let facilitator = Arc::new(DictionaryFacilitator::new(
        Arc::new(FileDictionaryProvider::new(&data_dir)),
        settings.clone(),
    )?);
    let secondary: Vec<Locale> = settings.secondary_locales.iter().map(|l| Locale::new(l.as_str())).collect();
    facilitator.reset_dictionaries(
        &Locale::new(args.locale.as_str()),
        &secondary,
        settings.use_contacts_dict,
        settings.use_personalized_dicts,
        false,
        args.account.as_deref(),
    );
    if !facilitator.wait_for_loading_main_dictionaries(Duration::from_secs(30)) {
        warn!("main dictionaries still loading; continuing without them");
    }
    info!(data_dir = %data_dir.display(), "ready");
    let suggest = Suggest::new(Arc::clone(&facilitator));
    let keyboard = KeyboardState::default();

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    let mut sequence_number = 0;
    for line in io::stdin().lock().lines() {
        let line = line?;
        let mut ctx = NgramContext::beginning_of_sentence();
        let mut sentence = Vec::new();
        for typed in line.split_whitespace() {
            let composer = WordComposer::from_typed_word(typed);
            let out = suggest.get_suggested_words(
                &composer,
                &ctx,
                &keyboard,
                &settings,
                settings.auto_correction_enabled,
                InputStyle::Typing,
                sequence_number,
            );
            sequence_number += 1;
            let committed = out
                .auto_correction()
                .map(|s| s.word.clone())
                .unwrap_or_else(|| typed.to_string());
            if args.json {
                writeln!(stdout, "{}", render_json(&out, &committed))?;
            } else {
                writeln!(stdout, "{}", render(&out, &committed))?;
            }
            if !args.no_learn {
                facilitator.add_to_user_history(
                    &committed,
                    false,
                    &ctx,
                    now(),
                    settings.block_potentially_offensive,
                );
            }
            ctx = ctx.next_context(WordInfo::new(committed.as_str()));
            sentence.push(committed);
        }
        if !args.json && !sentence.is_empty() {
            writeln!(stdout, "=> {}", sentence.join(" "))?;
        }
    }

    if let Some(confidences) = facilitator.locales_and_confidences() {
        info!(%confidences, "session done");
    }
    if !facilitator.wait_for_background_tasks(Duration::from_secs(30)) {
        warn!("background writes did not finish");
    }
    if args.dump {
        writeln!(stdout, "{}", facilitator.dump()?)?;
    }
    facilitator.on_finish_input();
    Ok(())
}
