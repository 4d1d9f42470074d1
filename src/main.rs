use std::{
    io::{
        self,
        Write,
    },
    path::PathBuf,
    process,
};

use clap::Parser;
use log::error;
use prophora::{
    core::PipelineConfig,
    pipeline,
    speech::GoogleTranslateTts,
};

#[derive(Parser)]
#[command(name = "prophora")]
#[command(about = "Adds synthesized Greek pronunciation audio to an Anki .apkg deck")]
struct Cli {
    /// Input .apkg deck archive
    input: PathBuf,

    /// Where to write the augmented .apkg
    #[arg(short, long, default_value = "output.apkg")]
    output: PathBuf,

    /// Directory of timestamp-suffixed backup archives
    #[arg(short, long, default_value = "backups")]
    backups: PathBuf,

    /// Speech cache directory (defaults to the local app data dir)
    #[arg(long, env = "PROPHORA_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Speech synthesis locale
    #[arg(long, default_value = "el")]
    locale: String,

    /// Proceed without asking when backed-up notes are missing
    #[arg(long)]
    force: bool,
}

fn prompt_confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = PipelineConfig {
        input_archive: cli.input,
        output_archive: cli.output,
        backup_dir: cli.backups,
        cache_dir: cli.cache_dir.unwrap_or_else(PipelineConfig::default_cache_dir),
        locale: cli.locale.clone(),
        translation_field: PipelineConfig::default_translation_field(),
        field_pairs: PipelineConfig::default_field_pairs(),
    };

    let synthesizer = Box::new(GoogleTranslateTts::new(&config.locale));
    let confirm: Box<dyn Fn(&str) -> bool> =
        if cli.force { Box::new(|_: &str| true) } else { Box::new(prompt_confirm) };

    // Scratch cleanup happens inside run() on every exit path; only the exit
    // code is decided here.
    match pipeline::run(&config, synthesizer, confirm.as_ref()) {
        Ok(summary) => {
            println!(
                "Done: {} notes updated, {} skipped, {} clips synthesized -> {:?}",
                summary.notes_updated,
                summary.notes_skipped,
                summary.clips_synthesized,
                summary.output_archive
            );
        }
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
