//! CLI command definitions and handlers

use clap::Subcommand;
use std::path::PathBuf;

use crate::core::client::Zaban;
use crate::core::models::{
    Operation, RequestDescriptor, SpeechRequest, TranscriptionRequest, TranslationRequest,
    TransliterationRequest,
};

/// Commands for the Zaban CLI
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a text
    Translate {
        /// Text to translate
        text: String,

        /// Source language (auto-detect if not specified)
        #[arg(long)]
        source_lang: Option<String>,

        /// Target language code, e.g. hin_Deva
        #[arg(short, long)]
        target_lang: String,
    },

    /// Transliterate a text between scripts
    Transliterate {
        /// Text to transliterate
        text: String,

        /// Source script, e.g. latn
        #[arg(long, default_value = "latn")]
        source_script: String,

        /// Target script, e.g. deva
        #[arg(long)]
        target_script: String,

        /// Language code, e.g. hi
        #[arg(short, long)]
        lang: String,

        /// Number of ranked candidates to return
        #[arg(long)]
        topk: Option<usize>,
    },

    /// Synthesize speech from text
    Speak {
        /// Text to speak
        text: String,

        /// Language code, e.g. hi
        #[arg(short, long)]
        lang: String,

        /// Speaker voice
        #[arg(short, long, default_value = "female")]
        speaker: String,

        /// Audio format
        #[arg(short, long, default_value = "wav")]
        format: String,

        /// Output audio file
        #[arg(short, long, default_value = "output.wav")]
        output: PathBuf,
    },

    /// Transcribe an audio file to text
    Transcribe {
        /// Input audio file
        file: PathBuf,

        /// Language code, e.g. hi
        #[arg(short, long)]
        lang: String,
    },

    /// Translate every line of a text file concurrently
    Batch {
        /// Input file, one text per line
        file: PathBuf,

        /// Target language code, e.g. hin_Deva
        #[arg(short, long)]
        target_lang: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Handle the translate command
pub async fn handle_translate(
    text: String,
    source_lang: Option<String>,
    target_lang: String,
) -> anyhow::Result<()> {
    let client = Zaban::from_env()?;

    let mut request = TranslationRequest::new(text, target_lang)?;
    request = match source_lang {
        Some(lang) => request.with_source_lang(lang),
        None => request.with_auto_detect(),
    };

    let result = client.translate(&request).await?;

    println!("{}", result.translated_text);
    if let Some(detected) = result.source_lang {
        eprintln!("Detected source language: {}", detected);
    }

    Ok(())
}

/// Handle the transliterate command
pub async fn handle_transliterate(
    text: String,
    source_script: String,
    target_script: String,
    lang: String,
    topk: Option<usize>,
) -> anyhow::Result<()> {
    let client = Zaban::from_env()?;

    let mut request = TransliterationRequest::new(text, source_script, target_script, lang)?;
    if let Some(topk) = topk {
        request = request.with_topk(topk);
    }

    let result = client.transliterate(&request).await?;

    match result.top() {
        Some(top) => println!("{}", top),
        None => anyhow::bail!("no transliteration candidates returned"),
    }
    if result.results.len() > 1 {
        eprintln!("Other candidates: {}", result.results[1..].join(", "));
    }

    Ok(())
}

/// Handle the speak command
pub async fn handle_speak(
    text: String,
    lang: String,
    speaker: String,
    format: String,
    output: PathBuf,
) -> anyhow::Result<()> {
    let client = Zaban::from_env()?;

    let request = SpeechRequest::new(text, lang, speaker)?.with_format(format);
    let audio = client.synthesize_speech(&request).await?;
    audio.save(&output)?;

    println!(
        "Saved {} bytes ({}) to {}",
        audio.content.len(),
        audio.mime_type,
        output.display()
    );

    Ok(())
}

/// Handle the transcribe command
pub async fn handle_transcribe(file: PathBuf, lang: String) -> anyhow::Result<()> {
    let client = Zaban::from_env()?;

    let audio = std::fs::read(&file)?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio.wav".to_string());

    let request = TranscriptionRequest::new(audio, lang)?.with_file_name(file_name);
    let transcription = client.transcribe(&request).await?;

    println!("{}", transcription.text);
    if let Some(language) = transcription.language {
        eprintln!("Detected language: {}", language);
    }

    Ok(())
}

/// Handle the batch command
pub async fn handle_batch(
    file: PathBuf,
    target_lang: String,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use tracing::info;

    let client = Zaban::from_env()?;

    let content = std::fs::read_to_string(&file)?;
    let lines: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    if lines.is_empty() {
        anyhow::bail!("no text lines found in {}", file.display());
    }

    info!("Translating {} lines to {}", lines.len(), target_lang);

    let mut descriptors = Vec::with_capacity(lines.len());
    for line in &lines {
        let request = TranslationRequest::new(*line, target_lang.clone())?.with_auto_detect();
        descriptors.push(RequestDescriptor::new(Operation::Translate(request)));
    }

    let pb = ProgressBar::new(descriptors.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("=>-"),
    );

    let dispatcher = client.dispatcher()?;
    let result = dispatcher
        .run_with(descriptors, |_item| pb.inc(1))
        .await;
    pb.finish_and_clear();

    let mut out_lines = Vec::with_capacity(result.len());
    for item in &result {
        match (item.descriptor.operation(), item.outcome.payload()) {
            (_, Some(payload)) => {
                if let Some(translation) = payload.as_translation() {
                    out_lines.push(translation.translated_text.clone());
                }
            }
            (Operation::Translate(request), None) => {
                eprintln!(
                    "Failed to translate {:?}: {}",
                    request.text,
                    item.outcome.error().map(|e| e.to_string()).unwrap_or_default()
                );
                out_lines.push(String::new());
            }
            _ => {}
        }
    }

    match output {
        Some(path) => {
            std::fs::write(&path, out_lines.join("\n"))?;
            println!("Wrote {} translations to {}", result.len(), path.display());
        }
        None => {
            for line in &out_lines {
                println!("{}", line);
            }
        }
    }

    let report = result.report();
    eprintln!(
        "{} succeeded, {} failed in {:.2}s ({:.1} req/s)",
        report.succeeded,
        report.failed,
        report.elapsed.as_secs_f64(),
        report.requests_per_sec
    );

    Ok(())
}
