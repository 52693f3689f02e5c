//! Concurrent batch translation with the dispatcher

use dotenvy::dotenv;
use zaban::{TranslationRequest, Zaban};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let client = Zaban::from_env()?;

    // Translate several texts concurrently; results come back in
    // submission order no matter which call finishes first.
    let texts = ["Hello", "Goodbye", "Thank you", "Good morning", "How are you?"];
    let mut requests = Vec::new();
    for text in &texts {
        requests.push(TranslationRequest::new(*text, "hin_Deva")?.with_auto_detect());
    }

    let result = client.translate_batch(requests).await?;
    for (text, item) in texts.iter().zip(result.iter()) {
        match item.outcome.payload().and_then(|p| p.as_translation()) {
            Some(translation) => println!("{:20} -> {}", text, translation.translated_text),
            None => println!("{:20} -> failed: {:?}", text, item.outcome.error()),
        }
    }

    // One text into several languages
    let targets = ["hin_Deva", "tam_Taml", "ben_Beng", "tel_Telu", "guj_Gujr"];
    let result = client.translate_to_many("Good morning", &targets).await?;
    println!("\nOriginal: Good morning");
    for (lang, payload) in targets.iter().zip(result.successes()) {
        if let Some(translation) = payload.as_translation() {
            println!("{:10} -> {}", lang, translation.translated_text);
        }
    }

    let report = result.report();
    println!(
        "\n{}/{} succeeded in {:.2}s ({:.1} req/s)",
        report.succeeded,
        report.total,
        report.elapsed.as_secs_f64(),
        report.requests_per_sec
    );

    Ok(())
}
