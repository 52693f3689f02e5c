//! Basic usage of the Zaban client: single calls for each operation

use dotenvy::dotenv;
use zaban::{SpeechRequest, TranslationRequest, TransliterationRequest, Zaban};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let client = Zaban::from_env()?;

    // Translation with an explicit source language
    let request = TranslationRequest::new("Hello, how are you?", "hin_Deva")?
        .with_source_lang("eng_Latn");
    let result = client.translate(&request).await?;
    println!("Original:   Hello, how are you?");
    println!("Translated: {}", result.translated_text);
    if let Some(model) = &result.model {
        println!("Model:      {}", model);
    }

    // Translation with auto-detection
    let request = TranslationRequest::new("Good morning", "tam_Taml")?.with_auto_detect();
    let result = client.translate(&request).await?;
    println!("\nOriginal:   Good morning");
    println!("Translated: {}", result.translated_text);
    if let Some(detected) = &result.source_lang {
        println!("Detected:   {}", detected);
    }

    // Transliteration with ranked candidates
    let request = TransliterationRequest::new("namaste", "latn", "deva", "hi")?.with_topk(3);
    let result = client.transliterate(&request).await?;
    println!("\nOriginal: namaste");
    println!("Top:      {}", result.top().unwrap_or("<none>"));
    println!("All:      {:?}", result.results);

    // Text-to-speech
    let request = SpeechRequest::new("नमस्ते दुनिया", "hi", "female")?;
    let audio = client.synthesize_speech(&request).await?;
    audio.save("output.wav")?;
    println!("\nAudio saved to output.wav ({} bytes)", audio.content.len());

    Ok(())
}
