use std::env;

use markov_core::store::FileStore;
use markov_core::{Markov, MarkovError, Settings, StoreFormat, TokenMode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Corpus file: one message per line
    let corpus = env::args().nth(1).unwrap_or_else(|| "./data/corpus.txt".to_owned());

    // Keep the demo chain away from the server's data directory
    let settings = Settings {
        data_dir: "./data/exemple".into(),
        store_format: StoreFormat::Postcard,
        ..Settings::load(None)?
    };
    let store = FileStore::open(&settings.data_dir, settings.store_format)?;
    let mut markov = Markov::new(store, settings);

    // An entity must opt in before anything is recorded
    markov.enable("corpus")?;

    // Word tokens, each state made of the last two words
    if let Some(advisory) = markov.configure("corpus", Some(TokenMode::Word), Some(2))? {
        println!("{}", advisory.message());
        markov.reset("corpus")?;
    }

    // Unknown modes are rejected, never replaced by a default
    match "frobnicate".parse::<TokenMode>() {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("{e}"),
    }

    let states = markov.train("corpus", &corpus)?;
    println!("Trained {states} states from {corpus}");

    // Messages can also be observed one at a time
    markov.observe("corpus", "Hello, world! This is a demo of the markov chain.");

    for i in 0..10 {
        match markov.generate("corpus") {
            Ok(text) => println!("Generated text {}: {}", i + 1, text),
            Err(e @ MarkovError::ModelIncomplete { .. }) => return Err(e.into()),
            Err(e) => println!("{}", e.user_message("corpus")),
        }
    }

    Ok(())
}
