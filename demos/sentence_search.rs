use kvtree::text::Vocabulary;
use kvtree::VectorStore;
use std::io::{self, BufRead};

const SENTENCES: [&str; 4] = [
    "Cricket is a popular sport in India",
    "Virat Kohli represents India in international cricket",
    "Virat Kohli plays for RCB in IPL",
    "Virat Kohli is my favorite cricketer",
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Query from command line args, or from stdin when none are given
    let args: Vec<String> = std::env::args().skip(1).collect();
    let query = if args.is_empty() {
        println!("Enter your query");
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line.trim().to_string()
    } else {
        args.join(" ")
    };

    let vocabulary = Vocabulary::from_corpus(&SENTENCES);
    println!("Vocabulary: {} tokens\n", vocabulary.len());

    let mut store = VectorStore::new();
    for sentence in SENTENCES {
        let id = store.insert_with_text(vocabulary.vectorize(sentence), sentence)?;
        println!("Inserted {} <- {:?}", id, sentence);
    }

    let k = 3;
    println!("\nQuery Prompt: {}", query);
    println!("Top {} Similar Sentences:", k);
    for (rank, hit) in store.k_nearest(&vocabulary.vectorize(&query), k)?.iter().enumerate() {
        println!("  {}. {} (distance: {:.4})",
            rank + 1, hit.entry.text.as_deref().unwrap_or("<no text>"), hit.distance);
    }

    Ok(())
}
