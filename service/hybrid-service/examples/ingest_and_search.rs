use hybrid_service::{ServiceConfig, Services};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: cargo run -p hybrid-service --example ingest_and_search -- <FILE> <QUERY>");
        std::process::exit(1);
    }
    let file = &args[1];
    let query = &args[2];

    let cfg = ServiceConfig::default();
    let mut svc = Services::new(cfg)?;
    let report = svc.ingest_file(file)?;
    println!(
        "Ingested {} chunks ({} exact dups, {} near dups, {} fallback embeddings)",
        report.chunks_written, report.exact_duplicates, report.near_duplicates, report.fallback_embeddings
    );

    let response = svc.search(query, &[], 10)?;
    println!("Results: {}", response.results.len());
    for (i, r) in response.results.iter().enumerate() {
        let preview: String = r.chunk.text.chars().take(80).collect();
        println!("{:>2}. {:.4} {}\n    {}", i + 1, r.score, r.citation.replace('\n', " "), preview);
    }
    Ok(())
}
