//! Command-line harness over [`hybrid_service::Services`], replacing the
//! teacher's separate insert/search GUI and CLI tools with one binary that
//! exercises the full S1-S5 + R pipeline end to end.

use std::env;
use std::path::PathBuf;

use chunking_store::FilterClause;
use hybrid_service::{ServiceConfig, Services};

fn print_usage() {
    eprintln!(
        "Usage:\n\
         rag-cli ingest [db_path] <FILE> [--hnsw DIR]\n\
         rag-cli search [db_path] --query Q [--k N] [--week N] [--hnsw DIR]\n\
         rag-cli scope [db_path] --question Q [--hnsw DIR]\n\
         \n\
         Notes: db_path defaults to target/demo/chunks.db; hnsw defaults to <db_path>.hnsw\n"
    );
}

fn take_db_path(tail: &mut Vec<String>) -> String {
    if !tail.is_empty() && !tail[0].starts_with('-') {
        tail.remove(0)
    } else {
        "target/demo/chunks.db".to_string()
    }
}

fn take_flag_value(rest: &mut Vec<String>, flag: &str) -> Option<String> {
    let idx = rest.iter().position(|a| a == flag)?;
    if idx + 1 >= rest.len() {
        return None;
    }
    rest.remove(idx);
    Some(rest.remove(idx))
}

fn build_config(db_path: String, rest: &mut Vec<String>) -> ServiceConfig {
    let mut cfg = ServiceConfig {
        db_path: PathBuf::from(db_path),
        ..ServiceConfig::default()
    };
    if let Some(dir) = take_flag_value(rest, "--hnsw") {
        cfg.hnsw_dir = Some(PathBuf::from(dir));
    }
    cfg
}

fn do_ingest(mut tail: Vec<String>) -> Result<(), String> {
    let db_path = take_db_path(&mut tail);
    let mut rest = tail;
    let file = if !rest.is_empty() && !rest[0].starts_with('-') {
        rest.remove(0)
    } else {
        return Err("ingest requires a FILE argument".into());
    };

    let cfg = build_config(db_path, &mut rest);
    let mut svc = Services::new(cfg).map_err(|e| e.to_string())?;
    let report = svc.ingest_file(&file).map_err(|e| e.to_string())?;

    println!(
        "Ingested {} chunks ({} exact duplicates, {} near duplicates, {} fallback embeddings)",
        report.chunks_written, report.exact_duplicates, report.near_duplicates, report.fallback_embeddings
    );
    Ok(())
}

fn do_search(mut tail: Vec<String>) -> Result<(), String> {
    let db_path = take_db_path(&mut tail);
    let mut rest = tail;
    let query = take_flag_value(&mut rest, "--query").ok_or("--query is required")?;
    let top_k: usize = take_flag_value(&mut rest, "--k").and_then(|s| s.parse().ok()).unwrap_or(10);
    let week_filter: Option<u32> = take_flag_value(&mut rest, "--week").and_then(|s| s.parse().ok());

    let cfg = build_config(db_path, &mut rest);
    let svc = Services::new(cfg).map_err(|e| e.to_string())?;

    let mut filters = Vec::new();
    if let Some(week) = week_filter {
        filters.push(FilterClause::week_number(week));
    }

    let response = svc.search(&query, &filters, top_k).map_err(|e| e.to_string())?;
    println!("Results: {}", response.results.len());
    for (i, r) in response.results.iter().enumerate() {
        let preview = truncate_chars(&r.chunk.text, 80);
        println!("{:>2}. relevance={:.4} {}", i + 1, r.score, r.citation.replace('\n', " | "));
        println!("    {preview}");
    }
    Ok(())
}

fn do_scope(mut tail: Vec<String>) -> Result<(), String> {
    let db_path = take_db_path(&mut tail);
    let mut rest = tail;
    let question = take_flag_value(&mut rest, "--question").ok_or("--question is required")?;

    let cfg = build_config(db_path, &mut rest);
    let svc = Services::new(cfg).map_err(|e| e.to_string())?;
    let result = svc.check_scope(&question).map_err(|e| e.to_string())?;

    println!("in_scope={} confidence={:.2}", result.in_scope, result.confidence);
    println!("reason: {}", result.reason);
    if !result.related_topics.is_empty() {
        println!("related topics: {}", result.related_topics.join(", "));
    }
    Ok(())
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    let mut it = s.chars();
    let truncated: String = it.by_ref().take(max_chars).collect();
    if it.next().is_some() {
        format!("{truncated}\u{2026}")
    } else {
        truncated
    }
}

fn main() {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return;
    }
    let cmd = args.remove(0);
    let res = match cmd.as_str() {
        "ingest" => do_ingest(args),
        "search" => do_search(args),
        "scope" => do_scope(args),
        _ => {
            print_usage();
            return;
        }
    };
    if let Err(err) = res {
        eprintln!("Error: {err}");
        print_usage();
        std::process::exit(1);
    }
}
