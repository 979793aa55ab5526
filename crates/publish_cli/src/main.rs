//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `publish_core` and `publish_api` wiring against the configured
//!   database.
//! - Print the active article listing, optionally narrowed by a tag filter
//!   passed as the first argument (`publish_cli "go, rust"`).

use publish_api::api::ListArticlesRequest;
use publish_api::PublishApi;
use std::process::ExitCode;

fn main() -> ExitCode {
    let api = PublishApi::from_env();
    if let Err(err) = api.init_logging() {
        eprintln!("publish_cli logging disabled: {err}");
    }

    println!("publish_core version={}", publish_core::core_version());
    println!("publish_cli db_path={}", api.config().db_path.display());

    let request = ListArticlesRequest {
        tag: std::env::args().nth(1),
        ..ListArticlesRequest::default()
    };
    match api.list_articles(&request) {
        Ok(articles) => {
            println!("publish_cli articles={}", articles.len());
            for article in articles {
                let tags: Vec<&str> = article.tags.iter().map(|tag| tag.name.as_str()).collect();
                println!("{} {} [{}]", article.id, article.slug, tags.join(","));
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("publish_cli list failed: {err}");
            ExitCode::FAILURE
        }
    }
}
