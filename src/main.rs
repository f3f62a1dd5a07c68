use coursegraph::analyze::{analyze, write_ranks_csv, write_topo_csv};
use coursegraph::config::CrawlConfig;
use coursegraph::crawl::CrawlDriver;
use coursegraph::gexf::{write_incompat_gexf, write_prereq_gexf};
use coursegraph::graph::{ConflictGraph, CourseGraph};
use coursegraph::server::{create_router, CourseStore};
use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    println!("coursegraph {VERSION}");

    let config_path = match std::env::args().skip(1).last() {
        Some(s) => s,
        None => {
            println!("[!] Please provide the path to a configuration file for the crawler.");
            return ExitCode::FAILURE;
        }
    };

    let config_path = Path::new(config_path.as_str());
    if !config_path.exists() {
        println!("[!] Invalid path. Please provide the path to a configuration file.");
        return ExitCode::FAILURE;
    }

    let config = match CrawlConfig::load(config_path) {
        Ok(c) => c,
        Err(err) => {
            println!("[!] Bad config file. Please fix it and then try again.\n{err}");
            return ExitCode::FAILURE;
        }
    };

    println!("[cfg] loaded config from {config_path:?}, output dir {}", config.output_dir);

    if let Err(err) = run(config).await {
        println!("[!] Fatal error: {err:#}");
        return ExitCode::FAILURE;
    }

    println!("Exiting.");
    ExitCode::SUCCESS
}

async fn run(config: CrawlConfig) -> anyhow::Result<()> {
    let output_dir = std::path::PathBuf::from(&config.output_dir);
    let serve = config.serve.clone();

    let driver = CrawlDriver::new(config)?;
    let outcome = driver.run().await?;

    let course_graph = CourseGraph::build(&outcome.edges);
    let conflict_graph = ConflictGraph::build(&outcome.conflicts);
    let (ranks, topo) = analyze(&course_graph);

    println!("[rank] {} courses ranked", ranks.len());
    println!("[topo] {} courses in topological order", topo.len());

    write_ranks_csv(output_dir.join("ranks.csv"), &ranks)?;
    write_topo_csv(output_dir.join("topo_order.csv"), &topo)?;

    let mut incompat_counts: HashMap<String, (usize, Vec<String>)> = HashMap::new();
    for (a, b) in &outcome.conflicts {
        let entry = incompat_counts.entry(a.clone()).or_insert((0, Vec::new()));
        entry.0 += 1;
        entry.1.push(b.clone());
    }

    write_prereq_gexf(
        output_dir.join("courses_graph.gexf"),
        &course_graph,
        &ranks,
        &outcome.pages,
        &incompat_counts,
    )?;
    write_incompat_gexf(output_dir.join("courses_graph_incompat.gexf"), &conflict_graph)?;
    println!("[graph] wrote courses_graph.gexf and courses_graph_incompat.gexf");

    if let Some(bind) = serve {
        let store = Arc::new(CourseStore::load(&output_dir.join("prereq_structured.json"))?);
        let app = create_router(store);
        let addr_str = format!("{}:{}", bind.address, bind.port);
        println!("[cfg] serving external HTTP view on {addr_str}");
        axum::Server::bind(&addr_str.parse()?)
            .serve(app.into_make_service())
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.expect("failed to listen for ctrl+c");
            })
            .await?;
    }

    Ok(())
}
